//! Coordinate-resolution-then-weather-fetch pipeline.
//!
//! The orchestrator owns the application state and sequences the two
//! lookups for every new coordinate: reverse geocoding and the weather
//! fetch run concurrently, and their combined outcome is published as one
//! snapshot. A newer coordinate supersedes an in-flight older one; the
//! stale results are discarded when they eventually arrive.
//!
//! All state mutation happens on a single task. Lookups run elsewhere and
//! post their completions back over a channel, which is the only
//! synchronization in the module.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::types::{Coordinate, GeocodeError, Place, WeatherError, WeatherReading};

/// Orchestrator lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No coordinate seen yet.
    #[default]
    Idle,
    /// Lookups in flight for the pending coordinate.
    Resolving,
    /// Results published for the pending coordinate.
    Ready,
}

/// Published application state.
///
/// `current_place` and `current_temperature_c` are always derived from the
/// same submission of `pending_coordinate`. `last_error` carries the
/// display message of an absorbed weather failure, cleared on the next
/// submission.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub phase: Phase,
    pub current_place: Option<Place>,
    pub current_temperature_c: Option<i32>,
    pub pending_coordinate: Option<Coordinate>,
    pub last_error: Option<String>,
}

/// Reverse geocoding seam consumed by the orchestrator.
#[async_trait]
pub trait ResolvePlace: Send + Sync {
    async fn resolve(&self, coordinate: Coordinate) -> Result<Place, GeocodeError>;
}

/// Weather fetch seam consumed by the orchestrator.
#[async_trait]
pub trait FetchWeather: Send + Sync {
    async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherReading, WeatherError>;
}

/// Pure sequencing core: no I/O, no time, driven entirely by the actor.
///
/// Submissions hand out generation tickets; completions are applied only
/// when their ticket is still the latest one. Generations rather than
/// coordinate comparison, so that re-submitting an earlier coordinate
/// cannot resurrect its superseded in-flight results.
#[derive(Debug, Default)]
struct Pipeline {
    state: AppState,
    generation: u64,
}

impl Pipeline {
    /// Accept a coordinate. Returns the generation ticket for the new
    /// resolution round, or `None` when the coordinate equals the pending
    /// one (duplicate submissions are no-ops, even after completion).
    fn submit(&mut self, coordinate: Coordinate) -> Option<u64> {
        if self.state.pending_coordinate == Some(coordinate) {
            return None;
        }
        self.generation += 1;
        self.state.phase = Phase::Resolving;
        self.state.pending_coordinate = Some(coordinate);
        self.state.current_place = None;
        self.state.current_temperature_c = None;
        self.state.last_error = None;
        Some(self.generation)
    }

    /// Apply a completed resolution round. Returns `false` when the round
    /// was superseded and its results were discarded.
    fn complete(
        &mut self,
        generation: u64,
        place: Place,
        temperature_c: Option<i32>,
        error: Option<String>,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.state.phase = Phase::Ready;
        self.state.current_place = Some(place);
        self.state.current_temperature_c = temperature_c;
        self.state.last_error = error;
        true
    }

    fn snapshot(&self) -> AppState {
        self.state.clone()
    }
}

enum Event {
    Submit(Coordinate),
    Completed {
        generation: u64,
        place: Place,
        temperature_c: Option<i32>,
        error: Option<String>,
    },
}

/// Handle to the orchestrator task.
///
/// Cheap to clone; the task runs until every handle is dropped and no
/// lookup is in flight.
#[derive(Clone)]
pub struct Orchestrator {
    events: mpsc::Sender<Event>,
    state: watch::Receiver<AppState>,
}

impl Orchestrator {
    /// Spawn the orchestrator task. Must be called within a tokio runtime.
    pub fn new(resolver: Arc<dyn ResolvePlace>, fetcher: Arc<dyn FetchWeather>) -> Self {
        let (events, inbox) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(AppState::default());
        tokio::spawn(run(inbox, events.downgrade(), state_tx, resolver, fetcher));
        Self {
            events,
            state: state_rx,
        }
    }

    /// Feed a coordinate into the pipeline. Duplicates of the pending
    /// coordinate are dropped by the sequencing core.
    pub async fn submit(&self, coordinate: Coordinate) {
        if self.events.send(Event::Submit(coordinate)).await.is_err() {
            tracing::error!("orchestrator task is gone; dropping coordinate");
        }
    }

    /// Subscribe to published state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.clone()
    }

    /// Latest published snapshot.
    pub fn state(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Wait for the next `Ready` snapshot.
    pub async fn ready_state(&self) -> AppState {
        let mut state = self.state.clone();
        loop {
            {
                let snapshot = state.borrow_and_update();
                if snapshot.phase == Phase::Ready {
                    return snapshot.clone();
                }
            }
            if state.changed().await.is_err() {
                // Task gone; return whatever was last published.
                return self.state.borrow().clone();
            }
        }
    }
}

async fn run(
    mut inbox: mpsc::Receiver<Event>,
    loopback: mpsc::WeakSender<Event>,
    state_tx: watch::Sender<AppState>,
    resolver: Arc<dyn ResolvePlace>,
    fetcher: Arc<dyn FetchWeather>,
) {
    let mut pipeline = Pipeline::default();

    // The loopback is held weakly here and upgraded per lookup: in-flight
    // lookups keep the loop alive, the loop itself does not.
    while let Some(event) = inbox.recv().await {
        match event {
            Event::Submit(coordinate) => {
                let Some(generation) = pipeline.submit(coordinate) else {
                    tracing::debug!(
                        latitude = coordinate.latitude,
                        longitude = coordinate.longitude,
                        "coordinate unchanged; nothing to do"
                    );
                    continue;
                };
                state_tx.send_replace(pipeline.snapshot());
                tracing::info!(
                    latitude = coordinate.latitude,
                    longitude = coordinate.longitude,
                    generation,
                    "resolving coordinate"
                );

                let Some(completions) = loopback.upgrade() else {
                    // Every handle is gone; nobody will observe the result.
                    continue;
                };
                let resolver = Arc::clone(&resolver);
                let fetcher = Arc::clone(&fetcher);
                tokio::spawn(async move {
                    let (place, weather) = tokio::join!(
                        resolver.resolve(coordinate),
                        fetcher.fetch(coordinate)
                    );

                    let place = place.unwrap_or_else(|error| {
                        tracing::warn!(%error, "reverse geocoding failed; continuing without a name");
                        Place::unnamed(coordinate)
                    });
                    let (temperature_c, error) = match weather {
                        Ok(reading) => (Some(reading.celsius()), None),
                        Err(error) => {
                            tracing::warn!(%error, "weather fetch failed");
                            (None, Some(error.user_message().to_string()))
                        }
                    };

                    let _ = completions
                        .send(Event::Completed {
                            generation,
                            place,
                            temperature_c,
                            error,
                        })
                        .await;
                });
            }
            Event::Completed {
                generation,
                place,
                temperature_c,
                error,
            } => {
                if pipeline.complete(generation, place, temperature_c, error) {
                    state_tx.send_replace(pipeline.snapshot());
                    tracing::debug!(generation, "published resolution results");
                } else {
                    tracing::debug!(generation, "discarding superseded results");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seattle() -> Coordinate {
        Coordinate::new(47.6062, -122.3321)
    }

    fn berlin() -> Coordinate {
        Coordinate::new(52.52, 13.405)
    }

    #[test]
    fn test_submit_transitions_to_resolving() {
        let mut pipeline = Pipeline::default();
        assert_eq!(pipeline.state.phase, Phase::Idle);

        let ticket = pipeline.submit(seattle());

        assert!(ticket.is_some());
        assert_eq!(pipeline.state.phase, Phase::Resolving);
        assert_eq!(pipeline.state.pending_coordinate, Some(seattle()));
        assert_eq!(pipeline.state.current_temperature_c, None);
    }

    #[test]
    fn test_duplicate_submit_is_noop() {
        let mut pipeline = Pipeline::default();
        let first = pipeline.submit(seattle());
        assert!(first.is_some());

        // While resolving and again after completion.
        assert_eq!(pipeline.submit(seattle()), None);
        pipeline.complete(first.unwrap(), Place::named("Seattle", seattle()), Some(24), None);
        assert_eq!(pipeline.submit(seattle()), None);
        assert_eq!(pipeline.state.phase, Phase::Ready);
    }

    #[test]
    fn test_completion_publishes_place_and_temperature() {
        let mut pipeline = Pipeline::default();
        let ticket = pipeline.submit(seattle()).unwrap();

        let applied = pipeline.complete(
            ticket,
            Place::named("Seattle, Washington", seattle()),
            Some(24),
            None,
        );

        assert!(applied);
        assert_eq!(pipeline.state.phase, Phase::Ready);
        assert_eq!(
            pipeline.state.current_place.as_ref().and_then(|p| p.name.as_deref()),
            Some("Seattle, Washington")
        );
        assert_eq!(pipeline.state.current_temperature_c, Some(24));
        assert_eq!(pipeline.state.last_error, None);
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut pipeline = Pipeline::default();
        let first = pipeline.submit(seattle()).unwrap();
        let second = pipeline.submit(berlin()).unwrap();

        // First round finishes after being superseded.
        let applied = pipeline.complete(first, Place::named("Seattle", seattle()), Some(24), None);
        assert!(!applied);
        assert_eq!(pipeline.state.phase, Phase::Resolving);
        assert_eq!(pipeline.state.pending_coordinate, Some(berlin()));
        assert_eq!(pipeline.state.current_temperature_c, None);

        let applied = pipeline.complete(second, Place::named("Berlin", berlin()), Some(7), None);
        assert!(applied);
        assert_eq!(
            pipeline.state.current_place.as_ref().and_then(|p| p.name.as_deref()),
            Some("Berlin")
        );
        assert_eq!(pipeline.state.current_temperature_c, Some(7));
    }

    #[test]
    fn test_resubmitted_coordinate_does_not_resurrect_old_round() {
        let mut pipeline = Pipeline::default();
        let first = pipeline.submit(seattle()).unwrap();
        pipeline.submit(berlin()).unwrap();
        let third = pipeline.submit(seattle()).unwrap();

        // The original Seattle round completes; same coordinate as the
        // current pending one, but an older submission.
        assert!(!pipeline.complete(first, Place::named("Seattle", seattle()), Some(20), None));
        assert_eq!(pipeline.state.phase, Phase::Resolving);

        assert!(pipeline.complete(third, Place::named("Seattle", seattle()), Some(21), None));
        assert_eq!(pipeline.state.current_temperature_c, Some(21));
    }

    #[test]
    fn test_weather_failure_leaves_temperature_unset() {
        let mut pipeline = Pipeline::default();
        let ticket = pipeline.submit(seattle()).unwrap();

        pipeline.complete(
            ticket,
            Place::named("Seattle", seattle()),
            None,
            Some("Weather is unavailable. Check your connection.".to_string()),
        );

        assert_eq!(pipeline.state.phase, Phase::Ready);
        assert_eq!(pipeline.state.current_temperature_c, None);
        assert!(pipeline.state.last_error.is_some());
        // The place still made it through.
        assert!(pipeline.state.current_place.is_some());
    }

    #[test]
    fn test_new_submission_clears_previous_error() {
        let mut pipeline = Pipeline::default();
        let ticket = pipeline.submit(seattle()).unwrap();
        pipeline.complete(ticket, Place::unnamed(seattle()), None, Some("boom".into()));
        assert!(pipeline.state.last_error.is_some());

        pipeline.submit(berlin()).unwrap();
        assert_eq!(pipeline.state.last_error, None);
    }
}
