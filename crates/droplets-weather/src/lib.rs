//! Weather lookup core for Droplets.
//!
//! Resolves a coordinate (device location or a searched city) to a place
//! name and current temperature: reverse geocoding via Nominatim, weather
//! via OpenWeatherMap, sequenced by a stale-result-suppressing
//! orchestrator.

pub mod geocode;
pub mod location;
pub mod orchestrator;
pub mod provider;
pub mod types;

pub use geocode::Geocoder;
pub use location::{current_location, AuthorizationStatus, IpLocationSource, LocationSource};
pub use orchestrator::{AppState, FetchWeather, Orchestrator, Phase, ResolvePlace};
pub use provider::WeatherProvider;
pub use types::*;
