//! Geocoding: coordinates to place names, and city search.
//!
//! Backed by Nominatim (OpenStreetMap) - free, no API key required.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::orchestrator::ResolvePlace;
use crate::types::{Coordinate, GeocodeError, Place};
use async_trait::async_trait;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "droplets/0.1.0 (weather lookup)";

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    #[serde(rename = "state_district")]
    state_district: Option<String>,
    state: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

impl Address {
    /// Pick a display name: the most specific locality available, with a
    /// state/country suffix for disambiguation when different from it.
    fn place_name(self) -> Option<String> {
        let state = self.state.clone();
        let country = self.country.clone();

        // Prefer city > town > village > municipality for the primary name
        let place = self
            .city
            .or(self.town)
            .or(self.village)
            .or(self.municipality)
            .or(self.state_district)
            .or(self.county)
            .or(self.state)
            .or(self.country)?;

        let suffix = state
            .as_ref()
            .filter(|s| !s.is_empty() && s.as_str() != place)
            .map(String::as_str)
            .or_else(|| {
                country
                    .as_ref()
                    .filter(|c| !c.is_empty() && c.as_str() != place)
                    .map(String::as_str)
            });

        match suffix {
            Some(suffix) => Some(format!("{}, {}", place, suffix)),
            None => Some(place),
        }
    }
}

/// One match from the place-search endpoint. Nominatim serializes the
/// coordinates as strings.
#[derive(Debug, Deserialize)]
struct SearchResult {
    display_name: String,
    lat: String,
    lon: String,
}

/// Nominatim client for reverse geocoding and city search.
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Client,
    base_url: Url,
}

impl Geocoder {
    /// Client against the public Nominatim instance.
    pub fn new() -> Result<Self, GeocodeError> {
        Self::with_base_url(NOMINATIM_URL)
    }

    /// Client against a specific Nominatim instance.
    pub fn with_base_url(base_url: &str) -> Result<Self, GeocodeError> {
        let base_url =
            Url::parse(base_url).map_err(|e| GeocodeError::Parse(format!("base URL: {e}")))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Reverse geocode a coordinate to a place (e.g. "Seattle, Washington").
    pub async fn reverse(&self, coordinate: Coordinate) -> Result<Place, GeocodeError> {
        let mut url = self
            .base_url
            .join("/reverse")
            .map_err(|e| GeocodeError::Parse(format!("reverse URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("lat", &coordinate.latitude.to_string())
            .append_pair("lon", &coordinate.longitude.to_string())
            .append_pair("format", "json")
            .append_pair("addressdetails", "1")
            .append_pair("layer", "address")
            .append_pair("zoom", "10");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let parsed: ReverseResponse =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

        let name = parsed
            .address
            .and_then(Address::place_name)
            .ok_or(GeocodeError::NoResult)?;

        tracing::debug!(%name, "reverse geocoded coordinate");
        Ok(Place::named(name, coordinate))
    }

    /// Search places matching a free-form query. Finite suggestion list,
    /// meant to be re-issued per keystroke; unparseable entries are
    /// skipped.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<Place>, GeocodeError> {
        let mut url = self
            .base_url
            .join("/search")
            .map_err(|e| GeocodeError::Parse(format!("search URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("limit", &limit.to_string());

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let results: Vec<SearchResult> =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

        let places = results
            .into_iter()
            .filter_map(|result| {
                match (result.lat.parse::<f64>(), result.lon.parse::<f64>()) {
                    (Ok(latitude), Ok(longitude)) => Some(Place::named(
                        result.display_name,
                        Coordinate::new(latitude, longitude),
                    )),
                    _ => {
                        tracing::debug!(
                            name = %result.display_name,
                            "skipping search result with unparseable coordinates"
                        );
                        None
                    }
                }
            })
            .collect();

        Ok(places)
    }
}

#[async_trait]
impl ResolvePlace for Geocoder {
    async fn resolve(&self, coordinate: Coordinate) -> Result<Place, GeocodeError> {
        self.reverse(coordinate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_name_prefers_city_and_adds_state() {
        let body = r#"{
            "address": {
                "city": "Seattle",
                "county": "King County",
                "state": "Washington",
                "country": "United States"
            }
        }"#;
        let parsed: ReverseResponse = serde_json::from_str(body).unwrap();
        let name = parsed.address.unwrap().place_name();
        assert_eq!(name.as_deref(), Some("Seattle, Washington"));
    }

    #[test]
    fn test_place_name_falls_back_to_country_suffix() {
        let body = r#"{
            "address": {
                "town": "Gimmelwald",
                "country": "Switzerland"
            }
        }"#;
        let parsed: ReverseResponse = serde_json::from_str(body).unwrap();
        let name = parsed.address.unwrap().place_name();
        assert_eq!(name.as_deref(), Some("Gimmelwald, Switzerland"));
    }

    #[test]
    fn test_place_name_suppresses_suffix_equal_to_place() {
        // City-states: place and state carry the same name.
        let body = r#"{
            "address": {
                "city": "Berlin",
                "state": "Berlin",
                "country": "Germany"
            }
        }"#;
        let parsed: ReverseResponse = serde_json::from_str(body).unwrap();
        let name = parsed.address.unwrap().place_name();
        assert_eq!(name.as_deref(), Some("Berlin, Germany"));
    }

    #[test]
    fn test_empty_address_yields_no_name() {
        let parsed: ReverseResponse = serde_json::from_str(r#"{"address": {}}"#).unwrap();
        assert_eq!(parsed.address.unwrap().place_name(), None);
    }

    #[test]
    fn test_missing_address_parses() {
        let parsed: ReverseResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(parsed.address.is_none());
    }

    #[test]
    fn test_search_results_parse_string_coordinates() {
        let body = r#"[
            {"display_name": "Paris, Île-de-France, France", "lat": "48.8589", "lon": "2.32"},
            {"display_name": "Paris, Texas, United States", "lat": "33.66", "lon": "-95.555"}
        ]"#;
        let results: Vec<SearchResult> = serde_json::from_str(body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].lat.parse::<f64>().unwrap(), 48.8589);
    }
}
