//! Current-weather fetch against the OpenWeatherMap endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use droplets_core::{ConfigError, WeatherConfig};

use crate::orchestrator::FetchWeather;
use crate::types::{Coordinate, WeatherError, WeatherReading};

const WEATHER_PATH: &str = "/data/2.5/weather";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Wire shape of the provider response. Only `main.temp` is consumed;
/// anything that does not carry it is a decode failure.
#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: MainSection,
}

#[derive(Debug, Deserialize)]
struct MainSection {
    temp: f64,
}

/// Weather provider client.
///
/// One HTTPS GET per fetch, no retries. The API key is required at
/// construction; a missing key is a configuration error, not a panic.
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: Url,
    api_key: String,
}

impl WeatherProvider {
    pub fn new(config: &WeatherConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .effective_api_key()
            .ok_or_else(|| ConfigError::MissingSetting("weather.api_key".to_string()))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::Invalid(format!("weather.base_url: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {e}")))?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            api_key,
        })
    }

    /// The request URL for a coordinate: `{base}/data/2.5/weather` with
    /// `lat`, `lon` and `appid` query parameters.
    fn request_url(&self, coordinate: Coordinate) -> Result<Url, WeatherError> {
        let mut url = self
            .base_url
            .join(WEATHER_PATH)
            .map_err(|e| WeatherError::InvalidRequest(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("lat", &coordinate.latitude.to_string())
            .append_pair("lon", &coordinate.longitude.to_string())
            .append_pair("appid", &self.api_key);
        Ok(url)
    }

    async fn fetch_current(&self, coordinate: Coordinate) -> Result<WeatherReading, WeatherError> {
        let url = self.request_url(coordinate)?;
        tracing::debug!(
            latitude = coordinate.latitude,
            longitude = coordinate.longitude,
            "fetching current weather"
        );

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            // The provider reports bad keys and malformed parameters as a
            // JSON error object; surface the status instead of a decode
            // failure.
            return Err(WeatherError::InvalidRequest(format!(
                "provider returned status {status}"
            )));
        }

        let body = response.text().await?;
        let parsed: WeatherResponse =
            serde_json::from_str(&body).map_err(|e| WeatherError::Decode(e.to_string()))?;

        Ok(WeatherReading {
            temperature_kelvin: parsed.main.temp,
        })
    }
}

#[async_trait]
impl FetchWeather for WeatherProvider {
    async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherReading, WeatherError> {
        self.fetch_current(coordinate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> WeatherProvider {
        let config = WeatherConfig {
            api_key: "test-key".to_string(),
            ..WeatherConfig::default()
        };
        WeatherProvider::new(&config).unwrap()
    }

    #[test]
    fn test_missing_api_key_fails_construction() {
        let config = WeatherConfig {
            api_key: String::new(),
            ..WeatherConfig::default()
        };
        // Guard against an ambient key leaking in from the environment.
        if config.effective_api_key().is_some() {
            return;
        }
        let result = WeatherProvider::new(&config);
        assert!(matches!(result, Err(ConfigError::MissingSetting(_))));
    }

    #[test]
    fn test_request_url_shape() {
        let url = provider()
            .request_url(Coordinate::new(47.6062, -122.3321))
            .unwrap();

        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("api.openweathermap.org"));
        assert_eq!(url.path(), "/data/2.5/weather");

        let params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(params.contains(&("lat".to_string(), "47.6062".to_string())));
        assert!(params.contains(&("lon".to_string(), "-122.3321".to_string())));
        assert!(params.contains(&("appid".to_string(), "test-key".to_string())));
    }

    #[test]
    fn test_valid_body_parses_kelvin() {
        let body = r#"{"main": {"temp": 298.08}}"#;
        let parsed: WeatherResponse = serde_json::from_str(body).unwrap();
        let reading = WeatherReading {
            temperature_kelvin: parsed.main.temp,
        };
        assert_eq!(reading.temperature_kelvin, 298.08);
        assert_eq!(reading.celsius(), 24);
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let body = r#"{
            "coord": {"lon": -122.33, "lat": 47.61},
            "weather": [{"id": 500, "main": "Rain"}],
            "main": {"temp": 281.4, "feels_like": 279.9, "humidity": 87},
            "name": "Seattle"
        }"#;
        let parsed: WeatherResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.main.temp, 281.4);
    }

    #[test]
    fn test_malformed_bodies_fail_to_parse() {
        for body in [
            r#"{}"#,
            r#"{"main": {}}"#,
            r#"{"main": {"temp": "hot"}}"#,
            r#"{"temp": 298.08}"#,
            r#"not json"#,
        ] {
            assert!(
                serde_json::from_str::<WeatherResponse>(body).is_err(),
                "expected decode failure for {body:?}"
            );
        }
    }
}
