use serde::{Deserialize, Serialize};

/// A latitude/longitude pair identifying a point on Earth.
///
/// Plain value type; equality is derived field-by-field and is what the
/// orchestrator uses to drop duplicate submissions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A place: an optional locality name plus the coordinate it belongs to.
///
/// `name` is absent when reverse geocoding failed or returned nothing;
/// consumers must be able to render weather without it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: Option<String>,
    pub coordinate: Coordinate,
}

impl Place {
    pub fn named(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            name: Some(name.into()),
            coordinate,
        }
    }

    pub fn unnamed(coordinate: Coordinate) -> Self {
        Self {
            name: None,
            coordinate,
        }
    }
}

/// Current weather for a coordinate, as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherReading {
    /// Temperature in Kelvin, straight from the wire.
    pub temperature_kelvin: f64,
}

impl WeatherReading {
    /// Integer Celsius, truncated toward zero.
    ///
    /// Truncation (not rounding, not floor): 298.08 K is 24.93 °C and
    /// displays as 24; 263.0 K is −10.15 °C and displays as −10.
    pub fn celsius(&self) -> i32 {
        (self.temperature_kelvin - 273.15) as i32
    }
}

/// Location service errors.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    Unavailable,
    #[error("Location error: {0}")]
    Other(String),
}

impl LocationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => {
                "Location access was denied. Allow it or search for a city instead."
            }
            LocationError::Unavailable => {
                "Your location could not be determined. Search for a city instead."
            }
            LocationError::Other(_) => "Location lookup failed. Please try again.",
        }
    }
}

/// Reverse-geocoding and place-search errors.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("No place found for the coordinate")]
    NoResult,
    #[error("Geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Geocoding service returned status {0}")]
    Status(u16),
    #[error("Malformed geocoding response: {0}")]
    Parse(String),
}

impl GeocodeError {
    pub fn user_message(&self) -> &'static str {
        match self {
            GeocodeError::NoResult => "No place name is known for this location.",
            GeocodeError::Http(_) | GeocodeError::Status(_) => {
                "Place lookup failed. Check your connection."
            }
            GeocodeError::Parse(_) => "Place lookup returned an unexpected response.",
        }
    }
}

/// Weather provider errors.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Invalid weather request: {0}")]
    InvalidRequest(String),
    #[error("Weather network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Malformed weather response: {0}")]
    Decode(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::InvalidRequest(_) => {
                "The weather service rejected the request. Check your API key."
            }
            WeatherError::Network(_) => "Weather is unavailable. Check your connection.",
            WeatherError::Decode(_) => "The weather service returned an unexpected response.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_celsius_truncates_positive() {
        // 298.08 K = 24.93 °C
        let reading = WeatherReading {
            temperature_kelvin: 298.08,
        };
        assert_eq!(reading.celsius(), 24);
    }

    #[test]
    fn test_celsius_truncates_toward_zero_below_freezing() {
        // 263.0 K = −10.15 °C; truncation gives −10 where floor would give −11
        let reading = WeatherReading {
            temperature_kelvin: 263.0,
        };
        assert_eq!(reading.celsius(), -10);
    }

    #[test]
    fn test_celsius_near_zero() {
        let just_above = WeatherReading {
            temperature_kelvin: 273.80,
        };
        assert_eq!(just_above.celsius(), 0);
        let just_below = WeatherReading {
            temperature_kelvin: 272.60,
        };
        assert_eq!(just_below.celsius(), 0);
    }

    #[test]
    fn test_coordinate_value_equality() {
        let a = Coordinate::new(47.6062, -122.3321);
        let b = Coordinate::new(47.6062, -122.3321);
        let c = Coordinate::new(47.6062, -122.3320);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_user_messages_are_non_empty() {
        assert!(!LocationError::PermissionDenied.user_message().is_empty());
        assert!(!GeocodeError::NoResult.user_message().is_empty());
        assert!(!WeatherError::Decode("x".into()).user_message().is_empty());
    }
}
