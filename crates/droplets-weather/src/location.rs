//! Device location retrieval.
//!
//! [`LocationSource`] abstracts over host location services: it exposes the
//! authorization state, a way to prompt for authorization, and the raw
//! location request. The permission sequencing itself lives in
//! [`current_location`] and is shared by every implementation.

use async_trait::async_trait;
use ipgeolocate::{Locator, Service};

use crate::types::{Coordinate, LocationError};

/// Host authorization state for location access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    Undetermined,
    Denied,
    /// Denied by policy rather than by the user (parental controls etc.).
    Restricted,
    Authorized,
}

/// A source of device coordinates.
///
/// Implementations differ only in how they bind to the host's location
/// services; none of them performs permission sequencing on its own.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Current authorization state, without prompting.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Prompt the user for authorization and resolve to their decision.
    async fn request_authorization(&self) -> AuthorizationStatus;

    /// Issue a raw location request. Callers are expected to have checked
    /// authorization first; see [`current_location`].
    async fn request_location(&self) -> Result<Coordinate, LocationError>;
}

/// Obtain the device's current coordinate, requesting authorization lazily.
///
/// Authorization is requested only when still undetermined. A denied or
/// restricted state yields [`LocationError::PermissionDenied`] without
/// issuing a location request, and is never retried automatically; the
/// next user action is the only recovery path.
pub async fn current_location(source: &dyn LocationSource) -> Result<Coordinate, LocationError> {
    let status = match source.authorization_status() {
        AuthorizationStatus::Undetermined => source.request_authorization().await,
        status => status,
    };

    match status {
        AuthorizationStatus::Authorized => source.request_location().await,
        AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
            tracing::info!("location permission denied; not requesting location");
            Err(LocationError::PermissionDenied)
        }
        // Prompt dismissed without a decision.
        AuthorizationStatus::Undetermined => Err(LocationError::PermissionDenied),
    }
}

/// Location via IP geolocation (ip-api.com).
///
/// Coarse but dependency-free on the host side: no OS location stack and
/// therefore no permission prompt, so authorization is always granted.
#[derive(Debug, Default, Clone, Copy)]
pub struct IpLocationSource;

#[async_trait]
impl LocationSource for IpLocationSource {
    fn authorization_status(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }

    async fn request_authorization(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }

    async fn request_location(&self) -> Result<Coordinate, LocationError> {
        // An empty IP makes the service geolocate the caller.
        let located = Locator::get("", Service::IpApi).await.map_err(|error| {
            tracing::warn!(%error, "IP geolocation failed");
            LocationError::Unavailable
        })?;

        let latitude = located.latitude.parse::<f64>();
        let longitude = located.longitude.parse::<f64>();
        match (latitude, longitude) {
            (Ok(latitude), Ok(longitude)) => {
                tracing::info!(latitude, longitude, city = %located.city, "located device by IP");
                Ok(Coordinate::new(latitude, longitude))
            }
            _ => Err(LocationError::Other(format!(
                "unparseable coordinates from geolocation service: {}, {}",
                located.latitude, located.longitude
            ))),
        }
    }
}
