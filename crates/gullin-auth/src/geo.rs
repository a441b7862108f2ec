//! IP geolocation for security notices.

/// Resolves a client IP to a human-readable location.
///
/// Lookups are best-effort: `None` means unknown, never an error.
pub trait GeoLocator: Send + Sync {
    fn locate(&self, ip: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Locator that never knows.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeoLocation;

impl GeoLocator for NoGeoLocation {
    async fn locate(&self, _ip: &str) -> Option<String> {
        None
    }
}

pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Location string for a notice, degrading to [`UNKNOWN_LOCATION`].
pub async fn describe<G: GeoLocator>(geo: &G, ip: &str) -> String {
    geo.locate(ip)
        .await
        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
}
