//! Geographic coordinates attached to locations.

use serde::{Deserialize, Serialize};

/// Latitude/longitude pair carried by a location.
///
/// Geo info follows two rules enforced by the location tree:
///
/// - once set on a location it is never cleared by a later `None`
/// - a location whose parent already carries geo info inherits it
///   instead of computing its own
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinates {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl GeoCoordinates {
    /// Creates a coordinate pair.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for GeoCoordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let geo = GeoCoordinates::new(51.5, -0.1);
        assert_eq!(geo.to_string(), "(51.5, -0.1)");
    }
}
