//! Geographic sanity filter.

use crime_dashboard_source_models::Coordinates;
use serde::{Deserialize, Serialize};

/// An inclusive latitude/longitude box. Points outside it are treated as
/// geocoding errors and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_latitude: f64,
    /// Northern edge.
    pub max_latitude: f64,
    /// Western edge.
    pub min_longitude: f64,
    /// Eastern edge.
    pub max_longitude: f64,
}

impl BoundingBox {
    /// The City of Chicago and its immediate surroundings.
    pub const CHICAGO: Self = Self {
        min_latitude: 41.0,
        max_latitude: 42.2,
        min_longitude: -88.5,
        max_longitude: -87.0,
    };

    /// Whether every edge is finite and each minimum is below its maximum.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [
            self.min_latitude,
            self.max_latitude,
            self.min_longitude,
            self.max_longitude,
        ]
        .iter()
        .all(|v| v.is_finite())
            && self.min_latitude < self.max_latitude
            && self.min_longitude < self.max_longitude
    }

    /// Whether `point` lies inside the box, edges included.
    #[must_use]
    pub fn contains(&self, point: &Coordinates) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&point.longitude)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::CHICAGO
    }
}
