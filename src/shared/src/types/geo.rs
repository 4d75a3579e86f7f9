//! Geographic coordinate types
//!
//! `Coordinate` is the strict form used for distance computation.
//! `CoordinateInput` is what callers and request contexts hand us: each
//! component may be a number, a numeric string or something unusable, and
//! must be resolved against a default before use.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback client latitude (Washington, DC)
pub const DEFAULT_LATITUDE: f64 = 38.88;

/// Fallback client longitude (Washington, DC)
pub const DEFAULT_LONGITUDE: f64 = -77.04;

/// A point on the globe in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Latitude in [-90, 90] and longitude in [-180, 180]
    pub fn is_within_bounds(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::new(DEFAULT_LATITUDE, DEFAULT_LONGITUDE)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// One loosely-typed coordinate component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateComponent {
    Number(f64),
    Text(String),
    Unknown(serde_json::Value),
}

impl CoordinateComponent {
    /// Finite degrees, or `None` when the component is not numeric.
    pub fn to_degrees(&self) -> Option<f64> {
        let value = match self {
            CoordinateComponent::Number(value) => *value,
            CoordinateComponent::Text(text) => text.trim().parse::<f64>().ok()?,
            CoordinateComponent::Unknown(_) => return None,
        };

        value.is_finite().then_some(value)
    }
}

impl From<f64> for CoordinateComponent {
    fn from(value: f64) -> Self {
        CoordinateComponent::Number(value)
    }
}

impl From<&str> for CoordinateComponent {
    fn from(value: &str) -> Self {
        CoordinateComponent::Text(value.to_string())
    }
}

impl From<String> for CoordinateComponent {
    fn from(value: String) -> Self {
        CoordinateComponent::Text(value)
    }
}

/// Client coordinate as supplied by a caller or request context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateInput {
    #[serde(default)]
    pub latitude: Option<CoordinateComponent>,
    #[serde(default)]
    pub longitude: Option<CoordinateComponent>,
}

impl CoordinateInput {
    pub fn new(
        latitude: impl Into<CoordinateComponent>,
        longitude: impl Into<CoordinateComponent>,
    ) -> Self {
        Self {
            latitude: Some(latitude.into()),
            longitude: Some(longitude.into()),
        }
    }

    /// Parse both components, substituting the matching component of
    /// `default` for any that is absent or not numeric.
    pub fn resolve(&self, default: Coordinate) -> Coordinate {
        let latitude = self
            .latitude
            .as_ref()
            .and_then(CoordinateComponent::to_degrees)
            .unwrap_or(default.latitude);
        let longitude = self
            .longitude
            .as_ref()
            .and_then(CoordinateComponent::to_degrees)
            .unwrap_or(default.longitude);

        Coordinate::new(latitude, longitude)
    }
}

impl From<Coordinate> for CoordinateInput {
    fn from(coordinate: Coordinate) -> Self {
        Self::new(coordinate.latitude, coordinate.longitude)
    }
}

impl From<(f64, f64)> for CoordinateInput {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}
