//! Latency sample wire format
//!
//! Samples are posted as a JSON array holding a single object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geo::Coordinate;
use super::request::GeoMetadata;

/// One measured server-time round trip against a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    pub node_id: String,
    /// Round trip in seconds
    pub value: f64,
    pub time: DateTime<Utc>,
    pub location: SampleLocation,
    pub source: String,
    pub meta: SampleMeta,
}

/// Client location, enriched with request geo metadata when available
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colo: Option<String>,
}

impl SampleLocation {
    pub fn new(coordinate: Coordinate, geo: Option<&GeoMetadata>) -> Self {
        let mut location = Self {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            ..Default::default()
        };

        if let Some(geo) = geo {
            location.country = geo.country.clone();
            location.city = geo.city.clone();
            location.region = geo.region.clone();
            location.region_code = geo.region_code.clone();
            location.continent = geo.continent.clone();
            location.postal_code = geo.postal_code.clone();
            location.timezone = geo.timezone.clone();
            location.colo = geo.colo.clone();
        }

        location
    }
}

/// Query details attached to a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMeta {
    pub query: String,
    /// Server time returned by the query; null unless exactly one row came back
    pub result: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}
