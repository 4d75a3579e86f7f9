//! Incoming request context
//!
//! Edge runtimes attach geo metadata and headers to each request. The connect
//! path reads the client coordinate from it when none is given explicitly,
//! and latency samples carry the enrichment fields and a trace id.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::geo::{CoordinateComponent, CoordinateInput};

/// Geo metadata attached to a request by the edge runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoMetadata {
    #[serde(default)]
    pub latitude: Option<CoordinateComponent>,
    #[serde(default)]
    pub longitude: Option<CoordinateComponent>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_code: Option<String>,
    #[serde(default)]
    pub continent: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub colo: Option<String>,
}

/// Request-derived context for one connect call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub geo: Option<GeoMetadata>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl RequestContext {
    pub fn with_geo(mut self, geo: GeoMetadata) -> Self {
        self.geo = Some(geo);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Coordinate embedded in the geo metadata, if it carries either component
    pub fn coordinate(&self) -> Option<CoordinateInput> {
        let geo = self.geo.as_ref()?;
        if geo.latitude.is_none() && geo.longitude.is_none() {
            return None;
        }

        Some(CoordinateInput {
            latitude: geo.latitude.clone(),
            longitude: geo.longitude.clone(),
        })
    }
}
