//! Latency telemetry
//!
//! After a connection opens, a sampled fraction of connect calls time one
//! `SELECT NOW()` round trip and post the result to the cluster's latency
//! endpoint. Nothing in this module can fail a connect call: every error is
//! contained and logged.

pub mod http;
pub mod latency;

use async_trait::async_trait;
use pgedge_shared::{LatencySample, TelemetrySettings};
use tracing::warn;
use url::Url;

use crate::env::Lookup;
use crate::{DatabaseError, CLUSTER_ID_KEY, LATENCY_URL_KEY};

pub use http::HttpTelemetrySink;
pub use latency::{LatencyReporter, SamplingRate, SERVER_TIME_QUERY};

/// Telemetry measurement and delivery errors
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Telemetry endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Server time query failed: {0}")]
    Query(#[from] DatabaseError),

    #[error("Invalid telemetry endpoint: {0}")]
    Endpoint(String),
}

/// Destination for latency sample batches
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn deliver(&self, endpoint: &str, batch: &[LatencySample]) -> Result<(), TelemetryError>;
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Canonical latency endpoint for a cluster
///
/// The cluster id is percent-encoded as a single path segment.
pub fn cluster_endpoint(settings: &TelemetrySettings, cluster_id: &str) -> Option<Url> {
    let base = format!("https://api.{}/", settings.service_domain.trim());
    let mut url = match Url::parse(&base) {
        Ok(url) => url,
        Err(e) => {
            warn!(
                "Service domain '{}' does not form a valid URL: {}",
                settings.service_domain, e
            );
            return None;
        }
    };

    url.path_segments_mut()
        .ok()?
        .clear()
        .extend(["clusters", cluster_id, "views", "latency-measurements"]);
    url.set_query(None);
    url.set_fragment(None);
    Some(url)
}

/// Resolve the latency endpoint for this connect call
///
/// An explicit `PGEDGE_LATENCY_URL` wins; otherwise `PGEDGE_CLUSTER_ID` is
/// expanded into the canonical cluster URL. Unparseable URLs disable
/// reporting.
pub fn resolve_endpoint(lookup: &dyn Lookup, settings: &TelemetrySettings) -> Option<String> {
    let Some(endpoint) = lookup.get(LATENCY_URL_KEY).and_then(non_empty) else {
        let cluster_id = lookup.get(CLUSTER_ID_KEY).and_then(non_empty)?;
        return cluster_endpoint(settings, &cluster_id).map(String::from);
    };

    match Url::parse(&endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(endpoint),
        Ok(url) => {
            warn!(
                "Latency endpoint has unsupported scheme '{}', reporting disabled",
                url.scheme()
            );
            None
        }
        Err(e) => {
            warn!("Latency endpoint '{}' is not a valid URL: {}", endpoint, e);
            None
        }
    }
}
