//! Settings for nearest-node connect
//!
//! These structures are deserialized by the CLI from a settings file and
//! `PGEDGE_CONNECT__*` environment variables, and handed to the connect
//! library directly by embedding applications.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::geo::Coordinate;

/// Invalid settings values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("Default location {0} is outside valid latitude/longitude ranges")]
    LocationOutOfRange(Coordinate),

    #[error("Sample rate must be a number")]
    InvalidSampleRate,

    #[error("Telemetry source name cannot be empty")]
    EmptySource,

    #[error("Telemetry service domain cannot be empty")]
    EmptyServiceDomain,

    #[error("Telemetry request timeout must be greater than 0")]
    ZeroTimeout,

    #[error("Telemetry user agent must be non-empty visible ASCII")]
    InvalidUserAgent,

    #[error("Invalid log format: {0}. Valid formats: json, pretty")]
    InvalidLogFormat(String),
}

/// Top-level connect settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectSettings {
    /// Client coordinate used when neither the caller nor the request supplies one
    pub default_location: Coordinate,
    /// Latency sampling rate used when a connect call does not set its own
    pub sample_rate: f64,
    /// Latency telemetry settings
    pub telemetry: TelemetrySettings,
    /// Logging settings (used by the CLI)
    pub logging: LoggingSettings,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            default_location: Coordinate::default(),
            sample_rate: 0.0,
            telemetry: TelemetrySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// How a latency sample is handed to the telemetry endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Spawn the POST on the runtime and return immediately
    Detached,
    /// Await the POST before connect returns
    Awaited,
}

impl Default for DeliveryMode {
    fn default() -> Self {
        DeliveryMode::Detached
    }
}

/// Latency telemetry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Domain used to build `https://api.<domain>/clusters/{id}/...` endpoints
    pub service_domain: String,
    /// Value of the `source` field in every sample
    pub source: String,
    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
    /// User-Agent header for telemetry requests
    pub user_agent: String,
    /// Delivery mode
    pub delivery: DeliveryMode,
    /// Request headers searched, in order, for a trace id
    pub trace_headers: Vec<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            service_domain: "pgedge.com".to_string(),
            source: "pgedge-connect-rs".to_string(),
            request_timeout_seconds: 10,
            user_agent: format!("pgedge-connect-rs/{}", env!("CARGO_PKG_VERSION")),
            delivery: DeliveryMode::Detached,
            trace_headers: vec![
                "traceparent".to_string(),
                "x-request-id".to_string(),
                "cf-ray".to_string(),
            ],
        }
    }
}

impl TelemetrySettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. "info" or "pgedge_connect=debug"
    pub level: String,
    /// "json" or "pretty"
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl ConnectSettings {
    /// Validate settings values
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.default_location.is_within_bounds() {
            return Err(SettingsError::LocationOutOfRange(self.default_location));
        }

        if self.sample_rate.is_nan() {
            return Err(SettingsError::InvalidSampleRate);
        }

        if self.telemetry.source.trim().is_empty() {
            return Err(SettingsError::EmptySource);
        }

        if self.telemetry.service_domain.trim().is_empty() {
            return Err(SettingsError::EmptyServiceDomain);
        }

        if self.telemetry.request_timeout_seconds == 0 {
            return Err(SettingsError::ZeroTimeout);
        }

        // must be usable as an HTTP header value
        let user_agent = &self.telemetry.user_agent;
        if user_agent.trim().is_empty()
            || !user_agent.bytes().all(|b| b == b' ' || b.is_ascii_graphic())
        {
            return Err(SettingsError::InvalidUserAgent);
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(SettingsError::InvalidLogFormat(self.logging.format.clone()));
        }

        Ok(())
    }
}
