//! Shared types and settings for pgEdge nearest-node connect

pub mod config;
pub mod types;

pub use config::{
    ConnectSettings, DeliveryMode, LoggingSettings, SettingsError, TelemetrySettings,
};

pub use types::*;
