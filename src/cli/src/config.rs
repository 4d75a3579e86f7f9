//! CLI configuration
//!
//! Settings are layered: optional YAML file, then `PGEDGE_CONNECT__*`
//! environment variables, then command-line overrides.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pgedge_shared::{ConnectSettings, CoordinateComponent, CoordinateInput};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Environment variable prefix for settings
pub const ENV_PREFIX: &str = "PGEDGE_CONNECT";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "pgedge-connect", version, about = "Connect to the nearest pgEdge node")]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config/pgedge-connect.yaml")]
    pub config: PathBuf,

    /// Log level (overrides config)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rank nodes by distance from a location
    Nearest {
        #[command(flatten)]
        location: LocationArgs,

        /// Read the node list from a file instead of PGEDGE_NODES
        #[arg(long)]
        nodes_file: Option<PathBuf>,
    },

    /// Open a connection to the nearest node and query its clock
    Connect {
        #[command(flatten)]
        location: LocationArgs,

        /// Latency sampling rate for this call (0-1)
        #[arg(long)]
        sample_rate: Option<f64>,

        /// Extra driver setting, e.g. --set sslmode=require
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        settings: Vec<(String, Value)>,
    },
}

/// Client coordinate as typed on the command line
#[derive(clap::Args, Debug, Default, Clone)]
pub struct LocationArgs {
    /// Client latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<String>,

    /// Client longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<String>,
}

impl LocationArgs {
    /// `None` when neither component was given
    pub fn to_input(&self) -> Option<CoordinateInput> {
        if self.lat.is_none() && self.lon.is_none() {
            return None;
        }

        Some(CoordinateInput {
            latitude: self.lat.clone().map(CoordinateComponent::Text),
            longitude: self.lon.clone().map(CoordinateComponent::Text),
        })
    }
}

/// Parse `key=value`; the value is read as JSON when possible, else as a string
pub fn parse_key_value(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Collect `--set` pairs into a driver override map
pub fn driver_overrides(pairs: &[(String, Value)]) -> Option<Map<String, Value>> {
    if pairs.is_empty() {
        return None;
    }

    Some(pairs.iter().cloned().collect())
}

/// Load settings from file and environment, then apply CLI overrides
pub fn load_settings(args: &Args) -> Result<ConnectSettings> {
    let mut builder = config::Config::builder();

    if args.config.exists() {
        builder = builder.add_source(config::File::from(args.config.clone()).required(false));
    }

    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut settings: ConnectSettings = builder
        .build()
        .context("Failed to build configuration")?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    if let Some(ref log_level) = args.log_level {
        settings.logging.level = log_level.clone();
    }

    if args.debug {
        settings.logging.level = "debug".to_string();
    }

    settings
        .validate()
        .context("Configuration validation failed")?;

    Ok(settings)
}
