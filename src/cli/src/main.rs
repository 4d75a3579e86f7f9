//! pgedge-connect
//!
//! Entry point for the nearest-node connect CLI.

use anyhow::Result;
use clap::Parser;
use pgedge_cli::{
    commands,
    config::{load_settings, Args, Command},
};
use tracing::info;

/// Logging setup
mod telemetry {
    use anyhow::Result;
    use pgedge_shared::LoggingSettings;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    /// Initialize tracing and logging
    pub fn init_tracing(logging: &LoggingSettings) -> Result<()> {
        let env_filter =
            EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

        let fmt_layer = match logging.format.as_str() {
            "json" => fmt::layer().json().with_writer(std::io::stderr).boxed(),
            _ => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let settings = load_settings(&args)?;

    telemetry::init_tracing(&settings.logging)?;
    info!("pgedge-connect v{}", pgedge_connect::VERSION);

    let output = match &args.command {
        Command::Nearest {
            location,
            nodes_file,
        } => commands::nearest(&settings, location, nodes_file.as_deref())?,
        Command::Connect {
            location,
            sample_rate,
            settings: overrides,
        } => commands::connect(&settings, location, *sample_rate, overrides).await?,
    };

    println!("{}", output);
    Ok(())
}
