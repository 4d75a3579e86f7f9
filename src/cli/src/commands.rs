//! Subcommand implementations

use anyhow::{Context, Result};
use pgedge_connect::{
    closest, load_nodes, load_nodes_from_str, rank, ConnectOptions, DatabaseClient,
    EdgeConnector, ProcessEnv, RankedNode, SERVER_TIME_QUERY,
};
use pgedge_shared::{ConnectSettings, Coordinate, DeliveryMode, NodeSet};
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info};

use crate::config::{driver_overrides, LocationArgs};

fn read_nodes(nodes_file: Option<&Path>) -> Result<NodeSet> {
    match nodes_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read node file {}", path.display()))?;
            load_nodes_from_str(&raw).context("Invalid node file")
        }
        None => load_nodes(&ProcessEnv).context("Failed to load nodes from environment"),
    }
}

/// Text table of nodes ordered by distance, nearest marked with `*`
pub fn render_ranking(ranking: &[RankedNode<'_>], location: Coordinate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Client location: {}", location);
    let _ = writeln!(
        out,
        "  {:<3} {:<24} {:<32} {:>12}",
        "#", "NODE", "ADDRESS", "DISTANCE"
    );

    for (index, ranked) in ranking.iter().enumerate() {
        let marker = if index == 0 { '*' } else { ' ' };
        let address = format!(
            "{}:{}",
            ranked.node.connection.host, ranked.node.connection.port
        );
        let _ = writeln!(
            out,
            "{} {:<3} {:<24} {:<32} {:>9.1} km",
            marker,
            index + 1,
            ranked.node.label(),
            address,
            ranked.distance_km
        );
    }

    out
}

/// `nearest`: rank every node and report the selection
pub fn nearest(
    settings: &ConnectSettings,
    location: &LocationArgs,
    nodes_file: Option<&Path>,
) -> Result<String> {
    let nodes = read_nodes(nodes_file)?;
    let location = location
        .to_input()
        .map(|input| input.resolve(settings.default_location))
        .unwrap_or(settings.default_location);

    let ranking = rank(&nodes, location);
    let selected = closest(&nodes, location)?;
    debug!("Ranked {} nodes", ranking.len());

    let mut out = render_ranking(&ranking, location);
    let _ = writeln!(
        out,
        "Selected: {} ({}:{})",
        selected.label(),
        selected.connection.host,
        selected.connection.port
    );
    Ok(out)
}

/// `connect`: open a connection to the nearest node and read its clock
pub async fn connect(
    settings: &ConnectSettings,
    location: &LocationArgs,
    sample_rate: Option<f64>,
    overrides: &[(String, Value)],
) -> Result<String> {
    let mut settings = settings.clone();
    // Detached deliveries are dropped when the runtime shuts down.
    if settings.telemetry.delivery == DeliveryMode::Detached {
        debug!("Switching telemetry delivery to awaited for a one-shot connect");
        settings.telemetry.delivery = DeliveryMode::Awaited;
    }

    let connector = EdgeConnector::new(settings);

    let mut options = ConnectOptions::from_env(ProcessEnv);
    if let Some(input) = location.to_input() {
        options = options.with_location(input);
    }
    if let Some(rate) = sample_rate {
        options = options.with_sample_rate(rate);
    }
    let overrides: Option<Map<String, Value>> = driver_overrides(overrides);
    if let Some(overrides) = overrides {
        options = options.with_config(overrides);
    }

    let mut client = connector
        .connect(options)
        .await
        .context("Failed to connect to nearest node")?;
    let host = client.host().to_string();
    info!("Connected to {}", host);

    let rows = client
        .query_timestamps(SERVER_TIME_QUERY)
        .await
        .context("Server time query failed")?;
    client.close().await.context("Failed to close connection")?;

    let server_time = rows
        .first()
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());
    Ok(format!("Connected to {}\nServer time: {}", host, server_time))
}
