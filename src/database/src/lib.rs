//! Nearest-node connect for pgEdge clusters
//!
//! A pgEdge cluster spreads PostgreSQL nodes across regions. Rather than
//! putting a load balancer in front of them, the client picks the node
//! closest to itself before opening a connection:
//!
//! 1. read the node list (`PGEDGE_NODES`) or take an explicit one,
//! 2. resolve the client coordinate (explicit, request geo data, or a default),
//! 3. pick the nearest node by haversine distance,
//! 4. merge the node's credentials with caller driver settings and connect,
//! 5. optionally sample one server-time round trip and post it to the cluster's
//!    latency endpoint without ever failing the connect call.
//!
//! ```no_run
//! use pgedge_connect::{ConnectOptions, ProcessEnv};
//!
//! # async fn run() -> pgedge_connect::Result<()> {
//! let client = pgedge_connect::connect(
//!     ConnectOptions::from_env(ProcessEnv).with_location((51.5, -0.12)),
//! )
//! .await?;
//! println!("connected to {}", client.host());
//! # Ok(())
//! # }
//! ```

pub mod connect;
pub mod connections;
pub mod env;
pub mod geo;
pub mod registry;
pub mod selector;
pub mod telemetry;

pub use connect::{ConnectOptions, EdgeConnector, NodeSource};
pub use connections::{
    build_connection_config, ConnectionConfig, DatabaseClient, DatabaseConnector,
};
pub use env::{LayeredLookup, Lookup, ProcessEnv};
pub use geo::{distance, EARTH_RADIUS_KM};
pub use registry::{load_nodes, load_nodes_from_str};
pub use selector::{closest, rank, RankedNode};
pub use telemetry::{
    cluster_endpoint, resolve_endpoint, HttpTelemetrySink, LatencyReporter, SamplingRate,
    TelemetryError, TelemetrySink, SERVER_TIME_QUERY,
};

#[cfg(feature = "postgres")]
pub use connect::connect;

#[cfg(feature = "postgres")]
pub use connections::{PostgresClient, PostgresConnector};

pub use pgedge_shared::{
    ConnectSettings, Coordinate, CoordinateInput, DatabaseNode, NodeSet, RequestContext,
};

/// Lookup key holding the JSON node list
pub const NODES_KEY: &str = "PGEDGE_NODES";

/// Lookup key holding an explicit latency telemetry URL
pub const LATENCY_URL_KEY: &str = "PGEDGE_LATENCY_URL";

/// Lookup key holding the cluster id used to derive the telemetry URL
pub const CLUSTER_ID_KEY: &str = "PGEDGE_CLUSTER_ID";

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors surfaced by the connect flow
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Malformed node configuration: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Node source missing, malformed or empty, or invalid connect options
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{0} is not an array")]
    NotAList(&'static str),

    #[error("{0} array is empty")]
    Empty(&'static str),

    #[error("invalid options: at least one node must be provided")]
    NoNodes,
}

/// Selection invoked without candidates
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("No nodes provided")]
    EmptyNodeSet,
}

/// Database capability errors
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Invalid connection option: {0}")]
    InvalidOption(String),
}

/// Result type alias for the connect library
pub type Result<T> = std::result::Result<T, RoutingError>;
