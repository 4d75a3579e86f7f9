//! Database connection capability
//!
//! The connect flow only needs two things from a driver: open a connection
//! from a `ConnectionConfig`, and run the latency query on it. PostgreSQL
//! via sqlx is the stock implementation; tests and embedders can plug in
//! their own.

pub mod config;

#[cfg(feature = "postgres")]
pub mod postgresql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::DatabaseError;

pub use config::{build_connection_config, ConnectionConfig, NODE_KEYS};

#[cfg(feature = "postgres")]
pub use postgresql::{DriverSettings, PostgresClient, PostgresConnector};

/// An open connection
#[async_trait]
pub trait DatabaseClient: Send {
    /// Run `sql` and return the first column of each row as a timestamp
    async fn query_timestamps(&mut self, sql: &str) -> Result<Vec<DateTime<Utc>>, DatabaseError>;
}

/// Opens connections from a merged driver configuration
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    type Client: DatabaseClient;

    async fn connect(&self, config: &ConnectionConfig) -> Result<Self::Client, DatabaseError>;
}
