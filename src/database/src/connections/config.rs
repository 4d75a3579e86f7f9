//! Driver configuration for the selected node
//!
//! The node's address and credentials are authoritative. Caller-supplied
//! settings (TLS, timeouts, application name and so on) ride along
//! untouched, but can never redirect the connection or swap credentials.

use pgedge_shared::DatabaseNode;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Keys always sourced from the node
pub const NODE_KEYS: [&str; 5] = ["host", "port", "user", "password", "database"];

/// Fully merged driver configuration
#[derive(Clone, PartialEq, Serialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Caller-supplied settings other than the node keys
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl ConnectionConfig {
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("options", &self.options)
            .finish()
    }
}

/// Merge caller overrides with the node's connection attributes
pub fn build_connection_config(
    node: &DatabaseNode,
    overrides: Option<&Map<String, Value>>,
) -> ConnectionConfig {
    let mut options = overrides.cloned().unwrap_or_default();

    for key in NODE_KEYS {
        if options.remove(key).is_some() {
            debug!("Caller-supplied '{}' replaced by node {}", key, node.label());
        }
    }

    let conn = &node.connection;
    ConnectionConfig {
        host: conn.host.clone(),
        port: conn.port,
        user: conn.username.clone(),
        password: conn.password.clone(),
        database: conn.database.clone(),
        options,
    }
}
