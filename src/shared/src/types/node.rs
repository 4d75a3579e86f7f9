//! Database node registry records

use serde::{Deserialize, Serialize};
use std::ops::Deref;

use super::geo::Coordinate;

// ============================================================================
// NODE RECORDS
// ============================================================================

/// Cloud region a node is deployed in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub cloud: String,
    #[serde(default)]
    pub availability_zones: Vec<String>,
}

/// Address and credentials for one database endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ip_address: Option<String>,
}

/// One registered database endpoint
///
/// Only `id`, `connection` and `location` drive routing; the descriptive
/// fields are carried through untouched and default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pg_version: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_detail: Option<Region>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip_address: Option<String>,
    pub connection: Connection,
    pub location: Coordinate,
}

impl DatabaseNode {
    /// Human readable label: name, then id, then host
    pub fn label(&self) -> &str {
        [&self.name, &self.id, &self.connection.host]
            .into_iter()
            .find(|value| !value.is_empty())
            .map(String::as_str)
            .unwrap_or("<unnamed>")
    }
}

// ============================================================================
// NODE SET
// ============================================================================

/// Ordered, non-empty list of nodes
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSet(Vec<DatabaseNode>);

impl NodeSet {
    /// Returns `None` for an empty list
    pub fn new(nodes: Vec<DatabaseNode>) -> Option<Self> {
        if nodes.is_empty() {
            None
        } else {
            Some(Self(nodes))
        }
    }

    pub fn into_inner(self) -> Vec<DatabaseNode> {
        self.0
    }
}

impl Deref for NodeSet {
    type Target = [DatabaseNode];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for NodeSet {
    type Item = DatabaseNode;
    type IntoIter = std::vec::IntoIter<DatabaseNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
