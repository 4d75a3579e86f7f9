//! Node registry
//!
//! Reads the list of available database nodes from the `PGEDGE_NODES`
//! lookup key. The value is a JSON array of node records. Only the shape of
//! the payload is checked here; records are not deduplicated.

use pgedge_shared::{DatabaseNode, NodeSet};
use serde_json::Value;
use tracing::debug;

use crate::env::Lookup;
use crate::{ConfigurationError, Result, NODES_KEY};

/// Load and validate the node list from a lookup source
pub fn load_nodes(source: &dyn Lookup) -> Result<NodeSet> {
    let raw = source
        .get(NODES_KEY)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigurationError::Missing(NODES_KEY))?;

    load_nodes_from_str(&raw)
}

/// Parse a JSON node list held directly by the caller
pub fn load_nodes_from_str(raw: &str) -> Result<NodeSet> {
    if raw.trim().is_empty() {
        return Err(ConfigurationError::Missing(NODES_KEY).into());
    }

    let payload: Value = serde_json::from_str(raw)?;
    let records = match payload {
        Value::Array(records) => records,
        _ => return Err(ConfigurationError::NotAList(NODES_KEY).into()),
    };

    if records.is_empty() {
        return Err(ConfigurationError::Empty(NODES_KEY).into());
    }

    let nodes = records
        .into_iter()
        .map(serde_json::from_value::<DatabaseNode>)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    debug!("Loaded {} database nodes", nodes.len());

    NodeSet::new(nodes).ok_or_else(|| ConfigurationError::Empty(NODES_KEY).into())
}
