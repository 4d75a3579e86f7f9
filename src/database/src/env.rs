//! Key-value lookup sources
//!
//! Node lists and telemetry endpoints are read from an environment-like
//! source. The process environment is the usual one; edge runtimes hand
//! bindings over as a map.

use std::collections::HashMap;
use std::sync::Arc;

/// Read-only string lookup
pub trait Lookup: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// The current process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Lookup for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Lookup for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl<L: Lookup + ?Sized> Lookup for &L {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<L: Lookup + ?Sized> Lookup for Arc<L> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<L: Lookup + ?Sized> Lookup for Box<L> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// Consults each source in order and returns the first hit
#[derive(Default)]
pub struct LayeredLookup {
    layers: Vec<Box<dyn Lookup>>,
}

impl LayeredLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, layer: impl Lookup + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }
}

impl Lookup for LayeredLookup {
    fn get(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_map_lookup() {
        let env = map(&[("PGEDGE_NODES", "[]")]);
        assert_eq!(Lookup::get(&env, "PGEDGE_NODES").as_deref(), Some("[]"));
        assert_eq!(Lookup::get(&env, "PGEDGE_CLUSTER_ID"), None);
    }

    #[test]
    fn test_layered_lookup_prefers_earlier_layers() {
        let lookup = LayeredLookup::new()
            .with_layer(map(&[("A", "first")]))
            .with_layer(map(&[("A", "second"), ("B", "fallback")]));

        assert_eq!(lookup.get("A").as_deref(), Some("first"));
        assert_eq!(lookup.get("B").as_deref(), Some("fallback"));
        assert_eq!(lookup.get("C"), None);
    }

    #[test]
    fn test_process_env_missing_key() {
        assert_eq!(ProcessEnv.get("PGEDGE_CONNECT_TEST_SURELY_UNSET"), None);
    }
}
