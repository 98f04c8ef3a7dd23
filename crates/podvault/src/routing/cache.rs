//! TTL cache in front of the supplier threshold rules.
//!
//! An explicit component with `get/invalidate/reload` rather than a
//! module-level mutable. Entries expire on the configured TTL, so a
//! reloaded rule set also propagates to readers that never invalidate.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use moka::sync::Cache;

pub struct RuleCache {
    entries: Cache<String, f64>,
    rules: RwLock<HashMap<String, f64>>,
    default_threshold: f64,
}

impl RuleCache {
    /// `rules` keys are expected lowercased (the config loader guarantees
    /// this); `*` is the wildcard rule.
    pub fn new(rules: HashMap<String, f64>, default_threshold: f64, ttl: Duration) -> Self {
        Self {
            entries: Cache::builder().max_capacity(1024).time_to_live(ttl).build(),
            rules: RwLock::new(rules),
            default_threshold,
        }
    }

    /// Resolved threshold for a supplier: exact key (case-insensitive),
    /// then the `*` wildcard, then the global default.
    pub fn threshold_for(&self, supplier: Option<&str>) -> f64 {
        let key = supplier
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| "*".to_string());
        self.entries.get_with(key.clone(), || self.resolve(&key))
    }

    fn resolve(&self, key: &str) -> f64 {
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        rules
            .get(key)
            .copied()
            .or_else(|| rules.get("*").copied())
            .unwrap_or(self.default_threshold)
    }

    /// Drops one supplier's cached entry.
    pub fn invalidate(&self, supplier: &str) {
        self.entries.invalidate(&supplier.to_lowercase());
    }

    /// Replaces the rule set and drops every cached entry.
    pub fn reload(&self, rules: HashMap<String, f64>) {
        let lowered = rules
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        *self.rules.write().unwrap_or_else(PoisonError::into_inner) = lowered;
        self.entries.invalidate_all();
    }
}
