//! Predicates over store entries
//!
//! A filter sees one entry at a time and keeps no state between entries,
//! so the store may evaluate it per partition in any order.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Boolean test over a single entry
pub trait Filter: Send + Sync + fmt::Debug {
    /// Evaluates the filter against one entry
    fn evaluate(&self, key: &Value, value: &Value) -> bool;

    /// Human-readable rendition for show-plan and explain output
    fn describe(&self) -> String;

    /// Description of the extractor an index on which would serve this filter
    fn index_candidate(&self) -> Option<String> {
        None
    }

    /// Component filters of a conjunction; empty for leaf filters
    fn conjuncts(&self) -> Vec<Arc<dyn Filter>> {
        Vec::new()
    }
}

/// The identity filter: matches every entry
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFilter;

impl Filter for AlwaysFilter {
    fn evaluate(&self, _key: &Value, _value: &Value) -> bool {
        true
    }

    fn describe(&self) -> String {
        "AlwaysFilter".to_string()
    }
}

/// Conjunction of filters
#[derive(Debug, Clone)]
pub struct AllFilter {
    filters: Vec<Arc<dyn Filter>>,
}

impl AllFilter {
    pub fn new(filters: Vec<Arc<dyn Filter>>) -> Self {
        Self { filters }
    }
}

impl Filter for AllFilter {
    fn evaluate(&self, key: &Value, value: &Value) -> bool {
        self.filters.iter().all(|f| f.evaluate(key, value))
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.filters.iter().map(|f| f.describe()).collect();
        format!("AllFilter({})", parts.join(", "))
    }

    fn conjuncts(&self) -> Vec<Arc<dyn Filter>> {
        self.filters.clone()
    }
}
