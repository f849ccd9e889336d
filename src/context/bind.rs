//! Bind variables
//!
//! Two environments supplied per execution: positional values for `?`
//! placeholders (1-based) and named values for `:name` placeholders.

use std::collections::BTreeMap;

use serde_json::Value;

/// Positional and named bind values for one execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindVariables {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl BindVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next positional value
    pub fn with_positional(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named value
    pub fn with_named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Value for `?` placeholder number `index`, counting from 1
    pub fn positional(&self, index: usize) -> Option<&Value> {
        index.checked_sub(1).and_then(|i| self.positional.get(i))
    }

    /// Value for `:name`
    pub fn named(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}
