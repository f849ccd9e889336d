//! Entry processors
//!
//! A processor runs against one entry at a time, atomically with respect
//! to that entry, and may read, replace or remove its value.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};
use super::extractor::ValueExtractor;
use super::filter::Filter;

/// Mutable view of one entry handed to a processor
#[derive(Debug, Clone)]
pub struct InvocableEntry {
    key: Value,
    value: Option<Value>,
}

impl InvocableEntry {
    pub fn new(key: Value, value: Option<Value>) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &Value {
        &self.key
    }

    /// Current value, `None` if absent or removed
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = Some(value);
    }

    /// Removes the entry, returning the old value
    pub fn remove(&mut self) -> Option<Value> {
        self.value.take()
    }

    pub fn into_value(self) -> Option<Value> {
        self.value
    }
}

/// Per-entry transform executed by the store
pub trait EntryProcessor: Send + Sync + fmt::Debug {
    /// Processes one entry; `Some` results are reported back to the caller
    fn process(&self, entry: &mut InvocableEntry) -> StoreResult<Option<Value>>;

    fn describe(&self) -> String;
}

/// Removes entries that match a filter and returns the removed values
#[derive(Debug, Clone)]
pub struct ConditionalRemoveProcessor {
    filter: Arc<dyn Filter>,
}

impl ConditionalRemoveProcessor {
    pub fn new(filter: Arc<dyn Filter>) -> Self {
        Self { filter }
    }
}

impl EntryProcessor for ConditionalRemoveProcessor {
    fn process(&self, entry: &mut InvocableEntry) -> StoreResult<Option<Value>> {
        let matches = entry
            .value()
            .map_or(false, |value| self.filter.evaluate(entry.key(), value));
        if matches {
            Ok(entry.remove())
        } else {
            Ok(None)
        }
    }

    fn describe(&self) -> String {
        format!("ConditionalRemove({})", self.filter.describe())
    }
}

/// One `path = expression` assignment of an UPDATE set-list
#[derive(Debug, Clone)]
pub struct Assignment {
    /// Property path to write; empty replaces the whole value
    pub path: Vec<String>,
    /// Evaluated against the entry as it was before the update
    pub expression: Arc<dyn ValueExtractor>,
}

impl Assignment {
    pub fn describe(&self) -> String {
        let target = if self.path.is_empty() {
            "value()".to_string()
        } else {
            self.path.join(".")
        };
        format!("{} = {}", target, self.expression.describe())
    }
}

/// Applies a set-list to each entry and returns the updated value
#[derive(Debug, Clone)]
pub struct UpdaterProcessor {
    assignments: Vec<Assignment>,
}

impl UpdaterProcessor {
    pub fn new(assignments: Vec<Assignment>) -> Self {
        Self { assignments }
    }
}

impl EntryProcessor for UpdaterProcessor {
    fn process(&self, entry: &mut InvocableEntry) -> StoreResult<Option<Value>> {
        let Some(original) = entry.value().cloned() else {
            return Ok(None);
        };

        let computed: Vec<Value> = self
            .assignments
            .iter()
            .map(|a| a.expression.extract(entry.key(), &original))
            .collect();

        let mut updated = original;
        for (assignment, value) in self.assignments.iter().zip(computed) {
            set_path(&mut updated, &assignment.path, value)?;
        }

        entry.set_value(updated.clone());
        Ok(Some(updated))
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.assignments.iter().map(|a| a.describe()).collect();
        format!("UpdaterProcessor({})", parts.join(", "))
    }
}

/// Writes `value` at `path`, creating intermediate objects as needed
fn set_path(target: &mut Value, path: &[String], value: Value) -> StoreResult<()> {
    let Some((last, parents)) = path.split_last() else {
        *target = value;
        return Ok(());
    };

    let mut current = target;
    for step in parents {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return Err(StoreError::ProcessorFailed(format!(
                "cannot set '{}' on a non-object value",
                path.join(".")
            )));
        };
        current = map
            .entry(step.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        _ => Err(StoreError::ProcessorFailed(format!(
            "cannot set '{}' on a non-object value",
            path.join(".")
        ))),
    }
}
