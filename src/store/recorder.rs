//! Recording aggregator behind EXPLAIN PLAN and TRACE
//!
//! Runs over every entry of a collection in place of the real aggregator
//! and reports how the query predicate would be (EXPLAIN) or was (TRACE)
//! evaluated, one step per conjunct.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::result::Payload;

use super::aggregator::EntryAggregator;
use super::errors::{StoreError, StoreResult};
use super::filter::Filter;
use super::Entry;

/// What the recorder reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingMode {
    /// Index usage and cost estimates; the predicate is not evaluated
    Explain,
    /// Sequential evaluation with per-step timings and entry counts
    Trace,
}

impl RecordingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingMode::Explain => "EXPLAIN",
            RecordingMode::Trace => "TRACE",
        }
    }
}

impl fmt::Display for RecordingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One predicate step, summed across partitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub filter: String,
    /// Index serving this step, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Estimated entries examined
    pub cost: u64,
    /// Entries entering the step (TRACE only)
    #[serde(default)]
    pub input: u64,
    /// Entries surviving the step (TRACE only)
    #[serde(default)]
    pub output: u64,
    #[serde(default)]
    pub micros: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PartitionRecord {
    entries: u64,
    steps: Vec<StepRecord>,
}

/// Full report returned as the statement's scalar result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub mode: String,
    pub cache: String,
    pub partitions: usize,
    pub entries: u64,
    pub steps: Vec<StepRecord>,
    /// Entries matching the whole predicate (TRACE only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct QueryRecorder {
    mode: RecordingMode,
    cache: String,
    filter: Arc<dyn Filter>,
    indexes: Vec<String>,
}

impl QueryRecorder {
    /// `indexes` are the extractor descriptions currently indexed on the
    /// collection
    pub fn new(
        mode: RecordingMode,
        cache: impl Into<String>,
        filter: Arc<dyn Filter>,
        indexes: Vec<String>,
    ) -> Self {
        Self {
            mode,
            cache: cache.into(),
            filter,
            indexes,
        }
    }

    pub fn mode(&self) -> RecordingMode {
        self.mode
    }

    fn steps(&self) -> Vec<Arc<dyn Filter>> {
        let conjuncts = self.filter.conjuncts();
        if conjuncts.is_empty() {
            vec![Arc::clone(&self.filter)]
        } else {
            conjuncts
        }
    }

    fn index_for(&self, step: &dyn Filter) -> Option<String> {
        step.index_candidate()
            .filter(|candidate| self.indexes.iter().any(|index| index == candidate))
    }

    fn explain(&self, entries: &[Entry]) -> Vec<StepRecord> {
        let total = entries.len() as u64;
        self.steps()
            .iter()
            .map(|step| {
                let index = self.index_for(step.as_ref());
                StepRecord {
                    filter: step.describe(),
                    cost: if index.is_some() { 1 } else { total },
                    index,
                    ..StepRecord::default()
                }
            })
            .collect()
    }

    fn trace(&self, entries: &[Entry]) -> Vec<StepRecord> {
        let mut remaining: Vec<&Entry> = entries.iter().collect();
        self.steps()
            .iter()
            .map(|step| {
                let input = remaining.len() as u64;
                let started = Instant::now();
                remaining.retain(|e| step.evaluate(&e.key, &e.value));
                let index = self.index_for(step.as_ref());
                StepRecord {
                    filter: step.describe(),
                    cost: if index.is_some() { 1 } else { input },
                    index,
                    input,
                    output: remaining.len() as u64,
                    micros: started.elapsed().as_micros() as u64,
                }
            })
            .collect()
    }
}

impl EntryAggregator for QueryRecorder {
    fn accumulate(&self, entries: &[Entry]) -> StoreResult<Value> {
        let steps = match self.mode {
            RecordingMode::Explain => self.explain(entries),
            RecordingMode::Trace => self.trace(entries),
        };
        let record = PartitionRecord {
            entries: entries.len() as u64,
            steps,
        };
        serde_json::to_value(record).map_err(|e| StoreError::AggregationFailed(e.to_string()))
    }

    fn combine(&self, partials: Vec<Value>) -> StoreResult<Payload> {
        let partitions = partials.len();
        let mut entries = 0;
        let mut steps: Vec<StepRecord> = Vec::new();

        for partial in partials {
            let record: PartitionRecord = serde_json::from_value(partial)
                .map_err(|e| StoreError::AggregationFailed(e.to_string()))?;
            entries += record.entries;
            if steps.is_empty() {
                steps = record.steps;
                continue;
            }
            for (merged, step) in steps.iter_mut().zip(record.steps) {
                merged.cost += step.cost;
                merged.input += step.input;
                merged.output += step.output;
                merged.micros += step.micros;
            }
        }

        let matched = match self.mode {
            RecordingMode::Trace => Some(steps.last().map_or(entries, |s| s.output)),
            RecordingMode::Explain => None,
        };
        let report = QueryRecord {
            mode: self.mode.as_str().to_string(),
            cache: self.cache.clone(),
            partitions,
            entries,
            steps,
            matched,
        };
        serde_json::to_value(report)
            .map(Payload::Scalar)
            .map_err(|e| StoreError::AggregationFailed(e.to_string()))
    }

    fn describe(&self) -> String {
        format!("QueryRecorder({}, {})", self.mode, self.filter.describe())
    }
}
