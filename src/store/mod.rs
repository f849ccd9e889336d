//! Store seam
//!
//! The distributed store is external. Statements talk to it through the
//! `Session` and `NamedCollection` traits and hand it the opaque
//! primitives defined here: filters, extractors, aggregators and entry
//! processors. `LocalSession` is an in-process implementation.

mod aggregator;
mod errors;
mod extractor;
mod filter;
mod local;
mod processor;
mod recorder;
pub mod values;

pub use aggregator::{
    AggregateFunction, Column, DistinctValuesAggregator, EntryAggregator, GroupAggregator,
    ReducerAggregator,
};
pub use errors::{StoreError, StoreResult};
pub use extractor::ValueExtractor;
pub use filter::{AllFilter, AlwaysFilter, Filter};
pub use local::{LocalCollection, LocalSession};
pub use processor::{
    Assignment, ConditionalRemoveProcessor, EntryProcessor, InvocableEntry, UpdaterProcessor,
};
pub use recorder::{QueryRecord, QueryRecorder, RecordingMode, StepRecord};

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::result::Payload;

/// One key/value pair of a collection
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Value,
    pub value: Value,
}

impl Entry {
    pub fn new(key: Value, value: Value) -> Self {
        Self { key, value }
    }
}

/// Handle to one named collection
pub trait NamedCollection: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Number of entries
    fn size(&self) -> StoreResult<usize>;

    /// Number of partitions the collection is split into
    fn partition_count(&self) -> usize;

    /// Entries matching the filter, in key order
    fn entries(&self, filter: &dyn Filter) -> StoreResult<Vec<Entry>>;

    /// Runs an aggregator over the entries matching the filter
    fn aggregate(
        &self,
        filter: &dyn Filter,
        aggregator: &dyn EntryAggregator,
    ) -> StoreResult<Payload>;

    /// Runs a processor against every matching entry; returns the non-null
    /// per-key results in key order
    fn invoke_all(
        &self,
        filter: &dyn Filter,
        processor: &dyn EntryProcessor,
    ) -> StoreResult<Vec<(Value, Value)>>;

    /// Stores a value, returning the previous one
    fn put(&self, key: Value, value: Value) -> StoreResult<Option<Value>>;

    fn get(&self, key: &Value) -> StoreResult<Option<Value>>;

    /// Removes every entry
    fn truncate(&self) -> StoreResult<()>;

    /// Adds an index; adding an existing index is a no-op
    fn add_index(&self, extractor: Arc<dyn ValueExtractor>) -> StoreResult<()>;

    /// Removes an index, returning whether it existed
    fn remove_index(&self, extractor: &dyn ValueExtractor) -> StoreResult<bool>;

    /// Descriptions of the indexed extractors
    fn indexes(&self) -> StoreResult<Vec<String>>;
}

/// Store session
pub trait Session: Send + Sync + fmt::Debug {
    /// Returns the named collection, creating it if needed
    fn get_collection(&self, name: &str) -> StoreResult<Arc<dyn NamedCollection>>;

    fn has_collection(&self, name: &str) -> bool;

    /// Destroys the collection; destroying a missing collection returns false
    fn destroy_collection(&self, name: &str) -> StoreResult<bool>;

    fn collection_names(&self) -> Vec<String>;
}
