//! Store errors

use thiserror::Error;

use crate::errors::QueryError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures raised by a store session or collection
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Entry processor failed: {0}")]
    ProcessorFailed(String),

    #[error("Aggregation failed: {0}")]
    AggregationFailed(String),

    #[error("Partition lock poisoned in collection {0}")]
    Poisoned(String),
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        QueryError::store("Error executing against the store", err)
    }
}
