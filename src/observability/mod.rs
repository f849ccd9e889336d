//! Observability
//!
//! Structured JSON logging and scope-based begin/complete events. Logging
//! is read-only with respect to execution: nothing here changes results.
//!
//! ```ignore
//! use cohql::observability::{Logger, ObservationScope};
//!
//! Logger::info("STATEMENT_REALIZED", &[("statement", "SELECT")]);
//!
//! let scope = ObservationScope::new("BACKUP");
//! // ... do work ...
//! scope.complete();
//! ```

mod logger;
mod scope;

pub use logger::{Logger, Severity};
pub use scope::ObservationScope;
