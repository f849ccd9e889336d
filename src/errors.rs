//! Query error types
//!
//! Every failure raised while compiling or executing a statement is a
//! `QueryError`. Codes follow the `COHQL_NAME` format and each belongs to
//! exactly one category:
//!
//! - COMPILATION: malformed or incomplete statement input, raised by `realize`
//! - ASSERTION: sanity-check failure, raised by `sanity_check`
//! - RUNTIME: store or I/O failure during execution
//! - CONFIGURATION: result formatting misconfiguration
//!
//! Compilation and assertion errors are never retried.

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed statement, never reaches the store
    Compilation,
    /// Sanity check failed
    Assertion,
    /// Store or I/O failure
    Runtime,
    /// Formatting misconfiguration
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Compilation => write!(f, "COMPILATION"),
            ErrorCategory::Assertion => write!(f, "ASSERTION"),
            ErrorCategory::Runtime => write!(f, "RUNTIME"),
            ErrorCategory::Configuration => write!(f, "CONFIGURATION"),
        }
    }
}

/// Query error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    /// A required AST attribute is absent or empty
    CohqlMissingAttribute,
    /// Extractor list compiled to no extractor
    CohqlMissingExtractor,
    /// Set-list entry is not an assignment
    CohqlMalformedSetList,
    /// GROUP BY used without a select list
    CohqlGroupByWithoutFields,
    /// GROUP BY fields are not a prefix of the select list
    CohqlGroupByMismatch,
    /// INSERT of a null value without KEY
    CohqlNoKey,
    /// SOURCE file does not exist
    CohqlFileNotFound,
    /// Expression form not understood by the compiler
    CohqlUnsupportedExpression,
    /// Bind variable referenced but not supplied
    CohqlMissingBindVariable,
    /// No builder registered for the statement functor
    CohqlUnknownStatement,
    /// Statement text could not be parsed into a term
    CohqlParse,
    /// Referenced collection or file does not exist
    CohqlAssertionFailed,
    /// Value has no key accessor
    CohqlMissingKeyAccessor,
    /// I/O failure
    CohqlIo,
    /// Store failure
    CohqlStore,
    /// Execution exceeded the configured timeout
    CohqlTimeout,
    /// Column headers do not match value columns
    CohqlColumnMismatch,
    /// Formatted result has nothing to format
    CohqlNoValues,
}

impl QueryErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorCode::CohqlMissingAttribute => "COHQL_MISSING_ATTRIBUTE",
            QueryErrorCode::CohqlMissingExtractor => "COHQL_MISSING_EXTRACTOR",
            QueryErrorCode::CohqlMalformedSetList => "COHQL_MALFORMED_SET_LIST",
            QueryErrorCode::CohqlGroupByWithoutFields => "COHQL_GROUP_BY_WITHOUT_FIELDS",
            QueryErrorCode::CohqlGroupByMismatch => "COHQL_GROUP_BY_MISMATCH",
            QueryErrorCode::CohqlNoKey => "COHQL_NO_KEY",
            QueryErrorCode::CohqlFileNotFound => "COHQL_FILE_NOT_FOUND",
            QueryErrorCode::CohqlUnsupportedExpression => "COHQL_UNSUPPORTED_EXPRESSION",
            QueryErrorCode::CohqlMissingBindVariable => "COHQL_MISSING_BIND_VARIABLE",
            QueryErrorCode::CohqlUnknownStatement => "COHQL_UNKNOWN_STATEMENT",
            QueryErrorCode::CohqlParse => "COHQL_PARSE",
            QueryErrorCode::CohqlAssertionFailed => "COHQL_ASSERTION_FAILED",
            QueryErrorCode::CohqlMissingKeyAccessor => "COHQL_MISSING_KEY_ACCESSOR",
            QueryErrorCode::CohqlIo => "COHQL_IO",
            QueryErrorCode::CohqlStore => "COHQL_STORE",
            QueryErrorCode::CohqlTimeout => "COHQL_TIMEOUT",
            QueryErrorCode::CohqlColumnMismatch => "COHQL_COLUMN_MISMATCH",
            QueryErrorCode::CohqlNoValues => "COHQL_NO_VALUES",
        }
    }

    /// Returns the category of this code
    pub fn category(&self) -> ErrorCategory {
        match self {
            QueryErrorCode::CohqlMissingAttribute
            | QueryErrorCode::CohqlMissingExtractor
            | QueryErrorCode::CohqlMalformedSetList
            | QueryErrorCode::CohqlGroupByWithoutFields
            | QueryErrorCode::CohqlGroupByMismatch
            | QueryErrorCode::CohqlNoKey
            | QueryErrorCode::CohqlFileNotFound
            | QueryErrorCode::CohqlUnsupportedExpression
            | QueryErrorCode::CohqlMissingBindVariable
            | QueryErrorCode::CohqlUnknownStatement
            | QueryErrorCode::CohqlParse => ErrorCategory::Compilation,
            QueryErrorCode::CohqlAssertionFailed => ErrorCategory::Assertion,
            QueryErrorCode::CohqlMissingKeyAccessor
            | QueryErrorCode::CohqlIo
            | QueryErrorCode::CohqlStore
            | QueryErrorCode::CohqlTimeout => ErrorCategory::Runtime,
            QueryErrorCode::CohqlColumnMismatch | QueryErrorCode::CohqlNoValues => {
                ErrorCategory::Configuration
            }
        }
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Query error with full context
#[derive(Debug)]
pub struct QueryError {
    code: QueryErrorCode,
    message: String,
    /// Statement kind, e.g. "SELECT"
    statement: Option<String>,
    /// Offending AST attribute, e.g. "from"
    field: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl QueryError {
    fn new(code: QueryErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            statement: None,
            field: None,
            source: None,
        }
    }

    fn with_statement(mut self, statement: &str) -> Self {
        self.statement = Some(statement.to_string());
        self
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// A required attribute is absent or empty
    pub fn missing_attribute(statement: &str, field: &str) -> Self {
        Self::new(
            QueryErrorCode::CohqlMissingAttribute,
            format!("{} requires a value for '{}'", statement, field),
        )
        .with_statement(statement)
        .with_field(field)
    }

    /// The extractor list produced no extractor
    pub fn missing_extractor(statement: &str) -> Self {
        Self::new(
            QueryErrorCode::CohqlMissingExtractor,
            format!("{} requires a non-empty extractor list", statement),
        )
        .with_statement(statement)
        .with_field("extractor")
    }

    /// The set-list contains something other than an assignment
    pub fn malformed_set_list(statement: &str, reason: impl Into<String>) -> Self {
        Self::new(QueryErrorCode::CohqlMalformedSetList, reason)
            .with_statement(statement)
            .with_field("setList")
    }

    /// GROUP BY without any selected field
    pub fn group_by_without_fields() -> Self {
        Self::new(
            QueryErrorCode::CohqlGroupByWithoutFields,
            "GROUP BY requires a list of selected fields",
        )
        .with_statement("SELECT")
        .with_field("groupBy")
    }

    /// GROUP BY fields do not head the select list
    pub fn group_by_mismatch() -> Self {
        Self::new(
            QueryErrorCode::CohqlGroupByMismatch,
            "GROUP BY fields must appear first, in order, in the select list",
        )
        .with_statement("SELECT")
        .with_field("groupBy")
    }

    /// INSERT of a null value with no KEY clause
    pub fn no_key() -> Self {
        Self::new(
            QueryErrorCode::CohqlNoKey,
            "INSERT of a null value requires a KEY clause",
        )
        .with_statement("INSERT")
        .with_field("key")
    }

    /// SOURCE file not found
    pub fn file_not_found(path: &str) -> Self {
        Self::new(
            QueryErrorCode::CohqlFileNotFound,
            format!("File not found: {}", path),
        )
        .with_statement("SOURCE")
        .with_field("file")
    }

    /// Expression the compiler does not understand
    pub fn unsupported_expression(reason: impl Into<String>) -> Self {
        Self::new(QueryErrorCode::CohqlUnsupportedExpression, reason)
    }

    /// Bind variable referenced but not supplied
    pub fn missing_bind_variable(name: impl fmt::Display) -> Self {
        Self::new(
            QueryErrorCode::CohqlMissingBindVariable,
            format!("No value bound for {}", name),
        )
    }

    /// No builder for the statement functor
    pub fn unknown_statement(functor: &str) -> Self {
        Self::new(
            QueryErrorCode::CohqlUnknownStatement,
            format!("Unknown statement '{}'", functor),
        )
    }

    /// Statement text is not a valid term
    pub fn parse(line: usize, source: serde_json::Error) -> Self {
        Self::new(
            QueryErrorCode::CohqlParse,
            format!("Unable to parse statement on line {}", line),
        )
        .with_source(source)
    }

    /// Referenced collection does not exist
    pub fn collection_not_found(statement: &str, name: &str) -> Self {
        Self::new(
            QueryErrorCode::CohqlAssertionFailed,
            format!("Cache '{}' does not exist", name),
        )
        .with_statement(statement)
        .with_field("from")
    }

    /// Referenced file does not exist
    pub fn file_missing(statement: &str, path: &str) -> Self {
        Self::new(
            QueryErrorCode::CohqlAssertionFailed,
            format!("File '{}' does not exist", path),
        )
        .with_statement(statement)
        .with_field("file")
    }

    /// Value has no key accessor
    pub fn missing_key_accessor(attribute: &str) -> Self {
        Self::new(
            QueryErrorCode::CohqlMissingKeyAccessor,
            format!(
                "Error creating key for insert: value has no '{}' attribute",
                attribute
            ),
        )
        .with_statement("INSERT")
        .with_field("value")
    }

    /// I/O failure with context, e.g. "Error in BACKUP"
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::new(QueryErrorCode::CohqlIo, context).with_source(source)
    }

    /// Store failure with context
    pub fn store(context: impl Into<String>, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::new(QueryErrorCode::CohqlStore, context).with_source(source)
    }

    /// Execution timed out
    pub fn timeout(statement: &str, millis: u128) -> Self {
        Self::new(
            QueryErrorCode::CohqlTimeout,
            format!("{} did not complete within {}ms", statement, millis),
        )
        .with_statement(statement)
    }

    /// A mutating statement timed out. Its store call is still running on a
    /// blocking thread and may apply its changes after this is reported.
    pub fn timeout_detached(statement: &str, millis: u128) -> Self {
        Self::new(
            QueryErrorCode::CohqlTimeout,
            format!(
                "{} did not complete within {}ms; it is still running and its changes may still be applied",
                statement, millis
            ),
        )
        .with_statement(statement)
    }

    /// Runtime failure without an underlying error value
    pub fn runtime(context: impl Into<String>) -> Self {
        Self::new(QueryErrorCode::CohqlStore, context)
    }

    /// Column headers do not line up with the value columns
    pub fn column_mismatch(headers: usize, columns: usize) -> Self {
        Self::new(
            QueryErrorCode::CohqlColumnMismatch,
            format!(
                "{} column headers supplied for {} value columns",
                headers, columns
            ),
        )
    }

    /// Nothing to format
    pub fn no_values() -> Self {
        Self::new(QueryErrorCode::CohqlNoValues, "No values to format")
    }

    /// Returns the error code
    pub fn code(&self) -> QueryErrorCode {
        self.code
    }

    /// Returns the error category
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the statement kind if known
    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }

    /// Returns the offending field if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.category(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl StdError for QueryError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
