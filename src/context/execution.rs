//! Execution context
//!
//! Everything a builder or statement needs from its surroundings: the
//! store session, the two compilers, bind variables, dialect, an output
//! writer and the execution flags. Cloning is cheap and clones share the
//! session, the output and the silent/sanity-check flags.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::compiler::{FilterBuilder, PredicateCompiler, ProjectionCompiler, SelectListMaker};
use crate::errors::{QueryError, QueryResult};
use crate::statement::StatementRegistry;
use crate::store::Session;

use super::bind::BindVariables;
use super::config::QueryConfig;
use super::dialect::Dialect;
use super::parser::{JsonTermParser, StatementParser};

/// Callback asked to approve destructive statements
pub type Confirmer = Arc<dyn Fn(&str) -> bool + Send + Sync>;

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// In-memory output sink; clones share the buffer
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        match self.inner.lock() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut bytes) = self.inner.lock() {
            bytes.clear();
        }
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "output buffer poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct Flags {
    silent: AtomicBool,
    sanity_check: AtomicBool,
}

/// Restores the silent and sanity-check flags when dropped
#[must_use]
pub struct FlagGuard {
    flags: Arc<Flags>,
    silent: bool,
    sanity_check: bool,
}

impl Drop for FlagGuard {
    fn drop(&mut self) {
        self.flags.silent.store(self.silent, Ordering::SeqCst);
        self.flags
            .sanity_check
            .store(self.sanity_check, Ordering::SeqCst);
    }
}

/// Session, compilers and flags for executing statements
#[derive(Clone)]
pub struct ExecutionContext {
    session: Arc<dyn Session>,
    predicates: Arc<dyn PredicateCompiler>,
    projections: Arc<dyn ProjectionCompiler>,
    parser: Arc<dyn StatementParser>,
    registry: Arc<StatementRegistry>,
    binds: BindVariables,
    dialect: Dialect,
    output: SharedWriter,
    confirmer: Option<Confirmer>,
    timeout: Option<Duration>,
    stop_on_error: bool,
    trace: bool,
    flags: Arc<Flags>,
}

impl ExecutionContext {
    /// Context with default compilers, the JSON term parser, the standard
    /// statement registry and stdout as output
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self::from_config(&QueryConfig::default(), session)
    }

    pub fn from_config(config: &QueryConfig, session: Arc<dyn Session>) -> Self {
        Self {
            session,
            predicates: Arc::new(FilterBuilder),
            projections: Arc::new(SelectListMaker),
            parser: Arc::new(JsonTermParser),
            registry: Arc::new(StatementRegistry::standard()),
            binds: BindVariables::new(),
            dialect: Dialect::from(config),
            output: Arc::new(Mutex::new(Box::new(io::stdout()))),
            confirmer: None,
            timeout: config.timeout_ms.map(Duration::from_millis),
            stop_on_error: config.stop_on_error,
            trace: config.trace,
            flags: Arc::new(Flags {
                silent: AtomicBool::new(config.silent),
                sanity_check: AtomicBool::new(config.sanity_check),
            }),
        }
    }

    pub fn with_binds(mut self, binds: BindVariables) -> Self {
        self.binds = binds;
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_output(mut self, writer: impl Write + Send + 'static) -> Self {
        self.output = Arc::new(Mutex::new(Box::new(writer)));
        self
    }

    pub fn with_confirmer(mut self, confirmer: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.confirmer = Some(Arc::new(confirmer));
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_silent(self, silent: bool) -> Self {
        self.flags.silent.store(silent, Ordering::SeqCst);
        self
    }

    pub fn with_sanity_check(self, sanity_check: bool) -> Self {
        self.flags
            .sanity_check
            .store(sanity_check, Ordering::SeqCst);
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn StatementParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_predicate_compiler(mut self, compiler: Arc<dyn PredicateCompiler>) -> Self {
        self.predicates = compiler;
        self
    }

    pub fn with_projection_compiler(mut self, compiler: Arc<dyn ProjectionCompiler>) -> Self {
        self.projections = compiler;
        self
    }

    pub fn with_registry(mut self, registry: Arc<StatementRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    pub fn predicate_compiler(&self) -> &dyn PredicateCompiler {
        self.predicates.as_ref()
    }

    pub fn projection_compiler(&self) -> &dyn ProjectionCompiler {
        self.projections.as_ref()
    }

    pub fn parser(&self) -> &dyn StatementParser {
        self.parser.as_ref()
    }

    pub fn registry(&self) -> &Arc<StatementRegistry> {
        &self.registry
    }

    pub fn binds(&self) -> &BindVariables {
        &self.binds
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_stop_on_error(&self) -> bool {
        self.stop_on_error
    }

    pub fn is_trace(&self) -> bool {
        self.trace
    }

    pub fn is_silent(&self) -> bool {
        self.flags.silent.load(Ordering::SeqCst)
    }

    pub fn is_sanity_check(&self) -> bool {
        self.flags.sanity_check.load(Ordering::SeqCst)
    }

    /// Switches to silent mode with sanity checks off until the guard is
    /// dropped, then restores the previous flags
    pub fn enter_silent(&self) -> FlagGuard {
        FlagGuard {
            flags: Arc::clone(&self.flags),
            silent: self.flags.silent.swap(true, Ordering::SeqCst),
            sanity_check: self.flags.sanity_check.swap(false, Ordering::SeqCst),
        }
    }

    /// Asks the confirmer; approves when none is installed
    pub fn confirm(&self, prompt: &str) -> bool {
        self.confirmer.as_ref().map_or(true, |confirm| confirm(prompt))
    }

    /// Runs `f` against the output writer
    pub fn with_writer<R>(&self, f: impl FnOnce(&mut dyn Write) -> io::Result<R>) -> QueryResult<R> {
        let mut writer = self
            .output
            .lock()
            .map_err(|_| QueryError::runtime("Output writer poisoned"))?;
        let result = f(writer.as_mut()).map_err(|e| QueryError::io("Error writing output", e))?;
        writer
            .flush()
            .map_err(|e| QueryError::io("Error writing output", e))?;
        Ok(result)
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("session", &self.session)
            .field("binds", &self.binds)
            .field("dialect", &self.dialect)
            .field("timeout", &self.timeout)
            .field("stop_on_error", &self.stop_on_error)
            .field("trace", &self.trace)
            .field("silent", &self.is_silent())
            .field("sanity_check", &self.is_sanity_check())
            .finish()
    }
}
