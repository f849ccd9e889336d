//! CLI command implementations

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::context::{ExecutionContext, QueryConfig};
use crate::observability::Logger;
use crate::statement::{StatementExecutor, StatementRegistry};
use crate::store::LocalSession;

use super::args::{Cli, Command};
use super::errors::CliResult;
use super::io::{prompt_confirmation, read_script};

/// Flags of `cohql exec` that override the configuration file
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub config: Option<PathBuf>,
    pub file: Option<PathBuf>,
    pub stop_on_error: bool,
    pub trace: bool,
    pub yes: bool,
}

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Exec {
            config,
            file,
            stop_on_error,
            trace,
            yes,
        } => exec(&ExecOptions {
            config,
            file,
            stop_on_error,
            trace,
            yes,
        }),
        Command::Syntax => syntax(&mut io::stdout()),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<QueryConfig> {
    let config = match path {
        Some(path) => QueryConfig::load(path)?,
        None => QueryConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Runs a script against a fresh in-process store
pub fn exec(options: &ExecOptions) -> CliResult<()> {
    let mut config = load_config(options.config.as_deref())?;
    config.stop_on_error |= options.stop_on_error;
    config.trace |= options.trace;
    Logger::set_threshold(config.severity());

    let script = read_script(options.file.as_deref())?;

    let session = Arc::new(LocalSession::new(config.partition_count));
    let ctx = ExecutionContext::from_config(&config, session);
    let ctx = if options.yes {
        ctx.with_confirmer(|_| true)
    } else if options.file.is_some() {
        ctx.with_confirmer(prompt_confirmation)
    } else {
        // stdin carries the script; there is nobody to ask
        ctx.with_confirmer(|prompt| {
            Logger::warn("CONFIRMATION_UNAVAILABLE", &[("prompt", prompt)]);
            false
        })
    };

    let source = options
        .file
        .as_ref()
        .map(|f| f.display().to_string())
        .unwrap_or_else(|| "stdin".to_string());
    Logger::info("EXEC_BEGIN", &[("source", source.as_str())]);

    StatementExecutor::new().execute(&script, &ctx)?;
    Ok(())
}

/// Writes every statement's syntax and description
pub fn syntax(out: &mut dyn Write) -> CliResult<()> {
    out.write_all(StatementRegistry::standard().help().as_bytes())?;
    out.flush()?;
    Ok(())
}
