//! CLI module for cohql
//!
//! Provides command-line interface for:
//! - exec: run statement terms from a script file or stdin
//! - syntax: print the syntax of every statement

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{exec, run, run_command, syntax, ExecOptions};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{prompt_confirmation, read_script};
