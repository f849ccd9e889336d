//! CLI argument definitions using clap
//!
//! Commands:
//! - cohql exec [--config <path>] [--file <path>]
//! - cohql syntax

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cohql - run CohQL statements against a partitioned key/value store
#[derive(Parser, Debug)]
#[command(name = "cohql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute statements, one JSON term per line
    Exec {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Script to execute; statements are read from stdin when absent
        #[arg(long)]
        file: Option<PathBuf>,

        /// Stop at the first failing statement
        #[arg(long)]
        stop_on_error: bool,

        /// Show the plan of every statement before running it
        #[arg(long)]
        trace: bool,

        /// Answer yes to every confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Print the syntax of every statement
    Syntax,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exec() {
        let cli = Cli::try_parse_from([
            "cohql",
            "exec",
            "--config",
            "cohql.json",
            "--file",
            "setup.cohql",
            "-y",
        ])
        .unwrap();
        match cli.command {
            Command::Exec {
                config, file, yes, stop_on_error, ..
            } => {
                assert_eq!(config, Some(PathBuf::from("cohql.json")));
                assert_eq!(file, Some(PathBuf::from("setup.cohql")));
                assert!(yes);
                assert!(!stop_on_error);
            }
            other => panic!("expected exec, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_syntax() {
        let cli = Cli::try_parse_from(["cohql", "syntax"]).unwrap();
        assert!(matches!(cli.command, Command::Syntax));
    }
}
