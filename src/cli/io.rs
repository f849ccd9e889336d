//! Script input and interactive prompts
//!
//! Statement results go to stdout through the execution context; prompts go
//! to stderr so piped output stays clean.

use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::Path;

use super::errors::{CliError, CliResult};

/// Reads the script from `file`, or all of stdin when no file is given
pub fn read_script(file: Option<&Path>) -> CliResult<String> {
    match file {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            CliError::io_error(format!("Failed to read {}: {}", path.display(), e))
        }),
        None => {
            let mut script = String::new();
            io::stdin().lock().read_to_string(&mut script)?;
            Ok(script)
        }
    }
}

/// Asks a yes/no question on stderr and reads the answer from stdin.
/// Anything but `y` or `yes` is a no.
pub fn prompt_confirmation(prompt: &str) -> bool {
    let mut stderr = io::stderr();
    if write!(stderr, "{} (y/n) ", prompt).and_then(|_| stderr.flush()).is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
