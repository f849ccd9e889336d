//! Column-aligned tabular result
//!
//! Every payload unit becomes one row; array keys and values spread across
//! columns. Column width is the widest of the header and every cell.

use std::io::Write;

use serde_json::Value;

use crate::errors::{QueryError, QueryResult};

use super::statement_result::{format_value, Payload, StatementResult};

/// A statement result printed as a table with explicit headers
#[derive(Debug, Clone)]
pub struct FormattedStatementResult {
    result: StatementResult,
    headers: Vec<String>,
}

impl FormattedStatementResult {
    /// Wraps a result with column headers
    pub fn new(result: StatementResult, headers: Vec<String>) -> Self {
        Self { result, headers }
    }

    /// Column headers
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn result(&self) -> &StatementResult {
        &self.result
    }

    pub fn into_result(self) -> StatementResult {
        self.result
    }

    /// Builds the cell grid, failing if any row does not line up with the headers
    pub fn rows(&self) -> QueryResult<Vec<Vec<String>>> {
        let rows: Vec<Vec<String>> = match self.result.payload() {
            Payload::Null => Vec::new(),
            Payload::Scalar(value) => vec![cells(value)],
            Payload::Keyed(entries) => entries
                .iter()
                .map(|(key, value)| {
                    let mut row = if self.result.show_keys() {
                        cells(key)
                    } else {
                        Vec::new()
                    };
                    row.extend(cells(value));
                    row
                })
                .collect(),
            Payload::Collection(values) => values.iter().map(cells).collect(),
        };

        if rows.is_empty() {
            return Err(QueryError::no_values());
        }

        for row in &rows {
            if row.len() != self.headers.len() {
                return Err(QueryError::column_mismatch(self.headers.len(), row.len()));
            }
        }

        Ok(rows)
    }

    /// Per-column maximum width across header and cells
    pub fn column_widths(&self) -> QueryResult<Vec<usize>> {
        let rows = self.rows()?;
        Ok(widths(&self.headers, &rows))
    }

    /// Prints the header, a dash rule, then one padded line per row
    pub fn print(&self, out: &mut dyn Write, title: Option<&str>) -> QueryResult<()> {
        let rows = self.rows()?;
        let widths = widths(&self.headers, &rows);

        let write = |out: &mut dyn Write, line: String| {
            writeln!(out, "{}", line)
                .map_err(|e| QueryError::io("Error printing result", e))
        };

        if let Some(title) = title {
            write(out, title.to_string())?;
        }
        write(out, format_row(&self.headers, &widths))?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write(out, format_row(&rule, &widths))?;
        for row in &rows {
            write(out, format_row(row, &widths))?;
        }

        out.flush()
            .map_err(|e| QueryError::io("Error printing result", e))
    }

    /// Renders the table into a string
    pub fn to_text(&self, title: Option<&str>) -> QueryResult<String> {
        let mut buffer = Vec::new();
        self.print(&mut buffer, title)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn cells(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(|v| format_value(v, false, false)).collect(),
        other => vec![format_value(other, false, false)],
    }
}

fn widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }
    widths
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    values
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            let width = widths[idx];
            format!("{value:<width$}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}
