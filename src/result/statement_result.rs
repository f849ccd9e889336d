//! Default statement result and its printer

use std::io::{self, Write};

use serde_json::Value;

/// Result shape produced by a statement
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Nothing to report
    Null,
    /// Single value or fixed-size tuple
    Scalar(Value),
    /// Keyed entries in key order
    Keyed(Vec<(Value, Value)>),
    /// Bare values
    Collection(Vec<Value>),
}

impl Payload {
    /// Returns true for `Payload::Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Payload::Null)
    }

    /// Number of printable units
    pub fn len(&self) -> usize {
        match self {
            Payload::Null => 0,
            Payload::Scalar(_) => 1,
            Payload::Keyed(entries) => entries.len(),
            Payload::Collection(values) => values.len(),
        }
    }

    /// Returns true if there is nothing to print
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Uniform wrapper around what a statement returned
#[derive(Debug, Clone, PartialEq)]
pub struct StatementResult {
    payload: Payload,
    show_keys: bool,
}

impl StatementResult {
    /// Creates a result
    pub fn new(payload: Payload, show_keys: bool) -> Self {
        Self { payload, show_keys }
    }

    /// The null result
    pub fn null() -> Self {
        Self::new(Payload::Null, false)
    }

    /// A single value (null values collapse to the null result)
    pub fn scalar(value: Value) -> Self {
        if value.is_null() {
            Self::null()
        } else {
            Self::new(Payload::Scalar(value), false)
        }
    }

    /// Returns the payload
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consumes the result, returning the payload
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Whether keyed entries print their keys
    pub fn show_keys(&self) -> bool {
        self.show_keys
    }

    /// Prints the result. A null payload prints nothing, not even the title.
    pub fn print(&self, out: &mut dyn Write, title: Option<&str>) -> io::Result<()> {
        if self.payload.is_null() {
            return Ok(());
        }

        if let Some(title) = title {
            writeln!(out, "{}", title)?;
        }

        match &self.payload {
            Payload::Null => {}
            Payload::Scalar(value) => {
                writeln!(out, "{}", format_value(value, true, true))?;
            }
            Payload::Keyed(entries) => {
                for (key, value) in entries {
                    if self.show_keys {
                        writeln!(
                            out,
                            "{}: {}",
                            format_value(key, true, false),
                            format_value(value, true, false)
                        )?;
                    } else {
                        writeln!(out, "{}", format_value(value, true, true))?;
                    }
                }
            }
            Payload::Collection(values) => {
                for value in values {
                    writeln!(out, "{}", format_value(value, true, true))?;
                }
            }
        }

        out.flush()
    }

    /// Renders the result into a string
    pub fn to_text(&self, title: Option<&str>) -> String {
        let mut buffer = Vec::new();
        // Writing to a Vec cannot fail
        let _ = self.print(&mut buffer, title);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Formats a value for display.
///
/// Strings are quoted when `quote` is set. Arrays print as `[a, b]`, except
/// at the top level where the tuple is the printed unit and prints bare.
/// Objects print as `{k: v}`.
pub fn format_value(value: &Value, quote: bool, top: bool) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            if quote {
                format!("\"{}\"", s)
            } else {
                s.clone()
            }
        }
        Value::Array(items) => {
            let inner = items
                .iter()
                .map(|item| format_value(item, quote, false))
                .collect::<Vec<_>>()
                .join(", ");
            if top {
                inner
            } else {
                format!("[{}]", inner)
            }
        }
        Value::Object(map) => {
            let inner = map
                .iter()
                .map(|(k, v)| {
                    let key = if quote { format!("\"{}\"", k) } else { k.clone() };
                    format!("{}: {}", key, format_value(v, quote, false))
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{}}}", inner)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_prints_nothing() {
        let result = StatementResult::null();
        assert_eq!(result.to_text(Some("Title")), "");
    }

    #[test]
    fn test_keyed_with_keys() {
        let result = StatementResult::new(
            Payload::Keyed(vec![(json!("a"), json!(1)), (json!("b"), json!([2, 3]))]),
            true,
        );
        let text = result.to_text(None);

        assert!(text.contains("\"a\": 1"));
        assert!(text.contains("\"b\": [2, 3]"));
    }

    #[test]
    fn test_keyed_without_keys() {
        let result = StatementResult::new(
            Payload::Keyed(vec![(json!(1), json!("Alice")), (json!(2), json!("Bob"))]),
            false,
        );
        assert_eq!(result.to_text(None), "\"Alice\"\n\"Bob\"\n");
    }

    #[test]
    fn test_collection_one_per_line() {
        let result = StatementResult::new(
            Payload::Collection(vec![json!("x"), json!(4), json!([1, "y"])]),
            false,
        );
        assert_eq!(result.to_text(None), "\"x\"\n4\n1, \"y\"\n");
    }

    #[test]
    fn test_nested_containers() {
        let value = json!([1, {"n": [1, 2]}, [3]]);
        assert_eq!(format_value(&value, true, true), "1, {\"n\": [1, 2]}, [3]");
        assert_eq!(format_value(&value, true, false), "[1, {\"n\": [1, 2]}, [3]]");
    }

    #[test]
    fn test_title_precedes_output() {
        let result = StatementResult::scalar(json!(42));
        assert_eq!(result.to_text(Some("Answer")), "Answer\n42\n");
    }
}
