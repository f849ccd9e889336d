//! Result Printing Tests
//!
//! - Keyed results print `key: value`, quoting only string scalars
//! - Formatted results pad every column to its widest cell
//! - SELECT headers line up with grouped aggregate rows
//! - The executor prints SELECT lists as tables and falls back to keyed
//!   output when the rows do not line up with the headers

use std::sync::Arc;

use cohql::ast::Term;
use cohql::context::{BindVariables, ExecutionContext, OutputBuffer};
use cohql::errors::ErrorCategory;
use cohql::result::{FormattedStatementResult, Payload, StatementResult};
use cohql::statement::StatementExecutor;
use cohql::store::LocalSession;
use serde_json::json;

#[test]
fn test_keyed_result_with_keys() {
    let result = StatementResult::new(
        Payload::Keyed(vec![(json!("a"), json!(1)), (json!("b"), json!([2, 3]))]),
        true,
    );
    let text = result.to_text(None);
    assert!(text.contains("\"a\": 1"));
    assert!(text.contains("\"b\": [2, 3]"));
}

#[test]
fn test_formatted_column_widths() {
    let result = StatementResult::new(
        Payload::Keyed(vec![(json!("x"), json!(5)), (json!("yy"), json!(12))]),
        true,
    );
    let formatted =
        FormattedStatementResult::new(result, vec!["Name".to_string(), "Count".to_string()]);

    let widths = formatted.column_widths().unwrap();
    assert!(widths[0] >= "Name".len().max("x".len()).max("yy".len()));
    assert!(widths[1] >= "Count".len().max("5".len()).max("12".len()));

    let text = formatted.to_text(None).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Name Count");
    assert_eq!(lines[1], "---- -----");
    assert_eq!(lines[2], "x    5    ");
    assert_eq!(lines[3], "yy   12   ");
}

#[test]
fn test_formatted_header_mismatch_is_configuration_error() {
    let result = StatementResult::new(Payload::Keyed(vec![(json!("x"), json!([1, 2]))]), true);
    let err = FormattedStatementResult::new(result, vec!["Name".to_string()])
        .rows()
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);

    let err = FormattedStatementResult::new(StatementResult::null(), vec!["Name".to_string()])
        .rows()
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[test]
fn test_grouped_select_prints_as_table() {
    let ctx = ExecutionContext::new(Arc::new(LocalSession::default())).with_output(OutputBuffer::new());
    let people = ctx.session().get_collection("people").unwrap();
    people.put(json!(1), json!({"city": "Oslo", "age": 30})).unwrap();
    people.put(json!(2), json!({"city": "Oslo", "age": 25})).unwrap();
    people.put(json!(3), json!({"city": "Rome", "age": 45})).unwrap();

    let term = Term::node(
        "sqlSelectNode",
        vec![
            Term::labeled("from", "people"),
            Term::node(
                "fieldList",
                vec![
                    Term::identifier("city"),
                    Term::node("callNode", vec![Term::atom("COUNT"), Term::atom("*")]),
                ],
            ),
            Term::node("groupBy", vec![Term::identifier("city")]),
        ],
    );
    let statement = ctx
        .registry()
        .realize(&ctx, &term, &BindVariables::new())
        .unwrap();
    let headers = statement.headers().to_vec();
    let result = statement.execute(&ctx).unwrap();

    let text = FormattedStatementResult::new(result, headers)
        .to_text(Some("People by city"))
        .unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "People by city",
            "city COUNT(*)",
            "---- --------",
            "Oslo 2       ",
            "Rome 1       ",
        ]
    );
}

fn seeded_with_output() -> (ExecutionContext, OutputBuffer) {
    let output = OutputBuffer::new();
    let ctx = ExecutionContext::new(Arc::new(LocalSession::default())).with_output(output.clone());
    let people = ctx.session().get_collection("people").unwrap();
    people.put(json!(1), json!({"city": "Oslo", "age": 30})).unwrap();
    people.put(json!(2), json!({"city": "Oslo", "age": 25})).unwrap();
    people.put(json!(3), json!({"city": "Rome", "age": 45})).unwrap();
    (ctx, output)
}

#[test]
fn test_executor_prints_grouped_select_as_table() {
    let (ctx, output) = seeded_with_output();
    let script = r#"{"functor": "sqlSelectNode", "children": [{"functor": "from", "children": ["people"]}, {"functor": "fieldList", "children": [{"functor": "identifier", "children": ["city"]}, {"functor": "callNode", "children": ["COUNT", "*"]}]}, {"functor": "groupBy", "children": [{"functor": "identifier", "children": ["city"]}]}]}"#;

    StatementExecutor::new().execute(script, &ctx).unwrap();

    let printed = output.contents();
    let lines: Vec<&str> = printed.lines().collect();
    assert_eq!(
        lines,
        vec!["city COUNT(*)", "---- --------", "Oslo 2       ", "Rome 1       "]
    );
}

#[test]
fn test_executor_prints_whole_objects_keyed() {
    let (ctx, output) = seeded_with_output();
    let script = r#"{"functor": "sqlSelectNode", "children": [{"functor": "from", "children": ["people"]}]}"#;

    StatementExecutor::new().execute(script, &ctx).unwrap();

    let printed = output.contents();
    assert!(!printed.contains("----"));
    assert!(printed.contains("\"Oslo\""));
}
