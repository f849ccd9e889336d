//! Async Parity Tests
//!
//! Synchronous and asynchronous execution of the same statement against
//! identical store states yield equal results and leave equal stores.

use std::sync::Arc;

use cohql::ast::Term;
use cohql::context::{BindVariables, ExecutionContext, OutputBuffer};
use cohql::statement::{Statement, StatementExecutor};
use cohql::store::{AlwaysFilter, Entry, LocalSession};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn seeded_context() -> ExecutionContext {
    let ctx = ExecutionContext::new(Arc::new(LocalSession::new(3))).with_output(OutputBuffer::new());
    let people = ctx.session().get_collection("people").unwrap();
    for (key, name, age, city) in [
        (1, "Ann", 30, "Oslo"),
        (2, "Bob", 25, "Oslo"),
        (3, "Cid", 45, "Rome"),
        (4, "Dee", 52, "Rome"),
        (5, "Eve", 19, "Lima"),
    ] {
        people
            .put(json!(key), json!({"name": name, "age": age, "city": city}))
            .unwrap();
    }
    ctx
}

fn from() -> Term {
    Term::labeled("from", "people")
}

fn where_age_over(n: i64) -> Term {
    Term::node(
        "whereClause",
        vec![Term::node(
            "binaryOperatorNode",
            vec![Term::atom(">"), Term::identifier("age"), Term::atom(n)],
        )],
    )
}

fn realize(ctx: &ExecutionContext, term: &Term) -> Statement {
    ctx.registry()
        .realize(ctx, term, &BindVariables::new())
        .unwrap()
}

fn snapshot(ctx: &ExecutionContext) -> Vec<Entry> {
    ctx.session()
        .get_collection("people")
        .unwrap()
        .entries(&AlwaysFilter)
        .unwrap()
}

async fn assert_parity(term: Term) {
    let sync_ctx = seeded_context();
    let async_ctx = seeded_context();

    let sync_result = realize(&sync_ctx, &term).execute(&sync_ctx).unwrap();
    let async_result = realize(&async_ctx, &term)
        .execute_async(&async_ctx)
        .await
        .unwrap();

    assert_eq!(sync_result, async_result, "{}", term);
    assert_eq!(snapshot(&sync_ctx), snapshot(&async_ctx), "{}", term);
}

// =============================================================================
// Parity
// =============================================================================

#[tokio::test]
async fn test_select_parity() {
    assert_parity(Term::node("sqlSelectNode", vec![from(), where_age_over(20)])).await;

    assert_parity(Term::node(
        "sqlSelectNode",
        vec![
            from(),
            Term::node(
                "fieldList",
                vec![
                    Term::identifier("city"),
                    Term::node("callNode", vec![Term::atom("AVG"), Term::identifier("age")]),
                ],
            ),
            Term::node("groupBy", vec![Term::identifier("city")]),
        ],
    ))
    .await;
}

#[tokio::test]
async fn test_insert_parity() {
    assert_parity(Term::node(
        "sqlInsertNode",
        vec![
            from(),
            Term::labeled("key", 6),
            Term::node("value", vec![Term::atom(json!({"name": "Fay", "age": 33}))]),
        ],
    ))
    .await;
}

#[tokio::test]
async fn test_update_parity() {
    assert_parity(Term::node(
        "sqlUpdateNode",
        vec![
            from(),
            Term::node(
                "setList",
                vec![Term::node(
                    "binaryOperatorNode",
                    vec![Term::atom("=="), Term::identifier("city"), Term::atom("Bergen")],
                )],
            ),
            where_age_over(40),
        ],
    ))
    .await;
}

#[tokio::test]
async fn test_delete_parity() {
    assert_parity(Term::node("sqlDeleteNode", vec![from(), where_age_over(26)])).await;
}

#[tokio::test]
async fn test_executor_async_parity() {
    let script = r#"{"functor": "sqlSelectNode", "children": [{"functor": "from", "children": ["people"]}, {"functor": "isDistinct", "children": []}, {"functor": "fieldList", "children": [{"functor": "identifier", "children": ["city"]}]}]}"#;

    let sync_ctx = seeded_context();
    let async_ctx = seeded_context();
    let executor = StatementExecutor::new();

    let sync_result = executor.execute(script, &sync_ctx).unwrap();
    let async_result = executor.execute_async(script, &async_ctx).await.unwrap();
    assert_eq!(sync_result, async_result);
    assert_eq!(sync_result.payload().len(), 3);
}
