//! Execution-plan checks with a canned EXPLAIN executor.
//!
//! Run with:
//!   cargo run --example explain -p ormscope

use ormscope::hook::{CallbackRegistry, HookPoint, Operation};
use ormscope::ormscope_explain::{AccessType, Extra, SelectType};
use ormscope::{
    ExplainOptions, ExplainPlugin, PlanTable, Plugin, PolicyRules, ScopeError, ScopeResult,
};
use serde_json::json;
use std::sync::Arc;

/// Plays the role of a raw connection that bypasses the instrumented hooks.
fn canned_explain(sql: &str) -> ScopeResult<PlanTable> {
    let Some(statement) = sql.strip_prefix("EXPLAIN ") else {
        return Err(ScopeError::query(format!("not an EXPLAIN statement: {sql}")));
    };
    let (access_type, extra) = if statement.contains("ORDER BY") {
        ("ALL", "Using where; Using filesort")
    } else {
        ("ref", "Using index")
    };
    Ok(PlanTable::with_plan_columns().with_row(vec![
        json!(1),
        json!("SIMPLE"),
        json!("orders"),
        json!(access_type),
        json!("idx_user"),
        json!(null),
        json!(null),
        json!(null),
        json!(1500),
        json!(extra.replace(';', ",")),
    ]))
}

fn main() -> ScopeResult<()> {
    tracing_subscriber::fmt().with_target(true).init();

    let rules = PolicyRules::new()
        .with_extra_black_list([Extra::FileSort, Extra::Temporary])
        .with_select_type_white_list([SelectType::Simple, SelectType::Primary])
        .with_min_access_type(AccessType::Range)
        .enforce_access_floor();

    let options = ExplainOptions::new()
        .with_rules(rules)
        .with_callback(|report| match &report.violation {
            Some(violation) => println!("[{}] {} -> {violation}", report.hook, report.sql),
            None => println!("[{}] {} -> ok", report.hook, report.sql),
        });

    let mut registry = CallbackRegistry::with_all(|_op: &mut Operation| {});
    ExplainPlugin::new(options, Arc::new(canned_explain)).initialize(&mut registry)?;

    let mut by_user = Operation::new("primary", "orders")
        .with_sql("SELECT id FROM orders WHERE user_id = $1")
        .bind(7);
    registry.dispatch(HookPoint::Query, &mut by_user)?;

    let mut sorted = Operation::new("primary", "orders")
        .with_sql("SELECT * FROM orders WHERE total > ? ORDER BY created_at")
        .bind(100);
    registry.dispatch(HookPoint::Query, &mut sorted)?;

    Ok(())
}
