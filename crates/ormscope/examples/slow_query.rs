//! Slow-query and error metrics over an in-process hook registry.
//!
//! Run with:
//!   cargo run --example slow_query -p ormscope
//!
//! Set `RUST_LOG=ormscope=debug` to also see hook installation events.

use ormscope::hook::{CallbackRegistry, HookPoint, Operation};
use ormscope::{
    ErrorQueryConfig, MetricPlugin, OperationError, Plugin, ScopeResult, SlowQueryConfig,
};
use prometheus::{Encoder, TextEncoder};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> ScopeResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ormscope=info")),
        )
        .init();

    // Stand-in for the host ORM: handlers "run" the statement.
    let mut registry = CallbackRegistry::<Operation>::new()
        .with_handler(HookPoint::Create, |_op: &mut Operation| {
            thread::sleep(Duration::from_millis(2))
        })
        .with_handler(HookPoint::Update, |op: &mut Operation| {
            op.set_error(OperationError::failed("deadlock detected"))
        })
        .with_handler(HookPoint::Delete, |_op: &mut Operation| {})
        .with_handler(HookPoint::Query, |op: &mut Operation| {
            thread::sleep(Duration::from_millis(60));
            op.set_error(OperationError::NotFound);
        })
        .with_handler(HookPoint::Raw, |_op: &mut Operation| {})
        .with_handler(HookPoint::Row, |_op: &mut Operation| {});

    let plugin = MetricPlugin::builder()
        .slow_query(
            SlowQueryConfig::new()
                .with_name_prefix("shop")
                .with_db_name("primary")
                .with_threshold(Duration::from_millis(50)),
        )
        .error_query(
            ErrorQueryConfig::new()
                .with_name_prefix("shop")
                .with_db_name("primary"),
        )
        .build()?;
    plugin.initialize(&mut registry)?;

    let prometheus_registry = prometheus::Registry::new();
    plugin.register(&prometheus_registry)?;

    let mut insert = Operation::new("primary", "orders")
        .with_sql("INSERT INTO orders (user_id, total) VALUES (?, ?)")
        .bind(7)
        .bind(19.5);
    registry.dispatch(HookPoint::Create, &mut insert)?;

    let mut update = Operation::new("primary", "orders")
        .with_sql("UPDATE orders SET total = ? WHERE id = ?")
        .bind(21.0)
        .bind(1);
    registry.dispatch(HookPoint::Update, &mut update)?;

    let mut lookup = Operation::new("primary", "orders")
        .with_sql("SELECT * FROM orders WHERE note = ?")
        .bind("gift 'wrap'");
    registry.dispatch(HookPoint::Query, &mut lookup)?;

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus_registry.gather(), &mut buffer)?;
    println!("{}", String::from_utf8_lossy(&buffer));

    Ok(())
}
