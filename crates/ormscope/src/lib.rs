//! # ormscope
//!
//! Instrumentation for ORM hook registries.
//!
//! ## Features
//!
//! - **Hook interception**: wrap the create / update / delete / query / raw /
//!   row handlers of a host registry once, atomically, with an explicit
//!   interceptor chain
//! - **Slow-query metrics**: latency histogram for every call, slow-query
//!   counter and log for calls at or above a threshold
//! - **Error metrics**: failed operations counted per table and hook,
//!   "record not found" excluded
//! - **Plan checks**: re-issue each statement under `EXPLAIN` and check the
//!   plan against white / black lists and an access-type floor
//!
//! Metric families are `prometheus` collectors handed to the host for
//! registration; diagnostics are `tracing` events under the
//! `ormscope.slow`, `ormscope.explain` and `ormscope.hook` targets.
//!
//! ## Example
//!
//! ```rust
//! use ormscope::hook::{CallbackRegistry, HookPoint, Operation};
//! use ormscope::{ErrorQueryConfig, MetricPlugin, Plugin, SlowQueryConfig};
//! use std::time::Duration;
//!
//! let mut registry = CallbackRegistry::<Operation>::with_all(|_op| {});
//!
//! let plugin = MetricPlugin::builder()
//!     .slow_query(
//!         SlowQueryConfig::new()
//!             .with_db_name("shop")
//!             .with_threshold(Duration::ZERO),
//!     )
//!     .error_query(ErrorQueryConfig::new().with_db_name("shop"))
//!     .build()
//!     .unwrap();
//! plugin.initialize(&mut registry).unwrap();
//!
//! let prometheus_registry = prometheus::Registry::new();
//! plugin.register(&prometheus_registry).unwrap();
//!
//! let mut op = Operation::new("shop", "orders").with_sql("SELECT 1");
//! registry.dispatch(HookPoint::Query, &mut op).unwrap();
//!
//! let slow = plugin.slow_metric().unwrap();
//! assert_eq!(slow.slow_query_count("orders", HookPoint::Query), 1);
//! ```

pub mod config;
pub mod error;
pub mod explain;
pub mod hook;
pub mod interceptor;
pub mod labels;
pub mod log;
pub mod metrics;
pub mod plugin;
pub mod sql;

pub use config::ScopeConfig;
pub use error::{OperationError, ScopeError, ScopeResult};
pub use explain::{
    EXPLAIN_CMD, ExplainCallback, ExplainEnable, ExplainInterceptor, ExplainOptions,
    ExplainReport, QueryExecutor,
};
pub use hook::{
    CallbackRegistry, Handler, HookPoint, HookRegistry, Interceptor, InterceptorChain, Operation,
    OperationContext,
};
pub use interceptor::{ErrorQueryInterceptor, SlowQueryInterceptor, SlowQueryLog};
pub use labels::LabelSet;
pub use log::{TracingSlowLog, default_slow_log};
pub use metrics::{DEFAULT_BUCKETS, ErrorMetric, SlowMetric, register_all};
pub use plugin::{
    DEFAULT_SLOW_THRESHOLD, ErrorQueryConfig, ExplainPlugin, MetricPlugin, MetricPluginBuilder,
    Plugin, SlowQueryConfig,
};
pub use sql::render_sql;

// Re-export the plan analysis crate
pub use ormscope_explain;
pub use ormscope_explain::{Explainer, PlanRow, PlanTable, PolicyRules, Violation};
