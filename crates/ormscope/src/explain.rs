//! EXPLAIN re-issue after each operation, checked against a policy.
//!
//! [`ExplainInterceptor`] runs the wrapped handler first, then re-issues the
//! statement prefixed with [`EXPLAIN_CMD`] through a [`QueryExecutor`],
//! analyzes the returned plan with an [`Explainer`] and hands the result to
//! the configured callback. A policy violation is reported, never enforced:
//! the host operation is not affected.
//!
//! The re-issue is handed to [`defer`], so it runs after the outermost
//! instrumented handler returns and never shows up in slow-query timing,
//! whether [`crate::ExplainPlugin`] is initialized before or after
//! [`crate::MetricPlugin`].

use crate::error::ScopeResult;
use crate::hook::{Handler, HookPoint, Interceptor, Operation, OperationContext, defer, handler};
use crate::labels::LabelSet;
use crate::sql::{render_sql, truncate_for_log};
use ormscope_explain::{Explainer, PlanRow, PlanTable, PolicyRules, Violation};
use serde::Serialize;
use std::sync::Arc;

/// Statement prefix used to request a plan.
pub const EXPLAIN_CMD: &str = "EXPLAIN";

const LOG_SQL_LENGTH: usize = 1024;

/// Runs a statement and returns its rows.
///
/// The executor is called from inside an instrumented hook, so it must not
/// route back through the instrumented hooks itself.
pub trait QueryExecutor: Send + Sync {
    fn query(&self, sql: &str) -> ScopeResult<PlanTable>;
}

impl<F> QueryExecutor for F
where
    F: Fn(&str) -> ScopeResult<PlanTable> + Send + Sync,
{
    fn query(&self, sql: &str) -> ScopeResult<PlanTable> {
        self(sql)
    }
}

/// Result of one explained statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainReport {
    pub hook: HookPoint,
    /// Statement with parameters inlined, without the EXPLAIN prefix.
    pub sql: String,
    /// Extracted plan rows. Rows after a violating row were not checked.
    pub rows: Vec<PlanRow>,
    pub violation: Option<Violation>,
}

impl ExplainReport {
    pub fn is_clean(&self) -> bool {
        self.violation.is_none()
    }
}

/// Decides, before each run, whether EXPLAIN should be issued at all.
pub type ExplainEnable = Arc<dyn Fn() -> bool + Send + Sync>;

/// Receives every analyzed plan.
pub type ExplainCallback = Arc<dyn Fn(&ExplainReport) + Send + Sync>;

/// Explain configuration.
#[derive(Clone, Default)]
pub struct ExplainOptions {
    pub enable: Option<ExplainEnable>,
    pub callback: Option<ExplainCallback>,
    pub rules: PolicyRules,
}

impl ExplainOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the predicate checked before each run.
    pub fn with_enable<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.enable = Some(Arc::new(f));
        self
    }

    /// Set the callback receiving each report.
    pub fn with_callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&ExplainReport) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(f));
        self
    }

    pub fn with_rules(mut self, rules: PolicyRules) -> Self {
        self.rules = rules;
        self
    }
}

impl std::fmt::Debug for ExplainOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplainOptions")
            .field("enable", &self.enable.is_some())
            .field("callback", &self.callback.is_some())
            .field("rules", &self.rules)
            .finish()
    }
}

/// Re-issues each completed statement under EXPLAIN.
#[derive(Clone)]
pub struct ExplainInterceptor {
    explainer: Arc<Explainer>,
    executor: Arc<dyn QueryExecutor>,
    enable: Option<ExplainEnable>,
    callback: Option<ExplainCallback>,
}

impl ExplainInterceptor {
    pub fn new(options: ExplainOptions, executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            explainer: Arc::new(Explainer::new(options.rules)),
            executor,
            enable: options.enable,
            callback: options.callback,
        }
    }

    pub fn explainer(&self) -> &Explainer {
        &self.explainer
    }

    /// Explain the statement of a completed operation.
    ///
    /// Returns `None` when the run is skipped or fails; failures are logged
    /// under the `ormscope.explain` target. The callback is not invoked here.
    pub fn explain(&self, hook: HookPoint, ctx: &dyn OperationContext) -> Option<ExplainReport> {
        if let Some(err) = ctx.error().filter(|err| !err.is_not_found()) {
            tracing::warn!(
                target: "ormscope.explain",
                hook = %hook,
                table = ctx.table(),
                error = %err,
                "operation failed, explain skipped"
            );
            return None;
        }

        if self.enable.as_ref().is_some_and(|enable| !enable()) {
            tracing::debug!(target: "ormscope.explain", hook = %hook, "explain not enabled");
            return None;
        }

        if ctx.sql().trim().is_empty() {
            tracing::debug!(target: "ormscope.explain", hook = %hook, "no statement to explain");
            return None;
        }

        let sql = render_sql(ctx.sql(), ctx.params());
        let explain_sql = format!("{EXPLAIN_CMD} {sql}");

        let table = match self.executor.query(&explain_sql) {
            Ok(table) => table,
            Err(err) => {
                tracing::error!(
                    target: "ormscope.explain",
                    hook = %hook,
                    sql = %truncate_for_log(&explain_sql, Some(LOG_SQL_LENGTH)),
                    error = %err,
                    "explain query failed"
                );
                return None;
            }
        };

        let analysis = match self.explainer.analyze_table(&table) {
            Ok(analysis) => analysis,
            Err(err) => {
                tracing::error!(
                    target: "ormscope.explain",
                    hook = %hook,
                    sql = %truncate_for_log(&explain_sql, Some(LOG_SQL_LENGTH)),
                    error = %err,
                    "unreadable explain output"
                );
                return None;
            }
        };

        if let Some(violation) = &analysis.violation {
            let labels = LabelSet::from_context(ctx, hook);
            tracing::info!(
                target: "ormscope.explain",
                hook = labels.hook.as_str(),
                db = labels.db_name.unwrap_or_default(),
                table = labels.table_name,
                rule = violation.rule(),
                violation = %violation,
                sql = %truncate_for_log(&sql, Some(LOG_SQL_LENGTH)),
                "plan policy violation"
            );
        }

        Some(ExplainReport {
            hook,
            sql,
            rows: analysis.rows,
            violation: analysis.violation,
        })
    }

    fn run(&self, hook: HookPoint, ctx: &dyn OperationContext) {
        let Some(report) = self.explain(hook, ctx) else {
            return;
        };
        if let Some(callback) = &self.callback {
            callback(&report);
        }
    }
}

impl std::fmt::Debug for ExplainInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplainInterceptor")
            .field("rules", self.explainer.rules())
            .field("enable", &self.enable.is_some())
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl<C: OperationContext + 'static> Interceptor<C> for ExplainInterceptor {
    fn name(&self) -> &str {
        "explain"
    }

    fn wrap(&self, hook: HookPoint, next: Handler<C>) -> Handler<C> {
        let this = self.clone();
        handler(move |ctx: &mut C| {
            next(ctx);
            let snapshot = Operation::from_context(&*ctx);
            let this = this.clone();
            defer(move || this.run(hook, &snapshot));
        })
    }
}
