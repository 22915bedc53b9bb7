use crate::hook::{HookPoint, OperationContext};
use crate::labels::LabelSet;
use crate::interceptor::SlowQueryLog;
use crate::sql::{render_sql, truncate_for_log};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// Default byte limit for SQL in slow-query events.
pub const DEFAULT_MAX_SQL_LENGTH: usize = 1024;

/// A `tracing`-based slow-query log.
///
/// Emits one event under the `ormscope.slow` target with the hook, database,
/// table, elapsed time, terminal error and the statement with its
/// parameters inlined.
#[derive(Debug, Clone)]
pub struct TracingSlowLog {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingSlowLog {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            max_sql_length: Some(DEFAULT_MAX_SQL_LENGTH),
        }
    }
}

impl TracingSlowLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Statement as it appears in the event.
    pub fn format_sql(&self, ctx: &dyn OperationContext) -> String {
        truncate_for_log(&render_sql(ctx.sql(), ctx.params()), self.max_sql_length)
    }

    pub fn emit(&self, hook: HookPoint, cost: Duration, ctx: &dyn OperationContext) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.format_sql(ctx);
        let labels = LabelSet::from_context(ctx, hook);
        let db = labels.db_name.unwrap_or_default();
        match ctx.error() {
            Some(err) => emit_at_level!(
                self.level,
                target: "ormscope.slow",
                hook = labels.hook.as_str(),
                db,
                table = labels.table_name,
                elapsed = ?cost,
                error = %err,
                sql = %sql,
                "slow query"
            ),
            None => emit_at_level!(
                self.level,
                target: "ormscope.slow",
                hook = labels.hook.as_str(),
                db,
                table = labels.table_name,
                elapsed = ?cost,
                sql = %sql,
                "slow query"
            ),
        }
    }

    /// Convert into a [`SlowQueryLog`] callback.
    pub fn into_log(self) -> SlowQueryLog {
        Arc::new(move |hook: HookPoint, cost: Duration, ctx: &dyn OperationContext| {
            self.emit(hook, cost, ctx)
        })
    }
}

/// The log installed when a slow-query layer is configured without one.
pub fn default_slow_log() -> SlowQueryLog {
    TracingSlowLog::default().into_log()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::Operation;

    #[test]
    fn test_format_sql_inlines_and_truncates() {
        let op = Operation::new("shop", "orders")
            .with_sql("SELECT * FROM orders WHERE id = ? AND note = ?")
            .bind(42)
            .bind("it's");

        let full = TracingSlowLog::new().no_truncate();
        assert_eq!(
            full.format_sql(&op),
            "SELECT * FROM orders WHERE id = 42 AND note = 'it''s'"
        );

        let short = TracingSlowLog::new().max_sql_length(8);
        assert_eq!(short.format_sql(&op), "SELECT *...");
    }

    #[test]
    fn test_defaults() {
        let log = TracingSlowLog::default();
        assert_eq!(log.level, Level::WARN);
        assert_eq!(log.max_sql_length, Some(DEFAULT_MAX_SQL_LENGTH));
    }

    #[test]
    fn test_emit_does_not_panic_without_subscriber() {
        let op = Operation::new("shop", "orders")
            .with_sql("DELETE FROM orders")
            .with_error(crate::OperationError::failed("lock wait timeout"));
        let log = default_slow_log();
        log(HookPoint::Delete, Duration::from_millis(300), &op);
    }
}
