//! Label keys shared by every metric family.

use crate::hook::{HookPoint, OperationContext};

/// Const label carrying the configured database name.
pub const LABEL_DB_NAME: &str = "db_name";
/// Per-sample label carrying the operation's table.
pub const LABEL_TABLE_NAME: &str = "table_name";
/// Per-sample label carrying the hook point name.
pub const LABEL_HOOK_NAME: &str = "hook_name";

/// Variable labels of the counter families, in declaration order.
pub const COUNTER_LABELS: [&str; 2] = [LABEL_TABLE_NAME, LABEL_HOOK_NAME];
/// Variable labels of the latency histogram family.
pub const HISTOGRAM_LABELS: [&str; 1] = [LABEL_TABLE_NAME];

/// Dimensions of one metric sample.
///
/// `db_name` is folded into a const label when the metric families are
/// built, so it is optional here and never part of the per-sample values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelSet<'a> {
    pub db_name: Option<&'a str>,
    pub table_name: &'a str,
    pub hook: HookPoint,
}

impl<'a> LabelSet<'a> {
    pub fn new(table_name: &'a str, hook: HookPoint) -> Self {
        Self {
            db_name: None,
            table_name,
            hook,
        }
    }

    /// Labels for an in-flight operation at `hook`.
    pub fn from_context<C: OperationContext + ?Sized>(ctx: &'a C, hook: HookPoint) -> Self {
        Self {
            db_name: Some(ctx.db_name()),
            table_name: ctx.table(),
            hook,
        }
    }

    /// Values for [`COUNTER_LABELS`].
    pub fn counter_values(&self) -> [&'a str; 2] {
        [self.table_name, self.hook.as_str()]
    }

    /// Values for [`HISTOGRAM_LABELS`].
    pub fn histogram_values(&self) -> [&'a str; 1] {
        [self.table_name]
    }
}
