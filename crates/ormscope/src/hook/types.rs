use crate::error::{OperationError, ScopeError, ScopeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A named extension point of the host framework.
///
/// The set is closed: every hook point must resolve to a handler in the
/// host registry before any interceptor is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    /// INSERT of a model
    Create,
    /// UPDATE of a model
    Update,
    /// DELETE of a model
    Delete,
    /// SELECT through the model API
    Query,
    /// Raw statement execution
    Raw,
    /// Raw single-row / row-iterator access
    Row,
}

impl HookPoint {
    /// Every hook point, in installation order.
    pub const ALL: [HookPoint; 6] = [
        HookPoint::Create,
        HookPoint::Update,
        HookPoint::Delete,
        HookPoint::Query,
        HookPoint::Raw,
        HookPoint::Row,
    ];

    /// Stable name, used as the `hook_name` label value.
    pub fn as_str(self) -> &'static str {
        match self {
            HookPoint::Create => "create",
            HookPoint::Update => "update",
            HookPoint::Delete => "delete",
            HookPoint::Query => "query",
            HookPoint::Raw => "raw",
            HookPoint::Row => "row",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookPoint {
    type Err = ScopeError;

    fn from_str(s: &str) -> ScopeResult<Self> {
        HookPoint::ALL
            .into_iter()
            .find(|hook| hook.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ScopeError::config(format!("unknown hook point '{s}'")))
    }
}

/// A host callback run for one database operation.
pub type Handler<C> = Arc<dyn Fn(&mut C) + Send + Sync>;

/// Box a closure as a [`Handler`].
pub fn handler<C, F>(f: F) -> Handler<C>
where
    F: Fn(&mut C) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Read-only view of one in-flight database operation.
///
/// Implemented by the host's statement type. Interceptors only read it.
pub trait OperationContext {
    /// Name of the database the operation runs against.
    fn db_name(&self) -> &str;

    /// Table the operation targets; empty for raw statements without one.
    fn table(&self) -> &str;

    /// Statement text, possibly with placeholders.
    fn sql(&self) -> &str;

    /// Values bound to the statement's placeholders.
    fn params(&self) -> &[Value] {
        &[]
    }

    /// Terminal error of the operation, once the handler has run.
    fn error(&self) -> Option<&OperationError>;
}

/// The host's callback registry.
///
/// ormscope calls exactly `get` and `replace`, and only during plugin
/// initialization.
pub trait HookRegistry {
    type Context: OperationContext + 'static;

    /// Handler currently installed for `hook`.
    fn get(&self, hook: HookPoint) -> Option<Handler<Self::Context>>;

    /// Install `handler` for `hook`, replacing the current one.
    fn replace(&mut self, hook: HookPoint, handler: Handler<Self::Context>) -> ScopeResult<()>;
}

/// Cross-cutting behavior wrapped around a hook handler.
pub trait Interceptor<C>: Send + Sync {
    /// Name used in logs and by [`super::InterceptorChain::names`].
    fn name(&self) -> &str;

    /// Wrap `next`, the handler currently installed for `hook`.
    ///
    /// The returned handler must call `next` exactly once per invocation.
    fn wrap(&self, hook: HookPoint, next: Handler<C>) -> Handler<C>;
}
