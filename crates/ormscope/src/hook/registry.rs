use super::types::{Handler, HookPoint, HookRegistry, OperationContext};
use crate::error::{OperationError, ScopeError, ScopeResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// In-process hook registry.
///
/// Holds one handler per hook point and dispatches operations to it. Hosts
/// with their own callback table implement [`HookRegistry`] directly; this
/// type backs the crate's tests and examples and suits hosts that route
/// statements through a closure table.
pub struct CallbackRegistry<C> {
    handlers: HashMap<HookPoint, Handler<C>>,
}

impl<C: OperationContext + 'static> CallbackRegistry<C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Create a registry with the same handler on every hook point.
    pub fn with_all<F>(f: F) -> Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        let shared: Handler<C> = Arc::new(f);
        let mut registry = Self::new();
        for hook in HookPoint::ALL {
            registry.handlers.insert(hook, Arc::clone(&shared));
        }
        registry
    }

    /// Register (or overwrite) the handler for `hook`.
    pub fn register<F>(&mut self, hook: HookPoint, f: F) -> &mut Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.handlers.insert(hook, Arc::new(f));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_handler<F>(mut self, hook: HookPoint, f: F) -> Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.register(hook, f);
        self
    }

    pub fn contains(&self, hook: HookPoint) -> bool {
        self.handlers.contains_key(&hook)
    }

    /// Run the handler installed for `hook` against `ctx`.
    pub fn dispatch(&self, hook: HookPoint, ctx: &mut C) -> ScopeResult<()> {
        let handler = self
            .handlers
            .get(&hook)
            .ok_or(ScopeError::MissingHandler(hook))?;
        handler(ctx);
        Ok(())
    }
}

impl<C: OperationContext + 'static> Default for CallbackRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: OperationContext + 'static> HookRegistry for CallbackRegistry<C> {
    type Context = C;

    fn get(&self, hook: HookPoint) -> Option<Handler<C>> {
        self.handlers.get(&hook).cloned()
    }

    fn replace(&mut self, hook: HookPoint, handler: Handler<C>) -> ScopeResult<()> {
        match self.handlers.get_mut(&hook) {
            Some(slot) => {
                *slot = handler;
                Ok(())
            }
            None => Err(ScopeError::hook(hook, "hook is not registered")),
        }
    }
}

/// One database operation, owned by the host.
#[derive(Debug, Clone, Default)]
pub struct Operation {
    db_name: String,
    table: String,
    sql: String,
    params: Vec<Value>,
    error: Option<OperationError>,
}

impl Operation {
    pub fn new(db_name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            table: table.into(),
            ..Self::default()
        }
    }

    /// Owned copy of any operation context.
    pub fn from_context(ctx: &dyn OperationContext) -> Self {
        Self {
            db_name: ctx.db_name().to_string(),
            table: ctx.table().to_string(),
            sql: ctx.sql().to_string(),
            params: ctx.params().to_vec(),
            error: ctx.error().cloned(),
        }
    }

    /// Set the statement text.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    /// Append a bound parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn with_error(mut self, error: OperationError) -> Self {
        self.error = Some(error);
        self
    }

    /// Replace the statement text; handlers call this once they build SQL.
    pub fn set_sql(&mut self, sql: impl Into<String>) {
        self.sql = sql.into();
    }

    /// Record the terminal error.
    pub fn set_error(&mut self, error: OperationError) {
        self.error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

impl OperationContext for Operation {
    fn db_name(&self) -> &str {
        &self.db_name
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn sql(&self) -> &str {
        &self.sql
    }

    fn params(&self) -> &[Value] {
        &self.params
    }

    fn error(&self) -> Option<&OperationError> {
        self.error.as_ref()
    }
}
