//! Hook interception framework.
//!
//! A host framework exposes a fixed set of [`HookPoint`]s, each backed by one
//! [`Handler`] in a [`HookRegistry`]. An [`Interceptor`] takes the handler
//! currently installed for a hook point and returns a wrapped handler, which
//! is registered back under the same hook point.
//!
//! Interceptors are composed through an explicit [`InterceptorChain`]: each
//! interceptor wraps the handler that was current when it was applied, so
//! the first interceptor added sits closest to the original handler and the
//! last one added runs outermost.
//!
//! Work handed to [`defer`] from inside a wrapped handler runs only after
//! the outermost instrumented handler has returned, so it is never timed or
//! counted by any interceptor, regardless of install order.
//!
//! # Example
//!
//! ```rust
//! use ormscope::hook::{CallbackRegistry, HookPoint, InterceptorChain, Operation};
//! use ormscope::{ErrorMetric, ErrorQueryInterceptor, OperationError};
//! use std::sync::Arc;
//!
//! let mut registry = CallbackRegistry::<Operation>::with_all(|op| {
//!     op.set_error(OperationError::failed("deadlock"));
//! });
//!
//! let metric = Arc::new(ErrorMetric::new("orm", "", "shop").unwrap());
//! InterceptorChain::new()
//!     .add(ErrorQueryInterceptor::new(metric.clone()))
//!     .install(&mut registry)
//!     .unwrap();
//!
//! let mut op = Operation::new("shop", "orders");
//! registry.dispatch(HookPoint::Update, &mut op).unwrap();
//! assert_eq!(metric.error_count("orders", HookPoint::Update), 1);
//! ```

mod chain;
mod deferred;
mod registry;
mod types;

#[cfg(test)]
mod tests;

pub use chain::{InterceptorChain, install};
pub use deferred::defer;
pub use registry::{CallbackRegistry, Operation};
pub use types::{Handler, HookPoint, HookRegistry, Interceptor, OperationContext, handler};
