//! Error types for ormscope

use crate::hook::HookPoint;
use ormscope_explain::ExplainError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for ormscope operations
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Errors raised while setting up or running instrumentation
#[derive(Debug, Error)]
pub enum ScopeError {
    /// The host registry has no handler for a hook point
    #[error("No handler registered for hook '{0}'")]
    MissingHandler(HookPoint),

    /// Installing an interceptor into the host registry failed
    #[error("Failed to install interceptor on hook '{hook}': {message}")]
    Hook { hook: HookPoint, message: String },

    /// Metric family construction or registration failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// EXPLAIN output could not be read
    #[error("Explain error: {0}")]
    Explain(#[from] ExplainError),

    /// The query executor failed to run a statement
    #[error("Query error: {0}")]
    Query(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl ScopeError {
    /// Create a hook installation error
    pub fn hook(hook: HookPoint, message: impl Into<String>) -> Self {
        Self::Hook {
            hook,
            message: message.into(),
        }
    }

    /// Create a query execution error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The hook point a setup failure refers to, if any
    pub fn hook_point(&self) -> Option<HookPoint> {
        match self {
            Self::MissingHandler(hook) | Self::Hook { hook, .. } => Some(*hook),
            _ => None,
        }
    }

    /// Check if this error aborted plugin initialization
    pub fn is_setup_failure(&self) -> bool {
        self.hook_point().is_some()
    }
}

/// Terminal error of a host database operation.
///
/// The host sets this on its operation context; ormscope only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The lookup matched no record. An expected outcome, not a fault.
    #[error("record not found")]
    NotFound,

    /// The operation exceeded its deadline
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The operation was canceled by the host
    #[error("operation canceled")]
    Canceled,

    /// Any other failure reported by the database
    #[error("{0}")]
    Failed(String),
}

impl OperationError {
    /// Create a generic failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Check if this is the "record not found" sentinel
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
