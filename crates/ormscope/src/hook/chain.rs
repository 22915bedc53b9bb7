use super::deferred::scoped;
use super::types::{Handler, HookPoint, HookRegistry, Interceptor};
use crate::error::{ScopeError, ScopeResult};
use std::sync::Arc;

/// An ordered list of interceptors applied to every hook point.
///
/// The first interceptor added wraps the original handler; each later one
/// wraps the result of the previous, so it runs outermost.
pub struct InterceptorChain<C> {
    interceptors: Vec<Arc<dyn Interceptor<C>>>,
}

impl<C: 'static> InterceptorChain<C> {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// Add an interceptor.
    #[allow(clippy::should_implement_trait)]
    pub fn add<I: Interceptor<C> + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Add an Arc-wrapped interceptor.
    pub fn add_arc(mut self, interceptor: Arc<dyn Interceptor<C>>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Append an interceptor in place; it will run outside every one
    /// already in the chain.
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor<C>>) {
        self.interceptors.push(interceptor);
    }

    /// Interceptor names, innermost first.
    pub fn names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Apply every interceptor to `handler`, in order.
    pub fn wrap(&self, hook: HookPoint, handler: Handler<C>) -> Handler<C> {
        self.interceptors
            .iter()
            .fold(handler, |next, interceptor| interceptor.wrap(hook, next))
    }

    /// Wrap the handler of every hook point in `registry`.
    ///
    /// All hook points are resolved before anything is replaced; a missing
    /// handler fails with [`ScopeError::MissingHandler`] and leaves the
    /// registry untouched. If a replacement fails part-way, hook points
    /// already wrapped are restored to their original handlers and the
    /// failing hook point is reported.
    pub fn install<R>(&self, registry: &mut R) -> ScopeResult<()>
    where
        R: HookRegistry<Context = C>,
    {
        let mut originals = Vec::with_capacity(HookPoint::ALL.len());
        for hook in HookPoint::ALL {
            let current = registry.get(hook).ok_or(ScopeError::MissingHandler(hook))?;
            originals.push((hook, current));
        }

        if self.is_empty() {
            return Ok(());
        }

        for (done, (hook, original)) in originals.iter().enumerate() {
            let wrapped = scoped(self.wrap(*hook, Arc::clone(original)));
            if let Err(err) = registry.replace(*hook, wrapped) {
                restore(registry, &originals[..done]);
                return Err(setup_failure(*hook, err));
            }
            tracing::debug!(
                target: "ormscope.hook",
                hook = %hook,
                interceptors = ?self.names(),
                "installed interceptors"
            );
        }
        Ok(())
    }
}

impl<C: 'static> Default for InterceptorChain<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap the handler installed for a single hook point.
pub fn install<R: HookRegistry>(
    registry: &mut R,
    hook: HookPoint,
    interceptor: &dyn Interceptor<R::Context>,
) -> ScopeResult<()> {
    let current = registry.get(hook).ok_or(ScopeError::MissingHandler(hook))?;
    registry
        .replace(hook, scoped(interceptor.wrap(hook, current)))
        .map_err(|err| setup_failure(hook, err))
}

fn restore<R: HookRegistry>(registry: &mut R, originals: &[(HookPoint, Handler<R::Context>)]) {
    for (hook, original) in originals {
        if let Err(err) = registry.replace(*hook, Arc::clone(original)) {
            tracing::warn!(
                target: "ormscope.hook",
                hook = %hook,
                error = %err,
                "failed to restore original handler"
            );
        }
    }
}

fn setup_failure(hook: HookPoint, err: ScopeError) -> ScopeError {
    match err {
        err @ (ScopeError::Hook { .. } | ScopeError::MissingHandler(_)) => err,
        other => ScopeError::hook(hook, other.to_string()),
    }
}
