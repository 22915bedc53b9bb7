//! Timing and error-counting interceptors.

use crate::hook::{Handler, HookPoint, Interceptor, OperationContext, handler};
use crate::metrics::{ErrorMetric, SlowMetric};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Called for every operation that reaches the slow-query threshold.
pub type SlowQueryLog = Arc<dyn Fn(HookPoint, Duration, &dyn OperationContext) + Send + Sync>;

/// Times each call, feeds the latency histogram and counts slow calls.
///
/// Every call is observed in the histogram. Calls taking at least
/// `threshold` also bump the slow-query counter and reach the log callback.
#[derive(Clone)]
pub struct SlowQueryInterceptor {
    threshold: Duration,
    metric: Arc<SlowMetric>,
    log: Option<SlowQueryLog>,
}

impl SlowQueryInterceptor {
    pub fn new(threshold: Duration, metric: Arc<SlowMetric>) -> Self {
        Self {
            threshold,
            metric,
            log: None,
        }
    }

    /// Set the callback run for slow calls.
    pub fn with_log(mut self, log: SlowQueryLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn metric(&self) -> &Arc<SlowMetric> {
        &self.metric
    }

    fn observe(&self, hook: HookPoint, cost: Duration, ctx: &dyn OperationContext) {
        self.metric.time_query(ctx.table(), cost);
        if cost < self.threshold {
            return;
        }
        self.metric.inc_slow_query(ctx.table(), hook);
        if let Some(log) = &self.log {
            log(hook, cost, ctx);
        }
    }
}

impl std::fmt::Debug for SlowQueryInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlowQueryInterceptor")
            .field("threshold", &self.threshold)
            .field("log", &self.log.is_some())
            .finish()
    }
}

impl<C: OperationContext + 'static> Interceptor<C> for SlowQueryInterceptor {
    fn name(&self) -> &str {
        "slow_query"
    }

    fn wrap(&self, hook: HookPoint, next: Handler<C>) -> Handler<C> {
        let this = self.clone();
        handler(move |ctx: &mut C| {
            let start = Instant::now();
            next(ctx);
            this.observe(hook, start.elapsed(), &*ctx);
        })
    }
}

/// Counts failed operations, ignoring "record not found".
#[derive(Debug, Clone)]
pub struct ErrorQueryInterceptor {
    metric: Arc<ErrorMetric>,
}

impl ErrorQueryInterceptor {
    pub fn new(metric: Arc<ErrorMetric>) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> &Arc<ErrorMetric> {
        &self.metric
    }

    fn observe(&self, hook: HookPoint, ctx: &dyn OperationContext) {
        match ctx.error() {
            Some(err) if !err.is_not_found() => self.metric.inc_error_query(ctx.table(), hook),
            _ => {}
        }
    }
}

impl<C: OperationContext + 'static> Interceptor<C> for ErrorQueryInterceptor {
    fn name(&self) -> &str {
        "error_query"
    }

    fn wrap(&self, hook: HookPoint, next: Handler<C>) -> Handler<C> {
        let this = self.clone();
        handler(move |ctx: &mut C| {
            next(ctx);
            this.observe(hook, &*ctx);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OperationError;
    use crate::hook::{CallbackRegistry, InterceptorChain, Operation};
    use std::sync::Mutex;
    use std::thread;

    fn sleeping_registry(delay: Duration) -> CallbackRegistry<Operation> {
        CallbackRegistry::with_all(move |_op: &mut Operation| thread::sleep(delay))
    }

    #[test]
    fn test_fast_call_only_observed() {
        let metric = Arc::new(SlowMetric::new("t", "", "shop").unwrap());
        let mut registry = sleeping_registry(Duration::ZERO);
        InterceptorChain::new()
            .add(SlowQueryInterceptor::new(Duration::from_secs(5), metric.clone()))
            .install(&mut registry)
            .unwrap();

        registry
            .dispatch(HookPoint::Create, &mut Operation::new("shop", "users"))
            .unwrap();
        assert_eq!(metric.slow_query_count("users", HookPoint::Create), 0);
        assert_eq!(metric.query_time_count("users"), 1);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let metric = Arc::new(SlowMetric::new("t", "", "shop").unwrap());
        let interceptor = SlowQueryInterceptor::new(Duration::from_millis(10), metric.clone());
        let op = Operation::new("shop", "users");

        interceptor.observe(HookPoint::Query, Duration::from_millis(10), &op);
        interceptor.observe(HookPoint::Query, Duration::from_millis(9), &op);

        assert_eq!(metric.slow_query_count("users", HookPoint::Query), 1);
        assert_eq!(metric.query_time_count("users"), 2);
        assert!((metric.query_time_sum("users") - 0.019).abs() < 1e-9);
    }

    #[test]
    fn test_log_only_for_slow_calls() {
        let metric = Arc::new(SlowMetric::new("t", "", "shop").unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let interceptor = SlowQueryInterceptor::new(Duration::from_millis(100), metric)
            .with_log(Arc::new(
                move |hook: HookPoint, cost: Duration, ctx: &dyn OperationContext| {
                    sink.lock()
                        .unwrap()
                        .push((hook, cost, ctx.table().to_string()));
                },
            ));
        let op = Operation::new("shop", "orders");

        interceptor.observe(HookPoint::Raw, Duration::from_millis(50), &op);
        interceptor.observe(HookPoint::Raw, Duration::from_millis(150), &op);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            (HookPoint::Raw, Duration::from_millis(150), "orders".to_string())
        );
    }

    #[test]
    fn test_error_counting_skips_not_found() {
        let metric = Arc::new(ErrorMetric::new("t", "", "shop").unwrap());
        let interceptor = ErrorQueryInterceptor::new(metric.clone());

        let ok = Operation::new("shop", "orders");
        let missing = Operation::new("shop", "orders").with_error(OperationError::NotFound);
        let failed = Operation::new("shop", "orders").with_error(OperationError::failed("boom"));
        let timeout = Operation::new("shop", "orders")
            .with_error(OperationError::Timeout(Duration::from_secs(1)));

        interceptor.observe(HookPoint::Query, &ok);
        interceptor.observe(HookPoint::Query, &missing);
        interceptor.observe(HookPoint::Query, &failed);
        interceptor.observe(HookPoint::Query, &timeout);

        assert_eq!(metric.error_count("orders", HookPoint::Query), 2);
    }

    #[test]
    fn test_error_set_by_handler_is_seen() {
        let metric = Arc::new(ErrorMetric::new("t", "", "shop").unwrap());
        let mut registry = CallbackRegistry::with_all(|op: &mut Operation| {
            op.set_error(OperationError::Canceled);
        });
        InterceptorChain::new()
            .add(ErrorQueryInterceptor::new(metric.clone()))
            .install(&mut registry)
            .unwrap();

        registry
            .dispatch(HookPoint::Delete, &mut Operation::new("shop", "carts"))
            .unwrap();
        assert_eq!(metric.error_count("carts", HookPoint::Delete), 1);
        assert_eq!(metric.error_count("carts", HookPoint::Update), 0);
    }
}
