//! Plugins: configured interceptor sets installed into a host registry.
//!
//! [`MetricPlugin`] wraps every hook point with slow-query timing and/or
//! error counting. [`ExplainPlugin`] wraps every hook point with an EXPLAIN
//! re-issue checked against a [`PolicyRules`](ormscope_explain::PolicyRules).
//!
//! # Install order
//!
//! Layers are installed in the order the builder received them. The first
//! layer wraps the host's original handler and the last one runs outermost,
//! so with `.slow_query(..).error_query(..)` the error layer observes the
//! operation after the slow layer has recorded its timing.

use crate::error::ScopeResult;
use crate::explain::{ExplainInterceptor, ExplainOptions, QueryExecutor};
use crate::hook::{HookRegistry, Interceptor, InterceptorChain, OperationContext};
use crate::interceptor::{ErrorQueryInterceptor, SlowQueryInterceptor, SlowQueryLog};
use crate::log::default_slow_log;
use crate::metrics::{DEFAULT_BUCKETS, ErrorMetric, SlowMetric, register_all};
use prometheus::Registry;
use prometheus::core::Collector;
use std::sync::Arc;
use std::time::Duration;

/// Operations at or above this duration count as slow unless configured.
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_millis(200);

/// Default metric name prefix.
pub const DEFAULT_NAME_PREFIX: &str = "orm";

/// A unit of instrumentation installed into a host registry once.
pub trait Plugin<R: HookRegistry> {
    fn name(&self) -> &str;

    /// Install into `registry`. Any error is a setup failure; the registry
    /// is left as it was before the call.
    fn initialize(&self, registry: &mut R) -> ScopeResult<()>;
}

/// Slow-query layer configuration.
#[derive(Clone)]
pub struct SlowQueryConfig {
    pub name_prefix: String,
    pub namespace: String,
    pub db_name: String,
    pub threshold: Duration,
    pub buckets: Vec<f64>,
    pub log: Option<SlowQueryLog>,
}

impl Default for SlowQueryConfig {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            namespace: String::new(),
            db_name: String::new(),
            threshold: DEFAULT_SLOW_THRESHOLD,
            buckets: DEFAULT_BUCKETS.to_vec(),
            log: Some(default_slow_log()),
        }
    }
}

impl SlowQueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = buckets;
        self
    }

    /// Replace the slow-query log callback.
    pub fn with_log(mut self, log: SlowQueryLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Count slow queries without logging them.
    pub fn without_log(mut self) -> Self {
        self.log = None;
        self
    }

    fn build(self) -> ScopeResult<SlowQueryInterceptor> {
        let metric = SlowMetric::with_buckets(
            &self.name_prefix,
            &self.namespace,
            &self.db_name,
            self.buckets,
        )?;
        let interceptor = SlowQueryInterceptor::new(self.threshold, Arc::new(metric));
        Ok(match self.log {
            Some(log) => interceptor.with_log(log),
            None => interceptor,
        })
    }
}

impl std::fmt::Debug for SlowQueryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlowQueryConfig")
            .field("name_prefix", &self.name_prefix)
            .field("namespace", &self.namespace)
            .field("db_name", &self.db_name)
            .field("threshold", &self.threshold)
            .field("buckets", &self.buckets)
            .field("log", &self.log.is_some())
            .finish()
    }
}

/// Error-counting layer configuration.
#[derive(Debug, Clone)]
pub struct ErrorQueryConfig {
    pub name_prefix: String,
    pub namespace: String,
    pub db_name: String,
}

impl Default for ErrorQueryConfig {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            namespace: String::new(),
            db_name: String::new(),
        }
    }
}

impl ErrorQueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    fn build(self) -> ScopeResult<ErrorQueryInterceptor> {
        let metric = ErrorMetric::new(&self.name_prefix, &self.namespace, &self.db_name)?;
        Ok(ErrorQueryInterceptor::new(Arc::new(metric)))
    }
}

#[derive(Debug, Clone)]
enum Layer {
    Slow(SlowQueryInterceptor),
    Error(ErrorQueryInterceptor),
}

impl Layer {
    fn into_interceptor<C: OperationContext + 'static>(self) -> Arc<dyn Interceptor<C>> {
        match self {
            Layer::Slow(i) => Arc::new(i),
            Layer::Error(i) => Arc::new(i),
        }
    }

    fn collectors(&self) -> Vec<Box<dyn Collector>> {
        match self {
            Layer::Slow(i) => i.metric().collectors(),
            Layer::Error(i) => i.metric().collectors(),
        }
    }
}

/// Builder for [`MetricPlugin`].
#[derive(Debug, Default)]
pub struct MetricPluginBuilder {
    layers: Vec<LayerConfig>,
}

#[derive(Debug)]
enum LayerConfig {
    Slow(SlowQueryConfig),
    Error(ErrorQueryConfig),
}

impl MetricPluginBuilder {
    /// Add a slow-query layer.
    pub fn slow_query(mut self, config: SlowQueryConfig) -> Self {
        self.layers.push(LayerConfig::Slow(config));
        self
    }

    /// Add an error-counting layer.
    pub fn error_query(mut self, config: ErrorQueryConfig) -> Self {
        self.layers.push(LayerConfig::Error(config));
        self
    }

    /// Create the metric families. Fails if a name or label is invalid.
    pub fn build(self) -> ScopeResult<MetricPlugin> {
        let layers = self
            .layers
            .into_iter()
            .map(|config| match config {
                LayerConfig::Slow(c) => c.build().map(Layer::Slow),
                LayerConfig::Error(c) => c.build().map(Layer::Error),
            })
            .collect::<ScopeResult<Vec<_>>>()?;
        Ok(MetricPlugin { layers })
    }
}

/// Slow-query and error metrics for every hook point.
#[derive(Debug, Clone)]
pub struct MetricPlugin {
    layers: Vec<Layer>,
}

impl MetricPlugin {
    pub const NAME: &'static str = "ormscope:metric";

    pub fn builder() -> MetricPluginBuilder {
        MetricPluginBuilder::default()
    }

    /// Every collector of every layer, for a host registry.
    pub fn collectors(&self) -> Vec<Box<dyn Collector>> {
        self.layers.iter().flat_map(Layer::collectors).collect()
    }

    /// Register every collector with `registry`.
    pub fn register(&self, registry: &Registry) -> ScopeResult<()> {
        register_all(registry, self.collectors())
    }

    /// The first slow-query layer's metric families.
    pub fn slow_metric(&self) -> Option<&Arc<SlowMetric>> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Slow(i) => Some(i.metric()),
            Layer::Error(_) => None,
        })
    }

    /// The first error layer's metric family.
    pub fn error_metric(&self) -> Option<&Arc<ErrorMetric>> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Error(i) => Some(i.metric()),
            Layer::Slow(_) => None,
        })
    }

    /// Interceptor names in install order, innermost first.
    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.layers
            .iter()
            .map(|layer| match layer {
                Layer::Slow(_) => "slow_query",
                Layer::Error(_) => "error_query",
            })
            .collect()
    }

    /// The chain installed by [`Plugin::initialize`].
    pub fn chain<C: OperationContext + 'static>(&self) -> InterceptorChain<C> {
        self.layers
            .iter()
            .cloned()
            .fold(InterceptorChain::new(), |chain, layer| {
                chain.add_arc(layer.into_interceptor())
            })
    }
}

impl<R: HookRegistry> Plugin<R> for MetricPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn initialize(&self, registry: &mut R) -> ScopeResult<()> {
        self.chain::<R::Context>().install(registry)
    }
}

/// Execution-plan policy checks for every hook point.
///
/// May be initialized before or after a [`MetricPlugin`] on the same
/// registry: the EXPLAIN round trip is deferred past every metric layer and
/// is never part of the measured query time.
#[derive(Debug, Clone)]
pub struct ExplainPlugin {
    interceptor: ExplainInterceptor,
}

impl ExplainPlugin {
    pub const NAME: &'static str = "ormscope:explain";

    pub fn new(options: ExplainOptions, executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            interceptor: ExplainInterceptor::new(options, executor),
        }
    }

    pub fn interceptor(&self) -> &ExplainInterceptor {
        &self.interceptor
    }
}

impl<R: HookRegistry> Plugin<R> for ExplainPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn initialize(&self, registry: &mut R) -> ScopeResult<()> {
        InterceptorChain::new()
            .add(self.interceptor.clone())
            .install(registry)
    }
}
