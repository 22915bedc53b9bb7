//! Slow-query and error metric families.
//!
//! Families are created once per plugin configuration and shared by every
//! interceptor closure through an `Arc`. All mutation goes through the
//! `prometheus` vectors, which are safe for concurrent use without any
//! caller-side locking.

use crate::error::ScopeResult;
use crate::hook::HookPoint;
use crate::labels::{COUNTER_LABELS, HISTOGRAM_LABELS, LABEL_DB_NAME, LabelSet};
use prometheus::core::Collector;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::time::Duration;

/// Default latency buckets, in seconds.
pub const DEFAULT_BUCKETS: [f64; 8] = [0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Slow-query counter plus query latency histogram.
#[derive(Debug, Clone)]
pub struct SlowMetric {
    counter: IntCounterVec,
    histogram: HistogramVec,
}

impl SlowMetric {
    /// Create `{prefix}_slow_query_count` and `{prefix}_query_time` with
    /// [`DEFAULT_BUCKETS`].
    pub fn new(name_prefix: &str, namespace: &str, db_name: &str) -> ScopeResult<Self> {
        Self::with_buckets(name_prefix, namespace, db_name, DEFAULT_BUCKETS.to_vec())
    }

    /// Like [`SlowMetric::new`], with custom latency buckets.
    pub fn with_buckets(
        name_prefix: &str,
        namespace: &str,
        db_name: &str,
        buckets: Vec<f64>,
    ) -> ScopeResult<Self> {
        let counter = IntCounterVec::new(
            Opts::new(
                format!("{name_prefix}_slow_query_count"),
                "ormscope: slow query counter",
            )
            .namespace(namespace)
            .const_label(LABEL_DB_NAME, db_name),
            &COUNTER_LABELS,
        )?;
        let histogram = HistogramVec::new(
            HistogramOpts::new(
                format!("{name_prefix}_query_time"),
                "ormscope: query time histogram (unit: second)",
            )
            .namespace(namespace)
            .const_label(LABEL_DB_NAME, db_name)
            .buckets(buckets),
            &HISTOGRAM_LABELS,
        )?;
        Ok(Self { counter, histogram })
    }

    /// Increase the slow query counter for (table, hook) by 1.
    pub fn inc_slow_query(&self, table: &str, hook: HookPoint) {
        let labels = LabelSet::new(table, hook);
        self.counter
            .with_label_values(&labels.counter_values())
            .inc();
    }

    /// Record one query duration for `table`.
    pub fn time_query(&self, table: &str, cost: Duration) {
        self.histogram
            .with_label_values(&[table])
            .observe(cost.as_secs_f64());
    }

    /// Current slow query count for (table, hook).
    pub fn slow_query_count(&self, table: &str, hook: HookPoint) -> u64 {
        let labels = LabelSet::new(table, hook);
        self.counter
            .with_label_values(&labels.counter_values())
            .get()
    }

    /// Number of durations observed for `table`.
    pub fn query_time_count(&self, table: &str) -> u64 {
        self.histogram.with_label_values(&[table]).get_sample_count()
    }

    /// Sum of durations observed for `table`, in seconds.
    pub fn query_time_sum(&self, table: &str) -> f64 {
        self.histogram.with_label_values(&[table]).get_sample_sum()
    }

    pub fn counter(&self) -> &IntCounterVec {
        &self.counter
    }

    pub fn histogram(&self) -> &HistogramVec {
        &self.histogram
    }

    /// Collectors for a host registry.
    pub fn collectors(&self) -> Vec<Box<dyn Collector>> {
        vec![
            Box::new(self.counter.clone()),
            Box::new(self.histogram.clone()),
        ]
    }
}

/// Error counter.
#[derive(Debug, Clone)]
pub struct ErrorMetric {
    counter: IntCounterVec,
}

impl ErrorMetric {
    /// Create `{prefix}_error_count`.
    pub fn new(name_prefix: &str, namespace: &str, db_name: &str) -> ScopeResult<Self> {
        let counter = IntCounterVec::new(
            Opts::new(format!("{name_prefix}_error_count"), "ormscope: error counter")
                .namespace(namespace)
                .const_label(LABEL_DB_NAME, db_name),
            &COUNTER_LABELS,
        )?;
        Ok(Self { counter })
    }

    /// Increase the error counter for (table, hook) by 1.
    pub fn inc_error_query(&self, table: &str, hook: HookPoint) {
        let labels = LabelSet::new(table, hook);
        self.counter
            .with_label_values(&labels.counter_values())
            .inc();
    }

    /// Current error count for (table, hook).
    pub fn error_count(&self, table: &str, hook: HookPoint) -> u64 {
        let labels = LabelSet::new(table, hook);
        self.counter
            .with_label_values(&labels.counter_values())
            .get()
    }

    pub fn counter(&self) -> &IntCounterVec {
        &self.counter
    }

    /// Collectors for a host registry.
    pub fn collectors(&self) -> Vec<Box<dyn Collector>> {
        vec![Box::new(self.counter.clone())]
    }
}

/// Register every collector in `collectors` with `registry`.
pub fn register_all(registry: &Registry, collectors: Vec<Box<dyn Collector>>) -> ScopeResult<()> {
    for collector in collectors {
        registry.register(collector)?;
    }
    Ok(())
}
