//! File configuration (TOML).
//!
//! ```toml
//! [metrics]
//! name_prefix = "orm"
//! db_name = "shop"
//!
//! [metrics.slow_query]
//! threshold_ms = 200
//!
//! [metrics.error_query]
//!
//! [explain]
//! enabled = true
//!
//! [explain.policy]
//! extra_black_list = ["using filesort", "using temporary"]
//! select_type_white_list = ["SIMPLE", "PRIMARY"]
//! min_access_type = "range"
//! ```
//!
//! Each section converts into the builder types of [`crate::plugin`]; the
//! slow-query layer is installed before the error layer.

use crate::error::{ScopeError, ScopeResult};
use crate::explain::{ExplainOptions, QueryExecutor};
use crate::log::{DEFAULT_MAX_SQL_LENGTH, TracingSlowLog};
use crate::metrics::DEFAULT_BUCKETS;
use crate::plugin::{
    DEFAULT_NAME_PREFIX, DEFAULT_SLOW_THRESHOLD, ErrorQueryConfig, ExplainPlugin, MetricPlugin,
    SlowQueryConfig,
};
use ormscope_explain::{AccessFloor, Extra, PolicyRules, SelectType};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub explain: ExplainConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub db_name: String,
    pub slow_query: Option<SlowQuerySection>,
    pub error_query: Option<ErrorQuerySection>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
            namespace: String::new(),
            db_name: String::new(),
            slow_query: None,
            error_query: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlowQuerySection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_threshold_ms")]
    pub threshold_ms: u64,
    #[serde(default = "default_buckets")]
    pub buckets: Vec<f64>,
    /// Emit a `tracing` event for each slow query.
    #[serde(default = "default_true")]
    pub log: bool,
    /// Truncate logged SQL (bytes). `0` disables truncation.
    #[serde(default = "default_max_sql_length")]
    pub max_sql_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorQuerySection {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExplainConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default)]
    pub extra_white_list: Vec<Extra>,
    #[serde(default)]
    pub extra_black_list: Vec<Extra>,
    #[serde(default)]
    pub select_type_white_list: Vec<SelectType>,
    #[serde(default)]
    pub select_type_black_list: Vec<SelectType>,
    /// Access-type floor; empty or `"none"` means no floor.
    #[serde(default)]
    pub min_access_type: String,
    /// Compare observed access types against the floor instead of only
    /// checking that they are recognized.
    #[serde(default)]
    pub enforce_access_floor: bool,
}

fn default_true() -> bool {
    true
}

fn default_name_prefix() -> String {
    DEFAULT_NAME_PREFIX.to_string()
}

fn default_threshold_ms() -> u64 {
    DEFAULT_SLOW_THRESHOLD.as_millis() as u64
}

fn default_buckets() -> Vec<f64> {
    DEFAULT_BUCKETS.to_vec()
}

fn default_max_sql_length() -> usize {
    DEFAULT_MAX_SQL_LENGTH
}

impl ScopeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> ScopeResult<Self> {
        let config: ScopeConfig = toml::from_str(raw)
            .map_err(|e| ScopeError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ScopeResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScopeError::config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw).map_err(|e| match e {
            ScopeError::Config(msg) => ScopeError::config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn validate(&self) -> ScopeResult<()> {
        if self.metrics.name_prefix.trim().is_empty() {
            return Err(ScopeError::config("metrics.name_prefix must not be empty"));
        }
        if let Some(slow) = &self.metrics.slow_query {
            if slow.buckets.is_empty() {
                return Err(ScopeError::config(
                    "metrics.slow_query.buckets must not be empty",
                ));
            }
            if slow.buckets.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ScopeError::config(
                    "metrics.slow_query.buckets must be strictly increasing",
                ));
            }
        }
        AccessFloor::from_token(&self.explain.policy.min_access_type)
            .map_err(|e| ScopeError::config(format!("explain.policy.min_access_type: {e}")))?;
        Ok(())
    }

    /// Build the metric plugin from `[metrics]`.
    pub fn metric_plugin(&self) -> ScopeResult<MetricPlugin> {
        let metrics = &self.metrics;
        let mut builder = MetricPlugin::builder();

        if let Some(slow) = metrics.slow_query.as_ref().filter(|s| s.enabled) {
            let mut config = SlowQueryConfig::new()
                .with_name_prefix(&metrics.name_prefix)
                .with_namespace(&metrics.namespace)
                .with_db_name(&metrics.db_name)
                .with_threshold(Duration::from_millis(slow.threshold_ms))
                .with_buckets(slow.buckets.clone());
            config = if !slow.log {
                config.without_log()
            } else if slow.max_sql_length == 0 {
                config.with_log(TracingSlowLog::new().no_truncate().into_log())
            } else {
                config.with_log(
                    TracingSlowLog::new()
                        .max_sql_length(slow.max_sql_length)
                        .into_log(),
                )
            };
            builder = builder.slow_query(config);
        }

        if metrics.error_query.as_ref().is_some_and(|e| e.enabled) {
            builder = builder.error_query(
                ErrorQueryConfig::new()
                    .with_name_prefix(&metrics.name_prefix)
                    .with_namespace(&metrics.namespace)
                    .with_db_name(&metrics.db_name),
            );
        }

        builder.build()
    }

    /// Policy rules from `[explain.policy]`.
    pub fn policy_rules(&self) -> ScopeResult<PolicyRules> {
        let policy = &self.explain.policy;
        let floor = AccessFloor::from_token(&policy.min_access_type)?;
        let rules = PolicyRules::new()
            .with_extra_white_list(policy.extra_white_list.iter().cloned())
            .with_extra_black_list(policy.extra_black_list.iter().cloned())
            .with_select_type_white_list(policy.select_type_white_list.iter().cloned())
            .with_select_type_black_list(policy.select_type_black_list.iter().cloned())
            .with_access_floor(floor);
        Ok(if policy.enforce_access_floor {
            rules.enforce_access_floor()
        } else {
            rules
        })
    }

    /// Explain options carrying the configured rules; callers add the
    /// callback and enable predicate.
    pub fn explain_options(&self) -> ScopeResult<ExplainOptions> {
        Ok(ExplainOptions::new().with_rules(self.policy_rules()?))
    }

    /// Build the explain plugin, or `None` when `[explain]` is disabled.
    pub fn explain_plugin(
        &self,
        options: ExplainOptions,
        executor: Arc<dyn QueryExecutor>,
    ) -> ScopeResult<Option<ExplainPlugin>> {
        if !self.explain.enabled {
            return Ok(None);
        }
        let options = options.with_rules(self.policy_rules()?);
        Ok(Some(ExplainPlugin::new(options, executor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormscope_explain::{AccessType, FloorMode, Rule};

    const FULL: &str = r#"
        [metrics]
        name_prefix = "app"
        namespace = "db"
        db_name = "shop"

        [metrics.slow_query]
        threshold_ms = 50
        max_sql_length = 0

        [metrics.error_query]

        [explain]
        enabled = true

        [explain.policy]
        extra_black_list = ["Using filesort", "using temporary"]
        select_type_white_list = ["SIMPLE"]
        min_access_type = "range"
        enforce_access_floor = true
    "#;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = ScopeConfig::from_toml_str("").unwrap();
        assert_eq!(config.metrics.name_prefix, "orm");
        assert!(config.metrics.slow_query.is_none());
        assert!(!config.explain.enabled);
        assert!(config.policy_rules().unwrap().is_unrestricted());
        assert!(config.metric_plugin().unwrap().interceptor_names().is_empty());
    }

    #[test]
    fn test_full_document() {
        let config = ScopeConfig::from_toml_str(FULL).unwrap();
        let slow = config.metrics.slow_query.as_ref().unwrap();
        assert_eq!(slow.threshold_ms, 50);
        assert_eq!(slow.buckets, DEFAULT_BUCKETS);

        let plugin = config.metric_plugin().unwrap();
        assert_eq!(plugin.interceptor_names(), ["slow_query", "error_query"]);

        let rules = config.policy_rules().unwrap();
        assert_eq!(
            rules.extra_black_list,
            Rule::Restricted(vec![Extra::FileSort, Extra::Temporary])
        );
        assert_eq!(
            rules.select_type_white_list,
            Rule::Restricted(vec![SelectType::Simple])
        );
        assert_eq!(rules.min_access_type, AccessFloor::AtLeast(AccessType::Range));
        assert_eq!(rules.floor_mode, FloorMode::Enforce);
    }

    #[test]
    fn test_slow_threshold_default() {
        let config = ScopeConfig::from_toml_str("[metrics.slow_query]\n").unwrap();
        let slow = config.metrics.slow_query.unwrap();
        assert_eq!(slow.threshold_ms, 200);
        assert!(slow.enabled);
        assert!(slow.log);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = ScopeConfig::from_toml_str("[metrics]\nname_prefix = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("name_prefix"));

        let err =
            ScopeConfig::from_toml_str("[metrics.slow_query]\nbuckets = [1.0, 0.5]\n").unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));

        let err =
            ScopeConfig::from_toml_str("[explain.policy]\nmin_access_type = \"fast\"\n").unwrap_err();
        assert!(err.to_string().contains("min_access_type"));

        let err = ScopeConfig::from_toml_str("[metrics]\nprefix = \"x\"\n").unwrap_err();
        assert!(matches!(err, ScopeError::Config(_)));
    }

    #[test]
    fn test_explain_plugin_disabled() {
        let config = ScopeConfig::from_toml_str("").unwrap();
        let executor = |_sql: &str| -> ScopeResult<ormscope_explain::PlanTable> {
            Ok(ormscope_explain::PlanTable::with_plan_columns())
        };
        let plugin = config
            .explain_plugin(ExplainOptions::new(), Arc::new(executor))
            .unwrap();
        assert!(plugin.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ScopeConfig::load("/definitely/not/here/ormscope.toml").unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
