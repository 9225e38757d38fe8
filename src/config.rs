//! Analyzer configuration.
//!
//! Options are an immutable value handed to each run. They can be written in
//! JSON or YAML and layered with configuration sources such as the process
//! environment, where every key is upper-cased behind the
//! `FERROUS_DI_ANALYZER_` prefix.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagnostics::{RuleId, Severity};
use crate::error::{AnalysisError, AnalysisResult};
use crate::internal::MAX_DEPTH;

/// Environment variable prefix for [`AnalyzerOptions::from_env`].
pub const ENV_PREFIX: &str = "FERROUS_DI_ANALYZER";

/// What to do when a procedure trace is internally inconsistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceErrorPolicy {
    /// Skip the procedure, log it and record it in the report
    #[default]
    Skip,
    /// Fail the whole run; intended for front-end test builds
    Fail,
}

/// Options for one analysis run.
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::{AnalyzerOptions, RuleId, Severity, TraceErrorPolicy};
///
/// let options = AnalyzerOptions::from_yaml_str(
///     "max_resolution_depth: 64\n\
///      trace_errors: fail\n\
///      severity_overrides:\n  captive_dependency: error\n\
///      disabled_rules: [try_add_ignored]\n",
/// )
/// .unwrap();
///
/// assert!(options.assume_framework_services_registered);
/// assert_eq!(options.max_resolution_depth, 64);
/// assert_eq!(options.trace_errors, TraceErrorPolicy::Fail);
/// assert_eq!(options.severity_for(RuleId::CaptiveDependency), Severity::Error);
/// assert!(!options.is_enabled(RuleId::TryAddIgnored));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    /// Treat host-provided services (loggers, options, configuration) as registered
    pub assume_framework_services_registered: bool,
    /// Extra host-provided service names, matched by simple name
    pub framework_services: Vec<String>,
    /// Longest dependency chain followed by the resolvability check
    pub max_resolution_depth: usize,
    pub trace_errors: TraceErrorPolicy,
    pub severity_overrides: BTreeMap<RuleId, Severity>,
    pub disabled_rules: BTreeSet<RuleId>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            assume_framework_services_registered: true,
            framework_services: Vec::new(),
            max_resolution_depth: MAX_DEPTH,
            trace_errors: TraceErrorPolicy::Skip,
            severity_overrides: BTreeMap::new(),
            disabled_rules: BTreeSet::new(),
        }
    }
}

impl AnalyzerOptions {
    pub fn from_json_str(text: &str) -> AnalysisResult<Self> {
        serde_json::from_str::<Self>(text)
            .map_err(|e| AnalysisError::Config(e.to_string()))?
            .validated()
    }

    pub fn from_yaml_str(text: &str) -> AnalysisResult<Self> {
        serde_yaml::from_str::<Self>(text)
            .map_err(|e| AnalysisError::Config(e.to_string()))?
            .validated()
    }

    /// Loads options from a `.json`, `.yaml` or `.yml` file.
    pub fn from_path(path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            other => Err(AnalysisError::Config(format!(
                "unsupported configuration file extension: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    /// Defaults overridden from `FERROUS_DI_ANALYZER_*` environment variables.
    pub fn from_env() -> AnalysisResult<Self> {
        Self::default().with_source(&EnvironmentConfigSource::with_prefix(ENV_PREFIX))
    }

    /// These options with every key present in `source` overridden.
    pub fn with_source(mut self, source: &dyn ConfigSource) -> AnalysisResult<Self> {
        if let Some(value) = source.get("assume_framework_services_registered") {
            self.assume_framework_services_registered = value.as_bool()?;
        }
        if let Some(value) = source.get("max_resolution_depth") {
            let depth = value.as_i64()?;
            self.max_resolution_depth = usize::try_from(depth).map_err(|_| {
                AnalysisError::Config(format!(
                    "max_resolution_depth must be positive, got {}",
                    depth
                ))
            })?;
        }
        if let Some(value) = source.get("trace_errors") {
            self.trace_errors = match value.as_string()?.to_ascii_lowercase().as_str() {
                "skip" => TraceErrorPolicy::Skip,
                "fail" => TraceErrorPolicy::Fail,
                other => {
                    return Err(AnalysisError::Config(format!(
                        "trace_errors must be 'skip' or 'fail', got '{}'",
                        other
                    )))
                }
            };
        }
        if let Some(value) = source.get("framework_services") {
            self.framework_services = value
                .as_string()?
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }
        debug!(options = ?self, "applied configuration source");
        self.validated()
    }

    fn validated(self) -> AnalysisResult<Self> {
        if self.max_resolution_depth == 0 || self.max_resolution_depth > MAX_DEPTH {
            return Err(AnalysisError::Config(format!(
                "max_resolution_depth must be between 1 and {}, got {}",
                MAX_DEPTH, self.max_resolution_depth
            )));
        }
        Ok(self)
    }

    /// Severity reported for `rule`, after overrides.
    pub fn severity_for(&self, rule: RuleId) -> Severity {
        self.severity_overrides
            .get(&rule)
            .copied()
            .unwrap_or_else(|| rule.default_severity())
    }

    pub fn is_enabled(&self, rule: RuleId) -> bool {
        !self.disabled_rules.contains(&rule)
    }
}

/// A configuration value as read from a source.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl ConfigValue {
    /// Types a raw string the way the environment source does.
    pub fn parse(raw: &str) -> Self {
        if let Ok(int_val) = raw.parse::<i64>() {
            ConfigValue::Integer(int_val)
        } else if let Ok(bool_val) = raw.to_ascii_lowercase().parse::<bool>() {
            ConfigValue::Boolean(bool_val)
        } else {
            ConfigValue::String(raw.to_string())
        }
    }

    pub fn as_string(&self) -> AnalysisResult<&str> {
        match self {
            ConfigValue::String(s) => Ok(s),
            other => Err(AnalysisError::Config(format!("expected a string, got {:?}", other))),
        }
    }

    pub fn as_i64(&self) -> AnalysisResult<i64> {
        match self {
            ConfigValue::Integer(i) => Ok(*i),
            other => Err(AnalysisError::Config(format!("expected an integer, got {:?}", other))),
        }
    }

    pub fn as_bool(&self) -> AnalysisResult<bool> {
        match self {
            ConfigValue::Boolean(b) => Ok(*b),
            other => Err(AnalysisError::Config(format!("expected a boolean, got {:?}", other))),
        }
    }
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Get a configuration value by key
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// List all available keys
    fn keys(&self) -> Vec<String>;
}

/// Environment variable configuration source
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    /// Prefix to filter environment variables
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: Some(prefix.into()) }
    }

    fn env_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.env_key(key)).ok().map(|value| ConfigValue::parse(&value))
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let prefix_upper = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&prefix_upper).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// In-memory configuration source, mostly for hosts and tests.
#[derive(Debug, Default, Clone)]
pub struct MapConfigSource {
    values: HashMap<String, String>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).map(|value| ConfigValue::parse(value))
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.values.keys().cloned().collect();
        keys.sort();
        keys
    }
}
