//! Planner configuration
//!
//! The default access action has no built-in value: a deployment must
//! choose ALLOW, MASK or DENY explicitly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::ActionType;

/// Default upper bound on IN-list length
pub const DEFAULT_MAX_IN_LIST: usize = 1024;

/// Environment variable names read by `PlannerConfig::from_env`
pub const ENV_DEFAULT_ACCESS: &str = "PLANNER_DEFAULT_ACCESS";
pub const ENV_PARTITION_PRUNING: &str = "PLANNER_PARTITION_PRUNING";
pub const ENV_BUCKET_HINTS: &str = "PLANNER_BUCKET_HINTS";
pub const ENV_MAX_IN_LIST: &str = "PLANNER_MAX_IN_LIST";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required setting not provided
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    /// Setting present but unparseable
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Action when no table level rule matches
    pub default_action: ActionType,
    /// Attach partition pruning hints
    #[serde(default = "enabled")]
    pub enable_partition_pruning: bool,
    /// Attach bucket hints
    #[serde(default = "enabled")]
    pub enable_bucket_hints: bool,
    /// Longest IN-list accepted in a filter
    #[serde(default = "default_max_in_list")]
    pub max_in_list: usize,
}

fn enabled() -> bool {
    true
}

fn default_max_in_list() -> usize {
    DEFAULT_MAX_IN_LIST
}

impl PlannerConfig {
    pub fn new(default_action: ActionType) -> Self {
        Self {
            default_action,
            enable_partition_pruning: true,
            enable_bucket_hints: true,
            max_in_list: DEFAULT_MAX_IN_LIST,
        }
    }

    #[must_use]
    pub fn partition_pruning(mut self, on: bool) -> Self {
        self.enable_partition_pruning = on;
        self
    }

    #[must_use]
    pub fn bucket_hints(mut self, on: bool) -> Self {
        self.enable_bucket_hints = on;
        self
    }

    #[must_use]
    pub fn max_in_list(mut self, max: usize) -> Self {
        self.max_in_list = max;
        self
    }

    /// Load from process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(ENV_DEFAULT_ACCESS).ok_or(ConfigError::Missing(ENV_DEFAULT_ACCESS))?;
        let default_action =
            ActionType::parse(raw.trim()).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_DEFAULT_ACCESS,
                value: raw.clone(),
            })?;

        let mut config = Self::new(default_action);
        if let Some(v) = lookup(ENV_PARTITION_PRUNING) {
            config.enable_partition_pruning = parse_bool(ENV_PARTITION_PRUNING, &v)?;
        }
        if let Some(v) = lookup(ENV_BUCKET_HINTS) {
            config.enable_bucket_hints = parse_bool(ENV_BUCKET_HINTS, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_IN_LIST) {
            config.max_in_list = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_MAX_IN_LIST,
                value: v.to_string(),
            })?;
        }
        Ok(config)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
