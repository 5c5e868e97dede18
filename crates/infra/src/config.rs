//! Engine configuration.

use serde::Deserialize;
use thiserror::Error;

use crate::ledger_store::DEFAULT_MAX_APPEND_ATTEMPTS;

pub const ENV_MAX_APPEND_ATTEMPTS: &str = "ELAST_MAX_APPEND_ATTEMPTS";
pub const ENV_ORDER_PREFIX: &str = "ELAST_ORDER_PREFIX";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer (got '{value}')")]
    InvalidAttempts { var: &'static str, value: String },

    #[error("order reference prefix cannot be empty")]
    EmptyPrefix,
}

/// Propagation engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempts per ledger append before contention is reported as a conflict.
    pub max_append_attempts: u32,
    /// Prefix of generated order references.
    pub order_reference_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_append_attempts: DEFAULT_MAX_APPEND_ATTEMPTS,
            order_reference_prefix: "ELAST".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_max_append_attempts(mut self, attempts: u32) -> Self {
        self.max_append_attempts = attempts;
        self
    }

    pub fn with_order_reference_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.order_reference_prefix = prefix.into();
        self
    }

    /// Defaults overridden by `ELAST_MAX_APPEND_ATTEMPTS` / `ELAST_ORDER_PREFIX`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_MAX_APPEND_ATTEMPTS) {
            config.max_append_attempts = value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidAttempts {
                    var: ENV_MAX_APPEND_ATTEMPTS,
                    value: value.clone(),
                })?;
        }
        if let Some(prefix) = lookup(ENV_ORDER_PREFIX) {
            config.order_reference_prefix = prefix;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_append_attempts == 0 {
            return Err(ConfigError::InvalidAttempts {
                var: ENV_MAX_APPEND_ATTEMPTS,
                value: "0".to_string(),
            });
        }
        if self.order_reference_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        Ok(())
    }
}
