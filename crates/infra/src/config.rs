//! Engine configuration.
//!
//! Defaults are usable as-is. `from_env` layers `PRICEWISE_*` environment
//! variables on top through the `config` crate; nested fields use `__`
//! (`PRICEWISE_RETRY__MAX_ATTEMPTS`).

use std::collections::HashMap;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use pricewise_orders::{StockShortfallPolicy, ValidationPolicy};

pub const ENV_PREFIX: &str = "PRICEWISE";

pub const ENV_STOCK_SHORTFALL: &str = "PRICEWISE_STOCK_SHORTFALL";
pub const ENV_ENFORCE_MOQ: &str = "PRICEWISE_ENFORCE_MOQ";
pub const ENV_PACKAGING_WARNINGS: &str = "PRICEWISE_PACKAGING_ALIGNMENT_WARNINGS";
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "PRICEWISE_RETRY__MAX_ATTEMPTS";
pub const ENV_RETRY_INITIAL_BACKOFF_MS: &str = "PRICEWISE_RETRY__INITIAL_BACKOFF_MS";
pub const ENV_RETRY_MAX_BACKOFF_MS: &str = "PRICEWISE_RETRY__MAX_BACKOFF_MS";

/// Bounded retry for retryable engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 10,
            max_backoff_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub stock_shortfall: StockShortfallPolicy,
    pub enforce_moq: bool,
    pub packaging_alignment_warnings: bool,
    pub retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let policy = ValidationPolicy::default();
        Self {
            stock_shortfall: policy.stock_shortfall,
            enforce_moq: policy.enforce_moq,
            packaging_alignment_warnings: policy.packaging_alignment_warnings,
            retry: RetryConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `PRICEWISE_*` environment variables.
    ///
    /// A malformed value logs a warning and the whole configuration falls
    /// back to [`EngineConfig::default`].
    pub fn from_env() -> Self {
        Self::or_default(Self::try_from_env())
    }

    /// Same as [`EngineConfig::from_env`] over an explicit variable map.
    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        Self::or_default(Self::load(environment().source(Some(vars))))
    }

    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::load(environment())
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            stock_shortfall: self.stock_shortfall,
            enforce_moq: self.enforce_moq,
            packaging_alignment_warnings: self.packaging_alignment_warnings,
        }
    }

    fn load(source: Environment) -> Result<Self, ConfigError> {
        let config: EngineConfig = Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;

        if config.retry.max_attempts == 0 {
            return Err(ConfigError::Message(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    fn or_default(loaded: Result<Self, ConfigError>) -> Self {
        loaded.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring malformed engine configuration; using defaults");
            Self::default()
        })
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
