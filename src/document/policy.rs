use super::lenient;
use serde::{Deserialize, Serialize};

/// Timeout applied when nothing upstream specifies one.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Retry behaviour of an action. Partially specified policies are completed with the built-in values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    #[serde(deserialize_with = "lenient::number")]
    pub max_attempts: u32,
    #[serde(deserialize_with = "lenient::number")]
    pub backoff_multiplier: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub initial_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_multiplier: 2.0,
            initial_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimit {
    #[serde(deserialize_with = "lenient::number")]
    pub requests_per_minute: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
        }
    }
}

/// A set of optional policy values, as found on workflows, context defaults and catalog entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policies {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_number"
    )]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_number"
    )]
    pub max_parallelism: Option<u32>,
}

impl Policies {
    /// Fills every unset key from `defaults`, leaving keys that are already set untouched.
    pub fn fill_missing_from(&mut self, defaults: &Policies) {
        if self.retry.is_none() {
            self.retry = defaults.retry.clone();
        }
        if self.timeout_ms.is_none() {
            self.timeout_ms = defaults.timeout_ms;
        }
        if self.rate_limit.is_none() {
            self.rate_limit = defaults.rate_limit.clone();
        }
        if self.max_parallelism.is_none() {
            self.max_parallelism = defaults.max_parallelism;
        }
    }
}
