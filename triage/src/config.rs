//! Environment-driven configuration, read once at process start.

use std::time::Duration;

use crate::budget::{DEFAULT_DAILY_BUDGET, DEFAULT_HOURLY_BUDGET};
use crate::cost::DEFAULT_COST_CEILING;
use crate::retrieval::DEFAULT_RETRIEVAL_LIMIT;

/// Default hard timeout for a provider call, in seconds.
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 8;

/// Default cap on answer length requested from the provider.
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 512;

/// Completion provider endpoint.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Hard per-call timeout. A timed-out call is escalated, not retried.
    pub timeout: Duration,
}

/// Top-level triage configuration.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub provider: ProviderConfig,
    pub daily_token_budget: u64,
    pub hourly_token_budget: u64,
    /// Ceiling on estimated tokens of retrieved content (cost kill-switch).
    pub cost_ceiling_tokens: u64,
    /// Passages requested per retrieval.
    pub retrieval_limit: usize,
    pub max_output_tokens: u32,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl TriageConfig {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            provider: ProviderConfig {
                base_url: env_or("TRIAGE_PROVIDER_URL", "https://api.openai.com/v1"),
                api_key: env_or("TRIAGE_PROVIDER_API_KEY", ""),
                model: env_or("TRIAGE_PROVIDER_MODEL", "gpt-4o-mini"),
                timeout: Duration::from_secs(env_parse(
                    "TRIAGE_PROVIDER_TIMEOUT_SECS",
                    DEFAULT_PROVIDER_TIMEOUT_SECS,
                )),
            },
            daily_token_budget: env_parse("DAILY_TOKEN_BUDGET", DEFAULT_DAILY_BUDGET),
            hourly_token_budget: env_parse("HOURLY_TOKEN_BUDGET", DEFAULT_HOURLY_BUDGET),
            cost_ceiling_tokens: env_parse("TRIAGE_COST_CEILING", DEFAULT_COST_CEILING),
            retrieval_limit: env_parse("TRIAGE_RETRIEVAL_LIMIT", DEFAULT_RETRIEVAL_LIMIT),
            max_output_tokens: env_parse("TRIAGE_MAX_OUTPUT_TOKENS", DEFAULT_MAX_OUTPUT_TOKENS),
        }
    }
}
