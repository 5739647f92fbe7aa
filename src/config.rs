//! Report generation settings.
//!
//! Defaults suit a desktop machine hashing a few thousand files. Settings can
//! be read from a JSON file and overridden through environment variables:
//!
//! - `MODREPORT_CONCURRENCY` - maximum number of files hashed at once
//! - `MODREPORT_DIGEST_THRESHOLD` - file count above which the caller is asked
//!   before digests are generated

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONCURRENCY_ENV: &str = "MODREPORT_CONCURRENCY";
pub const DIGEST_THRESHOLD_ENV: &str = "MODREPORT_DIGEST_THRESHOLD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportConfig {
    /// Upper bound on concurrently open files while hashing.
    pub concurrency: usize,
    /// Lowest concurrency the limiter shrinks to after descriptor exhaustion.
    pub min_concurrency: usize,
    pub digest_prompt_threshold: usize,
    pub retry: RetryPolicy,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            concurrency: 64,
            min_concurrency: 1,
            digest_prompt_threshold: 100,
            retry: RetryPolicy::default(),
        }
    }
}

/// Backoff applied between retries of an operation that hit a transient error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// `None` retries until the operation stops failing transiently.
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 50,
            max_delay_ms: 2000,
            max_retries: None,
        }
    }
}

impl RetryPolicy {
    /// Exponential delay before retry number `retry` (1-based), capped at
    /// `max_delay_ms`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 1u64 << (retry - 1).min(20);
        let millis = self.initial_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    pub fn allows_retry(&self, retries_done: u32) -> bool {
        self.max_retries.map_or(true, |max| retries_done < max)
    }
}

impl ReportConfig {
    /// Loads settings from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {:?}", path))?;
        let config: ReportConfig = serde_json::from_str(&content)
            .context(format!("Failed to parse config file: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment variable overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(value) = std::env::var(CONCURRENCY_ENV) {
            self.concurrency = value
                .trim()
                .parse()
                .context(format!("Invalid {}: {:?}", CONCURRENCY_ENV, value))?;
        }
        if let Ok(value) = std::env::var(DIGEST_THRESHOLD_ENV) {
            self.digest_prompt_threshold = value
                .trim()
                .parse()
                .context(format!("Invalid {}: {:?}", DIGEST_THRESHOLD_ENV, value))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.min_concurrency == 0 || self.min_concurrency > self.concurrency {
            bail!(
                "minConcurrency must be between 1 and concurrency ({})",
                self.concurrency
            );
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            bail!("retry.initialDelayMs must not exceed retry.maxDelayMs");
        }
        Ok(())
    }
}
