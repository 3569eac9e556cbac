//! Admission controller configuration structures.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How transactions on the same course are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyStrategy {
    /// Hold the course row lock for the whole transaction.
    #[default]
    RowLock,
    /// Run unlocked and commit only if the course revision is unchanged.
    Optimistic,
}

impl ConcurrencyStrategy {
    fn parse(input: &str) -> Result<Self, String> {
        match input.trim().to_ascii_lowercase().as_str() {
            "row_lock" | "rowlock" | "lock" => Ok(Self::RowLock),
            "optimistic" | "occ" => Ok(Self::Optimistic),
            other => Err(format!("unknown concurrency strategy `{other}`")),
        }
    }
}

/// Bounded retry with exponential backoff and jitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 5,
            max_delay_ms: 200,
        }
    }
}

impl RetryPolicy {
    /// Backoff after failed attempt number `attempt` (1-based).
    ///
    /// The delay doubles per attempt up to `max_delay_ms` and is jittered
    /// uniformly into its upper half.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let ceiling = self
            .base_delay_ms
            .saturating_mul(1_u64 << exp)
            .min(self.max_delay_ms);
        if ceiling == 0 {
            return Duration::ZERO;
        }
        let floor = ceiling / 2;
        Duration::from_millis(rand::rng().random_range(floor..=ceiling))
    }

    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry.max_attempts must be greater than 0".into());
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err("retry.base_delay_ms must not exceed retry.max_delay_ms".into());
        }
        Ok(())
    }
}

/// Root admission configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Same-course serialization strategy.
    pub concurrency: ConcurrencyStrategy,
    /// Longest wait for a course row lock, in milliseconds.
    pub transaction_timeout_ms: u64,
    /// Retry policy for optimistic conflicts and promotion restarts.
    pub retry: RetryPolicy,
    /// Interval of the background promotion/notification sweep, in seconds.
    pub sweep_interval_secs: u64,
    /// Delivery attempts a promotion notice gets before it is abandoned.
    pub notice_max_attempts: u32,
    /// Most undelivered notices held for redelivery; overflow is abandoned.
    pub max_pending_notices: usize,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            concurrency: ConcurrencyStrategy::RowLock,
            transaction_timeout_ms: 2_000,
            retry: RetryPolicy::default(),
            sweep_interval_secs: 30,
            notice_max_attempts: 10,
            max_pending_notices: 10_000,
            log_filter: None,
        }
    }
}

impl AdmissionConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.transaction_timeout_ms == 0 {
            return Err("transaction_timeout_ms must be greater than 0".into());
        }
        if self.sweep_interval_secs == 0 {
            return Err("sweep_interval_secs must be greater than 0".into());
        }
        if self.notice_max_attempts == 0 {
            return Err("notice_max_attempts must be greater than 0".into());
        }
        if self.max_pending_notices == 0 {
            return Err("max_pending_notices must be greater than 0".into());
        }
        self.retry.validate()
    }

    /// Row lock wait bound.
    pub const fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }

    /// Sweep period.
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from `ADMISSION_*` environment variables, reading a
    /// `.env` file first if one exists. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn num<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>, String> {
            raw.map(|v| v.trim().parse::<T>().map_err(|_| format!("{key}: invalid number `{v}`")))
                .transpose()
        }

        let mut cfg = Self::default();
        if let Some(v) = lookup("ADMISSION_CONCURRENCY") {
            cfg.concurrency = ConcurrencyStrategy::parse(&v)?;
        }
        if let Some(v) = num("ADMISSION_TRANSACTION_TIMEOUT_MS", lookup("ADMISSION_TRANSACTION_TIMEOUT_MS"))? {
            cfg.transaction_timeout_ms = v;
        }
        if let Some(v) = num("ADMISSION_RETRY_MAX_ATTEMPTS", lookup("ADMISSION_RETRY_MAX_ATTEMPTS"))? {
            cfg.retry.max_attempts = v;
        }
        if let Some(v) = num("ADMISSION_RETRY_BASE_DELAY_MS", lookup("ADMISSION_RETRY_BASE_DELAY_MS"))? {
            cfg.retry.base_delay_ms = v;
        }
        if let Some(v) = num("ADMISSION_RETRY_MAX_DELAY_MS", lookup("ADMISSION_RETRY_MAX_DELAY_MS"))? {
            cfg.retry.max_delay_ms = v;
        }
        if let Some(v) = num("ADMISSION_SWEEP_INTERVAL_SECS", lookup("ADMISSION_SWEEP_INTERVAL_SECS"))? {
            cfg.sweep_interval_secs = v;
        }
        if let Some(v) = num("ADMISSION_NOTICE_MAX_ATTEMPTS", lookup("ADMISSION_NOTICE_MAX_ATTEMPTS"))? {
            cfg.notice_max_attempts = v;
        }
        if let Some(v) = num("ADMISSION_MAX_PENDING_NOTICES", lookup("ADMISSION_MAX_PENDING_NOTICES"))? {
            cfg.max_pending_notices = v;
        }
        cfg.log_filter = lookup("ADMISSION_LOG").or(cfg.log_filter);
        cfg.validate()?;
        Ok(cfg)
    }
}
