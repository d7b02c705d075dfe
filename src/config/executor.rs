//! Executor configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::ExecutorError;

/// Entry function called when a runtime does not name one.
pub const DEFAULT_ENTRY_FUNC: &str = "event";

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Milliseconds between scheduler sweeps.
    pub tick_interval_ms: u64,
    /// Processes run at once per sweep; 0 selects the default of 10.
    pub max_executors: usize,
    /// Per-call module execution timeout in milliseconds.
    pub exec_timeout_ms: u64,
    /// Bound on closing every module at shutdown, in milliseconds.
    pub dispose_timeout_ms: u64,
    /// Delay before the service starts serving, in milliseconds.
    pub start_delay_ms: u64,
    /// Entry function used when a runtime does not name one.
    pub default_entry_func: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            max_executors: 10,
            exec_timeout_ms: 120_000,
            dispose_timeout_ms: 5_000,
            start_delay_ms: 0,
            default_entry_func: DEFAULT_ENTRY_FUNC.to_string(),
        }
    }
}

impl ExecutorConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sweep interval.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = duration_ms(interval);
        self
    }

    /// Set the per-sweep concurrency cap.
    #[must_use]
    pub const fn with_max_executors(mut self, max: usize) -> Self {
        self.max_executors = max;
        self
    }

    /// Set the module execution timeout.
    #[must_use]
    pub fn with_exec_timeout(mut self, timeout: Duration) -> Self {
        self.exec_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the dispose timeout.
    #[must_use]
    pub fn with_dispose_timeout(mut self, timeout: Duration) -> Self {
        self.dispose_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the start delay.
    #[must_use]
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay_ms = duration_ms(delay);
        self
    }

    /// Sweep interval.
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Module execution timeout.
    pub const fn exec_timeout(&self) -> Duration {
        Duration::from_millis(self.exec_timeout_ms)
    }

    /// Dispose timeout.
    pub const fn dispose_timeout(&self) -> Duration {
        Duration::from_millis(self.dispose_timeout_ms)
    }

    /// Start delay.
    pub const fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be greater than 0".into());
        }
        if self.exec_timeout_ms == 0 {
            return Err("exec_timeout_ms must be greater than 0".into());
        }
        if self.dispose_timeout_ms == 0 {
            return Err("dispose_timeout_ms must be greater than 0".into());
        }
        if self.default_entry_func.trim().is_empty() {
            return Err("default_entry_func must not be empty".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, ExecutorError> {
        let cfg: Self = serde_json::from_str(input)?;
        cfg.validate().map_err(ExecutorError::Config)?;
        Ok(cfg)
    }

    /// Build configuration from the environment, loading `.env` first if present.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ExecutorError> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();
        if let Some(v) = read_var("EXECUTOR_TICK_MS")? {
            cfg.tick_interval_ms = v;
        }
        if let Some(v) = read_var("EXECUTOR_MAX_PROCS")? {
            cfg.max_executors = v;
        }
        if let Some(v) = read_var("WASM_EXEC_TIMEOUT_MS")? {
            cfg.exec_timeout_ms = v;
        }
        if let Some(v) = read_var("EXECUTOR_DISPOSE_TIMEOUT_MS")? {
            cfg.dispose_timeout_ms = v;
        }
        if let Some(v) = read_var("EXECUTOR_DELAY_MS")? {
            cfg.start_delay_ms = v;
        }
        if let Ok(v) = env::var("EXECUTOR_ENTRY_FUNC") {
            cfg.default_entry_func = v;
        }
        cfg.validate().map_err(ExecutorError::Config)?;
        Ok(cfg)
    }
}

fn read_var<T: FromStr>(name: &str) -> Result<Option<T>, ExecutorError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ExecutorError::Config(format!("{name}: {e}"))),
        Err(_) => Ok(None),
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
