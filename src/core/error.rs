//! Error types for executor operations.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors produced by executor components.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Queue service failure (dequeue or enqueue).
    #[error("queue error: {0}")]
    Queue(String),
    /// Recorder service failure.
    #[error("recorder error: {0}")]
    Recorder(String),
    /// Repo service failure, including missing files.
    #[error("repo error: {0}")]
    Repo(String),
    /// Catalog service failure.
    #[error("catalog error: {0}")]
    Catalog(String),
    /// Module runtime failure outside a single module call.
    #[error("runtime error: {0}")]
    Runtime(String),
    /// A module call failed (trap, malloc/free failure, bad memory access).
    #[error("error in module {module}: {reason}")]
    Module {
        /// Module identity.
        module: String,
        /// Lower-level failure.
        reason: String,
    },
    /// A module call exceeded its execution timeout.
    #[error("module {module} timed out after {after:?}")]
    ModuleTimeout {
        /// Module identity.
        module: String,
        /// Timeout that elapsed.
        after: Duration,
    },
    /// A module was called after it was closed.
    #[error("module {0} is closed")]
    ModuleClosed(String),
    /// Payload (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A bounded operation ran out of time.
    #[error("{0} timed out")]
    Timeout(String),
    /// Several independent failures.
    #[error("{0}")]
    Multiple(ErrorSet),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

/// Aggregation of independent failures.
///
/// Used where one failure must not stop the remaining work, such as closing
/// every module on shutdown.
#[derive(Debug, Default)]
pub struct ErrorSet {
    errors: Vec<ExecutorError>,
}

impl ErrorSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error.
    pub fn push(&mut self, err: ExecutorError) {
        match err {
            ExecutorError::Multiple(set) => self.errors.extend(set.errors),
            other => self.errors.push(other),
        }
    }

    /// Add the error of a result, if any.
    pub fn collect<T>(&mut self, res: Result<T, ExecutorError>) {
        if let Err(err) = res {
            self.push(err);
        }
    }

    /// Number of collected errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether nothing failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Collected errors, in insertion order.
    pub fn errors(&self) -> &[ExecutorError] {
        &self.errors
    }

    /// `Ok` when empty, the single error when there is one, `Multiple` otherwise.
    pub fn into_result(mut self) -> Result<(), ExecutorError> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ExecutorError::Multiple(self)),
        }
    }
}

impl fmt::Display for ErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl Extend<ExecutorError> for ErrorSet {
    fn extend<I: IntoIterator<Item = ExecutorError>>(&mut self, iter: I) {
        for err in iter {
            self.push(err);
        }
    }
}
