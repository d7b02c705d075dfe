//! Builder assembling an [`Executor`] from configuration and collaborators.

use std::sync::Arc;

use crate::config::ExecutorConfig;
use crate::core::{
    CatalogClient, Clients, Executor, ExecutorError, IntervalTicker, ModuleRuntime, QueueClient,
    RecorderClient, RepoClient, Ticker,
};

/// Fluent builder for [`Executor`].
///
/// Every client and the runtime are required; the ticker defaults to an
/// [`IntervalTicker`] at the configured tick interval.
#[derive(Default)]
pub struct ExecutorBuilder {
    config: ExecutorConfig,
    catalog: Option<Arc<dyn CatalogClient>>,
    queue: Option<Arc<dyn QueueClient>>,
    repo: Option<Arc<dyn RepoClient>>,
    recorder: Option<Arc<dyn RecorderClient>>,
    runtime: Option<Arc<dyn ModuleRuntime>>,
    ticker: Option<Box<dyn Ticker>>,
}

impl ExecutorBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config`.
    #[must_use]
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `clients` for all four services.
    #[must_use]
    pub fn clients(mut self, clients: Clients) -> Self {
        self.catalog = Some(clients.catalog);
        self.queue = Some(clients.queue);
        self.repo = Some(clients.repo);
        self.recorder = Some(clients.recorder);
        self
    }

    /// Catalog service.
    #[must_use]
    pub fn catalog(mut self, catalog: Arc<dyn CatalogClient>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Queue service.
    #[must_use]
    pub fn queue(mut self, queue: Arc<dyn QueueClient>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Repo service.
    #[must_use]
    pub fn repo(mut self, repo: Arc<dyn RepoClient>) -> Self {
        self.repo = Some(repo);
        self
    }

    /// Recorder service.
    #[must_use]
    pub fn recorder(mut self, recorder: Arc<dyn RecorderClient>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Module runtime.
    #[must_use]
    pub fn runtime(mut self, runtime: Arc<dyn ModuleRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Drive sweeps from `ticker` instead of the configured interval.
    #[must_use]
    pub fn ticker(mut self, ticker: impl Ticker + 'static) -> Self {
        self.ticker = Some(Box::new(ticker));
        self
    }

    /// Validate the configuration and assemble the executor.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Config`] when the configuration is invalid or a
    /// collaborator is missing.
    pub fn build(self) -> Result<Arc<Executor>, ExecutorError> {
        self.config
            .validate()
            .map_err(|e| ExecutorError::Config(format!("config invalid: {e}")))?;

        let clients = Clients::new(
            required(self.catalog, "catalog")?,
            required(self.queue, "queue")?,
            required(self.repo, "repo")?,
            required(self.recorder, "recorder")?,
        );
        let runtime = required(self.runtime, "runtime")?;
        let ticker: Box<dyn Ticker> = match self.ticker {
            Some(ticker) => ticker,
            None => Box::new(IntervalTicker::new(self.config.tick_interval())),
        };

        Ok(Arc::new(Executor::new(self.config, clients, runtime, ticker)))
    }
}

fn required<T>(value: Option<T>, what: &str) -> Result<T, ExecutorError> {
    value.ok_or_else(|| ExecutorError::Config(format!("{what} not set")))
}

impl std::fmt::Debug for ExecutorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorBuilder")
            .field("config", &self.config)
            .field("ticker", &self.ticker.is_some())
            .finish_non_exhaustive()
    }
}
