//! # Jobico Executor
//!
//! The executor turns a declarative package catalog into a live set of
//! polling workers, runs sandboxed job code against dequeued items, and routes
//! every outcome to a follow-up queue, while staying consistent with a catalog
//! that changes underneath it.
//!
//! ## Moving parts
//!
//! - **Scheduler**: owns the live set of Processes and sweeps it on every tick,
//!   at most `max_executors` Processes at a time.
//! - **Process**: drains one tenant queue and dispatches each item to the
//!   Event named by the item.
//! - **Event**: one sandboxed Module plus the rule deciding where its result
//!   goes (`ok` on code 0, `error` otherwise).
//! - **Executor**: loads the catalog, follows its update stream, and rebuilds
//!   the Processes of a package whenever the package changes.
//!
//! Sink queues (names ending in `_ok` or `_error`) only receive results and
//! are never polled.
//!
//! ## Running an executor
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use jobico_executor::builders::ExecutorBuilder;
//! use jobico_executor::config::ExecutorConfig;
//! use jobico_executor::infra::{FnRuntime, MemCatalog, MemQueue, MemRecorder, MemRepo};
//! use jobico_executor::runtime::ExecutorService;
//!
//! jobico_executor::util::init_tracing();
//!
//! let executor = ExecutorBuilder::new()
//!     .config(ExecutorConfig::from_env()?)
//!     .catalog(Arc::new(MemCatalog::new()))
//!     .queue(Arc::new(MemQueue::new()))
//!     .repo(Arc::new(MemRepo::new()))
//!     .recorder(Arc::new(MemRecorder::new()))
//!     .runtime(Arc::new(FnRuntime::new()))
//!     .build()?;
//!
//! let service = ExecutorService::new(executor);
//! service.serve().await?;
//! service.dispose().await?;
//! ```
//!
//! Remote deployments provide their own implementations of the
//! [`core::CatalogClient`], [`core::QueueClient`], [`core::RepoClient`],
//! [`core::RecorderClient`] and [`core::ModuleRuntime`] traits.

#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Scheduler, processes, module boundary and reconciliation.
pub mod core;
/// Executor configuration.
pub mod config;
/// Builders to construct the executor from configuration.
pub mod builders;
/// In-memory collaborators and a closure-backed module runtime.
pub mod infra;
/// Service surface: lifecycle and health.
pub mod runtime;
/// Shared utilities.
pub mod util;
