//! In-process adapters for the executor's collaborators.
//!
//! These back the client and runtime traits with memory so the executor can run
//! standalone (local development, tests, benches).

pub mod catalog;
pub mod queue;
pub mod recorder;
pub mod repo;
pub mod runtime;

pub use catalog::MemCatalog;
pub use queue::MemQueue;
pub use recorder::MemRecorder;
pub use repo::MemRepo;
pub use runtime::{FnRuntime, Guest, Handler};
