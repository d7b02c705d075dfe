//! Module runtimes.

pub mod func;

pub use func::{FnRuntime, Guest, Handler};
