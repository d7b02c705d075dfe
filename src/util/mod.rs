//! Shared utilities.

pub mod clock;
pub mod host;
pub mod telemetry;

pub use telemetry::init_tracing;
