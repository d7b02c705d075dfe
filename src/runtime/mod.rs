//! Service surface: lifecycle and health of a running executor.

pub mod service;

pub use service::{ExecutorService, Health};
