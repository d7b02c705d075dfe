//! Builders to construct the executor from configuration.

pub mod executor_builder;

pub use executor_builder::ExecutorBuilder;
