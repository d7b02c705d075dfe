//! Tests for builder modules

use std::sync::Arc;

use jobico_executor::builders::ExecutorBuilder;
use jobico_executor::config::ExecutorConfig;
use jobico_executor::core::{Clients, ExecutorError, ManualTicker, Status};
use jobico_executor::infra::{FnRuntime, MemCatalog, MemQueue, MemRecorder, MemRepo};

fn clients() -> Clients {
    Clients::new(
        Arc::new(MemCatalog::new()),
        Arc::new(MemQueue::new()),
        Arc::new(MemRepo::new()),
        Arc::new(MemRecorder::new()),
    )
}

#[test]
fn test_builder_assembles_executor() {
    let (ticker, _ticks) = ManualTicker::channel();
    let executor = ExecutorBuilder::new()
        .config(ExecutorConfig::new().with_max_executors(3))
        .clients(clients())
        .runtime(Arc::new(FnRuntime::new()))
        .ticker(ticker)
        .build()
        .expect("executor");
    assert_eq!(executor.scheduler().max_executors(), 3);
    assert_eq!(executor.scheduler().status(), Status::Starting);
    assert!(!executor.is_up());
}

#[test]
fn test_builder_defaults_to_interval_ticker() {
    let executor = ExecutorBuilder::new()
        .clients(clients())
        .runtime(Arc::new(FnRuntime::new()))
        .build();
    assert!(executor.is_ok());
}

#[test]
fn test_builder_requires_runtime() {
    let err = ExecutorBuilder::new().clients(clients()).build().unwrap_err();
    match err {
        ExecutorError::Config(msg) => assert_eq!(msg, "runtime not set"),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_builder_rejects_invalid_config() {
    let err = ExecutorBuilder::new()
        .config(ExecutorConfig {
            dispose_timeout_ms: 0,
            ..ExecutorConfig::default()
        })
        .clients(clients())
        .runtime(Arc::new(FnRuntime::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, ExecutorError::Config(_)));
}
