//! Tests for the executor service

use std::sync::Arc;
use std::time::Duration;

use jobico_executor::builders::ExecutorBuilder;
use jobico_executor::config::ExecutorConfig;
use jobico_executor::core::{ManualTicker, Status, TickHandle};
use jobico_executor::infra::{FnRuntime, MemCatalog, MemQueue, MemRecorder, MemRepo};
use jobico_executor::runtime::ExecutorService;

fn service(config: ExecutorConfig) -> (Arc<ExecutorService>, TickHandle) {
    let (ticker, ticks) = ManualTicker::channel();
    let executor = ExecutorBuilder::new()
        .config(config)
        .catalog(Arc::new(MemCatalog::new()))
        .queue(Arc::new(MemQueue::new()))
        .repo(Arc::new(MemRepo::new()))
        .recorder(Arc::new(MemRecorder::new()))
        .runtime(Arc::new(FnRuntime::new()))
        .ticker(ticker)
        .build()
        .expect("executor");
    (Arc::new(ExecutorService::new(executor)), ticks)
}

#[tokio::test]
async fn test_service_health_follows_lifecycle() {
    let (svc, ticks) = service(ExecutorConfig::default());
    let health = svc.health();
    assert!(!health.ok);
    assert_eq!(health.status, Status::Starting);

    let serving = tokio::spawn({
        let svc = Arc::clone(&svc);
        async move { svc.serve().await }
    });
    let mut sweeps = svc.executor().scheduler().sweeps();
    assert!(ticks.tick().await);
    sweeps.changed().await.expect("sweep");
    assert!(svc.health().ok);

    svc.dispose().await.expect("dispose");
    serving.await.expect("serve task").expect("serve result");
    let health = svc.health();
    assert!(!health.ok);
    assert_eq!(health.status, Status::Stopped);
    assert_eq!(health.processes, 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_start_delay() {
    let config = ExecutorConfig::default().with_start_delay(Duration::from_secs(30));
    let (svc, _ticks) = service(config);
    let serving = tokio::spawn({
        let svc = Arc::clone(&svc);
        async move { svc.serve().await }
    });
    tokio::time::sleep(Duration::from_secs(1)).await;
    svc.shutdown();
    serving.await.expect("serve task").expect("serve result");
    assert_eq!(svc.health().status, Status::Starting);
}

#[test]
fn test_health_serializes() {
    let (svc, _ticks) = service(ExecutorConfig::default());
    let json = serde_json::to_value(svc.health()).expect("json");
    assert_eq!(json["ok"], false);
    assert_eq!(json["status"], "starting");
}
