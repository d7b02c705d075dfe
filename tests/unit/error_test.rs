//! Tests for error types

use std::time::Duration;

use jobico_executor::core::{ErrorSet, ExecutorError};

#[test]
fn test_queue_error() {
    let err = ExecutorError::Queue("connection refused".to_string());
    assert_eq!(format!("{}", err), "queue error: connection refused");
}

#[test]
fn test_module_error_names_module() {
    let err = ExecutorError::Module {
        module: "t1/p1/e1".to_string(),
        reason: "malloc failed".to_string(),
    };
    assert_eq!(format!("{}", err), "error in module t1/p1/e1: malloc failed");
}

#[test]
fn test_module_timeout_error() {
    let err = ExecutorError::ModuleTimeout {
        module: "t1/p1/e1".to_string(),
        after: Duration::from_secs(2),
    };
    assert_eq!(format!("{}", err), "module t1/p1/e1 timed out after 2s");
}

#[test]
fn test_serialization_error_converts() {
    let json_err = serde_json::from_str::<u64>("nope").unwrap_err();
    let err: ExecutorError = json_err.into();
    assert!(matches!(err, ExecutorError::Serialization(_)));
}

#[test]
fn test_error_set_keeps_every_failure() {
    let mut set = ErrorSet::new();
    set.extend([
        ExecutorError::Timeout("closing module a".to_string()),
        ExecutorError::Catalog("stream gone".to_string()),
    ]);
    assert_eq!(set.errors().len(), 2);
    let err = set.into_result().unwrap_err();
    assert_eq!(
        err.to_string(),
        "closing module a timed out\ncatalog error: stream gone"
    );
}

#[test]
fn test_executor_error_into_anyhow() {
    fn edge() -> jobico_executor::core::AppResult<()> {
        let res: Result<(), ExecutorError> = Err(ExecutorError::Config("bad".to_string()));
        res?;
        Ok(())
    }
    let err = edge().unwrap_err();
    assert!(err.downcast_ref::<ExecutorError>().is_some());
}
