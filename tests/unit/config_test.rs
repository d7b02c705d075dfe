//! Tests for configuration validation

use std::time::Duration;

use jobico_executor::config::ExecutorConfig;
use jobico_executor::core::ExecutorError;

#[test]
fn test_config_from_partial_json_keeps_defaults() {
    let cfg = ExecutorConfig::from_json_str(r#"{"max_executors": 4, "exec_timeout_ms": 500}"#)
        .expect("valid config");
    assert_eq!(cfg.max_executors, 4);
    assert_eq!(cfg.exec_timeout(), Duration::from_millis(500));
    assert_eq!(cfg.tick_interval(), Duration::from_secs(1));
    assert_eq!(cfg.default_entry_func, "event");
}

#[test]
fn test_config_invalid_tick_interval() {
    let err = ExecutorConfig::from_json_str(r#"{"tick_interval_ms": 0}"#).unwrap_err();
    assert!(matches!(err, ExecutorError::Config(_)));
}

#[test]
fn test_config_invalid_exec_timeout() {
    let invalid = ExecutorConfig {
        exec_timeout_ms: 0,
        ..ExecutorConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_invalid_entry_func() {
    let invalid = ExecutorConfig {
        default_entry_func: "  ".to_string(),
        ..ExecutorConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_malformed_json() {
    let err = ExecutorConfig::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, ExecutorError::Serialization(_)));
}

#[test]
fn test_config_from_env() {
    std::env::set_var("EXECUTOR_MAX_PROCS", "3");
    std::env::set_var("WASM_EXEC_TIMEOUT_MS", "750");
    std::env::set_var("EXECUTOR_ENTRY_FUNC", "main");
    let cfg = ExecutorConfig::from_env().expect("env config");
    assert_eq!(cfg.max_executors, 3);
    assert_eq!(cfg.exec_timeout(), Duration::from_millis(750));
    assert_eq!(cfg.default_entry_func, "main");

    std::env::set_var("EXECUTOR_MAX_PROCS", "many");
    assert!(ExecutorConfig::from_env().is_err());

    std::env::remove_var("EXECUTOR_MAX_PROCS");
    std::env::remove_var("WASM_EXEC_TIMEOUT_MS");
    std::env::remove_var("EXECUTOR_ENTRY_FUNC");
}
