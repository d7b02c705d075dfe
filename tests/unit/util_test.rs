//! Tests for utility functions

use jobico_executor::util::{clock, host, init_tracing};

#[test]
fn test_clock_is_utc_and_advancing() {
    let a = clock::now();
    let b = clock::now();
    assert!(b >= a);
    assert_eq!(a.timezone(), chrono::Utc);
}

#[test]
fn test_hostname_is_resolved_once() {
    let name = host::hostname();
    assert!(!name.is_empty());
    assert!(std::ptr::eq(name, host::hostname()));
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!(target: "jobico_executor", "tracing ready");
}
