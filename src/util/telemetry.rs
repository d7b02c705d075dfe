//! Telemetry helpers for structured logging and tracing.

/// Initialize tracing. Callers may install their own subscriber first; this
/// helper only installs the default `RUST_LOG`-filtered fmt subscriber when
/// none is set.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
