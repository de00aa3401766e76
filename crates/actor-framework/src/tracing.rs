//! Tracing setup shared by every binary built on the framework.

/// Initializes the global tracing subscriber.
///
/// Filtering is read from `RUST_LOG` (for example `RUST_LOG=info` or
/// `RUST_LOG=my_app=debug,actor_framework=info`). Call once, early in `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
