// ─── Core decision engine ───
pub mod manager;
pub mod performance;
pub mod registry;

// ─── Persistence & host integration ───
pub mod lifecycle;
pub mod persistence;

// ─── Shared types ───
pub mod types;

/// Install a test-writer subscriber so discard-path `trace!`/`debug!`
/// output is visible under `cargo test` (honors `RUST_LOG`). Safe to call
/// from every test; only the first installation wins.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
