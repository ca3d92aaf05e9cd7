//! Adaptive price-floor decision engine for mediated ad placements.
//!
//! Per placement, tracks recent fill performance in a trailing calendar-day
//! window and picks the highest-price floor variant still below the observed
//! trailing CPM. State survives restarts through a pluggable blob store.
//!
//! The engine is deliberately synchronous and single-writer: the host calls
//! into it from one logical thread (record outcomes, ask for the next
//! candidate, forward lifecycle transitions) and it never performs network
//! I/O or issues ad requests itself.

pub mod floors;

pub use floors::lifecycle::{LifecycleEvent, LifecycleObserver};
pub use floors::manager::FloorManager;
pub use floors::persistence::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use floors::types::{Candidate, FloorError, PaidEvent, RevenuePrecision};

// ─────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────

/// Engine configuration. All values configurable at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Trailing window length in calendar days. Buckets older than
    /// `today − retention_days` are excluded from aggregation and purged
    /// on load. Default: 7 (typical user lifecycle).
    pub retention_days: u32,

    /// Blob-store key under which the state snapshot is persisted.
    pub storage_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retention_days: 7,
            storage_key: "floor_engine.state".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load overrides from environment variables (if set).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("FLOOR_RETENTION_DAYS") {
            if let Ok(days) = v.parse::<u32>() {
                cfg.retention_days = days;
            }
        }
        if let Ok(v) = std::env::var("FLOOR_STORAGE_KEY") {
            if !v.is_empty() {
                cfg.storage_key = v;
            }
        }
        cfg
    }
}
