//! Floor manager: the long-lived engine instance owned by the host.
//!
//! Owns one performance tracker per placement plus the candidate registry,
//! and coordinates persistence behind a dirty flag. The host constructs it
//! at startup, calls `load_from_storage`, registers candidates, then feeds
//! it outcomes and lifecycle transitions from a single thread.
//!
//! Dirty state machine: clean → (qualifying record) → dirty → (save
//! attempt, any outcome) → clean.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use chrono::{Local, NaiveDate};
use tracing::{error, info, trace, warn};

use super::lifecycle::LifecycleObserver;
use super::performance::{PerformanceTracker, QUALIFYING_CURRENCY};
use super::persistence::{BlobStore, PersistenceCoordinator, SnapshotV1};
use super::registry::CandidateRegistry;
use super::types::{Candidate, FloorError, PaidEvent};
use crate::EngineConfig;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct FloorManager {
    cfg: EngineConfig,
    trackers: HashMap<String, PerformanceTracker>,
    registry: CandidateRegistry,
    persistence: PersistenceCoordinator,
    dirty: bool,
}

impl FloorManager {
    pub fn new(cfg: EngineConfig, store: Box<dyn BlobStore>) -> Self {
        let persistence = PersistenceCoordinator::new(store, cfg.storage_key.clone());
        Self {
            cfg,
            trackers: HashMap::new(),
            registry: CandidateRegistry::new(),
            persistence,
            dirty: false,
        }
    }

    // ─────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────

    /// Register the floor candidates for a placement, exactly once, before
    /// any request for it. Re-registration is a caller bug and fails loud.
    pub fn register_candidates(
        &mut self,
        placement: &str,
        candidates: Vec<Candidate>,
    ) -> Result<(), FloorError> {
        self.registry.register(placement, candidates)
    }

    // ─────────────────────────────────────────────────────
    // Recording
    // ─────────────────────────────────────────────────────

    /// Record a no-fill: a qualifying zero-value USD event. No-fills count
    /// toward the denominator of the trailing average.
    pub fn record_no_fill(&mut self, placement: &str) {
        self.record_event(placement, QUALIFYING_CURRENCY, 0);
    }

    /// Record a paid impression. Only `Estimated` and `PublisherProvided`
    /// precisions qualify; the rest are not waterfall-comparable and are
    /// discarded without touching state.
    pub fn record_paid(&mut self, placement: &str, event: &PaidEvent) {
        if !event.precision.is_comparable() {
            trace!(
                "discarding non-comparable paid event | placement={placement} precision={:?}",
                event.precision
            );
            return;
        }
        self.record_event(placement, &event.currency_code, event.value_micros);
    }

    fn record_event(&mut self, placement: &str, currency_code: &str, value_micros: i64) {
        let day = today();
        match self.trackers.get_mut(placement) {
            Some(tracker) => {
                if tracker.record(currency_code, value_micros, day) {
                    self.dirty = true;
                }
            }
            None => {
                // Only insert a tracker once an event actually records, so a
                // discarded event leaves no trace in dumps or snapshots.
                let mut tracker = PerformanceTracker::new(self.cfg.retention_days);
                if tracker.record(currency_code, value_micros, day) {
                    self.trackers.insert(placement.to_string(), tracker);
                    self.dirty = true;
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────
    // Selection
    // ─────────────────────────────────────────────────────

    /// Decide which candidate to request next. Read-only: never mutates
    /// state or the dirty flag. Returns `None` when the placement has no
    /// tracker, no registered candidates, or no trailing signal.
    pub fn get_candidate(&self, placement: &str) -> Option<&Candidate> {
        let tracker = self.trackers.get(placement)?;
        let trailing = tracker.trailing_cpm(today());
        self.registry.select(placement, trailing)
    }

    // ─────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────

    /// Load persisted state. Absent blob starts empty; a malformed blob is
    /// logged and reset to empty, never partially recovered. Stale days are
    /// purged here, once per load.
    pub fn load_from_storage(&mut self) {
        self.trackers.clear();
        match self.persistence.load() {
            Ok(Some(snapshot)) => {
                let day = today();
                for (placement, buckets) in snapshot.placements {
                    let mut tracker =
                        PerformanceTracker::from_buckets(buckets, self.cfg.retention_days);
                    tracker.clean(day);
                    self.trackers.insert(placement, tracker);
                }
                info!(
                    "💾 Floor state loaded | placements={}",
                    self.trackers.len()
                );
            }
            Ok(None) => {
                info!("💾 No persisted floor state, starting empty");
            }
            Err(err) => {
                error!("corrupt floor snapshot, resetting to empty: {err:#}");
            }
        }
        self.dirty = false;
    }

    /// Flush state if dirty. A failed save is logged, not retried; either
    /// way the dirty flag clears and unsaved deltas are lost on next load.
    pub fn save_to_storage(&mut self) {
        if !self.dirty {
            return;
        }
        let snapshot = self.snapshot();
        match self.persistence.persist(&snapshot) {
            Ok(()) => info!(
                "💾 Floor state saved | placements={}",
                snapshot.placements.len()
            ),
            Err(err) => warn!("floor snapshot save failed, deltas dropped: {err:#}"),
        }
        self.dirty = false;
    }

    /// Delete the persisted blob and reinitialize to empty.
    pub fn clear_storage(&mut self) {
        if let Err(err) = self.persistence.clear() {
            warn!("failed to delete floor snapshot: {err:#}");
        }
        self.trackers.clear();
        self.dirty = false;
        info!("🧹 Floor state cleared");
    }

    fn snapshot(&self) -> SnapshotV1 {
        let placements: BTreeMap<_, _> = self
            .trackers
            .iter()
            .map(|(placement, tracker)| (placement.clone(), tracker.buckets().clone()))
            .collect();
        SnapshotV1::new(placements)
    }

    // ─────────────────────────────────────────────────────
    // Debug / introspection
    // ─────────────────────────────────────────────────────

    /// Trailing CPM for display. Returns `0.0` for an unknown placement or
    /// an empty window — a UI convenience only. Selection goes through
    /// `get_candidate`, which keeps no-signal distinct from zero.
    pub fn trailing_cpm(&self, placement: &str) -> f64 {
        self.trackers
            .get(placement)
            .and_then(|t| t.trailing_cpm(today()))
            .unwrap_or(0.0)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Human-readable dump of full engine state.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "FloorManager | dirty={} placements={}",
            self.dirty,
            self.trackers.len()
        );

        let mut placements: Vec<&String> = self.trackers.keys().collect();
        placements.sort();
        for placement in placements {
            let tracker = &self.trackers[placement];
            let trailing = tracker
                .trailing_cpm(today())
                .map(|v| format!("{v:.4}"))
                .unwrap_or_else(|| "no-signal".to_string());
            let _ = writeln!(out, "  placement={placement} trailing={trailing}");

            if let Some(candidates) = self.registry.candidates(placement) {
                let ladder: Vec<String> = candidates
                    .iter()
                    .map(|c| format!("{:.3}→{}", c.cpm, c.ad_unit))
                    .collect();
                let _ = writeln!(out, "    candidates: {}", ladder.join(" "));
            } else {
                let _ = writeln!(out, "    candidates: (unregistered)");
            }

            for (day, bucket) in tracker.buckets() {
                let _ = writeln!(
                    out,
                    "    day={day} count={} revenue_micros={}",
                    bucket.count, bucket.revenue_micros
                );
            }
        }
        out
    }
}

impl LifecycleObserver for FloorManager {
    fn on_background(&mut self) {
        self.save_to_storage();
    }

    fn on_terminate(&mut self) {
        self.save_to_storage();
    }
}
