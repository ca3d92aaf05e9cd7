//! Trailing-window performance tracker.
//!
//! One tracker per placement. Qualifying events land in per-day buckets;
//! the trailing CPM aggregates the buckets inside the retention window.
//! "No qualifying events in the window" is an explicit no-signal state
//! (`None`), never a numeric zero.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::types::{day_key, window_floor, DayKey};

/// Only USD events qualify; other currencies are not comparable.
pub const QUALIFYING_CURRENCY: &str = "USD";

/// Per-day counters. Created on the first qualifying event of a day,
/// mutated by further same-day events, never touched after purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBucket {
    /// Qualifying events that day (paid + no-fill).
    pub count: u64,
    /// Summed USD value in millionths of a dollar.
    pub revenue_micros: i64,
}

/// Day-keyed bucket map with trailing-window aggregation and eviction.
#[derive(Debug, Clone)]
pub struct PerformanceTracker {
    buckets: BTreeMap<DayKey, DailyBucket>,
    retention_days: u32,
}

impl PerformanceTracker {
    pub fn new(retention_days: u32) -> Self {
        Self {
            buckets: BTreeMap::new(),
            retention_days,
        }
    }

    /// Rebuild a tracker from persisted buckets. Caller runs `clean`
    /// afterward to drop days that went stale while persisted.
    pub fn from_buckets(buckets: BTreeMap<DayKey, DailyBucket>, retention_days: u32) -> Self {
        Self {
            buckets,
            retention_days,
        }
    }

    /// Record one event into today's bucket. Non-USD events are discarded
    /// with no state change. Returns whether the tracker mutated.
    pub fn record(&mut self, currency_code: &str, value_micros: i64, today: NaiveDate) -> bool {
        if currency_code != QUALIFYING_CURRENCY {
            trace!("discarding non-USD event | currency={currency_code}");
            return false;
        }
        let bucket = self.buckets.entry(day_key(today)).or_default();
        bucket.count += 1;
        bucket.revenue_micros += value_micros;
        true
    }

    /// Trailing average in dollars per thousand events over the retention
    /// window, or `None` when the window holds no qualifying events.
    pub fn trailing_cpm(&self, today: NaiveDate) -> Option<f64> {
        let min_day = window_floor(today, self.retention_days);
        let mut count: u64 = 0;
        let mut revenue_micros: i64 = 0;
        for bucket in self.buckets.range((Excluded(min_day), Unbounded)).map(|(_, b)| b) {
            count += bucket.count;
            revenue_micros += bucket.revenue_micros;
        }
        if count == 0 {
            return None;
        }
        Some(revenue_micros as f64 / 1_000_000.0 / count as f64 * 1000.0)
    }

    /// Physically delete every bucket at or before the window floor.
    /// Intended to run once per load, not per record.
    pub fn clean(&mut self, today: NaiveDate) {
        let min_day = window_floor(today, self.retention_days);
        self.buckets.retain(|day, _| *day > min_day);
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub(crate) fn buckets(&self) -> &BTreeMap<DayKey, DailyBucket> {
        &self.buckets
    }
}
