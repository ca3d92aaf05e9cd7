//! Shared types: revenue events, floor candidates, calendar day keys.

use chrono::{Datelike, Days, NaiveDate};
use thiserror::Error;

/// Calendar day in integer `YYYYMMDD` form (local time). Integer order
/// matches date order, so window comparisons work directly on the key.
pub type DayKey = i32;

/// Convert a calendar date to its `YYYYMMDD` key.
pub fn day_key(date: NaiveDate) -> DayKey {
    date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32
}

/// Oldest day key still inside the trailing window: buckets with key
/// strictly greater than this are aggregated, the rest are stale.
pub fn window_floor(today: NaiveDate, retention_days: u32) -> DayKey {
    let min_day = today
        .checked_sub_days(Days::new(retention_days as u64))
        .unwrap_or(today);
    day_key(min_day)
}

/// How a paid event's value was derived by the mediation layer.
///
/// Only waterfall-comparable values feed the trailing average:
/// `Estimated` and `PublisherProvided`. `Exact` and `Unknown` come from
/// non-waterfall paths and do not reflect demand pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevenuePrecision {
    Estimated,
    PublisherProvided,
    Exact,
    Unknown,
}

impl RevenuePrecision {
    /// Whether this precision class is a comparable demand-pressure signal.
    pub fn is_comparable(&self) -> bool {
        matches!(
            self,
            RevenuePrecision::Estimated | RevenuePrecision::PublisherProvided
        )
    }
}

/// Paid-impression event as supplied by the ad SDK.
#[derive(Debug, Clone)]
pub struct PaidEvent {
    /// ISO currency code. Anything other than `"USD"` is discarded.
    pub currency_code: String,
    /// Value in millionths of one currency unit.
    pub value_micros: i64,
    pub precision: RevenuePrecision,
}

/// One price-floor variant: the floor price and the concrete ad unit
/// to request for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Floor price in dollars per thousand events. Finite, non-negative.
    pub cpm: f64,
    /// Opaque ad-unit identifier to request when this variant is chosen.
    pub ad_unit: String,
}

impl Candidate {
    pub fn new(cpm: f64, ad_unit: impl Into<String>) -> Self {
        Self {
            cpm,
            ad_unit: ad_unit.into(),
        }
    }
}

/// Configuration errors surfaced at registration time. These indicate a
/// caller bug and are deliberately loud, unlike data-integrity failures
/// which are contained and logged.
#[derive(Debug, Error)]
pub enum FloorError {
    #[error("candidates already registered for placement `{0}`")]
    DuplicateRegistration(String),

    #[error("invalid cpm {cpm} for ad unit `{ad_unit}`: must be finite and non-negative")]
    InvalidCpm { cpm: f64, ad_unit: String },
}
