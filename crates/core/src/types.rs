//! Core data types for the cross-venue analysis engine.

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Order size type.
pub type Size = f64;

/// Order size with ordering support, used as a map key.
pub type SizeKey = OrderedFloat<f64>;

/// Convert upstream float seconds to whole milliseconds.
#[inline]
pub fn secs_to_ms(secs: f64) -> TimestampMs {
    (secs * 1000.0).round() as TimestampMs
}

/// One of the two venues being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Exchange {
    /// Venue quoting instruments as `SYMBOL-YYYYMMDD-STRIKE-{C|P}`.
    A,
    /// Venue quoting instruments as `SYMBOL-DMONYY-STRIKE-{C|P}`.
    B,
}

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    /// Parse the single-letter suffix.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "C" => Some(OptionRight::Call),
            "P" => Some(OptionRight::Put),
            _ => None,
        }
    }

    /// Single-letter suffix.
    pub fn code(self) -> &'static str {
        match self {
            OptionRight::Call => "C",
            OptionRight::Put => "P",
        }
    }
}

/// A parsed option contract, independent of venue naming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionInstrument {
    /// Underlying symbol (e.g. "ETH").
    pub underlying: String,
    /// Expiry date.
    pub expiry: NaiveDate,
    /// Strike as written by the venue (digits only).
    pub strike: String,
    /// Call or put.
    pub right: OptionRight,
}

/// A single sample from the external query layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Timestamp in milliseconds.
    pub ts_ms: TimestampMs,
    /// Venue the sample came from.
    pub exchange: Exchange,
    /// Instrument as named by the venue.
    pub instrument: String,
    /// Observed value (price, size, spread, ...).
    pub value: f64,
}

/// A point of the reference price series used for unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    /// Timestamp in milliseconds.
    pub ts_ms: TimestampMs,
    /// Reference price.
    pub value: f64,
}

/// Values from both venues for one canonical instrument at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedObservation {
    /// Shared timestamp.
    pub ts_ms: TimestampMs,
    /// Canonical instrument.
    pub instrument: String,
    /// Venue A value.
    pub value_a: f64,
    /// Venue B value, converted by the reference price when one was supplied.
    pub value_b: f64,
    /// Instrument as named by venue A.
    pub instrument_a: String,
    /// Instrument as named by venue B.
    pub instrument_b: String,
    /// Reference price applied to `value_b` (None if unresolved or not used).
    pub reference_price: Option<f64>,
    /// Venue B value before conversion (only set when a reference was supplied).
    pub value_b_native: Option<f64>,
}

/// Correlation statistics for one canonical instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Canonical instrument.
    pub instrument: String,
    /// Number of paired observations.
    pub n: usize,
    /// Synchronous Pearson correlation (NaN if undefined).
    pub correlation: f64,
    /// Two-sided p-value of `correlation`.
    pub p_value: f64,
    /// Mean of (a - b).
    pub mean_diff: f64,
    /// Population std of (a - b).
    pub std_diff: f64,
    /// Mean of (a - b) / b * 100.
    pub mean_pct_diff: f64,
    /// Lag with maximal |correlation|. Positive: B leads. Negative: A leads.
    pub best_lag: i64,
    /// Correlation at `best_lag`.
    pub best_lag_correlation: f64,
    /// p-value at `best_lag`.
    pub best_lag_p_value: f64,
    /// Mean of venue A values.
    pub mean_a: f64,
    /// Mean of venue B values.
    pub mean_b: f64,
    /// Population std of venue A values.
    pub std_a: f64,
    /// Population std of venue B values.
    pub std_b: f64,
}

impl CorrelationResult {
    /// Whether the best lag is statistically significant at `alpha`.
    pub fn is_lag_significant(&self, alpha: f64) -> bool {
        self.best_lag_p_value < alpha
    }

    /// Interpret the best lag.
    pub fn lead_lag(&self, alpha: f64) -> LeadLag {
        if !self.is_lag_significant(alpha) {
            return LeadLag::NotSignificant;
        }
        match self.best_lag {
            0 => LeadLag::Synchronous,
            lag if lag > 0 => LeadLag::BLeads(lag.unsigned_abs()),
            lag => LeadLag::ALeads(lag.unsigned_abs()),
        }
    }
}

/// Interpreted lead-lag relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadLag {
    /// Venue A moves first by this many steps.
    ALeads(u64),
    /// Venue B moves first by this many steps.
    BLeads(u64),
    /// Best lag is zero.
    Synchronous,
    /// Best lag p-value is not below the significance level.
    NotSignificant,
}

/// One entry of a lead-lag scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LagCorrelation {
    /// Lag in steps.
    pub lag: i64,
    /// Correlation of the overlapping slices (0 if overlap too small).
    pub correlation: f64,
    /// p-value (1 if overlap too small).
    pub p_value: f64,
    /// Number of overlapping points.
    pub overlap: usize,
}

/// Presence of a tracked size at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    /// Tracked size.
    pub size: Size,
    /// Timestamp in milliseconds.
    pub ts_ms: TimestampMs,
    /// Whether the size was resting in the book.
    pub present: bool,
}

/// One observed order-book level for a fixed instrument/exchange.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevelSample {
    /// Timestamp in milliseconds.
    pub ts_ms: TimestampMs,
    /// Reported order size at the level.
    pub size: Size,
    /// Reported resting quantity.
    pub quantity: f64,
}

/// Presence fraction of one tracked size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceStats {
    pub size: Size,
    /// Fraction of timestamps at which the size was present (0-1).
    pub presence_fraction: f64,
    pub present_count: usize,
    pub total_count: usize,
}

/// Presence correlation between two tracked sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub size_1: Size,
    pub size_2: Size,
    pub correlation: f64,
    pub p_value: f64,
}

/// Co-occurrence between two tracked sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoOccurrencePair {
    pub size_1: Size,
    pub size_2: Size,
    /// both_present / either_present (0 if neither was ever present).
    pub co_occurrence_rate: f64,
    pub both_present: usize,
    pub either_present: usize,
}

/// Sizes inferred to belong to the same market maker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketMakerGroup {
    /// Member sizes, ascending.
    pub sizes: Vec<Size>,
    /// Mean presence fraction of the members.
    pub avg_presence_fraction: f64,
}

/// Sizes with similar presence percentages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceBand {
    /// Band centre in percent.
    pub band_pct: f64,
    /// Member sizes with their presence percentages.
    pub sizes: Vec<(Size, f64)>,
}
