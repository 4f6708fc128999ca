//! Batch-level summary over correlation results.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use xvenue_core::CorrelationResult;

use crate::stats::mean;

/// Aggregate view over one batch of correlation results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationSummary {
    /// Instruments with a result row.
    pub instruments: usize,
    /// Mean synchronous correlation (NaN rows excluded).
    pub avg_correlation: f64,
    /// Instruments with correlation > 0.9.
    pub above_0_90: usize,
    /// Instruments with correlation > 0.95.
    pub above_0_95: usize,
    /// Mean |mean_diff|.
    pub avg_abs_mean_diff: f64,
    /// Mean |mean_pct_diff|.
    pub avg_abs_pct_diff: f64,
}

impl CorrelationSummary {
    /// Summarize a batch of results.
    pub fn from_results(results: &[CorrelationResult]) -> Self {
        let defined = |xs: Vec<f64>| -> Vec<f64> { xs.into_iter().filter(|x| !x.is_nan()).collect() };

        let correlations = defined(results.iter().map(|r| r.correlation).collect());
        let abs_diffs = defined(results.iter().map(|r| r.mean_diff.abs()).collect());
        let abs_pct = defined(results.iter().map(|r| r.mean_pct_diff.abs()).collect());

        Self {
            instruments: results.len(),
            avg_correlation: mean(&correlations),
            above_0_90: correlations.iter().filter(|&&c| c > 0.9).count(),
            above_0_95: correlations.iter().filter(|&&c| c > 0.95).count(),
            avg_abs_mean_diff: mean(&abs_diffs),
            avg_abs_pct_diff: mean(&abs_pct),
        }
    }
}

/// Order results by descending correlation, undefined correlations last.
pub fn sort_by_correlation_desc(results: &mut [CorrelationResult]) {
    results.sort_by(|a, b| match (a.correlation.is_nan(), b.correlation.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.correlation.total_cmp(&a.correlation),
    });
}
