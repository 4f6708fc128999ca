//! Cross-venue analysis for the xvenue system.
//!
//! This crate handles:
//! - Pearson correlation with t-distribution p-values
//! - Lead-lag scanning over aligned option marks
//! - Batch summaries of correlation results
//! - Order-size presence fingerprinting
//! - Market-maker grouping over presence correlations

pub mod stats;
pub mod correlation;
pub mod summary;
pub mod presence;
pub mod clustering;
pub mod engine;

pub use stats::{pearson, Pearson};
pub use correlation::{select_best_lag, CorrelationEngine, RollingCorrelationPoint};
pub use summary::{sort_by_correlation_desc, CorrelationSummary};
pub use presence::{PresenceFingerprinter, PresenceMatrix, PresenceReport, PresenceSeries};
pub use clustering::{group_sizes, UnionFind};
pub use engine::{AnalysisEngine, CorrelationRun};
