//! Data ingestion and normalization for the cross-venue analysis engine.
//!
//! This crate handles:
//! - Instrument canonicalization across venue naming conventions
//! - Decoding query-range payloads into raw samples
//! - Reference price series selection
//! - Time alignment of per-venue samples into paired observations
//! - Percentage-return transformation

pub mod instrument;
pub mod payload;
pub mod reference;
pub mod aligner;
pub mod returns;

pub use instrument::{InstrumentCanonicalizer, InstrumentFormat};
pub use payload::{LabeledSample, QueryRangeResponse};
pub use reference::ReferenceSelector;
pub use aligner::{AlignmentStats, TimeSeriesAligner};
pub use returns::to_returns;
