//! Reference price series selection.
//!
//! Venue B quotes options in the underlying asset, so its prices are converted
//! into the quote currency by multiplying with a spot (or perpetual) series.

use std::collections::BTreeSet;
use tracing::{info, warn};
use xvenue_core::config::AlignmentConfig;
use xvenue_core::ReferencePoint;

use crate::payload::LabeledSample;

/// The chosen reference series.
#[derive(Debug, Clone)]
pub struct ReferenceSeries {
    /// Instrument the series was taken from.
    pub instrument: String,
    /// Reference points in input order.
    pub points: Vec<ReferencePoint>,
}

/// Picks a reference series out of decoded samples.
#[derive(Debug, Clone)]
pub struct ReferenceSelector {
    /// Instruments to try, in priority order.
    candidates: Vec<String>,
    /// Underlying prefix for the perpetual fallback.
    underlying: String,
    /// Marker identifying perpetual instruments.
    perpetual_marker: String,
}

impl ReferenceSelector {
    /// Create a selector.
    pub fn new(
        candidates: Vec<String>,
        underlying: impl Into<String>,
        perpetual_marker: impl Into<String>,
    ) -> Self {
        Self {
            candidates,
            underlying: underlying.into(),
            perpetual_marker: perpetual_marker.into(),
        }
    }

    /// Create a selector from alignment configuration.
    pub fn from_config(config: &AlignmentConfig) -> Self {
        Self::new(
            config.reference_candidates.clone(),
            config.reference_underlying.clone(),
            config.perpetual_marker.clone(),
        )
    }

    /// Select the reference series.
    ///
    /// The first candidate with any samples wins. Otherwise the
    /// lexicographically first instrument that starts with the underlying and
    /// contains the perpetual marker is used.
    pub fn select(&self, samples: &[LabeledSample]) -> Option<ReferenceSeries> {
        for candidate in &self.candidates {
            let points = points_for(samples, candidate);
            if !points.is_empty() {
                info!(instrument = %candidate, points = points.len(), "selected reference series");
                return Some(ReferenceSeries {
                    instrument: candidate.clone(),
                    points,
                });
            }
        }

        let perpetuals: BTreeSet<&str> = samples
            .iter()
            .map(|s| s.instrument.as_str())
            .filter(|i| i.starts_with(&self.underlying) && i.contains(&self.perpetual_marker))
            .collect();

        if let Some(instrument) = perpetuals.into_iter().next() {
            let points = points_for(samples, instrument);
            info!(instrument, points = points.len(), "selected perpetual as reference series");
            return Some(ReferenceSeries {
                instrument: instrument.to_string(),
                points,
            });
        }

        warn!(
            underlying = %self.underlying,
            "no reference series found; venue B values stay in native units"
        );
        None
    }
}

fn points_for(samples: &[LabeledSample], instrument: &str) -> Vec<ReferencePoint> {
    samples
        .iter()
        .filter(|s| s.instrument == instrument)
        .map(|s| ReferencePoint {
            ts_ms: s.ts_ms,
            value: s.value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts_ms: i64, instrument: &str, value: f64) -> LabeledSample {
        LabeledSample {
            ts_ms,
            exchange: Some("deribit".to_string()),
            instrument: instrument.to_string(),
            value,
        }
    }

    #[test]
    fn test_first_candidate_wins() {
        let selector = ReferenceSelector::from_config(&AlignmentConfig::default());
        let samples = vec![
            sample(0, "ETH-PERPETUAL", 2500.0),
            sample(0, "ETH-SPOT", 2501.0),
            sample(10_000, "ETH-SPOT", 2502.0),
        ];
        let series = selector.select(&samples).unwrap();
        assert_eq!(series.instrument, "ETH-SPOT");
        assert_eq!(series.points.len(), 2);
    }

    #[test]
    fn test_perpetual_fallback() {
        let selector = ReferenceSelector::new(vec!["ETH-SPOT".to_string()], "ETH", "PERP");
        let samples = vec![
            sample(0, "ETH-FS-6JUN25_PERP", 2400.0),
            sample(0, "ETH-FS-30MAY25_PERP", 2410.0),
            sample(0, "BTC-PERPETUAL", 100_000.0),
            sample(0, "ETH-20250531-2700-C", 100.0),
        ];
        let series = selector.select(&samples).unwrap();
        assert_eq!(series.instrument, "ETH-FS-30MAY25_PERP");
        assert_eq!(series.points.len(), 1);
        assert!((series.points[0].value - 2410.0).abs() < 1e-12);
    }

    #[test]
    fn test_nothing_found() {
        let selector = ReferenceSelector::from_config(&AlignmentConfig::default());
        let samples = vec![sample(0, "ETH-20250531-2700-C", 100.0)];
        assert!(selector.select(&samples).is_none());
    }
}
