//! Order-size presence fingerprinting.
//!
//! Market makers tend to quote recognisable sizes. Tracking when each size is
//! resting in one instrument's book, and how the presence of different sizes
//! moves together, hints at which sizes belong to the same participant.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};
use xvenue_core::config::PresenceConfig;
use xvenue_core::{
    BookLevelSample, CoOccurrencePair, CorrelationPair, MarketMakerGroup, PresenceBand,
    PresenceRecord, PresenceStats, Size, SizeKey, TimestampMs,
};

use crate::clustering::group_sizes;
use crate::stats::pearson;

/// Per-size presence series keyed by tracked size.
pub type PresenceSeries = BTreeMap<SizeKey, Vec<PresenceRecord>>;

/// Boolean presence over the union of observed timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceMatrix {
    /// Every timestamp observed for any tracked size, ascending.
    pub timestamps: Vec<TimestampMs>,
    /// Tracked sizes, ascending.
    pub sizes: Vec<Size>,
    /// `rows[i][t]`: size `i` present at `timestamps[t]`.
    pub rows: Vec<Vec<bool>>,
}

/// All presence tables for one instrument/exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceReport {
    pub stats: Vec<PresenceStats>,
    pub correlations: Vec<CorrelationPair>,
    pub co_occurrences: Vec<CoOccurrencePair>,
    pub groups: Vec<MarketMakerGroup>,
}

/// Presence fingerprinter.
#[derive(Debug, Clone)]
pub struct PresenceFingerprinter {
    config: PresenceConfig,
}

impl PresenceFingerprinter {
    /// Create a new fingerprinter.
    pub fn new(config: PresenceConfig) -> Self {
        Self { config }
    }

    /// Whether a reported level size counts as the tracked size.
    #[inline]
    pub fn matches(&self, level_size: Size, target: Size) -> bool {
        let tolerance = self.config.tolerance;
        level_size == target
            || (level_size > target - tolerance && level_size < target + tolerance)
    }

    /// Derive presence records from raw order-book levels.
    ///
    /// A record is emitted for each timestamp at which some level matched the
    /// tracked size; it is present if any matching level rests a positive
    /// quantity. Tracked sizes that never match keep an empty series.
    pub fn presence_from_levels(
        &self,
        tracked_sizes: &[Size],
        levels: &[BookLevelSample],
    ) -> PresenceSeries {
        let mut series = PresenceSeries::new();
        for &target in tracked_sizes {
            let mut by_ts: BTreeMap<TimestampMs, bool> = BTreeMap::new();
            for level in levels.iter().filter(|l| self.matches(l.size, target)) {
                *by_ts.entry(level.ts_ms).or_insert(false) |= level.quantity > 0.0;
            }
            let records = by_ts
                .into_iter()
                .map(|(ts_ms, present)| PresenceRecord {
                    size: target,
                    ts_ms,
                    present,
                })
                .collect();
            series.insert(OrderedFloat(target), records);
        }
        series
    }

    /// Build the presence matrix. Unreported timestamps count as absent.
    pub fn build_matrix(&self, series: &PresenceSeries) -> PresenceMatrix {
        let timestamps: Vec<TimestampMs> = series
            .values()
            .flatten()
            .map(|r| r.ts_ms)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let position: BTreeMap<TimestampMs, usize> =
            timestamps.iter().enumerate().map(|(i, &ts)| (ts, i)).collect();

        let mut sizes = Vec::with_capacity(series.len());
        let mut rows = Vec::with_capacity(series.len());
        for (size, records) in series {
            let mut row = vec![false; timestamps.len()];
            for record in records.iter().filter(|r| r.present) {
                if let Some(&i) = position.get(&record.ts_ms) {
                    row[i] = true;
                }
            }
            sizes.push(size.0);
            rows.push(row);
        }

        PresenceMatrix {
            timestamps,
            sizes,
            rows,
        }
    }

    /// Compute presence statistics, pairwise tables and market-maker groups.
    pub fn fingerprint(&self, series: &PresenceSeries) -> PresenceReport {
        let matrix = self.build_matrix(series);
        let total = matrix.timestamps.len();

        let stats: Vec<PresenceStats> = matrix
            .sizes
            .iter()
            .zip(&matrix.rows)
            .map(|(&size, row)| {
                let present_count = row.iter().filter(|&&p| p).count();
                PresenceStats {
                    size,
                    presence_fraction: if total > 0 {
                        present_count as f64 / total as f64
                    } else {
                        0.0
                    },
                    present_count,
                    total_count: total,
                }
            })
            .collect();

        let numeric: Vec<Vec<f64>> = matrix
            .rows
            .iter()
            .map(|row| row.iter().map(|&p| if p { 1.0 } else { 0.0 }).collect())
            .collect();

        let mut correlations = Vec::new();
        let mut co_occurrences = Vec::new();
        for i in 0..matrix.sizes.len() {
            for j in (i + 1)..matrix.sizes.len() {
                let (size_1, size_2) = (matrix.sizes[i], matrix.sizes[j]);

                let p = pearson(&numeric[i], &numeric[j]);
                correlations.push(CorrelationPair {
                    size_1,
                    size_2,
                    correlation: p.r,
                    p_value: p.p_value,
                });

                let (mut both_present, mut either_present) = (0, 0);
                for (&x, &y) in matrix.rows[i].iter().zip(&matrix.rows[j]) {
                    both_present += usize::from(x && y);
                    either_present += usize::from(x || y);
                }
                co_occurrences.push(CoOccurrencePair {
                    size_1,
                    size_2,
                    co_occurrence_rate: if either_present > 0 {
                        both_present as f64 / either_present as f64
                    } else {
                        0.0
                    },
                    both_present,
                    either_present,
                });
            }
        }

        let groups = group_sizes(
            &stats,
            &correlations,
            self.config.cluster_min_correlation,
            self.config.cluster_max_p_value,
        );

        info!(
            sizes = stats.len(),
            timestamps = total,
            groups = groups.len(),
            "fingerprinted order-size presence"
        );

        PresenceReport {
            stats,
            correlations,
            co_occurrences,
            groups,
        }
    }

    /// Group sizes whose presence percentages round to the same band.
    ///
    /// Only bands holding more than one size are returned, highest first.
    /// Rounding is half-to-even.
    pub fn presence_bands(&self, stats: &[PresenceStats]) -> Vec<PresenceBand> {
        let width = self.config.band_width_pct;
        let mut bands: BTreeMap<OrderedFloat<f64>, Vec<(Size, f64)>> = BTreeMap::new();
        for s in stats {
            let pct = s.presence_fraction * 100.0;
            let band = (pct / width).round_ties_even() * width;
            bands.entry(OrderedFloat(band)).or_default().push((s.size, pct));
        }

        let bands: Vec<PresenceBand> = bands
            .into_iter()
            .rev()
            .filter(|(_, sizes)| sizes.len() > 1)
            .map(|(band, sizes)| PresenceBand {
                band_pct: band.0,
                sizes,
            })
            .collect();
        debug!(bands = bands.len(), "banded sizes by presence");
        bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn fingerprinter() -> PresenceFingerprinter {
        PresenceFingerprinter::new(PresenceConfig::default())
    }

    fn series_from(size: f64, pattern: &[bool]) -> (SizeKey, Vec<PresenceRecord>) {
        let records = pattern
            .iter()
            .enumerate()
            .map(|(i, &present)| PresenceRecord {
                size,
                ts_ms: i as i64 * 5_000,
                present,
            })
            .collect();
        (OrderedFloat(size), records)
    }

    #[test]
    fn test_tolerance_matching() {
        let f = fingerprinter();
        assert!(f.matches(10.0, 10.0));
        assert!(f.matches(10.05, 10.0));
        assert!(f.matches(9.95, 10.0));
        assert!(!f.matches(10.2, 10.0));
        assert!(!f.matches(9.8, 10.0));
    }

    #[test]
    fn test_tolerance_band_is_open() {
        let f = fingerprinter();
        // 10.1 - 10.0 is just below 0.1 in floating point; the band edge
        // itself must still be excluded.
        assert!(!f.matches(10.1, 10.0));
        assert!(!f.matches(9.9, 10.0));
        assert!(f.matches(10.09, 10.0));
    }

    #[test]
    fn test_presence_from_levels() {
        let f = fingerprinter();
        let levels = vec![
            BookLevelSample { ts_ms: 0, size: 10.0, quantity: 10.0 },
            BookLevelSample { ts_ms: 0, size: 25.02, quantity: 25.02 },
            BookLevelSample { ts_ms: 5_000, size: 10.0, quantity: 0.0 },
            BookLevelSample { ts_ms: 10_000, size: 7.0, quantity: 7.0 },
            BookLevelSample { ts_ms: 15_000, size: 9.97, quantity: 9.97 },
        ];
        let series = f.presence_from_levels(&[10.0, 25.0, 50.0], &levels);

        let ten = &series[&OrderedFloat(10.0)];
        assert_eq!(ten.len(), 3);
        assert!(ten[0].present);
        assert!(!ten[1].present);
        assert_eq!(ten[2].ts_ms, 15_000);
        assert!(ten[2].present);

        assert_eq!(series[&OrderedFloat(25.0)].len(), 1);
        assert!(series[&OrderedFloat(50.0)].is_empty());
    }

    #[test]
    fn test_matrix_union_of_timestamps() {
        let f = fingerprinter();
        let mut series = PresenceSeries::new();
        series.insert(
            OrderedFloat(1.0),
            vec![PresenceRecord { size: 1.0, ts_ms: 0, present: true }],
        );
        series.insert(
            OrderedFloat(2.0),
            vec![PresenceRecord { size: 2.0, ts_ms: 5_000, present: true }],
        );
        let matrix = f.build_matrix(&series);

        assert_eq!(matrix.timestamps, vec![0, 5_000]);
        assert_eq!(matrix.rows[0], vec![true, false]);
        assert_eq!(matrix.rows[1], vec![false, true]);
    }

    #[test]
    fn test_identical_presence_grouped() {
        let f = fingerprinter();
        let pattern: Vec<bool> = (0..40).map(|i| (i / 4) % 2 == 0).collect();
        let other: Vec<bool> = (0..40).map(|i| i % 3 == 0).collect();

        let series: PresenceSeries = vec![
            series_from(1.0, &pattern),
            series_from(2.5, &pattern),
            series_from(7.0, &other),
        ]
        .into_iter()
        .collect();
        let report = f.fingerprint(&series);

        assert_eq!(report.stats.len(), 3);
        assert_relative_eq!(report.stats[0].presence_fraction, 0.5);
        assert_eq!(report.stats[0].present_count, 20);
        assert_eq!(report.stats[0].total_count, 40);

        assert_eq!(report.correlations.len(), 3);
        let pair = &report.correlations[0];
        assert_eq!((pair.size_1, pair.size_2), (1.0, 2.5));
        assert_relative_eq!(pair.correlation, 1.0, epsilon = 1e-12);
        assert!(pair.p_value < 0.05);

        let co = &report.co_occurrences[0];
        assert_relative_eq!(co.co_occurrence_rate, 1.0);
        assert_eq!(co.both_present, 20);

        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.groups[0].sizes, vec![1.0, 2.5]);
        assert_relative_eq!(report.groups[0].avg_presence_fraction, 0.5);
        assert_eq!(report.groups[1].sizes, vec![7.0]);
    }

    #[test]
    fn test_independent_random_presence_not_grouped() {
        let f = fingerprinter();
        let mut rng = StdRng::seed_from_u64(2024);
        let x: Vec<bool> = (0..2000).map(|_| rng.gen_bool(0.5)).collect();
        let y: Vec<bool> = (0..2000).map(|_| rng.gen_bool(0.5)).collect();

        let series: PresenceSeries = vec![series_from(1.0, &x), series_from(2.0, &y)]
            .into_iter()
            .collect();
        let report = f.fingerprint(&series);

        assert!(report.correlations[0].correlation.abs() < 0.1);
        assert_eq!(report.groups.len(), 2);
    }

    #[test]
    fn test_never_present_pair() {
        let f = fingerprinter();
        let series: PresenceSeries = vec![
            series_from(1.0, &[false, false, false]),
            series_from(2.0, &[false, false, false]),
        ]
        .into_iter()
        .collect();
        let report = f.fingerprint(&series);

        assert!(report.correlations[0].correlation.is_nan());
        assert_eq!(report.co_occurrences[0].co_occurrence_rate, 0.0);
        assert_eq!(report.co_occurrences[0].either_present, 0);
        assert_eq!(report.groups.len(), 2);
    }

    #[test]
    fn test_co_occurrence_rate() {
        let f = fingerprinter();
        let series: PresenceSeries = vec![
            series_from(1.0, &[true, true, false, false]),
            series_from(2.0, &[true, false, true, false]),
        ]
        .into_iter()
        .collect();
        let co = &f.fingerprint(&series).co_occurrences[0];
        assert_eq!(co.both_present, 1);
        assert_eq!(co.either_present, 3);
        assert_relative_eq!(co.co_occurrence_rate, 1.0 / 3.0);
    }

    #[test]
    fn test_empty_series() {
        let report = fingerprinter().fingerprint(&PresenceSeries::new());
        assert!(report.stats.is_empty());
        assert!(report.groups.is_empty());
    }

    #[test]
    fn test_presence_bands() {
        let f = fingerprinter();
        let stats: Vec<PresenceStats> = [(1.0, 0.51), (2.0, 0.49), (3.0, 0.125), (4.0, 0.9)]
            .iter()
            .map(|&(size, presence_fraction)| PresenceStats {
                size,
                presence_fraction,
                present_count: 0,
                total_count: 100,
            })
            .collect();
        let bands = f.presence_bands(&stats);

        // 51% and 49% both land in the 50% band; 12.5% rounds half-to-even to 10%.
        assert_eq!(bands.len(), 1);
        assert_relative_eq!(bands[0].band_pct, 50.0);
        let sizes: Vec<f64> = bands[0].sizes.iter().map(|(s, _)| *s).collect();
        assert_eq!(sizes, vec![1.0, 2.0]);
    }
}
