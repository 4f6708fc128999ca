//! Cross-venue correlation and lead-lag search.
//!
//! For every canonical instrument with enough paired observations this
//! computes the synchronous Pearson correlation, price-difference statistics
//! and the lag (in sampling steps) that maximizes |correlation|.
//!
//! Lag convention: a negative lag compares `a[0..n+lag]` with `b[-lag..n]`
//! (venue A leads), a positive lag compares `a[lag..n]` with `b[0..n-lag]`
//! (venue B leads).

use std::collections::BTreeMap;
use tracing::debug;
use xvenue_core::config::CorrelationConfig;
use xvenue_core::{
    CorrelationResult, Error, LagCorrelation, LeadLag, PairedObservation, Result, TimestampMs,
};

use crate::stats::{mean, pearson, rolling_correlation, std_dev};

/// One point of a rolling correlation series.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct RollingCorrelationPoint {
    pub ts_ms: TimestampMs,
    pub correlation: f64,
}

/// Correlation engine.
#[derive(Debug, Clone)]
pub struct CorrelationEngine {
    config: CorrelationConfig,
}

impl CorrelationEngine {
    /// Create a new correlation engine.
    pub fn new(config: CorrelationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    /// Analyze paired observations, one result per instrument.
    ///
    /// Instruments with fewer than `min_samples` observations are skipped.
    /// Results are ordered by instrument.
    pub fn analyze(
        &self,
        observations: &[PairedObservation],
        instrument_filter: Option<&str>,
    ) -> Vec<CorrelationResult> {
        let groups = group_by_instrument(observations, instrument_filter);

        let mut results = Vec::with_capacity(groups.len());
        for (instrument, rows) in groups {
            let values_a: Vec<f64> = rows.iter().map(|o| o.value_a).collect();
            let values_b: Vec<f64> = rows.iter().map(|o| o.value_b).collect();

            match self.analyze_series(instrument, &values_a, &values_b) {
                Ok(result) => {
                    if result.correlation.is_nan() {
                        debug!(instrument, n = result.n, "correlation undefined");
                    } else {
                        debug!(
                            instrument,
                            n = result.n,
                            best_lag = result.best_lag,
                            lead_lag = ?self.lead_lag(&result),
                            "analyzed instrument"
                        );
                    }
                    results.push(result);
                }
                Err(e) => debug!(instrument, error = %e, "skipping instrument"),
            }
        }
        results
    }

    /// Analyze one instrument's time-ordered value series.
    ///
    /// Fails with `Error::InsufficientData` below `min_samples` points.
    pub fn analyze_series(
        &self,
        instrument: &str,
        values_a: &[f64],
        values_b: &[f64],
    ) -> Result<CorrelationResult> {
        let n = values_a.len().min(values_b.len());
        if n < self.config.min_samples {
            return Err(Error::insufficient_data(format!(
                "{instrument}: {n} paired observations, need {}",
                self.config.min_samples
            )));
        }
        let (values_a, values_b) = (&values_a[..n], &values_b[..n]);

        let sync = pearson(values_a, values_b);

        let diffs: Vec<f64> = values_a.iter().zip(values_b).map(|(a, b)| a - b).collect();
        let pct_diffs: Vec<f64> = values_a
            .iter()
            .zip(values_b)
            .map(|(a, b)| (a - b) / b * 100.0)
            .collect();

        let profile = self.lag_profile(values_a, values_b);
        let best = select_best_lag(&profile).unwrap_or(LagCorrelation {
            lag: 0,
            correlation: f64::NAN,
            p_value: f64::NAN,
            overlap: n,
        });

        Ok(CorrelationResult {
            instrument: instrument.to_string(),
            n,
            correlation: sync.r,
            p_value: sync.p_value,
            mean_diff: mean(&diffs),
            std_diff: std_dev(&diffs),
            mean_pct_diff: mean(&pct_diffs),
            best_lag: best.lag,
            best_lag_correlation: best.correlation,
            best_lag_p_value: best.p_value,
            mean_a: mean(values_a),
            mean_b: mean(values_b),
            std_a: std_dev(values_a),
            std_b: std_dev(values_b),
        })
    }

    /// Interpret a result's best lag at the configured significance level.
    pub fn lead_lag(&self, result: &CorrelationResult) -> LeadLag {
        result.lead_lag(self.config.significance_level)
    }

    /// Lead-lag search radius for a series of length `n`.
    pub fn max_lag(&self, n: usize) -> usize {
        self.config.max_lag_cap.min(n / self.config.lag_divisor)
    }

    /// Correlation at every lag in `[-max_lag, max_lag]`, ascending.
    pub fn lag_profile(&self, values_a: &[f64], values_b: &[f64]) -> Vec<LagCorrelation> {
        let n = values_a.len().min(values_b.len());
        let max_lag = self.max_lag(n) as i64;

        (-max_lag..=max_lag)
            .map(|lag| {
                let shift = lag.unsigned_abs() as usize;
                let overlap = n.saturating_sub(shift);
                let (x, y) = if lag < 0 {
                    (&values_a[..overlap], &values_b[shift..n])
                } else if lag > 0 {
                    (&values_a[shift..n], &values_b[..overlap])
                } else {
                    (&values_a[..n], &values_b[..n])
                };

                if overlap < self.config.min_overlap {
                    return LagCorrelation {
                        lag,
                        correlation: 0.0,
                        p_value: 1.0,
                        overlap,
                    };
                }
                let p = pearson(x, y);
                LagCorrelation {
                    lag,
                    correlation: p.r,
                    p_value: p.p_value,
                    overlap,
                }
            })
            .collect()
    }

    /// Trailing-window correlation for one instrument.
    ///
    /// Empty unless the instrument has more than `rolling_window` observations.
    pub fn rolling_correlation(
        &self,
        observations: &[PairedObservation],
        instrument: &str,
    ) -> Vec<RollingCorrelationPoint> {
        let groups = group_by_instrument(observations, Some(instrument));
        let Some(rows) = groups.get(instrument) else {
            return Vec::new();
        };
        let window = self.config.rolling_window;
        if rows.len() <= window {
            return Vec::new();
        }

        let values_a: Vec<f64> = rows.iter().map(|o| o.value_a).collect();
        let values_b: Vec<f64> = rows.iter().map(|o| o.value_b).collect();
        rolling_correlation(&values_a, &values_b, window)
            .into_iter()
            .zip(rows.iter())
            .skip(window - 1)
            .map(|(correlation, obs)| RollingCorrelationPoint {
                ts_ms: obs.ts_ms,
                correlation,
            })
            .collect()
    }
}

/// Pick the lag with maximal |correlation|.
///
/// The first lag in ascending order wins ties. A NaN correlation at any lag
/// leaves the whole scan undefined and yields `None`.
pub fn select_best_lag(profile: &[LagCorrelation]) -> Option<LagCorrelation> {
    if profile.iter().any(|entry| entry.correlation.is_nan()) {
        return None;
    }
    let mut best: Option<LagCorrelation> = None;
    for entry in profile {
        match best {
            Some(b) if entry.correlation.abs() <= b.correlation.abs() => {}
            _ => best = Some(*entry),
        }
    }
    best
}

/// Group observations by canonical instrument, each group in timestamp order.
fn group_by_instrument<'a>(
    observations: &'a [PairedObservation],
    instrument_filter: Option<&str>,
) -> BTreeMap<&'a str, Vec<&'a PairedObservation>> {
    let mut groups: BTreeMap<&str, Vec<&PairedObservation>> = BTreeMap::new();
    for obs in observations {
        if instrument_filter.is_some_and(|f| f != obs.instrument) {
            continue;
        }
        groups.entry(obs.instrument.as_str()).or_default().push(obs);
    }
    for rows in groups.values_mut() {
        rows.sort_by_key(|o| o.ts_ms);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const INSTRUMENT: &str = "ETH-20250531-2700-C";

    fn engine() -> CorrelationEngine {
        CorrelationEngine::new(CorrelationConfig::default()).unwrap()
    }

    fn observations(instrument: &str, values_a: &[f64], values_b: &[f64]) -> Vec<PairedObservation> {
        values_a
            .iter()
            .zip(values_b)
            .enumerate()
            .map(|(i, (a, b))| PairedObservation {
                ts_ms: i as i64 * 10_000,
                instrument: instrument.to_string(),
                value_a: *a,
                value_b: *b,
                instrument_a: instrument.to_string(),
                instrument_b: instrument.to_string(),
                reference_price: None,
                value_b_native: None,
            })
            .collect()
    }

    fn noise(seed: u64, n: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(90.0..110.0)).collect()
    }

    #[test]
    fn test_identical_series() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0];
        let obs = observations(INSTRUMENT, &values, &values);
        let results = engine().analyze(&obs, None);

        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.n, 10);
        assert_relative_eq!(r.correlation, 1.0, epsilon = 1e-12);
        assert_relative_eq!(r.mean_diff, 0.0);
        assert_relative_eq!(r.std_diff, 0.0);
        assert_eq!(r.best_lag, 0);
        assert_relative_eq!(r.best_lag_correlation, 1.0, epsilon = 1e-12);
        assert_relative_eq!(r.mean_a, r.mean_b);
    }

    #[test]
    fn test_too_few_observations_skipped() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let obs = observations(INSTRUMENT, &values, &values);
        assert!(engine().analyze(&obs, None).is_empty());

        let err = engine().analyze_series(INSTRUMENT, &values, &values).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_b_lags_a() {
        // b[t] = a[t - k]: venue A leads, so the best lag is -k.
        let k = 3;
        let base = noise(1, 80 + k);
        let a = base[k..].to_vec();
        let b = base[..80].to_vec();

        let result = engine().analyze_series(INSTRUMENT, &a, &b).unwrap();
        assert_eq!(result.best_lag, -(k as i64));
        assert_relative_eq!(result.best_lag_correlation, 1.0, epsilon = 1e-9);
        assert!(result.is_lag_significant(0.05));
    }

    #[test]
    fn test_b_leads_a() {
        // b[t] = a[t + k]: venue B leads, so the best lag is +k.
        let k = 5;
        let base = noise(2, 80 + k);
        let a = base[..80].to_vec();
        let b = base[k..].to_vec();

        let result = engine().analyze_series(INSTRUMENT, &a, &b).unwrap();
        assert_eq!(result.best_lag, k as i64);
        assert_relative_eq!(result.best_lag_correlation, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_max_lag_bounds() {
        let e = engine();
        assert_eq!(e.max_lag(10), 2);
        assert_eq!(e.max_lag(40), 10);
        assert_eq!(e.max_lag(1000), 20);

        let profile = e.lag_profile(&noise(3, 40), &noise(4, 40));
        assert_eq!(profile.len(), 21);
        assert_eq!(profile.first().unwrap().lag, -10);
        assert_eq!(profile.last().unwrap().lag, 10);
        assert_eq!(profile[0].overlap, 30);
    }

    #[test]
    fn test_small_overlap_placeholder() {
        let mut config = CorrelationConfig::default();
        config.min_overlap = 9;
        let e = CorrelationEngine::new(config).unwrap();
        let profile = e.lag_profile(&noise(5, 10), &noise(6, 10));

        // max_lag = 2, overlaps 8, 9, 10, 9, 8
        assert_eq!(profile[0].overlap, 8);
        assert_eq!(profile[0].correlation, 0.0);
        assert_eq!(profile[0].p_value, 1.0);
        assert_eq!(profile[4].correlation, 0.0);
        assert!(profile[1].correlation != 0.0);
    }

    #[test]
    fn test_tie_break_prefers_earliest_lag() {
        let profile = vec![
            LagCorrelation { lag: -1, correlation: -0.9, p_value: 0.01, overlap: 9 },
            LagCorrelation { lag: 0, correlation: 0.5, p_value: 0.1, overlap: 10 },
            LagCorrelation { lag: 1, correlation: 0.9, p_value: 0.01, overlap: 9 },
        ];
        assert_eq!(select_best_lag(&profile).unwrap().lag, -1);
    }

    #[test]
    fn test_any_nan_lag_leaves_scan_undefined() {
        let profile = vec![
            LagCorrelation { lag: -1, correlation: -0.95, p_value: 0.001, overlap: 9 },
            LagCorrelation { lag: 0, correlation: f64::NAN, p_value: f64::NAN, overlap: 10 },
            LagCorrelation { lag: 1, correlation: 0.2, p_value: 0.5, overlap: 9 },
        ];
        assert!(select_best_lag(&profile).is_none());

        let all_nan = vec![LagCorrelation { lag: 0, correlation: f64::NAN, p_value: f64::NAN, overlap: 10 }];
        assert!(select_best_lag(&all_nan).is_none());
    }

    #[test]
    fn test_leading_missing_values_report_no_lead() {
        // Identical, in-step series whose first two venue B values are missing.
        let a = noise(11, 40);
        let mut b = a.clone();
        b[0] = f64::NAN;
        b[1] = f64::NAN;

        let e = engine();
        let result = e.analyze_series(INSTRUMENT, &a, &b).unwrap();
        assert!(result.correlation.is_nan());
        assert_eq!(result.best_lag, 0);
        assert!(result.best_lag_correlation.is_nan());
        assert_eq!(e.lead_lag(&result), LeadLag::NotSignificant);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = CorrelationConfig::default();
        config.lag_divisor = 0;
        assert!(matches!(CorrelationEngine::new(config), Err(Error::Config(_))));

        let mut config = CorrelationConfig::default();
        config.rolling_window = 0;
        assert!(CorrelationEngine::new(config).is_err());
    }

    #[test]
    fn test_lead_lag_uses_configured_significance() {
        let k = 2;
        let base = noise(12, 30 + k);
        let a = base[k..].to_vec();
        let b = base[..30].to_vec();

        let strict = CorrelationEngine::new(CorrelationConfig {
            significance_level: 0.0,
            ..CorrelationConfig::default()
        })
        .unwrap();
        let result = strict.analyze_series(INSTRUMENT, &a, &b).unwrap();
        assert_eq!(result.best_lag, -2);
        assert_eq!(strict.lead_lag(&result), LeadLag::NotSignificant);
        assert_eq!(engine().lead_lag(&result), LeadLag::ALeads(2));
    }

    #[test]
    fn test_degenerate_instrument_does_not_abort_batch() {
        let flat = [5.0; 12];
        let varying = noise(7, 12);
        let mut obs = observations("ETH-20250531-2700-C", &flat, &varying);
        obs.extend(observations("ETH-20250531-2800-C", &varying, &varying));

        let results = engine().analyze(&obs, None);
        assert_eq!(results.len(), 2);
        assert!(results[0].correlation.is_nan());
        assert!(results[0].best_lag_correlation.is_nan());
        assert_eq!(results[0].best_lag, 0);
        assert_relative_eq!(results[1].correlation, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_instrument_filter() {
        let values = noise(8, 12);
        let mut obs = observations("ETH-20250531-2700-C", &values, &values);
        obs.extend(observations("ETH-20250531-2800-C", &values, &values));

        let results = engine().analyze(&obs, Some("ETH-20250531-2800-C"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].instrument, "ETH-20250531-2800-C");
    }

    #[test]
    fn test_unordered_input_sorted_by_time() {
        let a = noise(9, 20);
        let b: Vec<f64> = a.iter().map(|v| v * 2.0).collect();
        let mut obs = observations(INSTRUMENT, &a, &b);
        obs.reverse();

        let result = &engine().analyze(&obs, None)[0];
        assert_eq!(result.best_lag, 0);
        assert_relative_eq!(result.correlation, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_difference_statistics() {
        let a = [110.0, 120.0, 130.0, 140.0, 150.0, 160.0, 170.0, 180.0, 190.0, 200.0];
        let b = [100.0, 110.0, 120.0, 130.0, 140.0, 150.0, 160.0, 170.0, 180.0, 190.0];
        let result = engine().analyze_series(INSTRUMENT, &a, &b).unwrap();

        assert_relative_eq!(result.mean_diff, 10.0, epsilon = 1e-12);
        assert_relative_eq!(result.std_diff, 0.0, epsilon = 1e-12);
        let expected_pct = b.iter().map(|v| 10.0 / v * 100.0).sum::<f64>() / 10.0;
        assert_relative_eq!(result.mean_pct_diff, expected_pct, epsilon = 1e-12);
        assert_relative_eq!(result.mean_a, 155.0);
        assert_relative_eq!(result.mean_b, 145.0);
    }

    #[test]
    fn test_rolling_correlation_requires_more_than_window() {
        let e = engine();
        let values = noise(10, 20);
        let obs = observations(INSTRUMENT, &values, &values);
        assert!(e.rolling_correlation(&obs, INSTRUMENT).is_empty());

        let values = noise(11, 25);
        let obs = observations(INSTRUMENT, &values, &values);
        let rolling = e.rolling_correlation(&obs, INSTRUMENT);
        assert_eq!(rolling.len(), 6);
        assert_eq!(rolling[0].ts_ms, 19 * 10_000);
        assert_relative_eq!(rolling[5].correlation, 1.0, epsilon = 1e-12);
    }
}
