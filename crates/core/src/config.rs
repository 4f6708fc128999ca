//! Configuration structures for the cross-venue analysis engine.

use crate::error::{Error, Result};
use crate::types::Exchange;
use serde::{Deserialize, Serialize};

/// Main configuration for an analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Venue labels and reference-series handling.
    pub alignment: AlignmentConfig,
    /// Correlation and lead-lag search configuration.
    pub correlation: CorrelationConfig,
    /// Order-size presence fingerprinting configuration.
    pub presence: PresenceConfig,
}

impl Config {
    /// Load a configuration from a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the analysis meaningless.
    pub fn validate(&self) -> Result<()> {
        let a = &self.alignment;
        if a.exchange_a_label.is_empty() || a.exchange_b_label.is_empty() {
            return Err(Error::config("exchange labels must not be empty"));
        }
        if a.exchange_a_label == a.exchange_b_label {
            return Err(Error::config(format!(
                "exchange labels must differ (both are {:?})",
                a.exchange_a_label
            )));
        }

        self.correlation.validate()?;

        let p = &self.presence;
        if !(p.tolerance >= 0.0) {
            return Err(Error::config("presence.tolerance must be non-negative"));
        }
        if !(-1.0..=1.0).contains(&p.cluster_min_correlation) {
            return Err(Error::config("presence.cluster_min_correlation must be in [-1, 1]"));
        }
        if !(0.0..=1.0).contains(&p.cluster_max_p_value) {
            return Err(Error::config("presence.cluster_max_p_value must be in [0, 1]"));
        }
        if !(p.band_width_pct > 0.0) {
            return Err(Error::config("presence.band_width_pct must be positive"));
        }
        Ok(())
    }
}

/// Venue naming and reference conversion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Upstream label of the venue quoting ISO-date instruments.
    pub exchange_a_label: String,
    /// Upstream label of the venue quoting day-month-year instruments.
    pub exchange_b_label: String,
    /// Multiply venue B values by the reference series before pairing.
    pub convert_with_reference: bool,
    /// Reference instruments to try, in priority order.
    pub reference_candidates: Vec<String>,
    /// Underlying prefix for the perpetual fallback (e.g. "ETH").
    pub reference_underlying: String,
    /// Marker identifying perpetual instruments in the fallback search.
    pub perpetual_marker: String,
    /// Correlate percentage returns instead of levels.
    pub compare_returns: bool,
}

impl AlignmentConfig {
    /// Map an upstream venue label to an exchange side.
    pub fn exchange_for_label(&self, label: &str) -> Option<Exchange> {
        if label == self.exchange_a_label {
            Some(Exchange::A)
        } else if label == self.exchange_b_label {
            Some(Exchange::B)
        } else {
            None
        }
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            exchange_a_label: "derive".to_string(),
            exchange_b_label: "deribit".to_string(),
            convert_with_reference: true,
            reference_candidates: [
                "ETH-SPOT",
                "ETH-USD",
                "ETH-USDT",
                "ETH",
                "ETHUSD",
                "ETH-PERPETUAL",
                "ETH-PERP",
                "ETH_USDT",
                "ETH_USD",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            reference_underlying: "ETH".to_string(),
            perpetual_marker: "PERP".to_string(),
            compare_returns: false,
        }
    }
}

/// Correlation and lead-lag configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Minimum paired observations for an instrument to be analyzed.
    pub min_samples: usize,
    /// Upper bound on the lead-lag search radius (steps).
    pub max_lag_cap: usize,
    /// Search radius is also bounded by n / lag_divisor.
    pub lag_divisor: usize,
    /// Minimum overlapping points for a lagged correlation.
    pub min_overlap: usize,
    /// p-value below which a lead-lag relationship is significant.
    pub significance_level: f64,
    /// Window length for rolling correlation.
    pub rolling_window: usize,
}

impl CorrelationConfig {
    /// Reject values that would break the lag scan or rolling window.
    pub fn validate(&self) -> Result<()> {
        if self.min_samples < 2 {
            return Err(Error::config("correlation.min_samples must be at least 2"));
        }
        if self.min_overlap < 3 {
            return Err(Error::config("correlation.min_overlap must be at least 3"));
        }
        if self.lag_divisor == 0 {
            return Err(Error::config("correlation.lag_divisor must be positive"));
        }
        if !(0.0..=1.0).contains(&self.significance_level) {
            return Err(Error::config("correlation.significance_level must be in [0, 1]"));
        }
        if self.rolling_window < 3 {
            return Err(Error::config("correlation.rolling_window must be at least 3"));
        }
        Ok(())
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            min_samples: 10,
            max_lag_cap: 20,
            lag_divisor: 4,
            min_overlap: 3,
            significance_level: 0.05,
            rolling_window: 20,
        }
    }
}

/// Presence fingerprinting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Absolute size tolerance when matching book levels to a tracked size.
    pub tolerance: f64,
    /// Correlation above which two sizes are linked.
    pub cluster_min_correlation: f64,
    /// p-value below which a link is accepted.
    pub cluster_max_p_value: f64,
    /// Width of presence-percentage bands.
    pub band_width_pct: f64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            cluster_min_correlation: 0.8,
            cluster_max_p_value: 0.05,
            band_width_pct: 5.0,
        }
    }
}
