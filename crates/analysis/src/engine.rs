//! Analysis engine.
//!
//! Combines alignment, correlation and presence fingerprinting into a unified
//! interface driven by one `Config`.

use serde::{Deserialize, Serialize};
use tracing::info;
use xvenue_core::{
    BookLevelSample, Config, CorrelationResult, LeadLag, PairedObservation, RawSample,
    ReferencePoint, Result, Size,
};
use xvenue_ingestion::payload::split_by_exchange;
use xvenue_ingestion::{to_returns, QueryRangeResponse, ReferenceSelector, TimeSeriesAligner};

use crate::correlation::CorrelationEngine;
use crate::presence::{PresenceFingerprinter, PresenceReport};
use crate::summary::{sort_by_correlation_desc, CorrelationSummary};

/// Output of one correlation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationRun {
    /// Observations the correlation was computed on (returns if enabled).
    pub observations: Vec<PairedObservation>,
    /// One row per instrument, highest correlation first.
    pub results: Vec<CorrelationResult>,
    /// Batch summary.
    pub summary: CorrelationSummary,
}

/// Analysis engine.
pub struct AnalysisEngine {
    config: Config,
    aligner: TimeSeriesAligner,
    reference_selector: ReferenceSelector,
    correlation: CorrelationEngine,
    presence: PresenceFingerprinter,
}

impl AnalysisEngine {
    /// Create a new analysis engine from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            aligner: TimeSeriesAligner::new()?,
            reference_selector: ReferenceSelector::from_config(&config.alignment),
            correlation: CorrelationEngine::new(config.correlation.clone())?,
            presence: PresenceFingerprinter::new(config.presence.clone()),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Correlation engine used by this analysis engine.
    pub fn correlation_engine(&self) -> &CorrelationEngine {
        &self.correlation
    }

    /// Interpret a result's best lag at the configured significance level.
    pub fn lead_lag(&self, result: &CorrelationResult) -> LeadLag {
        self.correlation.lead_lag(result)
    }

    /// Fingerprinter used by this analysis engine.
    pub fn fingerprinter(&self) -> &PresenceFingerprinter {
        &self.presence
    }

    /// Align both venues and correlate every paired instrument.
    pub fn correlate(
        &self,
        samples_a: &[RawSample],
        samples_b: &[RawSample],
        reference: Option<&[ReferencePoint]>,
        instrument_filter: Option<&str>,
    ) -> CorrelationRun {
        let mut observations = self.aligner.align(samples_a, samples_b, reference);
        if self.config.alignment.compare_returns {
            observations = to_returns(&observations);
        }

        let mut results = self.correlation.analyze(&observations, instrument_filter);
        sort_by_correlation_desc(&mut results);
        let summary = CorrelationSummary::from_results(&results);

        info!(
            observations = observations.len(),
            instruments = results.len(),
            returns = self.config.alignment.compare_returns,
            "correlation run complete"
        );

        CorrelationRun {
            observations,
            results,
            summary,
        }
    }

    /// Decode a query-range payload and run the full correlation pipeline.
    ///
    /// Upstream failures (bad status, malformed samples) abort the run.
    pub fn correlate_payload(
        &self,
        body: &str,
        instrument_filter: Option<&str>,
    ) -> Result<CorrelationRun> {
        let samples = QueryRangeResponse::from_json(body)?.into_samples()?;

        let reference = if self.config.alignment.convert_with_reference {
            self.reference_selector.select(&samples)
        } else {
            None
        };
        let (samples_a, samples_b) = split_by_exchange(&samples, &self.config.alignment)?;

        Ok(self.correlate(
            &samples_a,
            &samples_b,
            reference.as_ref().map(|r| r.points.as_slice()),
            instrument_filter,
        ))
    }

    /// Fingerprint order-size presence from raw book levels.
    pub fn fingerprint_levels(
        &self,
        tracked_sizes: &[Size],
        levels: &[BookLevelSample],
    ) -> PresenceReport {
        let series = self.presence.presence_from_levels(tracked_sizes, levels);
        self.presence.fingerprint(&series)
    }
}
