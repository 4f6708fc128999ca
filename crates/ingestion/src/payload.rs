//! Decoding of query-range payloads handed over by the external query layer.
//!
//! The query layer returns `{"status": "success", "data": {"result": [...]}}`
//! where each result carries a label set and `[timestamp_secs, "value"]` pairs.
//! Anything malformed here is an upstream failure and aborts the run.

use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;
use xvenue_core::config::AlignmentConfig;
use xvenue_core::{secs_to_ms, Error, Exchange, RawSample, Result, TimestampMs};

/// A decoded sample that still carries its upstream labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    /// Timestamp in milliseconds.
    pub ts_ms: TimestampMs,
    /// Upstream venue label, if the series had one.
    pub exchange: Option<String>,
    /// Instrument label.
    pub instrument: String,
    /// Sample value.
    pub value: f64,
}

/// Top-level query-range response.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRangeResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<QueryRangeData>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `data` member of a query-range response.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRangeData {
    #[serde(default)]
    pub result: Vec<SeriesResult>,
}

/// One labelled series.
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesResult {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    #[serde(default)]
    pub values: Vec<(f64, String)>,
}

impl QueryRangeResponse {
    /// Decode a raw JSON body.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Flatten all series into labelled samples.
    pub fn into_samples(self) -> Result<Vec<LabeledSample>> {
        if self.status != "success" {
            return Err(Error::upstream(format!(
                "query failed with status {:?}: {}",
                self.status,
                self.error.as_deref().unwrap_or("no error message")
            )));
        }
        let data = self
            .data
            .ok_or_else(|| Error::upstream("successful response without data"))?;

        let mut samples = Vec::new();
        for series in data.result {
            let instrument = series
                .metric
                .get("instrument")
                .cloned()
                .ok_or_else(|| Error::upstream("series without instrument label"))?;
            let exchange = series.metric.get("exchange").cloned();

            for (ts_secs, raw) in &series.values {
                if !ts_secs.is_finite() {
                    return Err(Error::upstream(format!(
                        "non-finite timestamp in series {instrument}"
                    )));
                }
                let value: f64 = raw.parse().map_err(|_| {
                    Error::upstream(format!("unparseable value {raw:?} in series {instrument}"))
                })?;
                samples.push(LabeledSample {
                    ts_ms: secs_to_ms(*ts_secs),
                    exchange: exchange.clone(),
                    instrument: instrument.clone(),
                    value,
                });
            }
        }
        debug!(samples = samples.len(), "decoded query-range payload");
        Ok(samples)
    }
}

/// Split labelled samples into venue A and venue B raw samples.
///
/// Samples from venues that are neither A nor B are skipped. A sample with no
/// venue label at all is an upstream error.
pub fn split_by_exchange(
    samples: &[LabeledSample],
    config: &AlignmentConfig,
) -> Result<(Vec<RawSample>, Vec<RawSample>)> {
    let mut side_a = Vec::new();
    let mut side_b = Vec::new();
    let mut skipped = 0usize;

    for sample in samples {
        let label = sample.exchange.as_deref().ok_or_else(|| {
            Error::upstream(format!("series {} has no exchange label", sample.instrument))
        })?;
        let Some(exchange) = config.exchange_for_label(label) else {
            skipped += 1;
            continue;
        };
        let raw = RawSample {
            ts_ms: sample.ts_ms,
            exchange,
            instrument: sample.instrument.clone(),
            value: sample.value,
        };
        match exchange {
            Exchange::A => side_a.push(raw),
            Exchange::B => side_b.push(raw),
        }
    }

    debug!(
        a = side_a.len(),
        b = side_b.len(),
        skipped,
        "split samples by exchange"
    );
    Ok((side_a, side_b))
}
