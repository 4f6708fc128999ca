//! Time alignment of per-venue samples into paired observations.
//!
//! Pairs are formed by an exact equality join on (timestamp, canonical
//! instrument). There is no tolerance window and no resampling: both venues
//! must be sampled on a common step upstream.

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};
use xvenue_core::{Exchange, PairedObservation, RawSample, ReferencePoint, Result, TimestampMs};

use crate::instrument::InstrumentCanonicalizer;

/// Counters describing one alignment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentStats {
    /// Venue A samples considered.
    pub samples_a: usize,
    /// Venue B samples considered.
    pub samples_b: usize,
    /// Samples passed on the wrong side and ignored.
    pub misrouted: usize,
    /// Paired observations produced.
    pub paired: usize,
    /// Distinct (timestamp, instrument) keys seen only on venue A.
    pub unmatched_a: usize,
    /// Distinct (timestamp, instrument) keys seen only on venue B.
    pub unmatched_b: usize,
    /// Observations left without a reference price (leading gap).
    pub unresolved_reference: usize,
}

/// Joins venue A and venue B samples on (timestamp, canonical instrument).
#[derive(Debug, Clone)]
pub struct TimeSeriesAligner {
    canonicalizer: InstrumentCanonicalizer,
}

impl TimeSeriesAligner {
    /// Create a new aligner.
    pub fn new() -> Result<Self> {
        Ok(Self {
            canonicalizer: InstrumentCanonicalizer::new()?,
        })
    }

    /// Pair samples from both venues.
    ///
    /// When `reference` is given, each observation's venue B value is
    /// multiplied by the reference price at its timestamp (forward-filled).
    pub fn align(
        &self,
        samples_a: &[RawSample],
        samples_b: &[RawSample],
        reference: Option<&[ReferencePoint]>,
    ) -> Vec<PairedObservation> {
        self.align_with_stats(samples_a, samples_b, reference).0
    }

    /// Pair samples and report counters.
    pub fn align_with_stats(
        &self,
        samples_a: &[RawSample],
        samples_b: &[RawSample],
        reference: Option<&[ReferencePoint]>,
    ) -> (Vec<PairedObservation>, AlignmentStats) {
        let mut stats = AlignmentStats::default();

        let keyed_a = self.key_samples(samples_a, Exchange::A, &mut stats.misrouted);
        let keyed_b = self.key_samples(samples_b, Exchange::B, &mut stats.misrouted);
        stats.samples_a = keyed_a.values().map(Vec::len).sum();
        stats.samples_b = keyed_b.values().map(Vec::len).sum();

        let mut observations = Vec::new();
        let mut matched: HashSet<&(TimestampMs, String)> = HashSet::new();

        for (key, a_side) in &keyed_a {
            let Some(b_side) = keyed_b.get(key) else {
                stats.unmatched_a += 1;
                continue;
            };
            matched.insert(key);

            for a in a_side {
                for b in b_side {
                    observations.push(PairedObservation {
                        ts_ms: key.0,
                        instrument: key.1.clone(),
                        value_a: a.value,
                        value_b: b.value,
                        instrument_a: a.instrument.clone(),
                        instrument_b: b.instrument.clone(),
                        reference_price: None,
                        value_b_native: None,
                    });
                }
            }
        }
        stats.unmatched_b = keyed_b.len() - matched.len();

        observations.sort_by(|x, y| {
            x.ts_ms
                .cmp(&y.ts_ms)
                .then_with(|| x.instrument.cmp(&y.instrument))
                .then_with(|| x.instrument_a.cmp(&y.instrument_a))
                .then_with(|| x.instrument_b.cmp(&y.instrument_b))
                .then_with(|| x.value_a.total_cmp(&y.value_a))
                .then_with(|| x.value_b.total_cmp(&y.value_b))
        });

        if let Some(reference) = reference {
            stats.unresolved_reference = apply_reference(&mut observations, reference);
            if stats.unresolved_reference > 0 {
                warn!(
                    unresolved = stats.unresolved_reference,
                    "observations before the first reference price left unconverted"
                );
            }
        }

        stats.paired = observations.len();
        if stats.misrouted > 0 {
            warn!(misrouted = stats.misrouted, "ignored samples passed on the wrong side");
        }
        debug!(?stats, "aligned venue samples");
        (observations, stats)
    }

    fn key_samples<'a>(
        &self,
        samples: &'a [RawSample],
        side: Exchange,
        misrouted: &mut usize,
    ) -> HashMap<(TimestampMs, String), Vec<&'a RawSample>> {
        let mut keyed: HashMap<(TimestampMs, String), Vec<&RawSample>> = HashMap::new();
        for sample in samples {
            if sample.exchange != side {
                *misrouted += 1;
                continue;
            }
            let canonical = self.canonicalizer.canonical_or_raw(&sample.instrument);
            keyed.entry((sample.ts_ms, canonical)).or_default().push(sample);
        }
        keyed
    }
}

/// Left-join the reference series on timestamp and forward-fill along the
/// (already time-sorted) observations. Returns the number of rows that could
/// not be resolved.
fn apply_reference(observations: &mut [PairedObservation], reference: &[ReferencePoint]) -> usize {
    // Several reference points at one timestamp are averaged.
    let mut by_ts: BTreeMap<TimestampMs, (f64, usize)> = BTreeMap::new();
    for point in reference.iter().filter(|p| p.value.is_finite()) {
        let entry = by_ts.entry(point.ts_ms).or_insert((0.0, 0));
        entry.0 += point.value;
        entry.1 += 1;
    }

    let mut last: Option<f64> = None;
    let mut unresolved = 0;
    for obs in observations.iter_mut() {
        if let Some((sum, count)) = by_ts.get(&obs.ts_ms) {
            last = Some(sum / *count as f64);
        }
        obs.value_b_native = Some(obs.value_b);
        match last {
            Some(price) => {
                obs.reference_price = Some(price);
                obs.value_b *= price;
            }
            None => {
                obs.value_b = f64::NAN;
                unresolved += 1;
            }
        }
    }
    unresolved
}
