//! Percentage-return transformation of paired observations.

use std::collections::BTreeMap;
use xvenue_core::PairedObservation;

/// Replace paired levels by percentage returns, per canonical instrument.
///
/// Each instrument's rows are ordered by timestamp and `value_a`/`value_b`
/// become `(x_t - x_{t-1}) / x_{t-1} * 100`. The first row of every
/// instrument is dropped, as is any row whose return is NaN. Diagnostic
/// fields (`reference_price`, `value_b_native`) keep their level values.
pub fn to_returns(observations: &[PairedObservation]) -> Vec<PairedObservation> {
    let mut by_instrument: BTreeMap<&str, Vec<&PairedObservation>> = BTreeMap::new();
    for obs in observations {
        by_instrument.entry(obs.instrument.as_str()).or_default().push(obs);
    }

    let mut returns = Vec::with_capacity(observations.len());
    for rows in by_instrument.values_mut() {
        rows.sort_by_key(|o| o.ts_ms);
        for pair in rows.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            let ret_a = pct_change(prev.value_a, cur.value_a);
            let ret_b = pct_change(prev.value_b, cur.value_b);
            if ret_a.is_nan() || ret_b.is_nan() {
                continue;
            }
            returns.push(PairedObservation {
                value_a: ret_a,
                value_b: ret_b,
                ..cur.clone()
            });
        }
    }
    returns
}

#[inline]
fn pct_change(prev: f64, cur: f64) -> f64 {
    (cur - prev) / prev * 100.0
}
