//! Descriptive statistics and Pearson correlation.
//!
//! Degenerate inputs (too short, zero variance, non-finite values) produce
//! NaN rather than errors so that one bad series never aborts a batch.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Pearson correlation coefficient with its two-sided p-value.
#[derive(Debug, Clone, Copy)]
pub struct Pearson {
    pub r: f64,
    pub p_value: f64,
}

impl Pearson {
    /// Undefined correlation.
    pub fn undefined() -> Self {
        Self {
            r: f64::NAN,
            p_value: f64::NAN,
        }
    }

    /// Whether the coefficient is defined.
    pub fn is_defined(&self) -> bool {
        !self.r.is_nan()
    }
}

/// Arithmetic mean (NaN for an empty slice).
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation (NaN for an empty slice).
pub fn std_dev(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    let m = mean(xs);
    let variance = xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64;
    variance.sqrt()
}

/// Pearson correlation of two equally long series.
pub fn pearson(x: &[f64], y: &[f64]) -> Pearson {
    let n = x.len();
    if n != y.len() || n < 2 {
        return Pearson::undefined();
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Pearson::undefined();
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return Pearson::undefined();
    }

    let r = (covariance / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0);
    Pearson {
        r,
        p_value: correlation_p_value(r, n),
    }
}

/// Two-sided p-value of a correlation coefficient under H0: rho = 0.
///
/// t = r * sqrt((n - 2) / (1 - r^2)) follows Student's t with n - 2 degrees
/// of freedom.
pub fn correlation_p_value(r: f64, n: usize) -> f64 {
    if r.is_nan() || n < 2 {
        return f64::NAN;
    }
    if n == 2 {
        return 1.0;
    }

    let one_minus_r2 = 1.0 - r * r;
    if one_minus_r2 <= 0.0 {
        return 0.0;
    }

    let df = (n - 2) as f64;
    let t = r * (df / one_minus_r2).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.cdf(-t.abs())).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}

/// Trailing-window Pearson correlation.
///
/// Entry `i` is the correlation over `[i + 1 - window, i]`; entries before the
/// first full window are NaN.
pub fn rolling_correlation(x: &[f64], y: &[f64], window: usize) -> Vec<f64> {
    let n = x.len().min(y.len());
    (0..n)
        .map(|i| {
            if window == 0 || i + 1 < window {
                f64::NAN
            } else {
                let start = i + 1 - window;
                pearson(&x[start..=i], &y[start..=i]).r
            }
        })
        .collect()
}
