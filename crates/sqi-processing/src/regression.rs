//! Robust linear regression for downslope modeling

use crate::stats::median;
use serde::{Deserialize, Serialize};

/// Straight line `y = intercept + slope * t`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, t: f64) -> f64 {
        self.intercept + self.slope * t
    }

    /// Perpendicular distance of the point `(t, y)` to the line
    pub fn orthogonal_distance(&self, t: f64, y: f64) -> f64 {
        (self.predict(t) - y).abs() / (1.0 + self.slope * self.slope).sqrt()
    }

    /// Coefficient of determination of this line on `(t, y)`.
    ///
    /// A constant `y` scores 1.0 when fitted exactly and 0.0 otherwise.
    pub fn r2(&self, t: &[f64], y: &[f64]) -> f64 {
        let n = t.len().min(y.len());
        if n == 0 {
            return 0.0;
        }
        let y_mean = y[..n].iter().sum::<f64>() / n as f64;

        let ss_res: f64 = (0..n).map(|i| (y[i] - self.predict(t[i])).powi(2)).sum();
        let ss_tot: f64 = y[..n].iter().map(|v| (v - y_mean).powi(2)).sum();

        if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    }
}

/// Theil–Sen estimator: median of pairwise slopes, median residual offset.
///
/// Resistant to up to ~29% outlying points. Returns `None` when fewer than
/// two distinct abscissae are available.
pub fn theil_sen(t: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = t.len().min(y.len());
    let mut slopes = Vec::with_capacity(n * n.saturating_sub(1) / 2);

    for i in 0..n {
        for j in (i + 1)..n {
            let dt = t[j] - t[i];
            if dt != 0.0 {
                slopes.push((y[j] - y[i]) / dt);
            }
        }
    }
    if slopes.is_empty() {
        return None;
    }

    let slope = median(&slopes);
    let offsets: Vec<f64> = (0..n).map(|i| y[i] - slope * t[i]).collect();
    let intercept = median(&offsets);

    Some(LinearFit { slope, intercept })
}
