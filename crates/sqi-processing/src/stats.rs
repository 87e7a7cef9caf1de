//! Statistics utilities for beat quality analysis
//!
//! Distribution shape (kurtosis, skewness), percentiles with linear
//! interpolation, correlation measures and the median-absolute-deviation
//! outlier score used on small descriptor populations.

/// Constant of the Iglewicz–Hoaglin modified z-score
pub const MAD_SCALE: f64 = 0.6745;

/// Relative floor applied to the median absolute deviation
const MAD_FLOOR: f64 = 1e-9;

pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Excess kurtosis: `E[(x-m)^4] / E[(x-m)^2]^2 - 3`
///
/// Returns 0.0 for empty or constant input.
pub fn kurtosis(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let m = mean(x);
    let n = x.len() as f64;

    let m2 = x.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    let m4 = x.iter().map(|v| (v - m).powi(4)).sum::<f64>() / n;

    if m2 > 0.0 {
        m4 / (m2 * m2) - 3.0
    } else {
        0.0
    }
}

/// Sample skewness: third central moment over the unbiased variance to the 3/2
///
/// Returns 0.0 for fewer than two samples or constant input.
pub fn skewness(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return 0.0;
    }
    let m = mean(x);
    let n = x.len() as f64;

    let m3 = x.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
    let var = x.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1.0);

    if var > 0.0 {
        m3 / var.powf(1.5)
    } else {
        0.0
    }
}

/// Percentile `q` (0..=100) with linear interpolation between closest ranks.
///
/// Matches the "R-7" definition. Returns NaN for an empty slice.
pub fn percentile(data: &[f64], q: f64) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(&sorted, q)
}

/// Percentile of already sorted data
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }

    let h = (n - 1) as f64 * (q / 100.0).clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    if lo >= n - 1 {
        return sorted[n - 1];
    }
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
}

pub fn median(data: &[f64]) -> f64 {
    percentile(data, 50.0)
}

/// Percentile taken independently at every sample position of equal-length rows
pub fn column_percentile<R: AsRef<[f64]>>(rows: &[R], q: f64) -> Vec<f64> {
    let width = rows.iter().map(|r| r.as_ref().len()).min().unwrap_or(0);
    let mut column = Vec::with_capacity(rows.len());

    (0..width)
        .map(|j| {
            column.clear();
            column.extend(rows.iter().map(|r| r.as_ref()[j]));
            column.sort_by(|a, b| a.total_cmp(b));
            percentile_sorted(&column, q)
        })
        .collect()
}

/// Sample-wise mean of equal-length rows
pub fn column_mean<R: AsRef<[f64]>>(rows: &[R]) -> Vec<f64> {
    if rows.is_empty() {
        return Vec::new();
    }
    let width = rows.iter().map(|r| r.as_ref().len()).min().unwrap_or(0);
    let n = rows.len() as f64;

    (0..width)
        .map(|j| rows.iter().map(|r| r.as_ref()[j]).sum::<f64>() / n)
        .collect()
}

/// Normalized (Pearson) cross-correlation of two sequences at zero lag.
///
/// Sequences of different length are compared over their common prefix.
/// A constant or empty input has no defined correlation and yields 0.0.
pub fn cross_corr(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let (ma, mb) = (mean(a), mean(b));

    let mut num = 0.0;
    let mut saa = 0.0;
    let mut sbb = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - ma;
        let dy = y - mb;
        num += dx * dy;
        saa += dx * dx;
        sbb += dy * dy;
    }

    let den = (saa * sbb).sqrt();
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Fractional ranks (1-based), ties receive the average of their ranks
pub fn ranks(x: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..x.len()).collect();
    order.sort_by(|&i, &j| x[i].total_cmp(&x[j]));

    let mut ranks = vec![0.0; x.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && x[order[j + 1]] == x[order[i]] {
            j += 1;
        }
        // positions i..=j share the average rank
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Spearman rank correlation.
///
/// Returns NaN when either input is constant or the inputs are too short,
/// leaving the neutral-value policy to the caller.
pub fn spearman(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return f64::NAN;
    }
    let ra = ranks(&a[..n]);
    let rb = ranks(&b[..n]);

    let constant = |r: &[f64]| r.iter().all(|&v| v == r[0]);
    if constant(&ra) || constant(&rb) {
        return f64::NAN;
    }
    cross_corr(&ra, &rb)
}

/// Map a similarity value into a quality score in `[0, 1]` (NaN becomes 0)
pub fn clip_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Modified z-scores `0.6745 * |v - median| / MAD` (Iglewicz and Hoaglin).
///
/// Works on tiny populations. The MAD is floored at `1e-9 * max(|median|, 1)`
/// so an exactly repeating population scores zero instead of 0/0.
pub fn mad_outlier_scores(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let med = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    let mad = median(&deviations).max(MAD_FLOOR * med.abs().max(1.0));

    deviations.iter().map(|d| MAD_SCALE * d / mad).collect()
}

/// Indices whose modified z-score exceeds `threshold`
pub fn tiny_outlier_detector(values: &[f64], threshold: f64) -> Vec<usize> {
    mad_outlier_scores(values)
        .iter()
        .enumerate()
        .filter(|(_, score)| **score > threshold)
        .map(|(i, _)| i)
        .collect()
}
