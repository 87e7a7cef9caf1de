//! Dynamic time warping under the L1 point distance

const DIAGONAL: u8 = 0;
const UP: u8 = 1;
const LEFT: u8 = 2;

/// Optimal warping path between `a` and `b` as `(i, j)` index pairs.
///
/// The path starts at `(0, 0)` and ends at `(a.len()-1, b.len()-1)`. On
/// cost ties the diagonal step wins, then the step advancing only `a`.
pub fn dtw_path(a: &[f64], b: &[f64]) -> Vec<(usize, usize)> {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return Vec::new();
    }

    // cumulative cost with a one-cell infinite border
    let w = m + 1;
    let mut cost = vec![f64::INFINITY; (n + 1) * w];
    let mut bp = vec![DIAGONAL; n * m];
    cost[0] = 0.0;

    for i in 1..=n {
        for j in 1..=m {
            let d = (a[i - 1] - b[j - 1]).abs();
            let (best, step) = best_predecessor(
                cost[(i - 1) * w + (j - 1)],
                cost[(i - 1) * w + j],
                cost[i * w + (j - 1)],
            );
            cost[i * w + j] = d + best;
            bp[(i - 1) * m + (j - 1)] = step;
        }
    }

    let mut path = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n - 1, m - 1);
    loop {
        path.push((i, j));
        if i == 0 && j == 0 {
            break;
        }
        // border cells are infinite, so steps never leave the matrix
        match bp[i * m + j] {
            DIAGONAL => {
                i -= 1;
                j -= 1;
            }
            UP => i -= 1,
            _ => j -= 1,
        }
    }
    path.reverse();
    path
}

#[inline]
fn best_predecessor(diag: f64, up: f64, left: f64) -> (f64, u8) {
    let mut best = (diag, DIAGONAL);
    if up < best.0 {
        best = (up, UP);
    }
    if left < best.0 {
        best = (left, LEFT);
    }
    best
}

/// Both sequences resampled along the warping path
pub fn dtw_align(a: &[f64], b: &[f64]) -> (Vec<f64>, Vec<f64>) {
    dtw_path(a, b)
        .into_iter()
        .map(|(i, j)| (a[i], b[j]))
        .unzip()
}

/// Total L1 cost along the optimal path
pub fn dtw_distance(a: &[f64], b: &[f64]) -> f64 {
    dtw_path(a, b)
        .into_iter()
        .map(|(i, j)| (a[i] - b[j]).abs())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_sequences_align_diagonally() {
        let a = vec![0.0, 1.0, 2.0, 1.0, 0.0];
        let path = dtw_path(&a, &a);
        assert_eq!(path, (0..5).map(|i| (i, i)).collect::<Vec<_>>());
        assert_eq!(dtw_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_stretched_sequence() {
        let a = vec![0.0, 1.0, 1.0, 2.0];
        let b = vec![0.0, 1.0, 2.0];
        let (wa, wb) = dtw_align(&a, &b);

        assert_eq!(wa, vec![0.0, 1.0, 1.0, 2.0]);
        assert_eq!(wb, vec![0.0, 1.0, 1.0, 2.0]);
        assert_eq!(dtw_distance(&a, &b), 0.0);
    }

    #[test]
    fn test_path_endpoints() {
        let a = vec![3.0, 1.0, 4.0, 1.0, 5.0, 9.0];
        let b = vec![2.0, 6.0, 5.0];
        let path = dtw_path(&a, &b);

        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(5, 2)));
        assert!(path.windows(2).all(|w| w[1].0 >= w[0].0 && w[1].1 >= w[0].1));
    }

    #[test]
    fn test_empty_input() {
        assert!(dtw_path(&[], &[1.0]).is_empty());
        let (a, b) = dtw_align(&[1.0], &[]);
        assert!(a.is_empty() && b.is_empty());
    }
}
