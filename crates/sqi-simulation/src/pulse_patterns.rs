//! Pre-defined pulse shapes for synthetic beat trains

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Shape of one pulse around its onset
///
/// Values depend only on the integer sample offset from the onset, so a
/// noise-free train repeats one exact beat shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PulseShape {
    /// Symmetric triangle peaking at the onset
    Triangular { half_width_s: f64, amplitude: f64 },
    /// Gaussian bump centered on the onset, truncated at four sigma
    Gaussian { sigma_s: f64, amplitude: f64 },
    /// Raised-cosine upstroke to a systolic peak, then a linear downslope
    /// crossing the onset halfway down
    PpgLike {
        rise_s: f64,
        fall_s: f64,
        amplitude: f64,
    },
}

impl PulseShape {
    /// Pulse value `offset` samples after the onset (negative = before)
    pub fn value_at(&self, offset: i64, fps: f64) -> f64 {
        let j = offset as f64;
        match *self {
            PulseShape::Triangular {
                half_width_s,
                amplitude,
            } => {
                let hw = (half_width_s * fps).round();
                if hw <= 0.0 || j.abs() >= hw {
                    0.0
                } else {
                    amplitude * (1.0 - j.abs() / hw)
                }
            }

            PulseShape::Gaussian { sigma_s, amplitude } => {
                let sigma = sigma_s * fps;
                if sigma <= 0.0 || j.abs() > 4.0 * sigma {
                    0.0
                } else {
                    amplitude * (-0.5 * (j / sigma).powi(2)).exp()
                }
            }

            PulseShape::PpgLike {
                rise_s,
                fall_s,
                amplitude,
            } => {
                let rise = (rise_s * fps).round();
                let half_fall = (fall_s * fps / 2.0).round();
                let peak = -half_fall;
                if rise <= 0.0 || half_fall <= 0.0 || j < peak - rise || j >= half_fall {
                    0.0
                } else if j < peak {
                    let phase = (j - (peak - rise)) / rise;
                    amplitude * 0.5 * (1.0 - (PI * phase).cos())
                } else {
                    amplitude * (half_fall - j) / (2.0 * half_fall)
                }
            }
        }
    }

    /// Sample offsets outside which the pulse is zero, as `(first, last)`
    pub fn support(&self, fps: f64) -> (i64, i64) {
        match *self {
            PulseShape::Triangular { half_width_s, .. } => {
                let hw = (half_width_s * fps).round() as i64;
                (-hw, hw)
            }
            PulseShape::Gaussian { sigma_s, .. } => {
                let reach = (4.0 * sigma_s * fps).ceil() as i64;
                (-reach, reach)
            }
            PulseShape::PpgLike { rise_s, fall_s, .. } => {
                let rise = (rise_s * fps).round() as i64;
                let half_fall = (fall_s * fps / 2.0).round() as i64;
                (-half_fall - rise, half_fall)
            }
        }
    }

    /// Every duration parameter positive and finite
    pub fn is_valid(&self) -> bool {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        match *self {
            PulseShape::Triangular {
                half_width_s,
                amplitude,
            } => ok(half_width_s) && amplitude.is_finite(),
            PulseShape::Gaussian { sigma_s, amplitude } => ok(sigma_s) && amplitude.is_finite(),
            PulseShape::PpgLike {
                rise_s,
                fall_s,
                amplitude,
            } => ok(rise_s) && ok(fall_s) && amplitude.is_finite(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PulseShape::Triangular { .. } => "Triangular pulse",
            PulseShape::Gaussian { .. } => "Gaussian pulse",
            PulseShape::PpgLike { .. } => "PPG-like pulse",
        }
    }

    /// Common preset shapes
    pub fn presets() -> Vec<(&'static str, PulseShape)> {
        vec![
            ("Narrow Triangle", PulseShape::Triangular { half_width_s: 0.2, amplitude: 1.0 }),
            ("Wide Triangle", PulseShape::Triangular { half_width_s: 0.3, amplitude: 1.0 }),
            ("Gaussian", PulseShape::Gaussian { sigma_s: 0.08, amplitude: 1.0 }),
            (
                "Fingertip PPG",
                PulseShape::PpgLike { rise_s: 0.15, fall_s: 0.4, amplitude: 1.0 },
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangular_values() {
        let shape = PulseShape::Triangular { half_width_s: 0.3, amplitude: 2.0 };
        assert_eq!(shape.value_at(0, 100.0), 2.0);
        assert!((shape.value_at(15, 100.0) - 1.0).abs() < 1e-12);
        assert_eq!(shape.value_at(-15, 100.0), shape.value_at(15, 100.0));
        assert_eq!(shape.value_at(30, 100.0), 0.0);
        assert_eq!(shape.support(100.0), (-30, 30));
    }

    #[test]
    fn test_gaussian_values() {
        let shape = PulseShape::Gaussian { sigma_s: 0.1, amplitude: 1.0 };
        assert_eq!(shape.value_at(0, 100.0), 1.0);
        assert!((shape.value_at(10, 100.0) - (-0.5f64).exp()).abs() < 1e-12);
        assert_eq!(shape.value_at(41, 100.0), 0.0);
    }

    #[test]
    fn test_ppg_like_downslope_crosses_onset() {
        let shape = PulseShape::PpgLike { rise_s: 0.15, fall_s: 0.4, amplitude: 1.0 };
        let fps = 100.0;

        assert_eq!(shape.value_at(-20, fps), 1.0);
        assert!((shape.value_at(0, fps) - 0.5).abs() < 1e-12);
        assert_eq!(shape.value_at(20, fps), 0.0);
        assert_eq!(shape.value_at(-35, fps), 0.0);
        // upstroke is monotonic
        assert!((-35..-20).all(|j| shape.value_at(j, fps) < shape.value_at(j + 1, fps)));
        assert_eq!(shape.support(fps), (-35, 20));
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(PulseShape::presets().iter().all(|(_, s)| s.is_valid()));
        assert!(!PulseShape::Gaussian { sigma_s: 0.0, amplitude: 1.0 }.is_valid());
    }
}
