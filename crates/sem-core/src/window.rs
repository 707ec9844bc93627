//! Apodisation windows and spectrum layout helpers.

use std::f64::consts::PI;

/// Symmetric Hanning window of length `m`.
///
/// `w[n] = 0.5 - 0.5 * cos(2 * pi * n / (m - 1))`. Length 0 yields an empty
/// window and length 1 yields `[1.0]`.
pub fn hanning(m: usize) -> Vec<f64> {
    match m {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denom = (m - 1) as f64;
            (0..m)
                .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / denom).cos())
                .collect()
        }
    }
}

/// Separable 2-D window factors for a `height x width` grid.
///
/// The full window is `sqrt(col[y] * row[x])`; backends evaluate it per
/// sample instead of materialising the outer product.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparableWindow {
    pub col: Vec<f64>,
    pub row: Vec<f64>,
}

impl SeparableWindow {
    pub fn hanning(height: usize, width: usize) -> Self {
        Self {
            col: hanning(height),
            row: hanning(width),
        }
    }

    /// Window weight at `(y, x)`.
    #[inline]
    pub fn at(&self, y: usize, x: usize) -> f64 {
        (self.col[y] * self.row[x]).sqrt()
    }
}

/// Destination index of frequency `k` after centring a length-`n` axis.
///
/// Rolls by `n / 2` so that frequency zero lands at index `n / 2`.
#[inline]
pub fn shifted_index(k: usize, n: usize) -> usize {
    (k + n / 2) % n
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hanning_edge_lengths() {
        assert!(hanning(0).is_empty());
        assert_eq!(hanning(1), vec![1.0]);
    }

    #[test]
    fn hanning_five() {
        let w = hanning(5);
        let expected = [0.0, 0.5, 1.0, 0.5, 0.0];
        for (a, b) in w.iter().zip(expected) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn hanning_symmetric() {
        let w = hanning(8);
        for n in 0..8 {
            assert_abs_diff_eq!(w[n], w[7 - n], epsilon = 1e-12);
        }
    }

    #[test]
    fn separable_window_peak() {
        let w = SeparableWindow::hanning(5, 3);
        assert_abs_diff_eq!(w.at(2, 1), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w.at(0, 1), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w.at(1, 1), 0.5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn shift_centres_zero_frequency() {
        assert_eq!(shifted_index(0, 4), 2);
        assert_eq!(shifted_index(2, 4), 0);
        assert_eq!(shifted_index(0, 5), 2);
        assert_eq!(shifted_index(3, 5), 0);
        assert_eq!(shifted_index(4, 5), 1);
    }
}
