//! Intensity histograms and the equalisation lookup table.
//!
//! Binning follows the usual array-library convention for integer edges
//! `0, 1, ..., max_level`: bin `i` covers `[i, i + 1)` except the last one,
//! which is closed on the right. Samples outside `[0, max_level]` and NaN are
//! not counted.
//!
//! # Table overflow
//!
//! The equalisation table is normalised to `max_level`, not `max_level - 1`,
//! so its last entry equals `max_level` (256 at 8 bits), one past the valid
//! intensity range. [`TableOverflow::Preserve`] keeps that value,
//! [`TableOverflow::Clamp`] caps the table at `max_level - 1`.

use rayon::prelude::*;

use crate::error::{Error, Result};

/// Pixel bit depth of an SEM frame.
pub const BIT_DEPTH: u32 = 8;

/// Number of intensity levels at `bit_depth`.
#[inline]
pub const fn max_level(bit_depth: u32) -> usize {
    1 << bit_depth
}

/// Histogram bin holding `value`, or `None` if it falls outside `[0, max_level]`.
#[inline]
pub fn bin_of(value: f32, max_level: usize) -> Option<usize> {
    let top = max_level as f32;
    if value >= 0.0 && value <= top {
        Some((value as usize).min(max_level - 1))
    } else {
        None
    }
}

/// Table index for `value`: its histogram bin, clamped into the table.
///
/// Defined for every finite sample so windowed (non-integral) grids can be
/// remapped; NaN maps to bin 0.
#[inline]
pub fn lookup_index(value: f32, max_level: usize) -> usize {
    // `as usize` saturates: negatives and NaN become 0
    (value as usize).min(max_level - 1)
}

/// What to do with table entries equal to `max_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableOverflow {
    /// Keep the unclamped value; the top level maps to `max_level`.
    #[default]
    Preserve,
    /// Cap entries at `max_level - 1`.
    Clamp,
}

/// Counts per unit-width bin plus the bin edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `max_level` counts.
    pub counts: Vec<u64>,
    /// `max_level + 1` edges: `0, 1, ..., max_level`.
    pub bin_edges: Vec<f32>,
}

impl Histogram {
    /// Empty histogram with `max_level` bins.
    pub fn empty(max_level: usize) -> Self {
        Self {
            counts: vec![0; max_level],
            bin_edges: (0..=max_level).map(|e| e as f32).collect(),
        }
    }

    /// Build from bin counts produced elsewhere (e.g. a device kernel).
    pub fn from_counts(counts: Vec<u64>) -> Self {
        let max_level = counts.len();
        Self {
            counts,
            bin_edges: (0..=max_level).map(|e| e as f32).collect(),
        }
    }

    /// Count `values` into `max_level` unit bins.
    pub fn compute(values: &[f32], max_level: usize) -> Self {
        let counts = values
            .par_iter()
            .fold(
                || vec![0u64; max_level],
                |mut acc, &v| {
                    if let Some(bin) = bin_of(v, max_level) {
                        acc[bin] += 1;
                    }
                    acc
                },
            )
            .reduce(
                || vec![0u64; max_level],
                |mut a, b| {
                    a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
                    a
                },
            );
        Self::from_counts(counts)
    }

    /// Number of bins.
    pub fn max_level(&self) -> usize {
        self.counts.len()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Running sum of the counts.
    pub fn cumulative(&self) -> Vec<u64> {
        self.counts
            .iter()
            .scan(0u64, |acc, &c| {
                *acc += c;
                Some(*acc)
            })
            .collect()
    }

    /// Mean bin index weighted by counts, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let weighted: f64 = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, &c)| i as f64 * c as f64)
            .sum();
        Some(weighted / total as f64)
    }

    /// Lowest and highest occupied bins.
    pub fn occupied_range(&self) -> Option<(usize, usize)> {
        let lo = self.counts.iter().position(|&c| c > 0)?;
        let hi = self.counts.iter().rposition(|&c| c > 0)?;
        Some((lo, hi))
    }

    /// Equalisation lookup table.
    ///
    /// `T[i] = round(cumsum[i] / cumsum.max() * max_level)` with ties rounded
    /// to even. The maximum of the running sum is the total count, so an
    /// empty histogram fails with [`Error::DegenerateHistogram`].
    pub fn equalisation_table(&self, overflow: TableOverflow) -> Result<Vec<f32>> {
        let cumulative = self.cumulative();
        let peak = cumulative.last().copied().unwrap_or(0);
        if peak == 0 {
            return Err(Error::DegenerateHistogram);
        }
        let levels = self.max_level() as f64;
        let ceiling = match overflow {
            TableOverflow::Preserve => levels,
            TableOverflow::Clamp => levels - 1.0,
        };
        Ok(cumulative
            .into_iter()
            .map(|c| {
                let t = (c as f64 / peak as f64 * levels).round_ties_even();
                t.min(ceiling) as f32
            })
            .collect())
    }
}
