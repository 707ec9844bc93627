//! Two-dimensional sample grids and the sources that convert into them.
//!
//! - [`Grid`] - Owned row-major `f32` grid of shape `(height, width)`
//! - [`RawImage`] - Array-like source of arbitrary rank (decoded bitmap, frame)
//! - [`IntoGrid`] - Validating conversion used as the pixel setter
//!
//! # Memory Layout
//!
//! Samples are stored row-major, top-to-bottom:
//!
//! ```text
//! index(y, x) = y * width + x
//! ```
//!
//! # Validation
//!
//! Conversion is eager: a source whose rank is not two is rejected with
//! [`Error::InvalidShape`] before any backend sees it.
//!
//! ```rust
//! use sem_core::{Grid, IntoGrid, RawImage};
//!
//! let raw = RawImage::new(vec![2, 3], vec![0u8, 1, 2, 3, 4, 5]);
//! let grid = raw.into_grid().unwrap();
//! assert_eq!(grid.shape(), (2, 3));
//! assert_eq!(grid.get(1, 2), 5.0);
//! ```

use crate::error::{Error, Result};

/// Owned 2-D grid of `f32` samples, shape `(height, width)`.
#[derive(Clone, PartialEq)]
pub struct Grid {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl Grid {
    /// Create from row-major data.
    ///
    /// A shape whose sample count overflows `usize` is reported as a size
    /// mismatch with `expected` saturated to `usize::MAX`.
    pub fn new(data: Vec<f32>, height: usize, width: usize) -> Result<Self> {
        let expected = width.checked_mul(height).ok_or(Error::BufferSizeMismatch {
            expected: usize::MAX,
            actual: data.len(),
        })?;
        if data.len() != expected {
            return Err(Error::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, width, height })
    }

    /// Create from an n-dimensional shape, rejecting any rank but two.
    pub fn from_shape(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        match *shape {
            [height, width] => Self::new(data, height, width),
            _ => Err(Error::InvalidShape {
                ndim: shape.len(),
                shape: shape.to_vec(),
            }),
        }
    }

    /// Grid filled with zeros.
    ///
    /// # Panics
    ///
    /// Panics if `height * width` samples cannot be allocated.
    pub fn zeros(height: usize, width: usize) -> Self {
        Self::filled(height, width, 0.0)
    }

    /// Grid filled with a constant.
    ///
    /// # Panics
    ///
    /// Panics if `height * width` samples cannot be allocated.
    pub fn filled(height: usize, width: usize, value: f32) -> Self {
        Self {
            data: vec![value; width.saturating_mul(height)],
            width,
            height,
        }
    }

    /// Shape as `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample at row `y`, column `x`.
    ///
    /// # Panics
    ///
    /// Panics if `(y, x)` is outside the grid.
    pub fn get(&self, y: usize, x: usize) -> f32 {
        assert!(y < self.height && x < self.width, "({y}, {x}) out of bounds for {}x{}", self.height, self.width);
        self.data[y * self.width + x]
    }

    /// Row-major samples.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consume into row-major samples.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Iterate rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks(0) panics, and a zero-width grid has no samples to yield anyway
        self.data.chunks(self.width.max(1))
    }

    /// Largest sample, `None` when empty or all NaN.
    pub fn max(&self) -> Option<f32> {
        self.data
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f32| m.max(v))))
    }

    /// Location `(y, x)` of the largest sample.
    pub fn argmax(&self) -> Option<(usize, usize)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &v) in self.data.iter().enumerate() {
            if v.is_nan() {
                continue;
            }
            if best.is_none_or(|(_, b)| v > b) {
                best = Some((i, v));
            }
        }
        best.map(|(i, _)| (i / self.width, i % self.width))
    }
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("height", &self.height)
            .field("width", &self.width)
            .finish()
    }
}

/// Numeric sample types accepted by the pixel setter.
pub trait Sample: Copy + Send + Sync {
    fn to_f32(self) -> f32;
}

macro_rules! impl_sample {
    ($($t:ty),*) => {
        $(impl Sample for $t {
            #[inline]
            fn to_f32(self) -> f32 {
                self as f32
            }
        })*
    };
}

impl_sample!(u8, u16, u32, i16, i32, f32, f64);

/// Array-like image source of any rank.
///
/// Mirrors what a decoder hands over: a shape plus flat samples. A grayscale
/// bitmap is `[H, W]`, an RGB one `[H, W, 3]`; only the former is a valid
/// pixel grid.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

impl<T: Sample> RawImage<T> {
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Self {
        Self { shape, data }
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}

/// Validating conversion into a [`Grid`].
///
/// This is the pixel setter of the image entity: every backend funnels its
/// input through it before converting to native storage.
pub trait IntoGrid {
    fn into_grid(self) -> Result<Grid>;
}

impl IntoGrid for Grid {
    fn into_grid(self) -> Result<Grid> {
        Ok(self)
    }
}

impl IntoGrid for &Grid {
    fn into_grid(self) -> Result<Grid> {
        Ok(self.clone())
    }
}

impl<T: Sample> IntoGrid for RawImage<T> {
    fn into_grid(self) -> Result<Grid> {
        if self.shape.len() != 2 {
            return Err(Error::InvalidShape {
                ndim: self.shape.len(),
                shape: self.shape,
            });
        }
        let data = self.data.into_iter().map(Sample::to_f32).collect();
        Grid::from_shape(&self.shape, data)
    }
}

impl<T: Sample> IntoGrid for &RawImage<T> {
    fn into_grid(self) -> Result<Grid> {
        if self.shape.len() != 2 {
            return Err(Error::InvalidShape {
                ndim: self.shape.len(),
                shape: self.shape.clone(),
            });
        }
        let data = self.data.iter().map(|v| v.to_f32()).collect();
        Grid::from_shape(&self.shape, data)
    }
}

impl<T: Sample> IntoGrid for Vec<Vec<T>> {
    fn into_grid(self) -> Result<Grid> {
        rows_to_grid(&self)
    }
}

impl<T: Sample> IntoGrid for &[Vec<T>] {
    fn into_grid(self) -> Result<Grid> {
        rows_to_grid(self)
    }
}

impl<T: Sample, const W: usize, const H: usize> IntoGrid for [[T; W]; H] {
    fn into_grid(self) -> Result<Grid> {
        let data = self.iter().flatten().map(|v| v.to_f32()).collect();
        Grid::new(data, H, W)
    }
}

fn rows_to_grid<T: Sample>(rows: &[Vec<T>]) -> Result<Grid> {
    let height = rows.len();
    let width = rows.first().map_or(0, Vec::len);
    let mut data = Vec::with_capacity(width * height);
    for (row, values) in rows.iter().enumerate() {
        if values.len() != width {
            return Err(Error::RaggedRow {
                row,
                expected: width,
                actual: values.len(),
            });
        }
        data.extend(values.iter().map(|v| v.to_f32()));
    }
    Grid::new(data, height, width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_2d_converts() {
        let raw = RawImage::new(vec![2, 2], vec![0u8, 1, 2, 3]);
        let grid = raw.into_grid().unwrap();
        assert_eq!(grid.shape(), (2, 2));
        assert_eq!(grid.data(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn raw_rgb_rejected() {
        let raw = RawImage::new(vec![2, 2, 3], vec![0u8; 12]);
        let err = raw.into_grid().unwrap_err();
        assert_eq!(err, Error::InvalidShape { ndim: 3, shape: vec![2, 2, 3] });
    }

    #[test]
    fn raw_1d_rejected() {
        let raw = RawImage::new(vec![4], vec![0.0f64; 4]);
        assert!(matches!(raw.into_grid(), Err(Error::InvalidShape { ndim: 1, .. })));
    }

    #[test]
    fn raw_length_mismatch() {
        let raw = RawImage::new(vec![2, 3], vec![0u16; 5]);
        assert_eq!(
            raw.into_grid().unwrap_err(),
            Error::BufferSizeMismatch { expected: 6, actual: 5 }
        );
    }

    #[test]
    fn overflowing_shape_rejected() {
        let raw = RawImage::new(vec![1 << (usize::BITS - 1), 2], vec![0u8; 4]);
        assert_eq!(
            raw.into_grid().unwrap_err(),
            Error::BufferSizeMismatch { expected: usize::MAX, actual: 4 }
        );
        assert!(Grid::new(Vec::new(), usize::MAX, usize::MAX).is_err());
    }

    #[test]
    #[should_panic]
    fn zeros_with_overflowing_shape_panics() {
        let _ = Grid::zeros(usize::MAX, 2);
    }

    #[test]
    fn ragged_rows_rejected() {
        let rows = vec![vec![1u8, 2, 3], vec![4, 5]];
        assert_eq!(
            rows.into_grid().unwrap_err(),
            Error::RaggedRow { row: 1, expected: 3, actual: 2 }
        );
    }

    #[test]
    fn nested_array_converts() {
        let grid = [[1i32, 2], [3, 4], [5, 6]].into_grid().unwrap();
        assert_eq!(grid.shape(), (3, 2));
        assert_eq!(grid.get(2, 1), 6.0);
    }

    #[test]
    fn empty_rows_make_empty_grid() {
        let rows: Vec<Vec<u8>> = Vec::new();
        let grid = rows.into_grid().unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.shape(), (0, 0));
    }

    #[test]
    fn argmax_finds_peak() {
        let mut grid = Grid::zeros(3, 4);
        grid.data_mut()[2 * 4 + 1] = 9.0;
        assert_eq!(grid.argmax(), Some((2, 1)));
        assert_eq!(grid.max(), Some(9.0));
        assert_eq!(Grid::zeros(0, 0).max(), None);
    }

    #[test]
    fn rows_iterate_in_order() {
        let grid = Grid::new((0..6).map(|v| v as f32).collect(), 2, 3).unwrap();
        let rows: Vec<&[f32]> = grid.rows().collect();
        assert_eq!(rows, vec![&[0.0, 1.0, 2.0][..], &[3.0, 4.0, 5.0][..]]);
    }
}
