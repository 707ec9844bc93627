//! CPU image variant using rayon for parallelisation.

use rayon::prelude::*;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use sem_core::{BIT_DEPTH, Grid, Histogram, IntoGrid, SeparableWindow, lookup_index, max_level, shifted_index};
use tracing::debug;

use super::Backend;
use crate::config::SemConfig;
use crate::image::SemImage;
use crate::ComputeResult;

/// SEM image held in host memory.
#[derive(Debug, Clone)]
pub struct CpuSemImage {
    pixels: Grid,
    fft: Grid,
    histogram: Histogram,
    config: SemConfig,
}

impl CpuSemImage {
    /// Convert `source` and compute the initial spectrum and histogram.
    pub fn new<S: IntoGrid>(source: S) -> ComputeResult<Self> {
        Self::with_config(source, SemConfig::default())
    }

    pub fn with_config<S: IntoGrid>(source: S, config: SemConfig) -> ComputeResult<Self> {
        let pixels = source.into_grid()?;
        let (height, width) = pixels.shape();
        debug!(width, height, "Created CPU SEM image");

        let mut image = Self {
            fft: Grid::zeros(height, width),
            histogram: Histogram::empty(max_level(BIT_DEPTH)),
            pixels,
            config,
        };
        image.update_fft()?;
        image.update_histogram()?;
        Ok(image)
    }
}

/// Centred magnitude of the 2-D DFT of `grid`.
///
/// Rows are transformed in parallel, columns through a transpose so they
/// are contiguous as well. Accumulates in `f64`.
pub(crate) fn centred_spectrum(grid: &Grid) -> ComputeResult<Grid> {
    let (height, width) = grid.shape();
    if grid.is_empty() {
        return Ok(Grid::zeros(height, width));
    }

    let mut planner = FftPlanner::<f64>::new();
    let row_fft = planner.plan_fft_forward(width);
    let col_fft = planner.plan_fft_forward(height);

    let mut rows: Vec<Complex<f64>> = grid
        .data()
        .par_iter()
        .map(|&v| Complex::new(v as f64, 0.0))
        .collect();
    rows.par_chunks_mut(width).for_each(|row| row_fft.process(row));

    // cols[x * height + y] = rows[y * width + x]
    let mut cols = vec![Complex::new(0.0, 0.0); width * height];
    cols.par_chunks_mut(height).enumerate().for_each(|(x, col)| {
        for (y, c) in col.iter_mut().enumerate() {
            *c = rows[y * width + x];
        }
    });
    cols.par_chunks_mut(height).for_each(|col| col_fft.process(col));

    let mut magnitude = vec![0.0f32; width * height];
    magnitude.par_chunks_mut(width).enumerate().for_each(|(sy, out)| {
        // Inverse of the shift: output row sy holds frequency ky
        let ky = (sy + height - height / 2) % height;
        for (kx, c) in cols.iter().skip(ky).step_by(height).enumerate() {
            out[shifted_index(kx, width)] = c.norm() as f32;
        }
    });

    Ok(Grid::new(magnitude, height, width)?)
}

impl SemImage for CpuSemImage {
    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    fn shape(&self) -> (usize, usize) {
        self.pixels.shape()
    }

    fn config(&self) -> &SemConfig {
        &self.config
    }

    fn pixels(&self) -> ComputeResult<&Grid> {
        Ok(&self.pixels)
    }

    fn fft(&self) -> ComputeResult<&Grid> {
        Ok(&self.fft)
    }

    fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    fn apply_hanning(&mut self) -> ComputeResult<()> {
        let (height, width) = self.pixels.shape();
        if self.pixels.is_empty() {
            return Ok(());
        }
        let window = SeparableWindow::hanning(height, width);

        let mut out = Grid::zeros(height, width);
        out.data_mut()
            .par_chunks_mut(width)
            .zip(self.pixels.data().par_chunks(width))
            .enumerate()
            .for_each(|(y, (dst, src))| {
                for (x, (d, &s)) in dst.iter_mut().zip(src).enumerate() {
                    *d = (window.at(y, x) * s as f64) as f32;
                }
            });

        self.pixels = out;
        debug!(width, height, "Applied Hanning window");
        Ok(())
    }

    fn apply_histogram_equalisation(&mut self) -> ComputeResult<()> {
        let table = self.histogram.equalisation_table(self.config.table_overflow)?;
        let levels = self.max_level();

        let (height, width) = self.pixels.shape();
        let mut out = Grid::zeros(height, width);
        out.data_mut()
            .par_iter_mut()
            .zip(self.pixels.data().par_iter())
            .for_each(|(d, &s)| *d = table[lookup_index(s, levels)]);

        self.pixels = out;
        debug!(overflow = ?self.config.table_overflow, "Applied histogram equalisation");
        Ok(())
    }

    fn update_fft(&mut self) -> ComputeResult<()> {
        self.fft = centred_spectrum(&self.pixels)?;
        debug!(shape = ?self.fft.shape(), "Updated spectrum");
        Ok(())
    }

    fn update_histogram(&mut self) -> ComputeResult<()> {
        self.histogram = Histogram::compute(self.pixels.data(), self.max_level());
        debug!(total = self.histogram.total(), "Updated histogram");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn spectrum_of_impulse_is_flat() {
        let mut grid = Grid::zeros(4, 6);
        grid.data_mut()[0] = 2.0;
        let spec = centred_spectrum(&grid).unwrap();
        assert!(spec.data().iter().all(|&m| (m - 2.0).abs() < 1e-6));
    }

    #[test]
    fn spectrum_of_cosine_has_two_peaks() {
        // cos(2 pi x / 8) along rows: energy at kx = +-1
        let (h, w) = (4usize, 8usize);
        let data: Vec<f32> = (0..h * w)
            .map(|i| (2.0 * std::f64::consts::PI * (i % w) as f64 / w as f64).cos() as f32)
            .collect();
        let spec = centred_spectrum(&Grid::new(data, h, w).unwrap()).unwrap();
        let peak = (h * w / 2) as f32;
        // Centred: zero frequency at (2, 4); kx = 1 -> 5, kx = -1 -> 3
        assert_abs_diff_eq!(spec.get(2, 5), peak, epsilon = 1e-4);
        assert_abs_diff_eq!(spec.get(2, 3), peak, epsilon = 1e-4);
        assert_abs_diff_eq!(spec.get(2, 4), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(spec.get(0, 5), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn odd_shapes_centre_zero_frequency() {
        let spec = centred_spectrum(&Grid::filled(3, 5, 1.0)).unwrap();
        assert_eq!(spec.argmax(), Some((1, 2)));
        assert_abs_diff_eq!(spec.get(1, 2), 15.0, epsilon = 1e-5);
    }

    #[test]
    fn empty_grid_has_empty_spectrum() {
        let spec = centred_spectrum(&Grid::zeros(0, 4)).unwrap();
        assert!(spec.is_empty());
        assert_eq!(spec.shape(), (0, 4));
    }

    #[test]
    fn spectrum_keeps_non_square_shape() {
        let spec = centred_spectrum(&Grid::filled(2, 7, 1.0)).unwrap();
        assert_eq!(spec.shape(), (2, 7));
        assert_eq!(spec.len(), 14);
        assert_eq!(spec.argmax(), Some((1, 3)));
    }
}
