//! wgpu image variant.
//!
//! Pixels and spectrum stay resident in device storage buffers; each
//! transform is one or two compute dispatches that write a fresh buffer,
//! which then replaces the old one. Host copies are downloaded on first read
//! and cached until the next mutation.

use std::cell::OnceCell;
use std::f64::consts::PI;
use std::sync::Arc;

use sem_core::{BIT_DEPTH, Grid, Histogram, IntoGrid, SeparableWindow, max_level};
use tracing::debug;

use super::Backend;
use super::context::WgpuContext;
use crate::config::SemConfig;
use crate::image::SemImage;
use crate::ComputeResult;

/// `(cos, -sin)(2 pi j / n)` for `j` in `0..n`.
fn twiddles(n: usize) -> Vec<[f32; 2]> {
    (0..n)
        .map(|j| {
            let theta = 2.0 * PI * j as f64 / n as f64;
            [theta.cos() as f32, -theta.sin() as f32]
        })
        .collect()
}

/// SEM image on a wgpu device.
pub struct WgpuSemImage {
    ctx: Arc<WgpuContext>,
    width: usize,
    height: usize,
    config: SemConfig,
    pixels: wgpu::Buffer,
    spectrum: wgpu::Buffer,
    histogram: Histogram,
    host_pixels: OnceCell<Grid>,
    host_fft: OnceCell<Grid>,
}

impl WgpuSemImage {
    /// Upload `source` and compute the initial spectrum and histogram.
    pub fn new<S: IntoGrid>(ctx: Arc<WgpuContext>, source: S) -> ComputeResult<Self> {
        Self::with_config(ctx, source, SemConfig::default())
    }

    pub fn with_config<S: IntoGrid>(ctx: Arc<WgpuContext>, source: S, config: SemConfig) -> ComputeResult<Self> {
        let grid = source.into_grid()?;
        let (height, width) = grid.shape();
        ctx.limits().check_grid(width, height)?;

        // Zero-sized bindings are invalid; empty grids keep a one-sample placeholder
        // and never dispatch.
        let pixels = if grid.is_empty() {
            ctx.storage_buffer("pixels", &[0.0f32])
        } else {
            ctx.storage_buffer("pixels", grid.data())
        };
        let spectrum = ctx.allocate("spectrum", (grid.len().max(1) * 4) as u64);

        debug!(width, height, device = ctx.device_name(), "Uploaded SEM image");

        let mut image = Self {
            ctx,
            width,
            height,
            config,
            pixels,
            spectrum,
            histogram: Histogram::empty(max_level(BIT_DEPTH)),
            host_pixels: OnceCell::from(grid),
            host_fft: OnceCell::new(),
        };
        image.update_fft()?;
        image.update_histogram()?;
        Ok(image)
    }

    fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn pixel_bytes(&self) -> u64 {
        (self.width * self.height * 4) as u64
    }

    fn dims(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    fn replace_pixels(&mut self, buffer: wgpu::Buffer) {
        self.pixels = buffer;
        self.host_pixels = OnceCell::new();
    }

    /// Download a device grid, or an empty grid of the right shape.
    fn download_grid(&self, buffer: &wgpu::Buffer) -> ComputeResult<Grid> {
        if self.is_empty() {
            return Ok(Grid::zeros(self.height, self.width));
        }
        let data: Vec<f32> = self.ctx.download(buffer)?;
        Ok(Grid::new(data, self.height, self.width)?)
    }
}

impl SemImage for WgpuSemImage {
    fn backend(&self) -> Backend {
        Backend::Wgpu
    }

    fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    fn config(&self) -> &SemConfig {
        &self.config
    }

    fn pixels(&self) -> ComputeResult<&Grid> {
        if let Some(grid) = self.host_pixels.get() {
            return Ok(grid);
        }
        let grid = self.download_grid(&self.pixels)?;
        Ok(self.host_pixels.get_or_init(|| grid))
    }

    fn fft(&self) -> ComputeResult<&Grid> {
        if let Some(grid) = self.host_fft.get() {
            return Ok(grid);
        }
        let grid = self.download_grid(&self.spectrum)?;
        Ok(self.host_fft.get_or_init(|| grid))
    }

    fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    fn apply_hanning(&mut self) -> ComputeResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        let (w, h) = self.dims();
        let window = SeparableWindow::hanning(self.height, self.width);
        let col: Vec<f32> = window.col.iter().map(|&v| v as f32).collect();
        let row: Vec<f32> = window.row.iter().map(|&v| v as f32).collect();

        let col_buf = self.ctx.storage_buffer("hanning_col", &col);
        let row_buf = self.ctx.storage_buffer("hanning_row", &row);
        let dims_buf = self.ctx.dims_buffer(w, h, 0);
        let dst = self.ctx.allocate("pixels", self.pixel_bytes());

        self.ctx.dispatch(
            &self.ctx.pipelines().hanning,
            "hanning",
            &[&self.pixels, &dst, &dims_buf, &col_buf, &row_buf],
            w,
            h,
        );
        self.replace_pixels(dst);
        debug!(width = w, height = h, "Applied Hanning window");
        Ok(())
    }

    fn apply_histogram_equalisation(&mut self) -> ComputeResult<()> {
        let table = self.histogram.equalisation_table(self.config.table_overflow)?;
        if self.is_empty() {
            return Ok(());
        }
        let (w, h) = self.dims();
        let lut_buf = self.ctx.storage_buffer("equalise_lut", &table);
        let dims_buf = self.ctx.dims_buffer(w, h, self.max_level() as u32);
        let dst = self.ctx.allocate("pixels", self.pixel_bytes());

        self.ctx.dispatch(
            &self.ctx.pipelines().equalise,
            "equalise",
            &[&self.pixels, &dst, &dims_buf, &lut_buf],
            w,
            h,
        );
        self.replace_pixels(dst);
        debug!(overflow = ?self.config.table_overflow, "Applied histogram equalisation");
        Ok(())
    }

    fn update_fft(&mut self) -> ComputeResult<()> {
        if self.is_empty() {
            self.host_fft = OnceCell::from(Grid::zeros(self.height, self.width));
            return Ok(());
        }
        let (w, h) = self.dims();
        let row_twiddle = self.ctx.storage_buffer("twiddle_row", &twiddles(self.width));
        let col_twiddle = self.ctx.storage_buffer("twiddle_col", &twiddles(self.height));
        let dims_buf = self.ctx.dims_buffer(w, h, 0);

        let rows = self.ctx.allocate("dft_rows", self.pixel_bytes() * 2);
        self.ctx.dispatch(
            &self.ctx.pipelines().dft_rows,
            "dft_rows",
            &[&self.pixels, &rows, &dims_buf, &row_twiddle],
            w,
            h,
        );

        let spectrum = self.ctx.allocate("spectrum", self.pixel_bytes());
        self.ctx.dispatch(
            &self.ctx.pipelines().dft_cols,
            "dft_cols",
            &[&rows, &spectrum, &dims_buf, &col_twiddle],
            w,
            h,
        );

        self.spectrum = spectrum;
        self.host_fft = OnceCell::new();
        debug!(width = w, height = h, "Updated spectrum");
        Ok(())
    }

    fn update_histogram(&mut self) -> ComputeResult<()> {
        let levels = self.max_level();
        if self.is_empty() {
            self.histogram = Histogram::empty(levels);
            return Ok(());
        }
        let (w, h) = self.dims();
        let bins = self.ctx.storage_buffer("histogram_bins", &vec![0u32; levels]);
        let dims_buf = self.ctx.dims_buffer(w, h, levels as u32);

        self.ctx.dispatch(
            &self.ctx.pipelines().histogram,
            "histogram",
            &[&self.pixels, &bins, &dims_buf],
            w,
            h,
        );

        let counts: Vec<u32> = self.ctx.download(&bins)?;
        self.histogram = Histogram::from_counts(counts.into_iter().map(u64::from).collect());
        debug!(total = self.histogram.total(), "Updated histogram");
        Ok(())
    }
}

impl std::fmt::Debug for WgpuSemImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuSemImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("device", &self.ctx.device_name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twiddles_unit_circle() {
        let t = twiddles(4);
        let expected = [[1.0, 0.0], [0.0, -1.0], [-1.0, 0.0], [0.0, 1.0]];
        for (a, b) in t.iter().zip(expected) {
            assert!((a[0] - b[0]).abs() < 1e-6 && (a[1] - b[1]).abs() < 1e-6, "{a:?} vs {b:?}");
        }
    }
}
