//! The SEM image contract shared by every backend.

use sem_core::{BIT_DEPTH, Grid, Histogram, max_level};

use crate::backend::Backend;
use crate::config::SemConfig;
use crate::ComputeResult;

/// Grayscale SEM image with its derived spectrum and histogram.
///
/// Implementations are built from any [`sem_core::IntoGrid`] source, which
/// validates the input is a 2-D grid, then compute the spectrum and the
/// histogram once.
///
/// # Stale derived fields
///
/// [`apply_hanning`](Self::apply_hanning) and
/// [`apply_histogram_equalisation`](Self::apply_histogram_equalisation)
/// replace the pixels but do **not** refresh [`fft`](Self::fft) or
/// [`histogram`](Self::histogram). Equalisation itself reads the cached
/// histogram, so equalising after windowing uses the pre-window snapshot
/// unless [`update_histogram`](Self::update_histogram) is called in between.
///
/// # Synchronisation
///
/// Every method returns only after the backend has finished; accessors
/// always observe completed results.
pub trait SemImage: std::fmt::Debug + Send {
    /// Backend executing this image.
    fn backend(&self) -> Backend;

    /// Pixel grid shape `(height, width)`.
    fn shape(&self) -> (usize, usize);

    /// Configuration the image was built with.
    fn config(&self) -> &SemConfig;

    /// Bits per sample, fixed at 8.
    fn bit_depth(&self) -> u32 {
        BIT_DEPTH
    }

    /// Number of intensity levels, `2^bit_depth`.
    fn max_level(&self) -> usize {
        max_level(self.bit_depth())
    }

    /// Current pixels.
    fn pixels(&self) -> ComputeResult<&Grid>;

    /// Centred spectral magnitude as of the last [`update_fft`](Self::update_fft).
    fn fft(&self) -> ComputeResult<&Grid>;

    /// Histogram as of the last [`update_histogram`](Self::update_histogram).
    fn histogram(&self) -> &Histogram;

    /// Multiply pixels by the separable Hanning window `sqrt(outer(hann(H), hann(W)))`.
    fn apply_hanning(&mut self) -> ComputeResult<()>;

    /// Remap pixels through the equalisation table of the cached histogram.
    ///
    /// Fails with [`sem_core::Error::DegenerateHistogram`] when the cached
    /// histogram is empty.
    fn apply_histogram_equalisation(&mut self) -> ComputeResult<()>;

    /// Recompute the centred 2-D DFT magnitude of the current pixels.
    fn update_fft(&mut self) -> ComputeResult<()>;

    /// Recount the current pixels into `max_level` unit bins.
    fn update_histogram(&mut self) -> ComputeResult<()>;
}
