//! Backend-agnostic SEM image entity.
//!
//! Provides a CPU (rayon + rustfft) and a GPU (wgpu) implementation of the
//! same [`SemImage`] contract. The variant is picked once per process by the
//! backend selector; after that every transform yields the same numbers on
//! either backend.
//!
//! # Architecture
//!
//! ```text
//! create(source)
//!     └── selector() (OnceLock, decided once)
//!             ├── CpuSemImage  (rayon, rustfft)
//!             └── WgpuSemImage (compute shaders)
//! ```
//!
//! # Stale derived fields
//!
//! The spectrum and histogram are computed once at construction. Transforms
//! that mutate pixels leave them as they were; call
//! [`SemImage::update_fft`] and [`SemImage::update_histogram`] to refresh.
//!
//! # Example
//!
//! ```ignore
//! use sem_compute::create;
//! use sem_core::RawImage;
//!
//! let mut img = create(RawImage::new(vec![480, 640], frame))?;
//! img.apply_hanning()?;
//! img.update_fft()?;
//! let spectrum = img.fft()?;
//! ```

pub mod backend;
pub mod config;
pub mod image;
mod shaders;

pub use backend::{
    Backend, BackendPreference, BackendSelector, CpuSemImage, accelerator_available,
    describe_backends, selector,
};
#[cfg(feature = "wgpu")]
pub use backend::{WgpuContext, WgpuSemImage};
pub use config::SemConfig;
pub use image::SemImage;
pub use sem_core::{Grid, Histogram, IntoGrid, RawImage, TableOverflow};

use thiserror::Error;
use tracing::debug;

/// Errors from image construction and transforms.
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Failed to create device: {0}")]
    DeviceCreation(String),

    #[error("Image too large: {width}x{height} needs {bytes} bytes, GPU binding limit is {limit}")]
    ImageTooLarge { width: usize, height: usize, bytes: u64, limit: u64 },

    #[error("GPU operation failed: {0}")]
    OperationFailed(String),

    #[error(transparent)]
    Core(#[from] sem_core::Error),
}

pub type ComputeResult<T> = Result<T, ComputeError>;

/// Build the image variant matching the process-wide backend selection.
pub fn create<S: IntoGrid>(source: S) -> ComputeResult<Box<dyn SemImage>> {
    create_with_config(source, SemConfig::default())
}

/// Like [`create`], with explicit configuration.
pub fn create_with_config<S: IntoGrid>(source: S, config: SemConfig) -> ComputeResult<Box<dyn SemImage>> {
    create_on(selector().backend(), source, config)
}

/// Build a specific variant.
///
/// Requesting [`Backend::Wgpu`] when the selector found no accelerator fails
/// with [`ComputeError::BackendNotAvailable`].
pub fn create_on<S: IntoGrid>(backend: Backend, source: S, config: SemConfig) -> ComputeResult<Box<dyn SemImage>> {
    debug!(backend = backend.name(), "Creating SEM image");
    match backend {
        Backend::Cpu => Ok(Box::new(CpuSemImage::with_config(source, config)?)),
        Backend::Wgpu => {
            #[cfg(feature = "wgpu")]
            {
                let ctx = selector().wgpu_context().ok_or_else(|| {
                    ComputeError::BackendNotAvailable(
                        selector()
                            .fallback_reason()
                            .unwrap_or("accelerator not acquired")
                            .to_string(),
                    )
                })?;
                Ok(Box::new(WgpuSemImage::with_config(ctx.clone(), source, config)?))
            }
            #[cfg(not(feature = "wgpu"))]
            {
                Err(ComputeError::BackendNotAvailable(
                    "wgpu feature not enabled".to_string()
                ))
            }
        }
    }
}
