//! Compute backends for SEM images.
//!
//! Provides a CPU (rayon) and a wgpu implementation of [`crate::SemImage`],
//! plus the process-wide selector that decides between them.
//!
//! # Architecture
//!
//! ```text
//! BackendSelector (OnceLock)
//!     +-- CpuSemImage   (rayon + rustfft)
//!     +-- WgpuSemImage  (WGSL compute kernels on a shared WgpuContext)
//! ```

mod cpu_backend;
mod detect;

#[cfg(feature = "wgpu")]
mod context;
#[cfg(feature = "wgpu")]
mod limits;
#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use cpu_backend::CpuSemImage;
pub use detect::{BackendPreference, BackendSelector, accelerator_available, describe_backends, selector};

#[cfg(feature = "wgpu")]
pub use context::WgpuContext;
#[cfg(feature = "wgpu")]
pub use limits::GpuLimits;
#[cfg(feature = "wgpu")]
pub use wgpu_backend::WgpuSemImage;

/// Image backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Host arrays, rayon parallelisation.
    Cpu,
    /// wgpu device (Vulkan/Metal/DX12).
    Wgpu,
}

impl Backend {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Wgpu => "wgpu",
        }
    }

    /// Whether this backend runs on an accelerator.
    pub fn is_accelerated(&self) -> bool {
        matches!(self, Self::Wgpu)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
