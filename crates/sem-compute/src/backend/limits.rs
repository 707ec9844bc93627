//! Device limits relevant to whole-image dispatch.
//!
//! SEM frames are processed in a single pass: every kernel binds the full
//! grid, so the largest intermediate (the complex row spectrum, 8 bytes per
//! sample) must fit in one storage binding.

use crate::{ComputeError, ComputeResult};

/// Workgroup edge used by every 2-D kernel.
pub const WORKGROUP_DIM: u32 = 16;

/// Bytes per sample of the widest intermediate buffer (`vec2<f32>`).
const WIDEST_SAMPLE_BYTES: u64 = 8;

/// GPU resource limits.
#[derive(Debug, Clone)]
pub struct GpuLimits {
    /// Maximum size of one storage buffer binding in bytes.
    pub max_storage_binding: u64,
    /// Maximum buffer size in bytes.
    pub max_buffer_bytes: u64,
    /// Maximum workgroups per dispatch dimension.
    pub max_workgroups_per_dim: u32,
}

impl GpuLimits {
    /// Creates limits from adapter limits.
    pub fn from_wgpu(limits: &wgpu::Limits) -> Self {
        Self {
            max_storage_binding: limits.max_storage_buffer_binding_size as u64,
            max_buffer_bytes: limits.max_buffer_size,
            max_workgroups_per_dim: limits.max_compute_workgroups_per_dimension,
        }
    }

    /// Bytes of the widest intermediate buffer for a `width x height` grid.
    pub fn required_bytes(width: usize, height: usize) -> u64 {
        (width as u64) * (height as u64) * WIDEST_SAMPLE_BYTES
    }

    /// Reject grids that cannot be bound or dispatched in one pass.
    pub fn check_grid(&self, width: usize, height: usize) -> ComputeResult<()> {
        let bytes = Self::required_bytes(width, height);
        let limit = self.max_storage_binding.min(self.max_buffer_bytes);
        let groups_x = (width as u64).div_ceil(WORKGROUP_DIM as u64);
        let groups_y = (height as u64).div_ceil(WORKGROUP_DIM as u64);
        let max_groups = self.max_workgroups_per_dim as u64;
        if bytes > limit || groups_x > max_groups || groups_y > max_groups {
            return Err(ComputeError::ImageTooLarge { width, height, bytes, limit });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(binding: u64) -> GpuLimits {
        GpuLimits {
            max_storage_binding: binding,
            max_buffer_bytes: u64::MAX,
            max_workgroups_per_dim: 65535,
        }
    }

    #[test]
    fn default_limits_bound_single_pass() {
        let l = GpuLimits::from_wgpu(&wgpu::Limits::default());
        assert_eq!(l.max_storage_binding, 128 << 20);
        // 4096 x 4096 needs exactly 128 MiB for the row spectrum
        assert!(l.check_grid(4096, 4096).is_ok());
        assert!(l.check_grid(4096, 4097).is_err());
    }

    #[test]
    fn small_grid_fits() {
        assert!(limits(128 << 20).check_grid(1024, 768).is_ok());
    }

    #[test]
    fn oversized_grid_rejected() {
        let err = limits(1 << 20).check_grid(1024, 1024).unwrap_err();
        assert!(matches!(err, ComputeError::ImageTooLarge { bytes, .. } if bytes == 8 << 20));
    }

    #[test]
    fn dispatch_width_limited() {
        let mut l = limits(u64::MAX);
        l.max_workgroups_per_dim = 4;
        assert!(l.check_grid(64, 8).is_ok());
        assert!(l.check_grid(65, 8).is_err());
    }
}
