//! GPU context and device management.
//!
//! One context is acquired per process by the selector and shared by every
//! [`super::WgpuSemImage`]; it owns the device, the queue and the compiled
//! pipelines.

use std::sync::Arc;

use bytemuck::Pod;
use wgpu::util::DeviceExt;
use wgpu::{Device, DeviceDescriptor, Features, Instance, Queue};
use tracing::{debug, trace};

use super::limits::{GpuLimits, WORKGROUP_DIM};
use crate::shaders;
use crate::{ComputeError, ComputeResult};

/// Compiled compute pipelines.
pub(crate) struct Pipelines {
    pub hanning: wgpu::ComputePipeline,
    pub histogram: wgpu::ComputePipeline,
    pub equalise: wgpu::ComputePipeline,
    pub dft_rows: wgpu::ComputePipeline,
    pub dft_cols: wgpu::ComputePipeline,
}

/// GPU context holding device, queue and pipelines.
pub struct WgpuContext {
    device: Arc<Device>,
    queue: Arc<Queue>,
    pipelines: Pipelines,
    limits: GpuLimits,
    adapter_info: wgpu::AdapterInfo,
}

impl WgpuContext {
    /// Acquire an adapter and device and compile all pipelines.
    pub fn new() -> ComputeResult<Self> {
        pollster::block_on(Self::new_async(wgpu::PowerPreference::HighPerformance))
    }

    async fn new_async(power: wgpu::PowerPreference) -> ComputeResult<Self> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: power,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ComputeError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        let adapter_limits = adapter.limits();

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("sem_compute_device"),
                    required_features: Features::empty(),
                    required_limits: adapter_limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| ComputeError::DeviceCreation(e.to_string()))?;

        let limits = GpuLimits::from_wgpu(&adapter_limits);
        let pipelines = Self::create_pipelines(&device).await?;

        debug!(
            adapter = %adapter_info.name,
            api = ?adapter_info.backend,
            max_binding = limits.max_storage_binding,
            "Acquired wgpu device"
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            pipelines,
            limits,
            adapter_info,
        })
    }

    async fn create_pipelines(device: &Device) -> ComputeResult<Pipelines> {
        // Validation errors are captured instead of hitting the uncaptured-error panic.
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let create_pipeline = |source: &str, label: &str| -> wgpu::ComputePipeline {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: None, // Auto layout
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        };

        let pipelines = Pipelines {
            hanning: create_pipeline(shaders::HANNING, "hanning_pipeline"),
            histogram: create_pipeline(shaders::HISTOGRAM, "histogram_pipeline"),
            equalise: create_pipeline(shaders::EQUALISE, "equalise_pipeline"),
            dft_rows: create_pipeline(shaders::DFT_ROWS, "dft_rows_pipeline"),
            dft_cols: create_pipeline(shaders::DFT_COLS_MAGNITUDE, "dft_cols_pipeline"),
        };

        match device.pop_error_scope().await {
            Some(err) => Err(ComputeError::OperationFailed(format!("pipeline creation: {err}"))),
            None => Ok(pipelines),
        }
    }

    /// Adapter info (GPU name, API).
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Device name.
    pub fn device_name(&self) -> &str {
        &self.adapter_info.name
    }

    /// Device limits.
    pub fn limits(&self) -> &GpuLimits {
        &self.limits
    }

    pub(crate) fn pipelines(&self) -> &Pipelines {
        &self.pipelines
    }

    /// Storage buffer initialised from `data`.
    pub(crate) fn storage_buffer<T: Pod>(&self, label: &str, data: &[T]) -> wgpu::Buffer {
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        })
    }

    /// Uninitialised storage buffer of `size` bytes.
    pub(crate) fn allocate(&self, label: &str, size: u64) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Dims uniform `(width, height, extra, 0)`.
    pub(crate) fn dims_buffer(&self, width: u32, height: u32, extra: u32) -> wgpu::Buffer {
        let dims: [u32; 4] = [width, height, extra, 0];
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("dims_uniform"),
            contents: bytemuck::cast_slice(&dims),
            usage: wgpu::BufferUsages::UNIFORM,
        })
    }

    /// Bind `buffers` to consecutive bindings of group 0 and dispatch over a
    /// `width x height` grid, waiting for completion.
    pub(crate) fn dispatch(
        &self,
        pipeline: &wgpu::ComputePipeline,
        label: &str,
        buffers: &[&wgpu::Buffer],
        width: u32,
        height: u32,
    ) {
        let layout = pipeline.get_bind_group_layout(0);
        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(i, buf)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: buf.as_entire_binding(),
            })
            .collect();
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layout,
            entries: &entries,
        });

        let workgroups = (width.div_ceil(WORKGROUP_DIM), height.div_ceil(WORKGROUP_DIM), 1);
        trace!(kernel = label, groups_x = workgroups.0, groups_y = workgroups.1, "Dispatch");

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("compute_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups.0, workgroups.1, workgroups.2);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.device.poll(wgpu::Maintain::Wait);
    }

    /// Copy a device buffer back to host memory.
    pub(crate) fn download<T: Pod>(&self, buffer: &wgpu::Buffer) -> ComputeResult<Vec<T>> {
        let size = buffer.size();

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging_buffer"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&Default::default());
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| ComputeError::OperationFailed("Map channel closed".into()))?
            .map_err(|e| ComputeError::OperationFailed(format!("Map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let result: Vec<T> = bytemuck::cast_slice(&data[..]).to_vec();
        drop(data);
        staging.unmap();

        Ok(result)
    }
}

impl std::fmt::Debug for WgpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuContext")
            .field("device", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .finish()
    }
}
