use anyhow::{Context, Result};

use super::GpuInit;

/// Owns the wgpu core objects.
///
/// This type is the one-time bootstrap of the harness:
/// - creates and stores Instance/Adapter/Device/Queue
/// - hands out device/queue references consumed by every other component
///
/// Surface (swapchain) ownership lives in [`crate::frame::FrameContext`];
/// `Gpu` only makes sure the adapter it selects is compatible with the
/// surface when one exists.
pub struct Gpu {
    /// wgpu instance used to create the adapter and any surfaces.
    instance: wgpu::Instance,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,
}

impl Gpu {
    /// Creates a headless GPU context (no surface).
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(init: &GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        Self::with_instance(instance, None, init).await
    }

    /// Creates a GPU context plus a surface bound to `target`.
    ///
    /// The adapter is selected for compatibility with the returned surface.
    pub async fn for_window(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        init: &GpuInit,
    ) -> Result<(Self, wgpu::Surface<'static>)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .context("failed to create wgpu surface")?;

        let gpu = Self::with_instance(instance, Some(&surface), init).await?;
        Ok((gpu, surface))
    }

    /// Blocking wrapper around [`Gpu::new`] for synchronous callers.
    pub fn new_blocking(init: &GpuInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    async fn with_instance(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
        init: &GpuInit,
    ) -> Result<Self> {
        anyhow::ensure!(
            init.frames_in_flight >= 2,
            "frames_in_flight must be at least 2 (got {})",
            init.frames_in_flight
        );

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        log::info!("adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("agni-engine device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Returns a reference to the wgpu instance.
    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    /// Returns a reference to the selected adapter.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}
