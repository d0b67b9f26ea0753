//! Mesh registry and per-frame driver facade.
//!
//! [`Renderer`] wires the bootstrap pieces together — device/queue, frame
//! context, pipeline cache — and owns the collection of live meshes. The
//! window/event-loop glue drives it through the per-frame contract:
//! `update`, `begin_render`, `render_mesh`/`render_all`, `end_render`,
//! `present`.

use anyhow::Result;
use glam::Mat4;

use crate::device::{Gpu, GpuInit};
use crate::frame::FrameContext;
use crate::mesh::{GpuMesh, MeshData};
use crate::pipeline::PipelineCache;

/// Opaque handle to a mesh owned by the registry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MeshHandle(usize);

pub struct Renderer {
    gpu: Gpu,
    frame: FrameContext,
    pipelines: PipelineCache,
    /// Slot map of live meshes; freed slots are reused.
    meshes: Vec<Option<GpuMesh>>,
}

impl Renderer {
    /// Bootstraps device, queue, and a windowed frame context.
    pub async fn for_window(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        init: GpuInit,
    ) -> Result<Self> {
        let (gpu, surface) = Gpu::for_window(target, &init).await?;
        let frame = FrameContext::for_window(&gpu, surface, width, height, &init)?;
        Ok(Self::assemble(gpu, frame))
    }

    /// Blocking wrapper around [`Renderer::for_window`].
    pub fn for_window_blocking(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        init: GpuInit,
    ) -> Result<Self> {
        pollster::block_on(Self::for_window(target, width, height, init))
    }

    /// Bootstraps a headless renderer drawing to offscreen back images.
    pub fn headless(width: u32, height: u32, init: GpuInit) -> Result<Self> {
        let gpu = Gpu::new_blocking(&init)?;
        let frame = FrameContext::headless(&gpu, width, height, &init)?;
        Ok(Self::assemble(gpu, frame))
    }

    fn assemble(gpu: Gpu, frame: FrameContext) -> Self {
        Self {
            gpu,
            frame,
            pipelines: PipelineCache::new(),
            meshes: Vec::new(),
        }
    }

    /// Creates a mesh from raw vertex/index arrays and registers it.
    pub fn create_mesh(&mut self, data: &MeshData) -> Result<MeshHandle> {
        let mesh = GpuMesh::new(
            &self.gpu,
            &mut self.pipelines,
            data,
            self.frame.pipeline_config(),
        )?;

        let slot = self.meshes.iter().position(Option::is_none);
        let index = match slot {
            Some(index) => {
                self.meshes[index] = Some(mesh);
                index
            }
            None => {
                self.meshes.push(Some(mesh));
                self.meshes.len() - 1
            }
        };
        Ok(MeshHandle(index))
    }

    /// Destroys a mesh. Owned buffers release immediately; shared pipeline
    /// state releases with the last mesh of its configuration.
    ///
    /// Destroying a handle twice is a caller contract violation.
    pub fn destroy_mesh(&mut self, handle: MeshHandle) {
        let slot = self
            .meshes
            .get_mut(handle.0)
            .unwrap_or_else(|| panic!("destroy_mesh: invalid handle {handle:?}"));
        assert!(slot.take().is_some(), "destroy_mesh: {handle:?} already destroyed");
    }

    pub fn set_world_transform(&mut self, handle: MeshHandle, world: Mat4) {
        self.mesh_mut(handle).set_world_transform(world);
    }

    pub fn mesh(&self, handle: MeshHandle) -> &GpuMesh {
        self.meshes
            .get(handle.0)
            .and_then(Option::as_ref)
            .unwrap_or_else(|| panic!("stale mesh handle {handle:?}"))
    }

    fn mesh_mut(&mut self, handle: MeshHandle) -> &mut GpuMesh {
        self.meshes
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("stale mesh handle {handle:?}"))
    }

    pub fn live_mesh_count(&self) -> usize {
        self.meshes.iter().filter(|m| m.is_some()).count()
    }

    /// Per-frame CPU update: refreshes every live mesh's uniform block with
    /// the current viewport aspect ratio.
    pub fn update(&mut self) {
        let aspect = self.frame.aspect_ratio();
        let queue = self.gpu.queue();
        for mesh in self.meshes.iter_mut().flatten() {
            mesh.update(queue, aspect);
        }
    }

    pub fn begin_render(&mut self) -> Result<()> {
        self.frame.begin_render()
    }

    /// Records a draw for one mesh. Repeatable within a frame.
    pub fn render_mesh(&mut self, handle: MeshHandle) {
        let mesh = self
            .meshes
            .get(handle.0)
            .and_then(Option::as_ref)
            .unwrap_or_else(|| panic!("stale mesh handle {handle:?}"));
        self.frame.draw_mesh(mesh);
    }

    /// Records draws for every live mesh, in handle order.
    pub fn render_all(&mut self) {
        for index in 0..self.meshes.len() {
            if self.meshes[index].is_some() {
                self.render_mesh(MeshHandle(index));
            }
        }
    }

    pub fn end_render(&mut self) {
        self.frame.end_render();
    }

    pub fn present(&mut self) -> Result<()> {
        self.frame.present()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.frame.resize(width, height);
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn frame(&self) -> &FrameContext {
        &self.frame
    }

    pub fn pipelines(&self) -> &PipelineCache {
        &self.pipelines
    }
}
