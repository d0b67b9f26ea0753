//! GPU mesh resources.
//!
//! A [`GpuMesh`] owns a device-local vertex buffer, an optional index
//! buffer, and a per-object uniform buffer (world/view/projection), and
//! holds a shared handle to the pipeline state for its configuration. Many
//! meshes of the same configuration draw through one pipeline; the shared
//! state is released when the last of them drops.

mod vertex;

pub use vertex::{MeshData, Vertex};

use std::sync::Arc;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::device::{Gpu, UploadTransfer};
use crate::pipeline::{MeshPipeline, PipelineCache, PipelineConfig};

/// Hardware constant-buffer alignment. Uniform allocations round up to this.
pub const UNIFORM_ALIGN: u64 = 256;

/// Rounds a uniform-buffer size request up to [`UNIFORM_ALIGN`].
pub fn align_uniform_size(size: u64) -> u64 {
    (size + UNIFORM_ALIGN - 1) & !(UNIFORM_ALIGN - 1)
}

/// Per-object uniform block, laid out as the shading stage expects.
///
/// Matrices are stored column-major (glam's native layout, which is also
/// WGSL's), so no transposition happens on upload.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub world: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}

/// Fixed-function camera defaults: a look-direction view from (0,0,-1)
/// facing +Z, and a left-handed 70 degree vertical-FOV perspective with
/// near 0.1 and far 100.0. Aspect comes from the owning frame context's
/// viewport.
pub const CAMERA_FOV_Y_DEG: f32 = 70.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 100.0;

impl ObjectUniforms {
    pub fn compute(world: Mat4, aspect: f32) -> Self {
        let view = Mat4::look_to_lh(Vec3::new(0.0, 0.0, -1.0), Vec3::Z, Vec3::Y);
        let proj = Mat4::perspective_lh(
            CAMERA_FOV_Y_DEG.to_radians(),
            aspect,
            CAMERA_NEAR,
            CAMERA_FAR,
        );
        Self {
            world: world.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
        }
    }
}

/// A renderable mesh instance.
pub struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,

    index_buffer: Option<wgpu::Buffer>,
    index_count: u32,

    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,

    /// CPU shadow of the last-written uniform block.
    uniforms: ObjectUniforms,
    world: Mat4,

    pipeline: Arc<MeshPipeline>,
}

impl GpuMesh {
    /// Uploads `data` and builds the per-mesh GPU state.
    ///
    /// The vertex (and index, if any) buffers go through a blocking
    /// [`UploadTransfer`]; the shared pipeline for `config` is taken from
    /// (or built into) `pipelines`.
    pub fn new(
        gpu: &Gpu,
        pipelines: &mut PipelineCache,
        data: &MeshData,
        config: PipelineConfig,
    ) -> Result<Self> {
        anyhow::ensure!(!data.vertices.is_empty(), "mesh has no vertices");

        let device = gpu.device();
        let mut upload = UploadTransfer::new(gpu);

        let vertex_buffer = upload.copy_to_device(
            bytemuck::cast_slice(&data.vertices),
            wgpu::BufferUsages::VERTEX,
            "agni mesh vertex buffer",
        )?;

        let index_buffer = if data.is_indexed() {
            Some(upload.copy_to_device(
                bytemuck::cast_slice(&data.indices),
                wgpu::BufferUsages::INDEX,
                "agni mesh index buffer",
            )?)
        } else {
            None
        };

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("agni mesh uniforms"),
            size: align_uniform_size(std::mem::size_of::<ObjectUniforms>() as u64),
            usage: wgpu::BufferUsages::UNIFORM
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let pipeline = pipelines.get_or_create(device, config);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("agni mesh bind group"),
            layout: &pipeline.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            vertex_buffer,
            vertex_count: data.vertices.len() as u32,
            index_buffer,
            index_count: data.indices.len() as u32,
            uniform_buffer,
            bind_group,
            uniforms: ObjectUniforms::compute(Mat4::IDENTITY, 1.0),
            world: Mat4::IDENTITY,
            pipeline,
        })
    }

    /// Stores the instance's world matrix. No GPU work.
    pub fn set_world_transform(&mut self, world: Mat4) {
        self.world = world;
    }

    pub fn world_transform(&self) -> Mat4 {
        self.world
    }

    /// Recomputes the uniform block and writes it to the GPU.
    ///
    /// Called once per frame per live mesh, before any draw referencing it is
    /// recorded. Idempotent for an unchanged world matrix and aspect.
    pub fn update(&mut self, queue: &wgpu::Queue, aspect: f32) {
        self.uniforms = ObjectUniforms::compute(self.world, aspect);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
    }

    /// Binds shared pipeline state and the mesh's own resources, then issues
    /// the draw. Indexed when an index buffer exists, non-indexed otherwise.
    /// Draws unconditionally — no culling.
    pub fn draw(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_pipeline(&self.pipeline.render_pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));

        match &self.index_buffer {
            Some(ib) => {
                rpass.set_index_buffer(ib.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..self.index_count, 0, 0..1);
            }
            None => rpass.draw(0..self.vertex_count, 0..1),
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// The last uniform block written by [`update`](Self::update).
    pub fn uniforms(&self) -> &ObjectUniforms {
        &self.uniforms
    }

    /// The mesh's uniform buffer (rounded up to [`UNIFORM_ALIGN`]).
    pub fn uniform_buffer(&self) -> &wgpu::Buffer {
        &self.uniform_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_round_up_to_256() {
        assert_eq!(align_uniform_size(1), 256);
        assert_eq!(align_uniform_size(192), 256);
        assert_eq!(align_uniform_size(256), 256);
        assert_eq!(align_uniform_size(257), 512);
    }

    #[test]
    fn uniform_block_fits_one_alignment_unit() {
        // 3 column-major 4x4 f32 matrices.
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 192);
        assert_eq!(
            align_uniform_size(std::mem::size_of::<ObjectUniforms>() as u64),
            256
        );
    }

    #[test]
    fn recompute_is_idempotent_for_unchanged_inputs() {
        let world = Mat4::from_rotation_y(0.7);
        let a = ObjectUniforms::compute(world, 800.0 / 600.0);
        let b = ObjectUniforms::compute(world, 800.0 / 600.0);
        assert_eq!(a, b);
    }

    #[test]
    fn translated_instances_differ_only_in_world_translation() {
        let left = ObjectUniforms::compute(Mat4::from_translation(Vec3::new(-0.5, 0.0, 0.0)), 1.0);
        let right = ObjectUniforms::compute(Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0)), 1.0);

        assert_eq!(left.view, right.view);
        assert_eq!(left.proj, right.proj);

        // Column-major: translation lives in column 3 of the world matrix.
        for col in 0..3 {
            assert_eq!(left.world[col], right.world[col]);
        }
        assert_eq!(left.world[3][0], -0.5);
        assert_eq!(right.world[3][0], 0.5);
        assert_eq!(left.world[3][1..], right.world[3][1..]);
    }

    #[test]
    fn projection_uses_the_fixed_clip_range() {
        let u = ObjectUniforms::compute(Mat4::IDENTITY, 1.0);
        let proj = Mat4::from_cols_array_2d(&u.proj);

        // Left-handed projection maps z=near to 0 and z=far to 1.
        let near = proj.project_point3(Vec3::new(0.0, 0.0, CAMERA_NEAR));
        let far = proj.project_point3(Vec3::new(0.0, 0.0, CAMERA_FAR));
        assert!(near.z.abs() < 1e-6);
        assert!((far.z - 1.0).abs() < 1e-6);
    }
}
