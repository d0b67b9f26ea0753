//! Shared pipeline state.
//!
//! Every mesh with the same color/depth format pair draws through one shared
//! bind-group-layout + render-pipeline pair (the root-signature/PSO analog).
//! The pair lives in a [`PipelineCache`] keyed by [`PipelineConfig`]; meshes
//! hold `Arc` handles, so the pipeline is released exactly once, when the
//! last referencing mesh drops.

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::{Arc, Weak};

use crate::mesh::{ObjectUniforms, Vertex};

/// Depth/stencil format used by the harness when depth is enabled.
///
/// 24-bit depth with 8-bit stencil, cleared to 1.0/0 each frame.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Key identifying one shared pipeline configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PipelineConfig {
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
}

/// The shared bound-resource layout and fixed-function+shader configuration.
pub struct MeshPipeline {
    pub(crate) render_pipeline: wgpu::RenderPipeline,
    pub(crate) bind_group_layout: wgpu::BindGroupLayout,
}

/// Cache of shared mesh pipelines, owned by the renderer bootstrap.
///
/// Entries are weak: the cache never keeps a pipeline alive on its own.
#[derive(Default)]
pub struct PipelineCache {
    entries: HashMap<PipelineConfig, Weak<MeshPipeline>>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live shared pipeline for `config`, building it on first
    /// use (or after the last previous holder dropped it).
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        config: PipelineConfig,
    ) -> Arc<MeshPipeline> {
        if let Some(live) = self.entries.get(&config).and_then(Weak::upgrade) {
            return live;
        }

        log::debug!("building mesh pipeline for {config:?}");
        let shared = Arc::new(build_mesh_pipeline(device, config));
        self.entries.insert(config, Arc::downgrade(&shared));
        shared
    }

    /// Whether a shared pipeline for `config` is currently alive.
    pub fn is_live(&self, config: &PipelineConfig) -> bool {
        self.entries
            .get(config)
            .is_some_and(|w| w.upgrade().is_some())
    }
}

fn uniform_min_binding_size() -> NonZeroU64 {
    // ObjectUniforms is three mat4x4<f32>, never zero-sized.
    NonZeroU64::new(std::mem::size_of::<ObjectUniforms>() as u64)
        .expect("ObjectUniforms has non-zero size by construction")
}

fn build_mesh_pipeline(device: &wgpu::Device, config: PipelineConfig) -> MeshPipeline {
    let shader_src = include_str!("shaders/mesh.wgsl");
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("agni mesh shader"),
        source: wgpu::ShaderSource::Wgsl(shader_src.into()),
    });

    // One uniform block at @group(0) @binding(0), vertex stage only.
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("agni mesh bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: Some(uniform_min_binding_size()),
            },
            count: None,
        }],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("agni mesh pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        immediate_size: 0,
    });

    let depth_stencil = config
        .depth_format
        .map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

    let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("agni mesh pipeline"),
        layout: Some(&pipeline_layout),

        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[Vertex::layout()],
        },

        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: config.color_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil,
        multisample: wgpu::MultisampleState::default(),

        multiview_mask: None,
        cache: None,
    });

    MeshPipeline {
        render_pipeline,
        bind_group_layout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Gpu, GpuInit};

    fn test_gpu() -> Option<Gpu> {
        match Gpu::new_blocking(&GpuInit::default()) {
            Ok(gpu) => Some(gpu),
            Err(err) => {
                eprintln!("no GPU adapter available, skipping: {err:#}");
                None
            }
        }
    }

    const CONFIG: PipelineConfig = PipelineConfig {
        color_format: wgpu::TextureFormat::Rgba8Unorm,
        depth_format: None,
    };

    #[test]
    fn same_config_shares_one_pipeline() {
        let Some(gpu) = test_gpu() else { return };
        let mut cache = PipelineCache::new();

        let a = cache.get_or_create(gpu.device(), CONFIG);
        let b = cache.get_or_create(gpu.device(), CONFIG);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(Arc::strong_count(&a), 2);
    }

    #[test]
    fn pipeline_released_when_last_holder_drops() {
        let Some(gpu) = test_gpu() else { return };
        let mut cache = PipelineCache::new();

        let a = cache.get_or_create(gpu.device(), CONFIG);
        let b = cache.get_or_create(gpu.device(), CONFIG);
        let c = cache.get_or_create(gpu.device(), CONFIG);

        drop(a);
        drop(b);
        assert!(cache.is_live(&CONFIG), "two drops must not release");

        drop(c);
        assert!(!cache.is_live(&CONFIG), "last drop releases exactly once");

        // A later request rebuilds rather than resurrecting.
        let again = cache.get_or_create(gpu.device(), CONFIG);
        assert_eq!(Arc::strong_count(&again), 1);
    }

    #[test]
    fn distinct_configs_do_not_alias() {
        let Some(gpu) = test_gpu() else { return };
        let mut cache = PipelineCache::new();

        let plain = cache.get_or_create(gpu.device(), CONFIG);
        let with_depth = cache.get_or_create(
            gpu.device(),
            PipelineConfig {
                depth_format: Some(DEPTH_FORMAT),
                ..CONFIG
            },
        );
        assert!(!Arc::ptr_eq(&plain, &with_depth));
    }
}
