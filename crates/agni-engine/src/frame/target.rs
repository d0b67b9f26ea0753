use anyhow::{Context, Result};

use crate::device::surface::{self, SurfaceErrorAction};
use crate::device::{Gpu, GpuInit};

/// Color format used for offscreen back images (8-bit-per-channel RGBA).
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A back image acquired for one frame.
///
/// Short-lived: created by `begin_render`, consumed by `present`. For a
/// windowed target it owns the surface texture; holding it blocks the next
/// acquisition.
pub(crate) struct AcquiredImage {
    pub view: wgpu::TextureView,
    pub surface_texture: Option<wgpu::SurfaceTexture>,
}

/// The presentation side of the frame context: a window surface, or a
/// rotating set of offscreen color textures standing in for the swapchain
/// when no window exists (headless operation and tests).
pub(crate) enum PresentTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        textures: Vec<wgpu::Texture>,
        width: u32,
        height: u32,
    },
}

impl PresentTarget {
    /// Configures `surface` for presentation and wraps it.
    pub fn for_surface(
        gpu: &Gpu,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
        init: &GpuInit,
    ) -> Result<Self> {
        let caps = surface.get_capabilities(gpu.adapter());
        let format = surface::choose_surface_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = surface::choose_alpha_mode(&caps);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.frames_in_flight as u32,
        };
        surface.configure(gpu.device(), &config);

        Ok(Self::Surface { surface, config })
    }

    /// Creates `frame_count` offscreen back images.
    pub fn offscreen(device: &wgpu::Device, width: u32, height: u32, frame_count: usize) -> Self {
        let textures = (0..frame_count)
            .map(|i| {
                device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(&format!("agni offscreen back image {i}")),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: OFFSCREEN_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                    view_formats: &[],
                })
            })
            .collect();

        Self::Offscreen {
            textures,
            width,
            height,
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match self {
            Self::Surface { config, .. } => config.format,
            Self::Offscreen { .. } => OFFSCREEN_FORMAT,
        }
    }

    /// Acquires the back image for `frame_index`.
    ///
    /// The index is ignored for a window surface; the swapchain hands out its
    /// own rotation.
    pub fn acquire(&self, frame_index: usize) -> Result<AcquiredImage, wgpu::SurfaceError> {
        match self {
            Self::Surface { surface, .. } => {
                let surface_texture = surface.get_current_texture()?;
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(AcquiredImage {
                    view,
                    surface_texture: Some(surface_texture),
                })
            }
            Self::Offscreen { textures, .. } => {
                let view = textures[frame_index % textures.len()]
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(AcquiredImage {
                    view,
                    surface_texture: None,
                })
            }
        }
    }

    /// Presents the acquired image (flips the swapchain, or simply releases
    /// the offscreen image).
    pub fn present(&self, image: AcquiredImage) {
        let AcquiredImage {
            view,
            surface_texture,
        } = image;
        drop(view);
        if let Some(surface_texture) = surface_texture {
            surface_texture.present();
        }
    }

    /// Reconfigures for a new size. Zero-sized surface resizes are deferred;
    /// offscreen images are recreated immediately.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        match self {
            Self::Surface { surface, config } => {
                surface::apply_resize(surface, device, config, width, height);
            }
            Self::Offscreen { textures, .. } => {
                let count = textures.len();
                *self = Self::offscreen(device, width.max(1), height.max(1), count);
            }
        }
    }

    /// Maps a surface acquisition error to a recovery action.
    pub fn handle_surface_error(&self, device: &wgpu::Device, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        match self {
            Self::Surface { surface, config } => {
                surface::map_surface_error(surface, device, config, err)
            }
            // Offscreen acquisition cannot fail transiently.
            Self::Offscreen { .. } => SurfaceErrorAction::Fatal,
        }
    }
}
