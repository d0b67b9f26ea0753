//! Per-frame command recording cycle.
//!
//! [`FrameContext`] owns the presentation target, the optional depth buffer,
//! the frame fence, and the viewport/scissor state, and drives the
//! begin/draw/end/present cycle:
//!
//! `Ready -> (begin_render) -> Recording -> (end_render) -> Submitted ->
//! (present) -> Ready`
//!
//! Calling a cycle operation out of order is a caller contract violation and
//! panics. Every `present` fully drains the GPU before returning, so CPU and
//! GPU never run more than one frame apart.

mod target;

pub use target::OFFSCREEN_FORMAT;

use anyhow::{Context, Result};

use crate::device::{Gpu, GpuFence, GpuInit, SurfaceErrorAction};
use crate::mesh::GpuMesh;
use crate::pipeline::{self, PipelineConfig};
use target::{AcquiredImage, PresentTarget};

/// Position in the frame cycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameState {
    Ready,
    Recording,
    Submitted,
}

impl FrameState {
    /// Asserts the cycle is in `expected` before `op` runs.
    ///
    /// A mismatch is a programming error in the caller's frame loop, not a
    /// recoverable condition.
    pub(crate) fn require(self, expected: FrameState, op: &str) {
        assert!(
            self == expected,
            "{op} called in {self:?} state (expected {expected:?})"
        );
    }
}

struct DepthBuffer {
    // Kept alive for the view's sake.
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

fn create_depth_buffer(device: &wgpu::Device, width: u32, height: u32) -> DepthBuffer {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("agni depth buffer"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: pipeline::DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    DepthBuffer {
        _texture: texture,
        view,
    }
}

struct Recording {
    encoder: wgpu::CommandEncoder,
    image: AcquiredImage,
}

/// Owns the swapchain side of the harness and the per-frame cycle.
pub struct FrameContext {
    device: wgpu::Device,
    queue: wgpu::Queue,

    target: PresentTarget,
    depth: Option<DepthBuffer>,

    /// Full-target viewport/scissor dimensions, in pixels.
    width: u32,
    height: u32,

    fence: GpuFence,
    frame_index: usize,
    frame_count: usize,

    state: FrameState,
    recording: Option<Recording>,
    /// Image recorded against, held between end_render and present.
    pending: Option<AcquiredImage>,

    clear_color: wgpu::Color,
}

impl FrameContext {
    /// Creates a frame context presenting to a window surface.
    pub fn for_window(
        gpu: &Gpu,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
        init: &GpuInit,
    ) -> Result<Self> {
        anyhow::ensure!(width > 0 && height > 0, "window has zero size");
        let target = PresentTarget::for_surface(gpu, surface, width, height, init)?;
        Ok(Self::with_target(gpu, target, width, height, init))
    }

    /// Creates a headless frame context rendering to rotating offscreen
    /// back images. Used by tests and windowless operation.
    pub fn headless(gpu: &Gpu, width: u32, height: u32, init: &GpuInit) -> Result<Self> {
        anyhow::ensure!(width > 0 && height > 0, "target has zero size");
        let target = PresentTarget::offscreen(gpu.device(), width, height, init.frames_in_flight);
        Ok(Self::with_target(gpu, target, width, height, init))
    }

    fn with_target(
        gpu: &Gpu,
        target: PresentTarget,
        width: u32,
        height: u32,
        init: &GpuInit,
    ) -> Self {
        let depth = init
            .depth_enabled
            .then(|| create_depth_buffer(gpu.device(), width, height));

        Self {
            device: gpu.device().clone(),
            queue: gpu.queue().clone(),
            target,
            depth,
            width,
            height,
            fence: GpuFence::new(),
            frame_index: 0,
            frame_count: init.frames_in_flight,
            state: FrameState::Ready,
            recording: None,
            pending: None,
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.2,
                b: 0.4,
                a: 1.0,
            },
        }
    }

    /// The pipeline configuration meshes must use to draw into this context.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            color_format: self.target.format(),
            depth_format: self.depth.as_ref().map(|_| pipeline::DEPTH_FORMAT),
        }
    }

    /// Begins recording the frame: acquires the current back image, opens a
    /// command encoder, and records the viewport/scissor/clear pass.
    ///
    /// Transient surface errors (lost/outdated) reconfigure the surface and
    /// fail this frame; the caller skips and retries next frame. Panics if
    /// the cycle is not in `Ready`.
    pub fn begin_render(&mut self) -> Result<()> {
        self.state.require(FrameState::Ready, "begin_render");

        let image = match self.target.acquire(self.frame_index) {
            Ok(image) => image,
            Err(err) => {
                let detail = format!("{err:?}");
                match self.target.handle_surface_error(&self.device, err) {
                    SurfaceErrorAction::Fatal => {
                        anyhow::bail!("fatal surface error: {detail}")
                    }
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        log::warn!("skipping frame after surface error: {detail}");
                        anyhow::bail!("frame skipped: {detail}")
                    }
                }
            }
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("agni frame encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("agni clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &image.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: self.depth.as_ref().map(|d| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view: &d.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(0),
                            store: wgpu::StoreOp::Store,
                        }),
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            rpass.set_viewport(0.0, 0.0, self.width as f32, self.height as f32, 0.0, 1.0);
            rpass.set_scissor_rect(0, 0, self.width, self.height);
        }

        self.recording = Some(Recording { encoder, image });
        self.state = FrameState::Recording;
        Ok(())
    }

    /// Records one mesh draw into the current frame. Repeatable while
    /// recording. Panics outside begin_render..end_render.
    pub fn draw_mesh(&mut self, mesh: &GpuMesh) {
        self.state.require(FrameState::Recording, "draw_mesh");

        let (width, height) = (self.width, self.height);
        let depth_view = self.depth.as_ref().map(|d| &d.view);
        let Recording { encoder, image } = self
            .recording
            .as_mut()
            .expect("recording state implies an open encoder");

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("agni mesh pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &image.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth_view.map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        rpass.set_scissor_rect(0, 0, width, height);
        mesh.draw(&mut rpass);
    }

    /// Closes the command encoder and submits the frame to the queue.
    /// Panics if the cycle is not in `Recording`.
    pub fn end_render(&mut self) {
        self.state.require(FrameState::Recording, "end_render");

        let Recording { encoder, image } = self
            .recording
            .take()
            .expect("recording state implies an open encoder");

        let index = self.queue.submit(std::iter::once(encoder.finish()));
        self.fence.observe(index);

        self.pending = Some(image);
        self.state = FrameState::Submitted;
    }

    /// Presents the frame, then blocks until the GPU has fully executed it.
    ///
    /// Full per-frame synchronization trades pipelining for correctness:
    /// nothing the CPU mutates next frame can still be in flight. Advances
    /// the back-image index. Panics if the cycle is not in `Submitted`.
    pub fn present(&mut self) -> Result<()> {
        self.state.require(FrameState::Submitted, "present");

        let image = self
            .pending
            .take()
            .expect("submitted state implies a pending image");
        self.target.present(image);

        self.fence
            .wait(&self.device)
            .context("GPU did not complete the presented frame")?;

        self.frame_index = (self.frame_index + 1) % self.frame_count;
        self.state = FrameState::Ready;
        Ok(())
    }

    /// Reconfigures the presentation target and depth buffer for a new size.
    ///
    /// Zero-sized surface resizes are deferred (minimized windows). Only
    /// valid between frames.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.state.require(FrameState::Ready, "resize");

        self.target.resize(&self.device, width, height);
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
            if self.depth.is_some() {
                self.depth = Some(create_depth_buffer(&self.device, width, height));
            }
        }
    }

    /// Blocks until all submitted GPU work has drained.
    pub fn wait_idle(&mut self) -> Result<u64> {
        self.fence.signal_and_wait(&self.device, &self.queue)
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Index of the back image the next begin_render will target.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Viewport aspect ratio, fed into mesh projection updates.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }
}

impl Drop for FrameContext {
    /// Drains in-flight GPU work before the target and depth resources drop.
    /// Releasing resources the GPU may still reference is undefined behavior
    /// on the underlying APIs; wgpu defends against it, but the drain keeps
    /// shutdown deterministic.
    fn drop(&mut self) {
        if let Err(err) = self.fence.signal_and_wait(&self.device, &self.queue) {
            log::warn!("shutdown GPU drain failed: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_states_advance_in_order() {
        FrameState::Ready.require(FrameState::Ready, "begin_render");
        FrameState::Recording.require(FrameState::Recording, "end_render");
        FrameState::Submitted.require(FrameState::Submitted, "present");
    }

    #[test]
    #[should_panic(expected = "end_render called in Ready state")]
    fn end_without_begin_is_a_contract_violation() {
        FrameState::Ready.require(FrameState::Recording, "end_render");
    }

    #[test]
    #[should_panic(expected = "present called in Recording state")]
    fn present_while_recording_is_a_contract_violation() {
        FrameState::Recording.require(FrameState::Submitted, "present");
    }

    #[test]
    #[should_panic(expected = "begin_render called in Submitted state")]
    fn double_begin_without_present_is_a_contract_violation() {
        FrameState::Submitted.require(FrameState::Ready, "begin_render");
    }
}
