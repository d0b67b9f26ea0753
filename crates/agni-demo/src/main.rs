//! Window glue for the agni rendering harness: a winit event loop driving
//! the per-frame contract with one spinning box.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use agni_engine::device::GpuInit;
use agni_engine::geometry;
use agni_engine::logging::{init_logging, LoggingConfig};
use agni_engine::renderer::{MeshHandle, Renderer};

struct DemoWindow {
    window: Arc<Window>,
    renderer: Renderer,
    box_mesh: MeshHandle,
    started: Instant,
}

impl DemoWindow {
    fn create(event_loop: &ActiveEventLoop) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title("agni harness demo")
            .with_inner_size(LogicalSize::new(800.0, 600.0));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let size = window.inner_size();
        let mut renderer = Renderer::for_window_blocking(
            window.clone(),
            size.width.max(1),
            size.height.max(1),
            GpuInit::default(),
        )?;
        let box_mesh = renderer.create_mesh(&geometry::box_mesh(0.5))?;

        Ok(Self {
            window,
            renderer,
            box_mesh,
            started: Instant::now(),
        })
    }

    fn render_frame(&mut self) -> Result<()> {
        let t = self.started.elapsed().as_secs_f32();
        let world = Mat4::from_translation(Vec3::new(0.0, 0.0, 2.5))
            * Mat4::from_rotation_y(t)
            * Mat4::from_rotation_x(t * 0.6);
        self.renderer.set_world_transform(self.box_mesh, world);

        self.renderer.update();
        self.renderer.begin_render()?;
        self.renderer.render_all();
        self.renderer.end_render();
        self.renderer.present()
    }
}

#[derive(Default)]
struct App {
    demo: Option<DemoWindow>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.demo.is_some() {
            return;
        }
        match DemoWindow::create(event_loop) {
            Ok(demo) => self.demo = Some(demo),
            Err(err) => {
                log::error!("initialization failed: {err:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(demo) = self.demo.as_mut() else { return };
        if demo.window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => demo.renderer.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                // Transient surface errors drop a single frame; the next
                // redraw retries against the reconfigured surface.
                if let Err(err) = demo.render_frame() {
                    log::warn!("frame dropped: {err:#}");
                }
                demo.window.request_redraw();
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::default();
    event_loop
        .run_app(&mut app)
        .context("winit event loop terminated with error")?;
    Ok(())
}
