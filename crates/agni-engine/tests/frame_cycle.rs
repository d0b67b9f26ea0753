//! End-to-end frame cycle scenarios against a headless device.
//!
//! Every test degrades to a skip (with a message) when the machine has no
//! usable GPU adapter.

use agni_engine::device::GpuInit;
use agni_engine::geometry;
use agni_engine::renderer::Renderer;

fn headless_renderer(width: u32, height: u32) -> Option<Renderer> {
    match Renderer::headless(width, height, GpuInit::default()) {
        Ok(renderer) => Some(renderer),
        Err(err) => {
            eprintln!("no GPU adapter available, skipping: {err:#}");
            None
        }
    }
}

#[test]
fn box_mesh_survives_one_full_frame() {
    let Some(mut renderer) = headless_renderer(800, 600) else { return };

    let data = geometry::box_mesh(0.5);
    assert_eq!(data.vertices.len(), 24);
    assert_eq!(data.indices.len(), 36);

    let handle = renderer.create_mesh(&data).unwrap();
    assert_eq!(renderer.frame().frame_index(), 0);

    renderer.update();
    renderer.begin_render().unwrap();
    renderer.render_mesh(handle);
    renderer.end_render();
    renderer.present().unwrap();

    // The back image rotated to the other buffer.
    assert_eq!(renderer.frame().frame_index(), 1);
}

#[test]
fn frame_index_wraps_over_the_back_image_set() {
    let Some(mut renderer) = headless_renderer(320, 240) else { return };
    let count = renderer.frame().frame_count();
    assert_eq!(count, 2);

    for i in 0..5 {
        assert_eq!(renderer.frame().frame_index(), i % count);
        renderer.update();
        renderer.begin_render().unwrap();
        renderer.render_all();
        renderer.end_render();
        renderer.present().unwrap();
    }
    assert_eq!(renderer.frame().frame_index(), 5 % count);
}

#[test]
fn non_indexed_mesh_draws_by_vertex_count() {
    let Some(mut renderer) = headless_renderer(256, 256) else { return };

    let mut data = geometry::triangle();
    data.indices.clear();

    let handle = renderer.create_mesh(&data).unwrap();
    assert!(!renderer.mesh(handle).is_indexed());
    assert_eq!(renderer.mesh(handle).vertex_count(), 3);

    renderer.update();
    renderer.begin_render().unwrap();
    renderer.render_mesh(handle);
    renderer.end_render();
    renderer.present().unwrap();
}

#[test]
fn repeated_draws_of_one_mesh_in_a_frame_are_allowed() {
    let Some(mut renderer) = headless_renderer(256, 256) else { return };

    let handle = renderer.create_mesh(&geometry::square(0.25)).unwrap();

    renderer.update();
    renderer.begin_render().unwrap();
    renderer.render_mesh(handle);
    renderer.render_mesh(handle);
    renderer.render_mesh(handle);
    renderer.end_render();
    renderer.present().unwrap();
}

#[test]
fn configurable_back_image_count_is_honored() {
    let init = GpuInit {
        frames_in_flight: 3,
        ..GpuInit::default()
    };
    let mut renderer = match Renderer::headless(128, 128, init) {
        Ok(renderer) => renderer,
        Err(err) => {
            eprintln!("no GPU adapter available, skipping: {err:#}");
            return;
        }
    };

    assert_eq!(renderer.frame().frame_count(), 3);
    for _ in 0..3 {
        renderer.update();
        renderer.begin_render().unwrap();
        renderer.end_render();
        renderer.present().unwrap();
    }
    assert_eq!(renderer.frame().frame_index(), 0);
}
