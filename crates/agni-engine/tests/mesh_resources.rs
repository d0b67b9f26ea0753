//! Mesh resource lifetime and uniform-content properties on a live device.

use agni_engine::device::{GpuInit, UploadTransfer};
use agni_engine::geometry;
use agni_engine::mesh::{ObjectUniforms, UNIFORM_ALIGN};
use agni_engine::renderer::Renderer;
use glam::{Mat4, Vec3};

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
fn uniform_buffer_is_rounded_to_hardware_alignment() {
    let Some(mut renderer) = headless_renderer(64, 64) else { return };

    let handle = renderer.create_mesh(&geometry::triangle()).unwrap();
    // The block itself is 192 bytes; the allocation rounds up.
    assert_eq!(renderer.mesh(handle).uniform_buffer().size(), UNIFORM_ALIGN);
}

#[test]
fn shared_pipeline_released_with_the_last_mesh() {
    let Some(mut renderer) = headless_renderer(64, 64) else { return };
    let config = renderer.frame().pipeline_config();

    let a = renderer.create_mesh(&geometry::box_mesh(1.0)).unwrap();
    let b = renderer.create_mesh(&geometry::box_mesh(1.0)).unwrap();
    let c = renderer.create_mesh(&geometry::box_mesh(1.0)).unwrap();
    assert!(renderer.pipelines().is_live(&config));

    renderer.destroy_mesh(a);
    renderer.destroy_mesh(b);
    assert!(
        renderer.pipelines().is_live(&config),
        "pipeline must survive while a mesh still references it"
    );

    renderer.destroy_mesh(c);
    assert!(
        !renderer.pipelines().is_live(&config),
        "last destroy releases the shared pipeline exactly once"
    );
    assert_eq!(renderer.live_mesh_count(), 0);
}

#[test]
fn update_twice_writes_identical_uniform_bytes() {
    let Some(mut renderer) = headless_renderer(800, 600) else { return };

    let handle = renderer.create_mesh(&geometry::square(0.5)).unwrap();
    renderer.set_world_transform(handle, Mat4::from_rotation_y(0.3));

    renderer.update();
    let first = {
        let mut upload = UploadTransfer::new(renderer.gpu());
        upload.read_back(renderer.mesh(handle).uniform_buffer()).unwrap()
    };

    renderer.update();
    let second = {
        let mut upload = UploadTransfer::new(renderer.gpu());
        upload.read_back(renderer.mesh(handle).uniform_buffer()).unwrap()
    };

    assert_eq!(first, second);
}

#[test]
fn translated_instances_differ_only_in_world_translation() {
    let Some(mut renderer) = headless_renderer(800, 600) else { return };

    let left = renderer.create_mesh(&geometry::box_mesh(0.25)).unwrap();
    let right = renderer.create_mesh(&geometry::box_mesh(0.25)).unwrap();
    renderer.set_world_transform(left, Mat4::from_translation(Vec3::new(-0.5, 0.0, 0.0)));
    renderer.set_world_transform(right, Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0)));

    renderer.update();

    let lu = *renderer.mesh(left).uniforms();
    let ru = *renderer.mesh(right).uniforms();
    assert_eq!(lu.view, ru.view);
    assert_eq!(lu.proj, ru.proj);
    for col in 0..3 {
        assert_eq!(lu.world[col], ru.world[col]);
    }
    assert_eq!(lu.world[3][0], -0.5);
    assert_eq!(ru.world[3][0], 0.5);

    // The GPU copies agree with the CPU shadows byte for byte.
    let mut upload = UploadTransfer::new(renderer.gpu());
    let lbytes = upload.read_back(renderer.mesh(left).uniform_buffer()).unwrap();
    let rbytes = upload.read_back(renderer.mesh(right).uniform_buffer()).unwrap();
    let block = std::mem::size_of::<ObjectUniforms>();
    assert_eq!(&lbytes[..block], bytemuck::bytes_of(&lu));
    assert_eq!(&rbytes[..block], bytemuck::bytes_of(&ru));
}
