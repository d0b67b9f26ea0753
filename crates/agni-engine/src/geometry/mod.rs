//! Geometry generators.
//!
//! Thin glue that supplies vertex/index arrays to the mesh factory. Nothing
//! here touches the GPU.

use crate::mesh::{MeshData, Vertex};

/// A single RGB triangle, non-indexed when `indices` is cleared by the caller.
pub fn triangle() -> MeshData {
    let vertices = vec![
        Vertex::new([0.0, 0.25, 0.0], [1.0, 0.0, 0.0, 1.0]),
        Vertex::new([0.25, -0.25, 0.0], [0.0, 1.0, 0.0, 1.0]),
        Vertex::new([-0.25, -0.25, 0.0], [0.0, 0.0, 1.0, 1.0]),
    ];
    MeshData::new(vertices, vec![0, 1, 2])
}

/// A unit square in the XY plane, scaled by `scale`.
pub fn square(scale: f32) -> MeshData {
    let vertices = vec![
        Vertex::new([-scale, -scale, 0.0], [1.0, 0.0, 0.0, 1.0]),
        Vertex::new([-scale, scale, 0.0], [0.0, 1.0, 0.0, 1.0]),
        Vertex::new([scale, scale, 0.0], [0.0, 1.0, 1.0, 1.0]),
        Vertex::new([scale, -scale, 0.0], [0.0, 0.0, 1.0, 1.0]),
    ];
    MeshData::new(vertices, vec![0, 1, 3, 1, 2, 3])
}

/// An axis-aligned box with per-face colors: 24 vertices, 36 indices.
pub fn box_mesh(scale: f32) -> MeshData {
    const FACES: [([[f32; 3]; 4], [f32; 4]); 6] = [
        // top
        (
            [
                [-1.0, 1.0, -1.0],
                [-1.0, 1.0, 1.0],
                [1.0, 1.0, 1.0],
                [1.0, 1.0, -1.0],
            ],
            [1.0, 0.0, 0.0, 1.0],
        ),
        // bottom
        (
            [
                [-1.0, -1.0, -1.0],
                [1.0, -1.0, -1.0],
                [1.0, -1.0, 1.0],
                [-1.0, -1.0, 1.0],
            ],
            [1.0, 0.0, 0.0, 1.0],
        ),
        // front
        (
            [
                [-1.0, -1.0, -1.0],
                [-1.0, 1.0, -1.0],
                [1.0, 1.0, -1.0],
                [1.0, -1.0, -1.0],
            ],
            [0.0, 0.0, 1.0, 1.0],
        ),
        // back
        (
            [
                [-1.0, -1.0, 1.0],
                [1.0, -1.0, 1.0],
                [1.0, 1.0, 1.0],
                [-1.0, 1.0, 1.0],
            ],
            [0.0, 1.0, 1.0, 1.0],
        ),
        // left
        (
            [
                [-1.0, -1.0, 1.0],
                [-1.0, 1.0, 1.0],
                [-1.0, 1.0, -1.0],
                [-1.0, -1.0, -1.0],
            ],
            [1.0, 1.0, 0.0, 1.0],
        ),
        // right
        (
            [
                [1.0, -1.0, 1.0],
                [1.0, -1.0, -1.0],
                [1.0, 1.0, -1.0],
                [1.0, 1.0, 1.0],
            ],
            [1.0, 0.0, 1.0, 1.0],
        ),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (face, (corners, color)) in FACES.iter().enumerate() {
        let base = (face * 4) as u32;
        for corner in corners {
            vertices.push(Vertex::new(
                [corner[0] * scale, corner[1] * scale, corner[2] * scale],
                *color,
            ));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData::new(vertices, indices)
}
