//! Procedural geometry for the built-in mesh shapes.
//!
//! Every generator emits triangles whose `(b - a) x (c - a)` points away from
//! the surface, which the backends treat as the front face.

use crate::graphics::{VertexFormat, VertexLayout};
use cinder_assets::Vertex;
use std::f32::consts::{PI, TAU};

/// The built-in shapes. Each kind maps to one shared set of static data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    Box,
    Sphere,
    Plane,
}

impl ShapeKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Sphere => "sphere",
            Self::Plane => "plane",
        }
    }

    /// Geometry for this shape with the engine's default resolution.
    pub fn geometry(self) -> (Vec<Vertex>, Vec<u16>) {
        match self {
            Self::Box => cube(),
            Self::Sphere => sphere(0.5, 16, 32),
            Self::Plane => plane(10),
        }
    }
}

/// Input layout matching [`Vertex`].
pub fn vertex_layout() -> VertexLayout {
    VertexLayout::packed(&[
        ("POSITION", VertexFormat::Float32x3),
        ("NORMAL", VertexFormat::Float32x3),
        ("TEXCOORD", VertexFormat::Float32x2),
    ])
}

/// Unit cube centred on the origin with one quad per face.
pub fn cube() -> (Vec<Vertex>, Vec<u16>) {
    let p = 0.5_f32;
    let v = Vertex::new;
    #[rustfmt::skip]
    let vertices = vec![
        // +Z face
        v([-p, -p,  p], [0.0, 0.0, 1.0], [0.0, 1.0]),
        v([ p, -p,  p], [0.0, 0.0, 1.0], [1.0, 1.0]),
        v([ p,  p,  p], [0.0, 0.0, 1.0], [1.0, 0.0]),
        v([-p,  p,  p], [0.0, 0.0, 1.0], [0.0, 0.0]),
        // -Z face
        v([ p, -p, -p], [0.0, 0.0, -1.0], [0.0, 1.0]),
        v([-p, -p, -p], [0.0, 0.0, -1.0], [1.0, 1.0]),
        v([-p,  p, -p], [0.0, 0.0, -1.0], [1.0, 0.0]),
        v([ p,  p, -p], [0.0, 0.0, -1.0], [0.0, 0.0]),
        // +X face
        v([ p, -p,  p], [1.0, 0.0, 0.0], [0.0, 1.0]),
        v([ p, -p, -p], [1.0, 0.0, 0.0], [1.0, 1.0]),
        v([ p,  p, -p], [1.0, 0.0, 0.0], [1.0, 0.0]),
        v([ p,  p,  p], [1.0, 0.0, 0.0], [0.0, 0.0]),
        // -X face
        v([-p, -p, -p], [-1.0, 0.0, 0.0], [0.0, 1.0]),
        v([-p, -p,  p], [-1.0, 0.0, 0.0], [1.0, 1.0]),
        v([-p,  p,  p], [-1.0, 0.0, 0.0], [1.0, 0.0]),
        v([-p,  p, -p], [-1.0, 0.0, 0.0], [0.0, 0.0]),
        // +Y face
        v([-p,  p,  p], [0.0, 1.0, 0.0], [0.0, 1.0]),
        v([ p,  p,  p], [0.0, 1.0, 0.0], [1.0, 1.0]),
        v([ p,  p, -p], [0.0, 1.0, 0.0], [1.0, 0.0]),
        v([-p,  p, -p], [0.0, 1.0, 0.0], [0.0, 0.0]),
        // -Y face
        v([-p, -p, -p], [0.0, -1.0, 0.0], [0.0, 1.0]),
        v([ p, -p, -p], [0.0, -1.0, 0.0], [1.0, 1.0]),
        v([ p, -p,  p], [0.0, -1.0, 0.0], [1.0, 0.0]),
        v([-p, -p,  p], [0.0, -1.0, 0.0], [0.0, 0.0]),
    ];
    #[rustfmt::skip]
    let indices: Vec<u16> = vec![
        0,1,2, 2,3,0,       // +Z
        4,5,6, 6,7,4,       // -Z
        8,9,10, 10,11,8,    // +X
        12,13,14, 14,15,12, // -X
        16,17,18, 18,19,16, // +Y
        20,21,22, 22,23,20, // -Y
    ];
    (vertices, indices)
}

/// Largest segment count per axis for the grid generators. A grid of
/// `(n + 1)²` vertices then stays addressable by `u16` indices.
pub const MAX_GRID_SEGMENTS: u16 = 254;

fn clamp_segments(what: &str, requested: u16, min: u16) -> u32 {
    if requested > MAX_GRID_SEGMENTS {
        tracing::warn!(
            requested,
            max = MAX_GRID_SEGMENTS,
            "{what} segment count too large for u16 indices, clamping"
        );
    }
    u32::from(requested.clamp(min, MAX_GRID_SEGMENTS))
}

/// Quad grid indices for a `rows` x `cols` patch laid out row by row with a
/// `cols + 1` vertex stride. `emit` receives each quad's row and its corners
/// `[a, b, c, d]`, going around from the top-left.
fn grid_indices(
    rows: u32,
    cols: u32,
    mut emit: impl FnMut(&mut Vec<u16>, u32, [u16; 4]),
) -> Vec<u16> {
    let stride = cols + 1;
    let mut indices = Vec::with_capacity((rows * cols * 6) as usize);
    for j in 0..rows {
        for i in 0..cols {
            let a = j * stride + i;
            let d = a + stride;
            // Bounded by MAX_GRID_SEGMENTS, so every corner fits in u16.
            let quad = [a, a + 1, d + 1, d].map(|index| index as u16);
            emit(&mut indices, j, quad);
        }
    }
    indices
}

/// UV sphere. Stacks run from the +Y pole down, slices around Y.
///
/// The seam column is duplicated so texture coordinates wrap cleanly. The
/// degenerate triangle of each pole quad is dropped. Both counts are capped
/// at [`MAX_GRID_SEGMENTS`].
pub fn sphere(radius: f32, stacks: u16, slices: u16) -> (Vec<Vertex>, Vec<u16>) {
    let stacks = clamp_segments("sphere stack", stacks, 2);
    let slices = clamp_segments("sphere slice", slices, 3);

    let mut vertices = Vec::with_capacity(((stacks + 1) * (slices + 1)) as usize);
    for j in 0..=stacks {
        let v = j as f32 / stacks as f32;
        let theta = v * PI;
        for i in 0..=slices {
            let u = i as f32 / slices as f32;
            let phi = u * TAU;
            let normal = [theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()];
            let position = normal.map(|n| n * radius);
            vertices.push(Vertex::new(position, normal, [u, v]));
        }
    }

    let indices = grid_indices(stacks, slices, |indices, j, [a, b, c, d]| {
        if j != 0 {
            indices.extend_from_slice(&[a, b, d]);
        }
        if j != stacks - 1 {
            indices.extend_from_slice(&[b, c, d]);
        }
    });
    (vertices, indices)
}

/// Unit plane in XZ facing +Y, split into `divisions` quads per side.
/// `divisions` is capped at [`MAX_GRID_SEGMENTS`].
pub fn plane(divisions: u16) -> (Vec<Vertex>, Vec<u16>) {
    let divisions = clamp_segments("plane", divisions, 1);
    let step = 1.0 / divisions as f32;

    let mut vertices = Vec::with_capacity(((divisions + 1) * (divisions + 1)) as usize);
    for j in 0..=divisions {
        for i in 0..=divisions {
            let (u, v) = (i as f32 * step, j as f32 * step);
            vertices.push(Vertex::new([u - 0.5, 0.0, v - 0.5], [0.0, 1.0, 0.0], [u, 1.0 - v]));
        }
    }

    let indices = grid_indices(divisions, divisions, |indices, _, [a, b, c, d]| {
        indices.extend_from_slice(&[a, d, b, d, c, b]);
    });
    (vertices, indices)
}
