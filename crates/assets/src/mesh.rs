//! Wavefront OBJ import.

use crate::{AssetError, AssetId};
use bytemuck::{Pod, Zeroable};
use std::collections::HashMap;
use std::io::BufRead;

/// Vertex layout shared by every mesh: position, normal, texture coordinate.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Decoded, indexed triangle list.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub id: AssetId,
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NormalRef {
    Index(usize),
    /// No normal in the file; the face normal of face `n` is used.
    Face(usize),
}

type VertexKey = (usize, Option<usize>, NormalRef);

/// Parse OBJ text into an indexed mesh.
///
/// Identical position/uv/normal triples are joined. Polygons are fan
/// triangulated. Texture V is flipped so row 0 is the top of the image.
/// Positions are multiplied by `import_scale`.
pub fn parse_obj(
    name: &str,
    reader: impl BufRead,
    import_scale: f32,
) -> Result<MeshData, AssetError> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut tex_coords: Vec<[f32; 2]> = Vec::new();
    let mut vertices: Vec<Vertex> = Vec::new();
    let mut indices: Vec<u16> = Vec::new();
    let mut lookup: HashMap<VertexKey, u16> = HashMap::new();
    let mut hasher = crate::ContentHasher::new();
    hasher.update(&import_scale.to_le_bytes());
    let mut face_count = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        hasher.update(line.as_bytes());
        let line_no = line_no + 1;
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        let args: Vec<&str> = parts.collect();

        match tag {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&args, line_no, "vertex")?;
                positions.push([x * import_scale, y * import_scale, z * import_scale]);
            }
            "vn" => normals.push(parse_floats::<3>(&args, line_no, "normal")?),
            "vt" => {
                let [u, v] = parse_floats::<2>(&args, line_no, "texture coordinate")?;
                tex_coords.push([u, 1.0 - v]);
            }
            "f" => {
                if args.len() < 3 {
                    return Err(AssetError::Parse {
                        line: line_no,
                        message: format!("face needs at least 3 vertices, got {}", args.len()),
                    });
                }
                let mut keys = Vec::with_capacity(args.len());
                for corner in &args {
                    keys.push(parse_corner(
                        corner,
                        line_no,
                        face_count,
                        positions.len(),
                        tex_coords.len(),
                        normals.len(),
                    )?);
                }
                let face_normal = face_normal(&positions, &keys);

                let mut face = Vec::with_capacity(keys.len());
                for key in keys {
                    if let Some(&index) = lookup.get(&key) {
                        face.push(index);
                        continue;
                    }
                    let index = u16::try_from(vertices.len())
                        .map_err(|_| AssetError::TooManyVertices(vertices.len() + 1))?;
                    let (p, t, n) = key;
                    let normal = match n {
                        NormalRef::Index(i) => normals[i],
                        NormalRef::Face(_) => face_normal,
                    };
                    let uv = t.map(|i| tex_coords[i]).unwrap_or([0.0, 0.0]);
                    vertices.push(Vertex::new(positions[p], normal, uv));
                    lookup.insert(key, index);
                    face.push(index);
                }
                for i in 1..face.len() - 1 {
                    indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
                }
                face_count += 1;
            }
            // Groups, materials and smoothing are not used.
            _ => {}
        }
    }

    if indices.is_empty() {
        return Err(AssetError::InvalidFormat(format!("{name}: no faces found")));
    }

    tracing::debug!(
        mesh = name,
        vertices = vertices.len(),
        indices = indices.len(),
        "parsed obj mesh"
    );

    Ok(MeshData {
        id: hasher.finish(),
        name: name.to_string(),
        vertices,
        indices,
    })
}

fn parse_floats<const N: usize>(
    args: &[&str],
    line: usize,
    what: &str,
) -> Result<[f32; N], AssetError> {
    if args.len() < N {
        return Err(AssetError::Parse {
            line,
            message: format!("{what} needs {N} components, got {}", args.len()),
        });
    }
    let mut out = [0.0; N];
    for (slot, text) in out.iter_mut().zip(args) {
        *slot = text.parse().map_err(|_| AssetError::Parse {
            line,
            message: format!("invalid {what} component {text:?}"),
        })?;
    }
    Ok(out)
}

/// Resolve a 1-based (or negative, relative) OBJ index.
fn resolve_index(text: &str, len: usize, line: usize, what: &str) -> Result<usize, AssetError> {
    let raw: i64 = text.parse().map_err(|_| AssetError::Parse {
        line,
        message: format!("invalid {what} index {text:?}"),
    })?;
    let resolved = if raw > 0 {
        raw - 1
    } else {
        len as i64 + raw
    };
    if raw == 0 || resolved < 0 || resolved >= len as i64 {
        return Err(AssetError::Parse {
            line,
            message: format!("{what} index {raw} out of range (have {len})"),
        });
    }
    Ok(resolved as usize)
}

fn parse_corner(
    corner: &str,
    line: usize,
    face: usize,
    position_count: usize,
    tex_count: usize,
    normal_count: usize,
) -> Result<VertexKey, AssetError> {
    let mut fields = corner.split('/');
    let position = resolve_index(fields.next().unwrap_or(""), position_count, line, "position")?;
    let tex = match fields.next() {
        Some(t) if !t.is_empty() => Some(resolve_index(t, tex_count, line, "texture")?),
        _ => None,
    };
    let normal = match fields.next() {
        Some(n) if !n.is_empty() => NormalRef::Index(resolve_index(n, normal_count, line, "normal")?),
        _ => NormalRef::Face(face),
    };
    Ok((position, tex, normal))
}

fn face_normal(positions: &[[f32; 3]], keys: &[VertexKey]) -> [f32; 3] {
    let [a, b, c] = [keys[0].0, keys[1].0, keys[2].0].map(|i| positions[i]);
    let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        ab[1] * ac[2] - ab[2] * ac[1],
        ab[2] * ac[0] - ab[0] * ac[2],
        ab[0] * ac[1] - ab[1] * ac[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len <= f32::EPSILON {
        [0.0, 1.0, 0.0]
    } else {
        [n[0] / len, n[1] / len, n[2] / len]
    }
}
