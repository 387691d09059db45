//! Builders for the engine's mesh types.
//!
//! Shapes share geometry and shaders per [`ShapeKind`] and keep their material
//! per instance. Static meshes share everything but the transform.

use crate::context::{ContextData, ContextDataList};
use crate::graphics::{Graphics, PrimitiveTopology, SamplerDesc};
use crate::renderable::{MeshKey, RenderableMesh, StaticDataCache};
use crate::shaders::{PIXEL_ENTRY, SOLID_SHADER, TEXTURED_SHADER, VERTEX_ENTRY};
use crate::shapes::{self, ShapeKind};
use crate::RenderError;
use bytemuck::{Pod, Zeroable};
use cinder_assets::{ImageData, MeshData};

/// Pixel constant slot that receives [`Material`].
pub const MATERIAL_SLOT: u32 = 1;
/// Texture and sampler slot of textured meshes.
pub const TEXTURE_SLOT: u32 = 0;

/// Surface constants, 32 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Material {
    pub color: [f32; 4],
    pub specular_intensity: f32,
    pub specular_power: f32,
    pub _pad: [f32; 2],
}

impl Material {
    pub fn new(color: [f32; 4]) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    pub fn with_specular(mut self, intensity: f32, power: f32) -> Self {
        self.specular_intensity = intensity;
        self.specular_power = power;
        self
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0, 1.0],
            specular_intensity: 0.6,
            specular_power: 30.0,
            _pad: [0.0; 2],
        }
    }
}

/// A renderable of a built-in shape with its own material.
pub fn shape_mesh(
    gfx: &mut dyn Graphics,
    cache: &mut StaticDataCache,
    kind: ShapeKind,
    material: &Material,
) -> Result<RenderableMesh, RenderError> {
    let shared = cache.get_or_insert_with(MeshKey::Shape(kind), || {
        let (vertices, indices) = kind.geometry();
        let shader = gfx.create_shader(kind.name(), SOLID_SHADER)?;
        let mut data = ContextDataList::new();
        data.push(ContextData::vertex_data(gfx, kind.name(), &vertices)?)?;
        data.push(ContextData::index_data(gfx, kind.name(), &indices)?)?;
        data.push(ContextData::vertex_shader(shader, VERTEX_ENTRY))?;
        data.push(ContextData::pixel_shader(shader, PIXEL_ENTRY))?;
        data.push(ContextData::input_layout(shapes::vertex_layout()))?;
        data.push(ContextData::topology(PrimitiveTopology::TriangleList))?;
        Ok(data)
    })?;

    let mut instance = ContextDataList::new();
    instance.push(ContextData::transform_data(gfx)?)?;
    instance.push(ContextData::pixel_constants(gfx, MATERIAL_SLOT, material)?)?;
    RenderableMesh::new(shared, instance)
}

/// A renderable of an imported mesh.
///
/// Without a texture a 1x1 white one is bound so the textured shader still
/// shows the material colour.
pub fn static_mesh(
    gfx: &mut dyn Graphics,
    cache: &mut StaticDataCache,
    mesh: &MeshData,
    texture: Option<&ImageData>,
) -> Result<RenderableMesh, RenderError> {
    let key = MeshKey::Asset {
        mesh: mesh.id,
        texture: texture.map(|t| t.id),
    };
    let shared = cache.get_or_insert_with(key, || {
        let fallback;
        let image = match texture {
            Some(image) => image,
            None => {
                fallback = ImageData::solid_color(1, 1, [255; 4]);
                &fallback
            }
        };
        let shader = gfx.create_shader(&mesh.name, TEXTURED_SHADER)?;
        let mut data = ContextDataList::new();
        data.push(ContextData::vertex_data(gfx, &mesh.name, &mesh.vertices)?)?;
        data.push(ContextData::index_data(gfx, &mesh.name, &mesh.indices)?)?;
        data.push(ContextData::vertex_shader(shader, VERTEX_ENTRY))?;
        data.push(ContextData::pixel_shader(shader, PIXEL_ENTRY))?;
        data.push(ContextData::input_layout(shapes::vertex_layout()))?;
        data.push(ContextData::topology(PrimitiveTopology::TriangleList))?;
        data.push(ContextData::texture(gfx, &mesh.name, TEXTURE_SLOT, image)?)?;
        data.push(ContextData::sample_state(gfx, TEXTURE_SLOT, &SamplerDesc::default())?)?;
        data.push(ContextData::pixel_constants(gfx, MATERIAL_SLOT, &Material::default())?)?;
        Ok(data)
    })?;

    let mut instance = ContextDataList::new();
    instance.push(ContextData::transform_data(gfx)?)?;
    RenderableMesh::new(shared, instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingGraphics;
    use crate::graphics::ShaderStage;
    use cinder_assets::parse_obj;
    use glam::Mat4;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    #[test]
    fn material_is_32_bytes() {
        assert_eq!(std::mem::size_of::<Material>(), 32);
    }

    #[test]
    fn shapes_of_one_kind_share_static_data() {
        let mut gfx = RecordingGraphics::new();
        let mut cache = StaticDataCache::new();
        let red = Material::new([1.0, 0.0, 0.0, 1.0]);
        let blue = Material::new([0.0, 0.0, 1.0, 1.0]);

        let a = shape_mesh(&mut gfx, &mut cache, ShapeKind::Box, &red).unwrap();
        let vertex_buffers = gfx.vertex_buffer_count();
        let shaders = gfx.shader_count();
        let b = shape_mesh(&mut gfx, &mut cache, ShapeKind::Box, &blue).unwrap();

        assert!(std::rc::Rc::ptr_eq(a.shared(), b.shared()));
        assert_eq!(gfx.vertex_buffer_count(), vertex_buffers);
        assert_eq!(gfx.shader_count(), shaders);
        assert_eq!(a.index_count(), Some(36));

        shape_mesh(&mut gfx, &mut cache, ShapeKind::Sphere, &red).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn shape_material_is_per_instance() {
        let mut gfx = RecordingGraphics::new();
        let mut cache = StaticDataCache::new();
        let red = Material::new([1.0, 0.0, 0.0, 1.0]);
        let blue = Material::new([0.0, 0.0, 1.0, 1.0]);
        let a = shape_mesh(&mut gfx, &mut cache, ShapeKind::Box, &red).unwrap();
        let b = shape_mesh(&mut gfx, &mut cache, ShapeKind::Box, &blue).unwrap();

        gfx.clear_render_buffer(0.0, 0.0, 0.0).unwrap();
        a.render(&mut gfx, Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
        b.render(&mut gfx, Mat4::IDENTITY, Mat4::IDENTITY).unwrap();

        let colors: Vec<[f32; 4]> = gfx
            .draws()
            .iter()
            .map(|d| {
                let bytes = d.constants(ShaderStage::Pixel, MATERIAL_SLOT).unwrap();
                bytemuck::pod_read_unaligned::<Material>(bytes).color
            })
            .collect();
        assert_eq!(colors, vec![red.color, blue.color]);
    }

    #[test]
    fn static_mesh_without_texture_binds_fallback() {
        let mut gfx = RecordingGraphics::new();
        let mut cache = StaticDataCache::new();
        let mesh = parse_obj("tri", TRIANGLE.as_bytes(), 1.0).unwrap();

        let renderable = static_mesh(&mut gfx, &mut cache, &mesh, None).unwrap();
        assert_eq!(gfx.texture_count(), 1);
        assert_eq!(renderable.index_count(), Some(3));

        gfx.clear_render_buffer(0.0, 0.0, 0.0).unwrap();
        renderable.render(&mut gfx, Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
        let draw = &gfx.draws()[0];
        assert!(draw.texture.is_some());
        assert!(draw.sampler.is_some());
    }

    #[test]
    fn static_meshes_key_on_texture_too() {
        let mut gfx = RecordingGraphics::new();
        let mut cache = StaticDataCache::new();
        let mesh = parse_obj("tri", TRIANGLE.as_bytes(), 1.0).unwrap();
        let texture = ImageData::solid_color(2, 2, [0, 255, 0, 255]);

        let plain = static_mesh(&mut gfx, &mut cache, &mesh, None).unwrap();
        let textured = static_mesh(&mut gfx, &mut cache, &mesh, Some(&texture)).unwrap();
        let again = static_mesh(&mut gfx, &mut cache, &mesh, Some(&texture)).unwrap();

        assert!(!std::rc::Rc::ptr_eq(plain.shared(), textured.shared()));
        assert!(std::rc::Rc::ptr_eq(textured.shared(), again.shared()));
        assert_eq!(cache.len(), 2);
    }
}
