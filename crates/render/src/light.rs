use crate::graphics::{Binding, BufferId, Graphics, GraphicsError, ShaderStage};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Pixel constant slot that receives [`LightConstants`].
pub const LIGHT_SLOT: u32 = 0;

/// GPU layout of the point light, 64 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LightConstants {
    pub view_position: [f32; 3],
    pub intensity: f32,
    pub ambient: [f32; 3],
    pub att_const: f32,
    pub diffuse: [f32; 3],
    pub att_lin: f32,
    pub att_quad: f32,
    pub _pad: [f32; 3],
}

/// Single point light bound once per frame to pixel constant slot 0.
#[derive(Debug, Clone)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub intensity: f32,
    pub att_const: f32,
    pub att_lin: f32,
    pub att_quad: f32,
    buffer: BufferId,
}

impl PointLight {
    pub const DEFAULT_AMBIENT: Vec3 = Vec3::splat(0.05);
    pub const DEFAULT_DIFFUSE: Vec3 = Vec3::ONE;
    pub const DEFAULT_INTENSITY: f32 = 5.0;

    pub fn new(gfx: &mut dyn Graphics, position: Vec3) -> Result<Self, GraphicsError> {
        let buffer =
            gfx.create_constant_buffer("point_light", bytemuck::bytes_of(&LightConstants::zeroed()))?;
        let mut light = Self {
            position,
            ambient: Vec3::ZERO,
            diffuse: Vec3::ZERO,
            intensity: 0.0,
            att_const: 0.0,
            att_lin: 0.0,
            att_quad: 0.0,
            buffer,
        };
        light.reset();
        Ok(light)
    }

    /// Restore colour, intensity and attenuation defaults. Position is kept.
    pub fn reset(&mut self) {
        self.ambient = Self::DEFAULT_AMBIENT;
        self.diffuse = Self::DEFAULT_DIFFUSE;
        self.intensity = Self::DEFAULT_INTENSITY;
        self.att_const = 1.0;
        self.att_lin = 0.05;
        self.att_quad = 0.008;
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Constants with the position moved into view space.
    pub fn constants(&self, view: Mat4) -> LightConstants {
        LightConstants {
            view_position: view.transform_point3(self.position).to_array(),
            intensity: self.intensity,
            ambient: self.ambient.to_array(),
            att_const: self.att_const,
            diffuse: self.diffuse.to_array(),
            att_lin: self.att_lin,
            att_quad: self.att_quad,
            _pad: [0.0; 3],
        }
    }

    pub fn bind(&self, gfx: &mut dyn Graphics, view: Mat4) -> Result<(), GraphicsError> {
        gfx.update_constant_buffer(self.buffer, bytemuck::bytes_of(&self.constants(view)))?;
        gfx.bind(Binding::ConstantBuffer {
            stage: ShaderStage::Pixel,
            slot: LIGHT_SLOT,
            buffer: self.buffer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingGraphics;

    #[test]
    fn constants_are_64_bytes() {
        assert_eq!(std::mem::size_of::<LightConstants>(), 64);
    }

    #[test]
    fn position_is_view_space() {
        let mut gfx = RecordingGraphics::new();
        let light = PointLight::new(&mut gfx, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(light.constants(view).view_position, [1.0, 2.0, 13.0]);
        assert_eq!(light.constants(view).intensity, 5.0);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut gfx = RecordingGraphics::new();
        let mut light = PointLight::new(&mut gfx, Vec3::ZERO).unwrap();
        light.intensity = 0.5;
        light.att_quad = 1.0;
        light.position = Vec3::X;
        light.reset();
        assert_eq!(light.intensity, 5.0);
        assert_eq!(light.att_quad, 0.008);
        assert_eq!(light.position, Vec3::X);
    }

    #[test]
    fn bind_uploads_and_binds_pixel_slot() {
        let mut gfx = RecordingGraphics::new();
        let light = PointLight::new(&mut gfx, Vec3::new(0.0, 5.0, 0.0)).unwrap();
        light.bind(&mut gfx, Mat4::IDENTITY).unwrap();
        let uploaded: LightConstants = bytemuck::pod_read_unaligned(gfx.buffer_contents(light.buffer()).unwrap());
        assert_eq!(uploaded.view_position, [0.0, 5.0, 0.0]);
        assert_eq!(gfx.bound_constants(ShaderStage::Pixel, LIGHT_SLOT), Some(light.buffer()));
    }
}
