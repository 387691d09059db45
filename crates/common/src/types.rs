use crate::Rotator;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Spatial transform: location, rotation (degrees), scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: Vec3,
    pub rotation: Rotator,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            rotation: Rotator::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub const WORLD_UP: Vec3 = Vec3::Y;

    pub fn new(location: Vec3, rotation: Rotator, scale: Vec3) -> Self {
        Self {
            location,
            rotation,
            scale,
        }
    }

    pub fn from_location(location: Vec3) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }

    /// Scale, then rotate, then translate.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation.to_quat(), self.location)
    }

    pub fn forward_vector(&self) -> Vec3 {
        self.rotation.rotate_vector(Vec3::Z)
    }

    pub fn right_vector(&self) -> Vec3 {
        self.rotation.rotate_vector(Vec3::X)
    }

    pub fn up_vector(&self) -> Vec3 {
        self.rotation.rotate_vector(Vec3::Y)
    }

    /// Compare location, rotation and scale within `tolerance`.
    pub fn equals(&self, other: &Self, tolerance: f32) -> bool {
        self.location.abs_diff_eq(other.location, tolerance)
            && self.rotation.equals(other.rotation, tolerance)
            && self.scale.abs_diff_eq(other.scale, tolerance)
    }
}
