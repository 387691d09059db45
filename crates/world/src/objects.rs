//! Ready-made game objects.

use crate::component::{CameraComponent, ComponentHandle, ObjectHandle};
use crate::config::CameraConfig;
use crate::object::{Behaviour, ObjectContext};
use crate::{World, WorldError};
use cinder_common::{Rotator, Transform};
use cinder_input::{Key, MouseButton};
use cinder_render::{Graphics, Material, ProjectionSettings, ShapeKind};
use glam::{Vec2, Vec3};
use std::path::Path;

/// Root plus one mesh component drawing a file mesh.
pub struct StaticMeshObject;

impl StaticMeshObject {
    pub const MESH: &'static str = "Mesh";

    pub fn spawn(
        world: &mut World,
        gfx: &mut dyn Graphics,
        name: &str,
        stem: impl AsRef<Path>,
        import_scale: f32,
        transform: Transform,
    ) -> Result<(ObjectHandle, ComponentHandle), WorldError> {
        let object = world.spawn_object(name, transform);
        let mesh = world.add_mesh_component(object, Self::MESH)?;
        if let Err(e) = world.set_static_mesh(gfx, mesh, stem, import_scale) {
            world.despawn(object)?;
            return Err(e);
        }
        Ok((object, mesh))
    }
}

/// Root plus one mesh component drawing a built-in shape.
pub struct ShapeObject;

impl ShapeObject {
    pub const MESH: &'static str = "Mesh";

    pub fn spawn(
        world: &mut World,
        gfx: &mut dyn Graphics,
        name: &str,
        kind: ShapeKind,
        material: &Material,
        transform: Transform,
    ) -> Result<(ObjectHandle, ComponentHandle), WorldError> {
        let object = world.spawn_object(name, transform);
        let mesh = world.add_mesh_component(object, Self::MESH)?;
        world.set_mesh_shape(gfx, mesh, kind, material)?;
        Ok((object, mesh))
    }
}

/// Free-flying camera, made the world's active camera on spawn.
pub struct EngineCamera;

impl EngineCamera {
    pub const CAMERA: &'static str = "Camera";
    pub const START: Vec3 = Vec3::new(0.0, 0.0, -10.0);

    pub fn spawn(
        world: &mut World,
        controls: &CameraConfig,
        projection: ProjectionSettings,
    ) -> Result<(ObjectHandle, ComponentHandle), WorldError> {
        let object = world.spawn_with_behaviour(
            "EngineCamera",
            Transform::from_location(Self::START),
            Box::new(CameraController::new(controls)),
        );
        let camera =
            world.add_camera_component(object, Self::CAMERA, CameraComponent::new(projection))?;
        world.set_active_camera(camera)?;
        Ok((object, camera))
    }
}

/// Mouse-look and WASD flight, active only while the left mouse button is held.
#[derive(Debug, Clone)]
pub struct CameraController {
    move_speed: f32,
    look_sensitivity: f32,
    boost: f32,
}

impl CameraController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            move_speed: config.move_speed,
            look_sensitivity: config.look_sensitivity,
            boost: config.boost,
        }
    }
}

impl Behaviour for CameraController {
    fn tick(&mut self, ctx: &mut ObjectContext<'_>, delta_time: f32) -> Result<(), WorldError> {
        if !ctx.input.is_button_down(MouseButton::Left) {
            return Ok(());
        }
        let root = ctx.root()?;

        let look = ctx.input.mouse_delta() * self.look_sensitivity;
        if look != Vec2::ZERO {
            ctx.scene()
                .set_world_rotation(root, Rotator::new(look.y, look.x, 0.0), true)?;
        }

        let transform = ctx.scene().world_transform(root)?;
        let input = ctx.input;
        let mut direction = Vec3::ZERO;
        if input.is_key_down(Key::W) {
            direction += transform.forward_vector();
        }
        if input.is_key_down(Key::S) {
            direction -= transform.forward_vector();
        }
        if input.is_key_down(Key::D) {
            direction += transform.right_vector();
        }
        if input.is_key_down(Key::A) {
            direction -= transform.right_vector();
        }
        if input.is_key_down(Key::Space) {
            direction += Transform::WORLD_UP;
        }
        if input.is_key_down(Key::Control) {
            direction -= Transform::WORLD_UP;
        }
        if direction == Vec3::ZERO {
            return Ok(());
        }

        let speed = if input.is_key_down(Key::Shift) {
            self.move_speed * self.boost
        } else {
            self.move_speed
        };
        ctx.scene()
            .set_world_location(root, direction * speed * delta_time, true)?;
        Ok(())
    }
}
