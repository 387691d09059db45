//! The scene shown by the desktop app and simulated by the CLI.

use crate::component::{ComponentHandle, ObjectHandle};
use crate::config::EngineConfig;
use crate::object::{Behaviour, ObjectContext};
use crate::objects::{EngineCamera, ShapeObject, StaticMeshObject};
use crate::{World, WorldError};
use cinder_common::{Rotator, Transform};
use cinder_render::{Graphics, Material, ProjectionSettings, ShapeKind};
use glam::Vec3;

/// Offset of the orbiting moon from the spinner's origin.
pub const MOON_OFFSET: Vec3 = Vec3::new(3.0, 0.0, 0.0);

/// Turns its object about the world up axis at a fixed rate.
#[derive(Debug, Clone, Copy)]
pub struct Spinner {
    pub degrees_per_second: f32,
}

impl Behaviour for Spinner {
    fn tick(&mut self, ctx: &mut ObjectContext<'_>, delta_time: f32) -> Result<(), WorldError> {
        let root = ctx.root()?;
        let yaw = self.degrees_per_second * delta_time;
        ctx.scene()
            .set_world_rotation(root, Rotator::new(0.0, yaw, 0.0), true)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DemoScene {
    pub camera: ObjectHandle,
    pub floor: ObjectHandle,
    pub spinner: ObjectHandle,
    pub moon: ComponentHandle,
    pub pillar: ObjectHandle,
}

/// Populate `world` with the demo objects plus any configured static meshes.
pub fn build_demo_scene(
    world: &mut World,
    gfx: &mut dyn Graphics,
    config: &EngineConfig,
) -> Result<DemoScene, WorldError> {
    world.set_clear_color(config.clear_color);
    world.set_light_position(Vec3::from_array(config.light_position));

    let projection = ProjectionSettings::default().merged(
        config.projection.fov_degrees,
        config.window.width as f32,
        config.window.height as f32,
        config.projection.near,
        config.projection.far,
    );
    let (camera, _) = EngineCamera::spawn(world, &config.camera, projection)?;

    let (floor, _) = ShapeObject::spawn(
        world,
        gfx,
        "Floor",
        ShapeKind::Plane,
        &Material::new([0.45, 0.45, 0.5, 1.0]).with_specular(0.1, 8.0),
        Transform::new(Vec3::new(0.0, -2.0, 0.0), Rotator::ZERO, Vec3::new(20.0, 1.0, 20.0)),
    )?;

    let (spinner, _) = ShapeObject::spawn(
        world,
        gfx,
        "Spinner",
        ShapeKind::Box,
        &Material::new([0.85, 0.2, 0.15, 1.0]),
        Transform::default(),
    )?;
    world.set_behaviour(
        spinner,
        Box::new(Spinner {
            degrees_per_second: 45.0,
        }),
    )?;
    let moon = world.add_mesh_component(spinner, "Moon")?;
    world.set_mesh_shape(
        gfx,
        moon,
        ShapeKind::Sphere,
        &Material::new([0.3, 0.5, 0.95, 1.0]),
    )?;
    let moon_scene = world.component_scene(moon)?;
    world
        .scene_mut()
        .set_relative_location(moon_scene, MOON_OFFSET, false)?;
    world
        .scene_mut()
        .set_world_scale(moon_scene, Vec3::splat(0.5), false)?;

    let (pillar, _) = ShapeObject::spawn(
        world,
        gfx,
        "Pillar",
        ShapeKind::Box,
        &Material::new([0.9, 0.8, 0.3, 1.0]),
        Transform::new(Vec3::new(-4.0, 0.0, 3.0), Rotator::ZERO, Vec3::new(1.0, 3.0, 1.0)),
    )?;

    for entry in &config.meshes {
        StaticMeshObject::spawn(
            world,
            gfx,
            &entry.name,
            &entry.stem,
            entry.import_scale,
            Transform::from_location(Vec3::from_array(entry.location)),
        )?;
    }

    tracing::info!(
        objects = world.object_count(),
        components = world.component_count(),
        "built demo scene"
    );
    Ok(DemoScene {
        camera,
        floor,
        spinner,
        moon,
        pillar,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshEntry;
    use cinder_assets::AssetStore;
    use cinder_input::InputState;
    use cinder_render::RecordingGraphics;
    use std::path::PathBuf;

    #[test]
    fn demo_scene_draws_every_mesh_and_shares_box_data() {
        let mut world = World::new(AssetStore::new("."));
        let mut gfx = RecordingGraphics::new();
        build_demo_scene(&mut world, &mut gfx, &EngineConfig::default()).unwrap();

        world.level_start(&mut gfx).unwrap();
        world.tick(0.016, &InputState::new(), &mut gfx).unwrap();

        assert_eq!(gfx.draws().len(), 4);
        // Plane, box and sphere: the two boxes share one entry.
        assert_eq!(world.static_data().len(), 3);
        assert_eq!(gfx.vertex_buffer_count(), 3);
    }

    #[test]
    fn moon_orbits_the_spinner() {
        let mut world = World::new(AssetStore::new("."));
        let mut gfx = RecordingGraphics::new();
        let demo = build_demo_scene(&mut world, &mut gfx, &EngineConfig::default()).unwrap();
        assert!(
            world
                .world_transform(demo.moon)
                .unwrap()
                .location
                .abs_diff_eq(MOON_OFFSET, 1e-5)
        );

        world.level_start(&mut gfx).unwrap();
        world.tick(2.0, &InputState::new(), &mut gfx).unwrap();

        // 90 degrees of yaw carries +X onto -Z.
        let moon = world.world_transform(demo.moon).unwrap();
        assert!(moon.location.abs_diff_eq(Vec3::new(0.0, 0.0, -3.0), 1e-4));
        assert!(moon.rotation.equals(Rotator::new(0.0, 90.0, 0.0), 1e-4));
        assert!(moon.scale.abs_diff_eq(Vec3::splat(0.5), 1e-5));
    }

    #[test]
    fn configured_meshes_are_spawned() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tri.obj"), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let mut config = EngineConfig::default();
        config.meshes.push(MeshEntry {
            name: "Triangle".to_string(),
            stem: PathBuf::from("tri"),
            import_scale: 1.0,
            location: [0.0, 4.0, 0.0],
        });

        let mut world = World::new(AssetStore::new(dir.path()));
        let mut gfx = RecordingGraphics::new();
        build_demo_scene(&mut world, &mut gfx, &config).unwrap();
        let triangle = world.find_object("Triangle").unwrap();
        let root = world.object(triangle).unwrap().root();
        assert_eq!(world.world_transform(root).unwrap().location, Vec3::new(0.0, 4.0, 0.0));
    }
}
