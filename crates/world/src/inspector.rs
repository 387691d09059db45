use crate::component::{ComponentHandle, ObjectHandle};
use crate::world::{World, WorldState};
use std::fmt::Write;

/// World inspector for developer tooling.
///
/// Read-only queries for the desktop debug panel and the CLI.
pub struct WorldInspector;

impl WorldInspector {
    pub fn summary(world: &World) -> WorldSummary {
        let active_camera = world.active_camera().and_then(|handle| {
            let component = world.component(handle)?;
            let owner = world.object(component.owner())?;
            Some(format!("{}.{}", owner.name(), component.name()))
        });
        WorldSummary {
            state: world.state(),
            frame: world.frame_count(),
            object_count: world.object_count(),
            component_count: world.component_count(),
            scene_nodes: world.scene().len(),
            static_data_entries: world.static_data().len(),
            active_camera,
        }
    }

    /// Transforms and kind of a single component.
    pub fn inspect_component(world: &World, handle: ComponentHandle) -> Option<ComponentInfo> {
        let component = world.component(handle)?;
        let owner = world.object(component.owner())?;
        let node = world.scene().get(component.scene())?;
        let world_transform = node.world_transform();
        let relative = node.relative_transform();
        let r = world_transform.rotation;
        Some(ComponentInfo {
            object: owner.name().to_string(),
            name: component.name().to_string(),
            kind: component.kind().label(),
            location: world_transform.location.to_array(),
            rotation: [r.pitch, r.yaw, r.roll],
            scale: world_transform.scale.to_array(),
            relative_location: relative.location.to_array(),
            attached: node.is_attached(),
        })
    }

    /// Object names in spawn order.
    pub fn list_objects(world: &World) -> Vec<(ObjectHandle, String)> {
        world
            .objects()
            .map(|(handle, object)| (handle, object.name().to_string()))
            .collect()
    }

    /// Indented dump of the attachment forest, one line per scene node.
    pub fn tree(world: &World) -> String {
        let mut out = String::new();
        let roots: Vec<_> = world
            .objects()
            .filter_map(|(handle, _)| world.root_scene(handle).ok())
            .filter(|&scene| world.scene().attach_parent(scene).ok().flatten().is_none())
            .collect();
        for root in roots {
            let Ok(walk) = world.scene().depth_first(root) else {
                continue;
            };
            for (depth, handle) in walk {
                let Some(node) = world.scene().get(handle) else {
                    continue;
                };
                let l = node.world_transform().location;
                let _ = writeln!(
                    out,
                    "{:indent$}{} ({:.2}, {:.2}, {:.2})",
                    "",
                    node.name(),
                    l.x,
                    l.y,
                    l.z,
                    indent = depth * 2
                );
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct WorldSummary {
    pub state: WorldState,
    pub frame: u64,
    pub object_count: usize,
    pub component_count: usize,
    pub scene_nodes: usize,
    pub static_data_entries: usize,
    pub active_camera: Option<String>,
}

impl std::fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "World: state={:?} frame={} objects={} components={} scene_nodes={} static_data={} camera={}",
            self.state,
            self.frame,
            self.object_count,
            self.component_count,
            self.scene_nodes,
            self.static_data_entries,
            self.active_camera.as_deref().unwrap_or("none"),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub object: String,
    pub name: String,
    pub kind: &'static str,
    pub location: [f32; 3],
    /// Pitch, yaw, roll in degrees.
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub relative_location: [f32; 3],
    pub attached: bool,
}

impl std::fmt::Display for ComponentInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} [{}] pos=({:.2}, {:.2}, {:.2}) rot=({:.1}, {:.1}, {:.1}) scale=({:.2}, {:.2}, {:.2})",
            self.object,
            self.name,
            self.kind,
            self.location[0],
            self.location[1],
            self.location[2],
            self.rotation[0],
            self.rotation[1],
            self.rotation[2],
            self.scale[0],
            self.scale[1],
            self.scale[2],
        )
    }
}
