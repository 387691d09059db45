use crate::component::{ComponentHandle, ObjectHandle};
use crate::{World, WorldError};
use cinder_input::InputState;
use cinder_scene::{SceneGraph, SceneHandle};

/// Per-object logic run by the world's level start and tick cascades.
pub trait Behaviour {
    fn level_start(&mut self, _ctx: &mut ObjectContext<'_>) -> Result<(), WorldError> {
        Ok(())
    }

    fn tick(&mut self, ctx: &mut ObjectContext<'_>, delta_time: f32) -> Result<(), WorldError>;
}

/// What a behaviour may touch while it runs.
///
/// The world is fully borrowed; the object's own behaviour is detached for
/// the duration of the call.
pub struct ObjectContext<'a> {
    pub world: &'a mut World,
    pub object: ObjectHandle,
    pub input: &'a InputState,
}

impl ObjectContext<'_> {
    /// Scene node of the object's root component.
    pub fn root(&self) -> Result<SceneHandle, WorldError> {
        self.world.root_scene(self.object)
    }

    pub fn scene(&mut self) -> &mut SceneGraph {
        self.world.scene_mut()
    }

    /// Scene node of the object's first component called `name`.
    pub fn component_scene(&self, name: &str) -> Result<Option<SceneHandle>, WorldError> {
        Ok(self
            .world
            .find_component(self.object, name)?
            .and_then(|h| self.world.component(h))
            .map(|c| c.scene()))
    }
}

/// A spawned object: a root component, the components attached under it and
/// optional behaviour.
pub struct GameObject {
    pub(crate) name: String,
    pub(crate) root: ComponentHandle,
    pub(crate) components: Vec<ComponentHandle>,
    pub(crate) behaviour: Option<Box<dyn Behaviour>>,
}

impl GameObject {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> ComponentHandle {
        self.root
    }

    /// Components in creation order, root first.
    pub fn components(&self) -> &[ComponentHandle] {
        &self.components
    }

    pub fn has_behaviour(&self) -> bool {
        self.behaviour.is_some()
    }
}

impl std::fmt::Debug for GameObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameObject")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("components", &self.components)
            .field("behaviour", &self.behaviour.is_some())
            .finish()
    }
}
