use crate::component::{
    CameraComponent, Component, ComponentHandle, ComponentKind, MeshComponent, ObjectHandle,
};
use crate::object::{Behaviour, GameObject, ObjectContext};
use crate::WorldError;
use cinder_assets::AssetStore;
use cinder_common::Transform;
use cinder_input::InputState;
use cinder_render::meshes::{self, Material};
use cinder_render::{Graphics, PointLight, ShapeKind, StaticDataCache};
use cinder_scene::{AttachmentProperties, SceneGraph, SceneHandle};
use glam::{Mat4, Vec3};
use slotmap::SlotMap;
use std::path::Path;

/// Name of the component every object is spawned with.
pub const ROOT_COMPONENT: &str = "Root";

pub const DEFAULT_LIGHT_POSITION: Vec3 = Vec3::new(0.0, 8.0, -6.0);

/// Lifecycle of a [`World`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldState {
    Unstarted,
    LevelStarted,
    Running,
    Closed,
}

/// Owns every game object, component and scene node, the point light and the
/// shared static render data.
///
/// Objects tick in spawn order. Each object's behaviour runs before its mesh
/// components render, so a frame shows the state the behaviour left behind.
#[derive(Debug)]
pub struct World {
    state: WorldState,
    scene: SceneGraph,
    components: SlotMap<ComponentHandle, Component>,
    objects: SlotMap<ObjectHandle, GameObject>,
    order: Vec<ObjectHandle>,
    active_camera: Option<ComponentHandle>,
    light: Option<PointLight>,
    light_position: Vec3,
    clear_color: [f32; 3],
    static_data: StaticDataCache,
    assets: AssetStore,
    frame: u64,
}

impl World {
    pub fn new(assets: AssetStore) -> Self {
        Self {
            state: WorldState::Unstarted,
            scene: SceneGraph::new(),
            components: SlotMap::with_key(),
            objects: SlotMap::with_key(),
            order: Vec::new(),
            active_camera: None,
            light: None,
            light_position: DEFAULT_LIGHT_POSITION,
            clear_color: [0.0, 0.0, 0.0],
            static_data: StaticDataCache::new(),
            assets,
            frame: 0,
        }
    }

    pub fn state(&self) -> WorldState {
        self.state
    }

    /// Frames ticked since level start.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn static_data(&self) -> &StaticDataCache {
        &self.static_data
    }

    pub fn clear_color(&self) -> [f32; 3] {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: [f32; 3]) {
        self.clear_color = color;
    }

    /// The light exists from level start on.
    pub fn light(&self) -> Option<&PointLight> {
        self.light.as_ref()
    }

    pub fn light_mut(&mut self) -> Option<&mut PointLight> {
        self.light.as_mut()
    }

    pub fn set_light_position(&mut self, position: Vec3) {
        self.light_position = position;
        if let Some(light) = &mut self.light {
            light.position = position;
        }
    }

    // --- Objects ---

    /// Spawn an object whose root component sits at `transform`.
    pub fn spawn_object(&mut self, name: impl Into<String>, transform: Transform) -> ObjectHandle {
        let name = name.into();
        let object = self.objects.insert(GameObject {
            name: name.clone(),
            root: ComponentHandle::default(),
            components: Vec::new(),
            behaviour: None,
        });
        let scene = self.scene.create(format!("{name}.{ROOT_COMPONENT}"), transform);
        let root = self.components.insert(Component {
            name: ROOT_COMPONENT.to_string(),
            owner: object,
            scene,
            kind: ComponentKind::Scene,
        });
        let game_object = &mut self.objects[object];
        game_object.root = root;
        game_object.components.push(root);
        self.order.push(object);
        tracing::debug!(object = %name, "spawned game object");
        object
    }

    pub fn spawn_with_behaviour(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        behaviour: Box<dyn Behaviour>,
    ) -> ObjectHandle {
        let object = self.spawn_object(name, transform);
        self.objects[object].behaviour = Some(behaviour);
        object
    }

    pub fn set_behaviour(
        &mut self,
        object: ObjectHandle,
        behaviour: Box<dyn Behaviour>,
    ) -> Result<(), WorldError> {
        self.objects
            .get_mut(object)
            .ok_or(WorldError::InvalidObject(object))?
            .behaviour = Some(behaviour);
        Ok(())
    }

    /// Remove an object with all its components and scene nodes.
    ///
    /// Components of other objects attached under it are detached in place.
    pub fn despawn(&mut self, object: ObjectHandle) -> Result<(), WorldError> {
        let removed = self
            .objects
            .remove(object)
            .ok_or(WorldError::InvalidObject(object))?;
        self.order.retain(|&o| o != object);
        for &handle in &removed.components {
            if self.active_camera == Some(handle) {
                self.active_camera = None;
            }
            if let Some(component) = self.components.remove(handle) {
                self.scene.remove(component.scene)?;
            }
        }
        tracing::debug!(object = %removed.name, "despawned game object");
        Ok(())
    }

    pub fn object(&self, object: ObjectHandle) -> Option<&GameObject> {
        self.objects.get(object)
    }

    /// Objects in spawn order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectHandle, &GameObject)> {
        self.order
            .iter()
            .filter_map(|&h| self.objects.get(h).map(|o| (h, o)))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// First object in spawn order called `name`.
    pub fn find_object(&self, name: &str) -> Option<ObjectHandle> {
        self.objects()
            .find(|(_, o)| o.name == name)
            .map(|(handle, _)| handle)
    }

    /// Scene node of the object's root component.
    pub fn root_scene(&self, object: ObjectHandle) -> Result<SceneHandle, WorldError> {
        let root = self
            .objects
            .get(object)
            .ok_or(WorldError::InvalidObject(object))?
            .root;
        self.component_scene(root)
    }

    // --- Components ---

    /// Add a component to `object`, attached under its root.
    ///
    /// The component starts at the root's world pose: zero relative location
    /// and rotation.
    pub fn add_component(
        &mut self,
        object: ObjectHandle,
        name: impl Into<String>,
        kind: ComponentKind,
    ) -> Result<ComponentHandle, WorldError> {
        let root_scene = self.root_scene(object)?;
        let pose = self.scene.world_transform(root_scene)?;
        let owner = self
            .objects
            .get_mut(object)
            .ok_or(WorldError::InvalidObject(object))?;
        let name = name.into();
        let scene = self.scene.create(format!("{}.{name}", owner.name), pose);
        self.scene
            .attach_to_component(scene, root_scene, AttachmentProperties::keep_relative())?;
        let handle = self.components.insert(Component {
            name,
            owner: object,
            scene,
            kind,
        });
        owner.components.push(handle);
        Ok(handle)
    }

    pub fn add_mesh_component(
        &mut self,
        object: ObjectHandle,
        name: impl Into<String>,
    ) -> Result<ComponentHandle, WorldError> {
        self.add_component(object, name, ComponentKind::Mesh(MeshComponent::new()))
    }

    pub fn add_camera_component(
        &mut self,
        object: ObjectHandle,
        name: impl Into<String>,
        camera: CameraComponent,
    ) -> Result<ComponentHandle, WorldError> {
        self.add_component(object, name, ComponentKind::Camera(camera))
    }

    /// Re-parent one component's scene node under another's.
    pub fn attach_component(
        &mut self,
        child: ComponentHandle,
        parent: ComponentHandle,
        props: AttachmentProperties,
    ) -> Result<(), WorldError> {
        let child = self.component_scene(child)?;
        let parent = self.component_scene(parent)?;
        self.scene.attach_to_component(child, parent, props)?;
        Ok(())
    }

    pub fn component(&self, handle: ComponentHandle) -> Option<&Component> {
        self.components.get(handle)
    }

    pub fn component_mut(&mut self, handle: ComponentHandle) -> Option<&mut Component> {
        self.components.get_mut(handle)
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn component_scene(&self, handle: ComponentHandle) -> Result<SceneHandle, WorldError> {
        self.components
            .get(handle)
            .map(|c| c.scene)
            .ok_or(WorldError::InvalidComponent(handle))
    }

    pub fn world_transform(&self, handle: ComponentHandle) -> Result<Transform, WorldError> {
        Ok(self.scene.world_transform(self.component_scene(handle)?)?)
    }

    /// First component of `object` called `name`.
    pub fn find_component(
        &self,
        object: ObjectHandle,
        name: &str,
    ) -> Result<Option<ComponentHandle>, WorldError> {
        let object = self
            .objects
            .get(object)
            .ok_or(WorldError::InvalidObject(object))?;
        Ok(object
            .components
            .iter()
            .copied()
            .find(|&h| self.components.get(h).is_some_and(|c| c.name == name)))
    }

    /// Give a mesh component a built-in shape with its own material.
    pub fn set_mesh_shape(
        &mut self,
        gfx: &mut dyn Graphics,
        handle: ComponentHandle,
        kind: ShapeKind,
        material: &Material,
    ) -> Result<(), WorldError> {
        self.mesh_slot(handle)?;
        let mut renderable = meshes::shape_mesh(gfx, &mut self.static_data, kind, material)?;
        let (mesh, transform) = self.mesh_slot(handle)?;
        renderable.set_transform(transform);
        mesh.set_renderable(renderable);
        Ok(())
    }

    /// Give a mesh component the mesh at `<stem>.obj`, textured with
    /// `<stem>.png` when that file exists.
    pub fn set_static_mesh(
        &mut self,
        gfx: &mut dyn Graphics,
        handle: ComponentHandle,
        stem: impl AsRef<Path>,
        import_scale: f32,
    ) -> Result<(), WorldError> {
        self.mesh_slot(handle)?;
        let asset = self.assets.load_static_mesh(stem, import_scale)?;
        let mut renderable = meshes::static_mesh(
            gfx,
            &mut self.static_data,
            &asset.mesh,
            asset.texture.as_deref(),
        )?;
        let (mesh, transform) = self.mesh_slot(handle)?;
        renderable.set_transform(transform);
        mesh.set_renderable(renderable);
        Ok(())
    }

    fn mesh_slot(
        &mut self,
        handle: ComponentHandle,
    ) -> Result<(&mut MeshComponent, Transform), WorldError> {
        let component = self
            .components
            .get_mut(handle)
            .ok_or(WorldError::InvalidComponent(handle))?;
        let transform = self.scene.world_transform(component.scene)?;
        match &mut component.kind {
            ComponentKind::Mesh(mesh) => Ok((mesh, transform)),
            _ => Err(WorldError::NotAMesh(component.name.clone())),
        }
    }

    // --- Camera ---

    pub fn set_active_camera(&mut self, handle: ComponentHandle) -> Result<(), WorldError> {
        let component = self
            .components
            .get(handle)
            .ok_or(WorldError::InvalidComponent(handle))?;
        if component.as_camera().is_none() {
            return Err(WorldError::NotACamera(component.name.clone()));
        }
        self.active_camera = Some(handle);
        Ok(())
    }

    /// The camera component supplying the frame's view and projection.
    pub fn active_camera(&self) -> Option<ComponentHandle> {
        self.active_camera
    }

    fn active_camera_component(&self) -> Option<(&CameraComponent, SceneHandle)> {
        let component = self.components.get(self.active_camera?)?;
        Some((component.as_camera()?, component.scene))
    }

    /// View of the active camera, or of an unrotated eye at the origin.
    pub fn view_matrix(&self) -> Result<Mat4, WorldError> {
        match self.active_camera_component() {
            Some((camera, scene)) => Ok(camera.view_matrix(&self.scene.world_transform(scene)?)),
            None => Ok(CameraComponent::default().view_matrix(&Transform::default())),
        }
    }

    /// Projection of the active camera, or the device's own.
    pub fn projection_matrix(&self, gfx: &dyn Graphics) -> Mat4 {
        self.active_camera_component()
            .map(|(camera, _)| camera.projection_matrix())
            .unwrap_or_else(|| gfx.projection_matrix())
    }

    /// Resize the render targets and keep the active camera's aspect in step.
    ///
    /// A zero-size window leaves the camera alone.
    pub fn on_window_resized(
        &mut self,
        gfx: &mut dyn Graphics,
        width: u32,
        height: u32,
    ) -> Result<(), WorldError> {
        gfx.resize_render_targets(width, height)?;
        if width == 0 || height == 0 {
            return Ok(());
        }
        let camera = self
            .active_camera
            .and_then(|h| self.components.get_mut(h))
            .and_then(Component::as_camera_mut);
        if let Some(camera) = camera {
            camera.update_window_size(width, height);
            gfx.set_projection_settings(camera.settings());
        }
        Ok(())
    }

    // --- Lifecycle ---

    /// Create the light, push the camera projection to the device and run
    /// every behaviour's level start.
    pub fn level_start(&mut self, gfx: &mut dyn Graphics) -> Result<(), WorldError> {
        match self.state {
            WorldState::Unstarted => {}
            WorldState::Closed => return Err(WorldError::Closed),
            state => return Err(WorldError::AlreadyStarted(state)),
        }
        self.light = Some(PointLight::new(gfx, self.light_position)?);
        if let Some((camera, _)) = self.active_camera_component() {
            gfx.set_projection_settings(camera.settings());
        }

        let input = InputState::new();
        for object in self.order.clone() {
            self.run_behaviour(object, &input, |behaviour, ctx| behaviour.level_start(ctx))?;
        }
        self.state = WorldState::LevelStarted;
        tracing::info!(
            objects = self.objects.len(),
            components = self.components.len(),
            "level started"
        );
        Ok(())
    }

    /// Run one frame: clear, bind the light, then tick and draw each object
    /// in turn. Presenting is left to the caller.
    ///
    /// View and projection are taken once, before any behaviour runs.
    pub fn tick(
        &mut self,
        delta_time: f32,
        input: &InputState,
        gfx: &mut dyn Graphics,
    ) -> Result<(), WorldError> {
        match self.state {
            WorldState::LevelStarted | WorldState::Running => {}
            WorldState::Closed => return Err(WorldError::Closed),
            state => return Err(WorldError::NotStarted(state)),
        }
        let [red, green, blue] = self.clear_color;
        gfx.clear_render_buffer(red, green, blue)?;
        let view = self.view_matrix()?;
        let projection = self.projection_matrix(&*gfx);
        if let Some(light) = &self.light {
            light.bind(gfx, view)?;
        }

        for object in self.order.clone() {
            self.run_behaviour(object, input, |behaviour, ctx| behaviour.tick(ctx, delta_time))?;
            self.render_object(object, gfx, view, projection)?;
        }
        self.state = WorldState::Running;
        self.frame += 1;
        tracing::trace!(frame = self.frame, delta_time, "ticked world");
        Ok(())
    }

    /// Stop ticking. Every later tick is rejected.
    pub fn close(&mut self) {
        if self.state != WorldState::Closed {
            tracing::info!(frames = self.frame, "world closed");
            self.state = WorldState::Closed;
        }
    }

    fn run_behaviour(
        &mut self,
        object: ObjectHandle,
        input: &InputState,
        call: impl FnOnce(&mut dyn Behaviour, &mut ObjectContext<'_>) -> Result<(), WorldError>,
    ) -> Result<(), WorldError> {
        let Some(mut behaviour) = self
            .objects
            .get_mut(object)
            .and_then(|o| o.behaviour.take())
        else {
            return Ok(());
        };
        let result = {
            let mut ctx = ObjectContext {
                world: &mut *self,
                object,
                input,
            };
            call(behaviour.as_mut(), &mut ctx)
        };
        // The behaviour may have despawned its own object.
        if let Some(o) = self.objects.get_mut(object) {
            o.behaviour = Some(behaviour);
        }
        result
    }

    fn render_object(
        &mut self,
        object: ObjectHandle,
        gfx: &mut dyn Graphics,
        view: Mat4,
        projection: Mat4,
    ) -> Result<(), WorldError> {
        let Some(game_object) = self.objects.get(object) else {
            return Ok(());
        };
        for &handle in &game_object.components {
            let Some(component) = self.components.get_mut(handle) else {
                continue;
            };
            let ComponentKind::Mesh(mesh) = &mut component.kind else {
                continue;
            };
            mesh.sync_transform(self.scene.world_transform(component.scene)?);
            mesh.render(gfx, view, projection)?;
        }
        Ok(())
    }
}
