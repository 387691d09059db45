use cinder_common::Transform;
use cinder_render::{Graphics, ProjectionSettings, RenderError, RenderableMesh};
use cinder_scene::SceneHandle;
use glam::Mat4;

slotmap::new_key_type! {
    /// Stable handle to a component owned by a [`World`](crate::World).
    pub struct ComponentHandle;
    /// Stable handle to a game object owned by a [`World`](crate::World).
    pub struct ObjectHandle;
}

/// A part of a game object with a node in the scene graph.
///
/// The scene node holds the component's transforms; the kind holds whatever
/// else the component does with them.
#[derive(Debug)]
pub struct Component {
    pub(crate) name: String,
    pub(crate) owner: ObjectHandle,
    pub(crate) scene: SceneHandle,
    pub(crate) kind: ComponentKind,
}

impl Component {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> ObjectHandle {
        self.owner
    }

    pub fn scene(&self) -> SceneHandle {
        self.scene
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ComponentKind {
        &mut self.kind
    }

    pub fn as_mesh(&self) -> Option<&MeshComponent> {
        match &self.kind {
            ComponentKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut MeshComponent> {
        match &mut self.kind {
            ComponentKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_camera(&self) -> Option<&CameraComponent> {
        match &self.kind {
            ComponentKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn as_camera_mut(&mut self) -> Option<&mut CameraComponent> {
        match &mut self.kind {
            ComponentKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ComponentKind {
    /// Transform only. Every object root is one of these.
    Scene,
    Mesh(MeshComponent),
    Camera(CameraComponent),
}

impl ComponentKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Mesh(_) => "mesh",
            Self::Camera(_) => "camera",
        }
    }
}

/// Draws an optional renderable at the component's world transform.
#[derive(Debug)]
pub struct MeshComponent {
    renderable: Option<RenderableMesh>,
    visible: bool,
}

impl Default for MeshComponent {
    fn default() -> Self {
        Self {
            renderable: None,
            visible: true,
        }
    }
}

impl MeshComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn renderable(&self) -> Option<&RenderableMesh> {
        self.renderable.as_ref()
    }

    /// Replace the drawn mesh, returning the previous one.
    pub fn set_renderable(&mut self, renderable: RenderableMesh) -> Option<RenderableMesh> {
        self.renderable.replace(renderable)
    }

    pub fn clear(&mut self) -> Option<RenderableMesh> {
        self.renderable.take()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn sync_transform(&mut self, world: Transform) {
        if let Some(renderable) = &mut self.renderable {
            renderable.set_transform(world);
        }
    }

    /// Draw the renderable if there is one and the component is visible.
    pub fn render(
        &self,
        gfx: &mut dyn Graphics,
        view: Mat4,
        projection: Mat4,
    ) -> Result<(), RenderError> {
        match &self.renderable {
            Some(renderable) if self.visible => renderable.render(gfx, view, projection),
            _ => Ok(()),
        }
    }
}

/// Supplies the view and projection of the frame when it is the active camera.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraComponent {
    settings: ProjectionSettings,
}

impl CameraComponent {
    pub fn new(settings: ProjectionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> ProjectionSettings {
        self.settings
    }

    /// Look along the transform's forward vector from its location.
    pub fn view_matrix(&self, world: &Transform) -> Mat4 {
        let eye = world.location;
        Mat4::look_at_lh(eye, eye + world.forward_vector(), world.up_vector())
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.settings.matrix()
    }

    /// Zero arguments keep the current value.
    pub fn set_projection_settings(
        &mut self,
        fov_degrees: f32,
        width: f32,
        height: f32,
        near: f32,
        far: f32,
    ) {
        self.settings = self.settings.merged(fov_degrees, width, height, near, far);
    }

    pub fn update_window_size(&mut self, width: u32, height: u32) {
        self.set_projection_settings(0.0, width as f32, height as f32, 0.0, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_common::Rotator;
    use glam::{Vec3, Vec4};

    fn project(view: Mat4, point: Vec3) -> Vec3 {
        (view * Vec4::new(point.x, point.y, point.z, 1.0)).truncate()
    }

    #[test]
    fn view_looks_down_forward_vector() {
        let camera = CameraComponent::default();
        let eye = Transform::from_location(Vec3::new(0.0, 0.0, -10.0));
        let view = camera.view_matrix(&eye);

        // A point straight ahead lands on the view-space +Z axis.
        let ahead = project(view, Vec3::ZERO);
        assert!(ahead.x.abs() < 1e-4 && ahead.y.abs() < 1e-4);
        assert!((ahead.z - 10.0).abs() < 1e-4);
    }

    #[test]
    fn yawed_camera_sees_the_side() {
        let camera = CameraComponent::default();
        let mut eye = Transform::default();
        eye.rotation = Rotator::new(0.0, 90.0, 0.0);
        let view = camera.view_matrix(&eye);

        let side = project(view, eye.forward_vector() * 3.0);
        assert!((side.z - 3.0).abs() < 1e-4);
    }

    #[test]
    fn zero_projection_arguments_keep_values() {
        let mut camera = CameraComponent::default();
        camera.set_projection_settings(90.0, 0.0, 0.0, 0.0, 100.0);
        let s = camera.settings();
        assert_eq!(s.fov_degrees, 90.0);
        assert_eq!(s.width, 1280.0);
        assert_eq!(s.near, 0.5);
        assert_eq!(s.far, 100.0);

        camera.update_window_size(800, 600);
        assert_eq!(camera.settings().width, 800.0);
        assert_eq!(camera.settings().height, 600.0);
        assert_eq!(camera.settings().fov_degrees, 90.0);
    }

    #[test]
    fn hidden_or_empty_mesh_draws_nothing() {
        let mut gfx = cinder_render::RecordingGraphics::new();
        let mut mesh = MeshComponent::new();
        mesh.render(&mut gfx, Mat4::IDENTITY, Mat4::IDENTITY).unwrap();

        let mut cache = cinder_render::StaticDataCache::new();
        let renderable = cinder_render::meshes::shape_mesh(
            &mut gfx,
            &mut cache,
            cinder_render::ShapeKind::Box,
            &cinder_render::Material::default(),
        )
        .unwrap();
        mesh.set_renderable(renderable);
        mesh.set_visible(false);
        gfx.clear_render_buffer(0.0, 0.0, 0.0).unwrap();
        mesh.render(&mut gfx, Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
        assert!(gfx.draws().is_empty());

        mesh.set_visible(true);
        mesh.render(&mut gfx, Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
        assert_eq!(gfx.draws().len(), 1);
    }
}
