use crate::component::{ComponentHandle, ObjectHandle};
use crate::world::WorldState;
use cinder_assets::AssetError;
use cinder_render::{GraphicsError, RenderError};
use cinder_scene::SceneError;

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Graphics(#[from] GraphicsError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("game object {0:?} does not exist")]
    InvalidObject(ObjectHandle),

    #[error("component {0:?} does not exist")]
    InvalidComponent(ComponentHandle),

    #[error("component {0} is not a camera")]
    NotACamera(String),

    #[error("component {0} is not a mesh")]
    NotAMesh(String),

    #[error("operation needs a started level, world is {0:?}")]
    NotStarted(WorldState),

    #[error("level already started, world is {0:?}")]
    AlreadyStarted(WorldState),

    #[error("world is closed")]
    Closed,
}
