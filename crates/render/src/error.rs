use crate::{GraphicsError, ShaderStage};
use cinder_assets::AssetError;

/// Errors from building or rendering renderables.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderable has no index data")]
    MissingIndexData,
    #[error("renderable already has index data")]
    DuplicateIndexData,
    #[error("{0} context data holds no constants")]
    NotConstantData(&'static str),
    #[error("renderable has no {stage:?} constants in slot {slot}")]
    NoConstantSlot { stage: ShaderStage, slot: u32 },
    #[error(transparent)]
    Graphics(#[from] GraphicsError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}
