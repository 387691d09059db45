//! Render-context binding: the graphics device boundary and the data bound
//! through it.
//!
//! A [`RenderableMesh`] owns per-instance [`ContextData`] and shares a list of
//! static context data with every other mesh of its type through a
//! [`StaticDataCache`]. Rendering binds both lists and issues one indexed draw.
//!
//! # Invariants
//! - A renderable has exactly one index data entry across its two lists.
//! - Static data for a mesh type is built at most once per cache.
//! - Transform data is recomputed from the model, view and projection on every bind.
//! - Constant buffers never exceed [`MAX_CONSTANT_BUFFER_SIZE`] bytes.

pub mod context;
mod error;
pub mod graphics;
mod light;
pub mod meshes;
pub mod recording;
mod renderable;
pub mod shaders;
pub mod shapes;

pub use context::{ContextData, ContextDataList, DrawContext, MeshTransform};
pub use error::RenderError;
pub use graphics::{
    Binding, BufferId, Graphics, GraphicsError, MAX_CONSTANT_BUFFER_SIZE, PrimitiveTopology,
    ProjectionSettings, SamplerDesc, SamplerId, ShaderId, ShaderStage, TextureId, VertexFormat,
    VertexLayout,
};
pub use light::{LightConstants, PointLight};
pub use meshes::Material;
pub use recording::RecordingGraphics;
pub use renderable::{MeshKey, RenderableMesh, StaticData, StaticDataCache};
pub use shapes::ShapeKind;
