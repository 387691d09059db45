//! wgpu backend for the cinder graphics device boundary.
//!
//! [`WgpuGraphics`] implements [`cinder_render::Graphics`] against a window
//! surface. Meshes use a shared pipeline layout: group 0 carries the four
//! constant slots as dynamic-offset uniforms, group 1 the texture and sampler.
//!
//! # Invariants
//! - Triangles wind clockwise on screen and back faces are culled.
//! - Depth is cleared to 1.0 every frame and compared with `Less`.
//! - A constant slot with nothing bound reads zeros.

mod gpu;

pub use gpu::{OverlayTarget, WgpuGraphics};
