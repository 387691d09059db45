//! Shared math primitives used across the engine.
//!
//! # Invariants
//! - Rotations are stored in degrees and converted to radians only when a
//!   quaternion or matrix is built.
//! - Rotation order is roll (Z), then pitch (X), then yaw (Y).
//! - The engine is left-handed: +X right, +Y up, +Z forward.

pub mod math;
mod rotator;
mod time;
mod types;

pub use rotator::Rotator;
pub use time::Timer;
pub use types::Transform;
