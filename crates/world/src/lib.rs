//! World orchestration: game objects, their components and the per-frame
//! tick cascade.
//!
//! A [`World`] owns every [`GameObject`] and [`Component`] in slot maps and
//! every spatial node in one [`SceneGraph`](cinder_scene::SceneGraph). Game
//! objects hold component handles only. Mesh components render inline while
//! their object ticks; there is no separate render pass.
//!
//! # Invariants
//! - Every game object has a root component, and every other component of the
//!   object is created attached under that root.
//! - The active camera, when set, is a camera component that exists.
//! - Lifecycle moves Unstarted, LevelStarted, Running, Closed and never back.
//! - A closed world dispatches no further ticks.

mod component;
pub mod config;
pub mod demo;
mod error;
mod inspector;
mod object;
pub mod objects;
mod world;

pub use component::{
    CameraComponent, Component, ComponentHandle, ComponentKind, MeshComponent, ObjectHandle,
};
pub use config::{ConfigError, EngineConfig};
pub use error::WorldError;
pub use inspector::{ComponentInfo, WorldInspector, WorldSummary};
pub use object::{Behaviour, GameObject, ObjectContext};
pub use world::{DEFAULT_LIGHT_POSITION, ROOT_COMPONENT, World, WorldState};
