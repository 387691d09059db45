//! Scene components: an attachment tree of spatial nodes.
//!
//! Every node stores an authoritative world transform and a cached transform
//! relative to its attach parent. Nodes live in a single arena and refer to
//! each other by handle, so a stale handle is an error instead of a dangling
//! reference.
//!
//! # Invariants
//! - A node has at most one attach parent, and the attachment graph is a forest.
//! - After any public setter returns, every attached node's relative transform
//!   composed with its parent's world transform equals its world transform.
//! - World changes cascade to children as deltas, depth first.

mod component;
mod graph;

pub use component::{AttachmentProperties, AttachmentRule, SceneComponent};
pub use graph::{SceneError, SceneGraph, SceneHandle};
