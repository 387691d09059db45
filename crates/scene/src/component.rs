use crate::SceneHandle;
use cinder_common::Transform;

/// How one axis of a node's transform is resolved when it is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachmentRule {
    /// Keep the world value; the relative value is derived from it.
    #[default]
    AttachWorld,
    /// Re-express the current world value against the new parent and apply it
    /// through the relative setter.
    ///
    /// The world value survives the round trip, so the result matches
    /// [`AttachmentRule::AttachWorld`]. The world value is never reused
    /// verbatim as the relative offset, which would move the node.
    AttachRelative,
    /// Force the world value to the parent's.
    Snap,
}

/// Per-axis attachment rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttachmentProperties {
    pub location: AttachmentRule,
    pub rotation: AttachmentRule,
    pub scale: AttachmentRule,
}

impl AttachmentProperties {
    pub const fn all(rule: AttachmentRule) -> Self {
        Self {
            location: rule,
            rotation: rule,
            scale: rule,
        }
    }

    pub const fn keep_world() -> Self {
        Self::all(AttachmentRule::AttachWorld)
    }

    pub const fn keep_relative() -> Self {
        Self::all(AttachmentRule::AttachRelative)
    }

    pub const fn snap() -> Self {
        Self::all(AttachmentRule::Snap)
    }
}

/// A node in the attachment tree.
#[derive(Debug, Clone)]
pub struct SceneComponent {
    pub(crate) name: String,
    pub(crate) transform: Transform,
    pub(crate) relative: Transform,
    pub(crate) parent: Option<SceneHandle>,
    pub(crate) children: Vec<SceneHandle>,
}

impl SceneComponent {
    pub(crate) fn new(name: String, transform: Transform) -> Self {
        Self {
            name,
            transform,
            relative: transform,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Authoritative world transform.
    pub fn world_transform(&self) -> &Transform {
        &self.transform
    }

    /// Transform relative to the attach parent. Equals the world transform
    /// while unattached.
    pub fn relative_transform(&self) -> &Transform {
        &self.relative
    }

    pub fn attach_parent(&self) -> Option<SceneHandle> {
        self.parent
    }

    /// Attached children in attachment order.
    pub fn children(&self) -> &[SceneHandle] {
        &self.children
    }

    pub fn is_attached(&self) -> bool {
        self.parent.is_some()
    }
}
