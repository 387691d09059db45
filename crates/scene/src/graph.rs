use crate::{AttachmentProperties, AttachmentRule, SceneComponent};
use cinder_common::{Rotator, Transform};
use glam::Vec3;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Stable handle to a node in a [`SceneGraph`].
    pub struct SceneHandle;
}

/// Errors from scene graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("scene component {0:?} does not exist")]
    InvalidHandle(SceneHandle),
    #[error("scene component {0:?} cannot be attached to itself")]
    SelfAttachment(SceneHandle),
    #[error("attaching {child:?} to {parent:?} would create a cycle")]
    Cycle {
        child: SceneHandle,
        parent: SceneHandle,
    },
}

/// Arena of scene components forming an attachment forest.
///
/// World transforms are authoritative. Each setter updates the world value,
/// refreshes the cached relative value for the same channel, then pushes the
/// change to attached children as a delta.
///
/// # Invariants
/// - `parent.children` contains `child` iff `child.parent == Some(parent)`.
/// - Attaching never creates a cycle.
/// - An additive setter called with an exactly zero delta changes nothing.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<SceneHandle, SceneComponent>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unattached node with the given world transform.
    pub fn create(&mut self, name: impl Into<String>, transform: Transform) -> SceneHandle {
        self.nodes.insert(SceneComponent::new(name.into(), transform))
    }

    /// Remove a node. Its children are detached and keep their world transforms.
    pub fn remove(&mut self, handle: SceneHandle) -> Result<SceneComponent, SceneError> {
        self.detach_from_component(handle)?;
        let children = self.node(handle)?.children.clone();
        for child in children {
            self.detach_from_component(child)?;
        }
        let node = self
            .nodes
            .remove(handle)
            .ok_or(SceneError::InvalidHandle(handle))?;
        tracing::debug!(name = %node.name, "removed scene component");
        Ok(node)
    }

    pub fn get(&self, handle: SceneHandle) -> Option<&SceneComponent> {
        self.nodes.get(handle)
    }

    pub fn contains(&self, handle: SceneHandle) -> bool {
        self.nodes.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SceneHandle, &SceneComponent)> {
        self.nodes.iter()
    }

    /// Nodes without an attach parent.
    pub fn roots(&self) -> impl Iterator<Item = SceneHandle> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(handle, _)| handle)
    }

    /// Pre-order walk of the subtree under `root`, paired with depth.
    pub fn depth_first(&self, root: SceneHandle) -> Result<Vec<(usize, SceneHandle)>, SceneError> {
        self.node(root)?;
        let mut out = Vec::new();
        let mut stack = vec![(0, root)];
        while let Some((depth, handle)) = stack.pop() {
            out.push((depth, handle));
            let node = self.node(handle)?;
            for &child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        Ok(out)
    }

    pub fn world_transform(&self, handle: SceneHandle) -> Result<Transform, SceneError> {
        Ok(self.node(handle)?.transform)
    }

    pub fn relative_transform(&self, handle: SceneHandle) -> Result<Transform, SceneError> {
        Ok(self.node(handle)?.relative)
    }

    pub fn attach_parent(&self, handle: SceneHandle) -> Result<Option<SceneHandle>, SceneError> {
        Ok(self.node(handle)?.parent)
    }

    /// True if `ancestor` appears anywhere above `handle`.
    pub fn is_attached_to(&self, handle: SceneHandle, ancestor: SceneHandle) -> bool {
        let mut current = self.nodes.get(handle).and_then(|n| n.parent);
        while let Some(h) = current {
            if h == ancestor {
                return true;
            }
            current = self.nodes.get(h).and_then(|n| n.parent);
        }
        false
    }

    // --- World setters ---

    pub fn set_world_location(
        &mut self,
        handle: SceneHandle,
        location: Vec3,
        add_to_current: bool,
    ) -> Result<(), SceneError> {
        let old = self.node(handle)?.transform.location;
        if add_to_current && location == Vec3::ZERO {
            return Ok(());
        }
        let new = if add_to_current { old + location } else { location };
        self.node_mut(handle)?.transform.location = new;
        self.refresh_relative_location(handle)?;

        let delta = new - old;
        if delta != Vec3::ZERO {
            self.init_new_location(handle, delta)?;
        }
        Ok(())
    }

    pub fn set_world_rotation(
        &mut self,
        handle: SceneHandle,
        rotation: Rotator,
        add_to_current: bool,
    ) -> Result<(), SceneError> {
        let old = self.node(handle)?.transform.rotation;
        if add_to_current && rotation.is_zero() {
            return Ok(());
        }
        let new = if add_to_current { old + rotation } else { rotation };
        self.node_mut(handle)?.transform.rotation = new;
        self.refresh_relative_rotation(handle)?;

        let delta = new - old;
        if !delta.is_zero() {
            self.init_new_rotation(handle, delta)?;
        }
        Ok(())
    }

    pub fn set_world_scale(
        &mut self,
        handle: SceneHandle,
        scale: Vec3,
        add_to_current: bool,
    ) -> Result<(), SceneError> {
        let old = self.node(handle)?.transform.scale;
        if add_to_current && scale == Vec3::ZERO {
            return Ok(());
        }
        let new = if add_to_current { old + scale } else { scale };
        self.node_mut(handle)?.transform.scale = new;
        self.refresh_relative_scale(handle)?;

        let delta = new - old;
        if delta != Vec3::ZERO {
            self.init_new_scale(handle, delta)?;
        }
        Ok(())
    }

    pub fn set_world_transform(
        &mut self,
        handle: SceneHandle,
        transform: Transform,
    ) -> Result<(), SceneError> {
        self.set_world_location(handle, transform.location, false)?;
        self.set_world_rotation(handle, transform.rotation, false)?;
        self.set_world_scale(handle, transform.scale, false)
    }

    // --- Relative setters ---

    /// Unattached nodes treat this exactly like [`Self::set_world_location`].
    pub fn set_relative_location(
        &mut self,
        handle: SceneHandle,
        location: Vec3,
        add_to_current: bool,
    ) -> Result<(), SceneError> {
        let node = self.node(handle)?;
        let Some(parent) = node.parent else {
            return self.set_world_location(handle, location, add_to_current);
        };
        if add_to_current && location == Vec3::ZERO {
            return Ok(());
        }
        let relative = if add_to_current {
            node.relative.location + location
        } else {
            location
        };
        let parent = self.node(parent)?.transform;
        self.node_mut(handle)?.relative.location = relative;

        let world = parent.location + parent.rotation.rotate_vector(relative);
        self.set_world_location(handle, world, false)
    }

    pub fn set_relative_rotation(
        &mut self,
        handle: SceneHandle,
        rotation: Rotator,
        add_to_current: bool,
    ) -> Result<(), SceneError> {
        let node = self.node(handle)?;
        let Some(parent) = node.parent else {
            return self.set_world_rotation(handle, rotation, add_to_current);
        };
        if add_to_current && rotation.is_zero() {
            return Ok(());
        }
        let relative = if add_to_current {
            node.relative.rotation + rotation
        } else {
            rotation
        };
        let parent = self.node(parent)?.transform;
        self.node_mut(handle)?.relative.rotation = relative;
        self.set_world_rotation(handle, parent.rotation + relative, false)
    }

    pub fn set_relative_scale(
        &mut self,
        handle: SceneHandle,
        scale: Vec3,
        add_to_current: bool,
    ) -> Result<(), SceneError> {
        let node = self.node(handle)?;
        let Some(parent) = node.parent else {
            return self.set_world_scale(handle, scale, add_to_current);
        };
        if add_to_current && scale == Vec3::ZERO {
            return Ok(());
        }
        let relative = if add_to_current {
            node.relative.scale + scale
        } else {
            scale
        };
        let parent = self.node(parent)?.transform;
        self.node_mut(handle)?.relative.scale = relative;
        self.set_world_scale(handle, parent.scale + relative, false)
    }

    pub fn set_relative_transform(
        &mut self,
        handle: SceneHandle,
        transform: Transform,
    ) -> Result<(), SceneError> {
        self.set_relative_location(handle, transform.location, false)?;
        self.set_relative_rotation(handle, transform.rotation, false)?;
        self.set_relative_scale(handle, transform.scale, false)
    }

    // --- Attachment ---

    /// Attach `child` under `parent`, detaching it from any previous parent.
    ///
    /// Each axis is then resolved with its [`AttachmentRule`]. Attaching a node
    /// to itself or to one of its own descendants is rejected and leaves the
    /// graph untouched.
    pub fn attach_to_component(
        &mut self,
        child: SceneHandle,
        parent: SceneHandle,
        props: AttachmentProperties,
    ) -> Result<(), SceneError> {
        self.node(child)?;
        self.node(parent)?;
        if child == parent {
            return Err(SceneError::SelfAttachment(child));
        }
        if self.is_attached_to(parent, child) {
            return Err(SceneError::Cycle { child, parent });
        }

        self.unlink(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        let parent_transform = self.node(parent)?.transform;

        self.refresh_relative_location(child)?;
        match props.location {
            AttachmentRule::AttachWorld => {}
            AttachmentRule::AttachRelative => {
                let relative = self.node(child)?.relative.location;
                self.set_relative_location(child, relative, false)?;
            }
            AttachmentRule::Snap => {
                self.set_world_location(child, parent_transform.location, false)?;
            }
        }

        self.refresh_relative_rotation(child)?;
        match props.rotation {
            AttachmentRule::AttachWorld => {}
            AttachmentRule::AttachRelative => {
                let relative = self.node(child)?.relative.rotation;
                self.set_relative_rotation(child, relative, false)?;
            }
            AttachmentRule::Snap => {
                self.set_world_rotation(child, parent_transform.rotation, false)?;
            }
        }

        self.refresh_relative_scale(child)?;
        match props.scale {
            AttachmentRule::AttachWorld => {}
            AttachmentRule::AttachRelative => {
                let relative = self.node(child)?.relative.scale;
                self.set_relative_scale(child, relative, false)?;
            }
            AttachmentRule::Snap => {
                self.set_world_scale(child, parent_transform.scale, false)?;
            }
        }

        tracing::debug!(
            child = %self.node(child)?.name,
            parent = %self.node(parent)?.name,
            ?props,
            "attached scene component"
        );
        Ok(())
    }

    /// Detach from the current parent, keeping the world transform.
    /// Detaching an unattached node is a no-op.
    pub fn detach_from_component(&mut self, child: SceneHandle) -> Result<(), SceneError> {
        if self.node(child)?.parent.is_none() {
            return Ok(());
        }
        self.unlink(child)?;
        let node = self.node_mut(child)?;
        node.relative = node.transform;
        tracing::debug!(child = %node.name, "detached scene component");
        Ok(())
    }

    fn unlink(&mut self, child: SceneHandle) -> Result<(), SceneError> {
        let Some(parent) = self.node_mut(child)?.parent.take() else {
            return Ok(());
        };
        let siblings = &mut self.node_mut(parent)?.children;
        if let Some(i) = siblings.iter().position(|&c| c == child) {
            siblings.remove(i);
        }
        Ok(())
    }

    // --- Cached relative values ---

    fn refresh_relative_location(&mut self, handle: SceneHandle) -> Result<(), SceneError> {
        let node = self.node(handle)?;
        let world = node.transform.location;
        let relative = match node.parent {
            Some(p) => {
                let parent = self.node(p)?.transform;
                parent.rotation.unrotate_vector(world - parent.location)
            }
            None => world,
        };
        self.node_mut(handle)?.relative.location = relative;
        Ok(())
    }

    fn refresh_relative_rotation(&mut self, handle: SceneHandle) -> Result<(), SceneError> {
        let node = self.node(handle)?;
        let world = node.transform.rotation;
        let relative = match node.parent {
            Some(p) => world - self.node(p)?.transform.rotation,
            None => world,
        };
        self.node_mut(handle)?.relative.rotation = relative;
        Ok(())
    }

    fn refresh_relative_scale(&mut self, handle: SceneHandle) -> Result<(), SceneError> {
        let node = self.node(handle)?;
        let world = node.transform.scale;
        let relative = match node.parent {
            Some(p) => world - self.node(p)?.transform.scale,
            None => world,
        };
        self.node_mut(handle)?.relative.scale = relative;
        Ok(())
    }

    // --- Propagation ---

    /// Every node below `handle` paired with its attach parent, parents
    /// before their children.
    fn descendants(
        &self,
        handle: SceneHandle,
    ) -> Result<Vec<(SceneHandle, SceneHandle)>, SceneError> {
        let mut out = Vec::new();
        let mut stack: Vec<_> = self
            .node(handle)?
            .children
            .iter()
            .rev()
            .map(|&c| (handle, c))
            .collect();
        while let Some((parent, child)) = stack.pop() {
            out.push((parent, child));
            stack.extend(self.node(child)?.children.iter().rev().map(|&c| (child, c)));
        }
        Ok(out)
    }

    /// Every descendant moves by the same delta.
    fn init_new_location(&mut self, handle: SceneHandle, delta: Vec3) -> Result<(), SceneError> {
        for (_, node) in self.descendants(handle)? {
            self.node_mut(node)?.transform.location += delta;
            self.refresh_relative_location(node)?;
        }
        Ok(())
    }

    /// Every descendant takes the same rotation delta, then re-derives its
    /// world location from its cached relative location in its parent's new
    /// orientation, so children orbit their parents.
    ///
    /// Rotators add per axis rather than compose, so a delta about several
    /// axes is not a rigid motion of a subtree whose nodes are rotated
    /// relative to each other. Each link keeps its relative transform.
    fn init_new_rotation(&mut self, handle: SceneHandle, delta: Rotator) -> Result<(), SceneError> {
        for (parent, node) in self.descendants(handle)? {
            let parent = self.node(parent)?.transform;
            let child = self.node_mut(node)?;
            child.transform.rotation += delta;
            child.transform.location =
                parent.location + parent.rotation.rotate_vector(child.relative.location);
            self.refresh_relative_rotation(node)?;
        }
        Ok(())
    }

    fn init_new_scale(&mut self, handle: SceneHandle, delta: Vec3) -> Result<(), SceneError> {
        for (_, node) in self.descendants(handle)? {
            self.node_mut(node)?.transform.scale += delta;
            self.refresh_relative_scale(node)?;
        }
        Ok(())
    }

    fn node(&self, handle: SceneHandle) -> Result<&SceneComponent, SceneError> {
        self.nodes
            .get(handle)
            .ok_or(SceneError::InvalidHandle(handle))
    }

    fn node_mut(&mut self, handle: SceneHandle) -> Result<&mut SceneComponent, SceneError> {
        self.nodes
            .get_mut(handle)
            .ok_or(SceneError::InvalidHandle(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn at(location: Vec3) -> Transform {
        Transform::from_location(location)
    }

    /// Every attached node's relative transform composed with its parent
    /// reproduces its world transform.
    fn assert_consistent(graph: &SceneGraph) {
        for (_, node) in graph.iter() {
            let Some(p) = node.attach_parent() else {
                assert_eq!(node.relative_transform(), node.world_transform());
                continue;
            };
            let parent = graph.world_transform(p).unwrap();
            let rel = node.relative_transform();
            let world = node.world_transform();
            let location = parent.location + parent.rotation.rotate_vector(rel.location);
            assert!(
                location.abs_diff_eq(world.location, EPS),
                "{}: {location} vs {}",
                node.name(),
                world.location
            );
            assert!((parent.rotation + rel.rotation).equals(world.rotation, EPS));
            assert!((parent.scale + rel.scale).abs_diff_eq(world.scale, EPS));
        }
    }

    fn family() -> (SceneGraph, SceneHandle, SceneHandle, SceneHandle) {
        let mut graph = SceneGraph::new();
        let parent = graph.create("parent", Transform::default());
        let child = graph.create("child", at(Vec3::new(5.0, 0.0, 0.0)));
        let grandchild = graph.create("grandchild", at(Vec3::new(5.0, 0.0, 2.0)));
        graph
            .attach_to_component(child, parent, AttachmentProperties::keep_world())
            .unwrap();
        graph
            .attach_to_component(grandchild, child, AttachmentProperties::keep_world())
            .unwrap();
        (graph, parent, child, grandchild)
    }

    #[test]
    fn create_is_unattached() {
        let mut graph = SceneGraph::new();
        let h = graph.create("node", at(Vec3::ONE));
        let node = graph.get(h).unwrap();
        assert!(!node.is_attached());
        assert_eq!(node.relative_transform(), node.world_transform());
        assert_eq!(graph.roots().count(), 1);
    }

    #[test]
    fn attach_relative_preserves_world_pose() {
        let mut graph = SceneGraph::new();
        let parent = graph.create(
            "parent",
            Transform::new(
                Vec3::new(1.0, 2.0, 3.0),
                Rotator::new(0.0, 45.0, 0.0),
                Vec3::splat(2.0),
            ),
        );
        let before = Transform::new(
            Vec3::new(4.0, -1.0, 7.0),
            Rotator::new(10.0, 20.0, 0.0),
            Vec3::ONE,
        );
        let child = graph.create("child", before);

        graph
            .attach_to_component(child, parent, AttachmentProperties::keep_relative())
            .unwrap();

        let after = graph.world_transform(child).unwrap();
        assert!(after.equals(&before, EPS));

        let rel = graph.relative_transform(child).unwrap();
        let expected = Rotator::new(0.0, 45.0, 0.0).unrotate_vector(Vec3::new(3.0, -3.0, 4.0));
        assert!(rel.location.abs_diff_eq(expected, EPS));
        assert!(rel.rotation.equals(Rotator::new(10.0, -25.0, 0.0), EPS));
        assert!(rel.scale.abs_diff_eq(Vec3::splat(-1.0), EPS));
        assert_consistent(&graph);
    }

    #[test]
    fn attach_relative_lands_where_attach_world_does() {
        let parent_pose = Transform::new(
            Vec3::new(2.0, -1.0, 4.0),
            Rotator::new(20.0, -35.0, 10.0),
            Vec3::splat(1.5),
        );
        let child_pose = Transform::new(
            Vec3::new(-3.0, 5.0, 1.0),
            Rotator::new(-5.0, 60.0, 0.0),
            Vec3::new(1.0, 2.0, 1.0),
        );
        let attach = |props| {
            let mut graph = SceneGraph::new();
            let parent = graph.create("parent", parent_pose);
            let child = graph.create("child", child_pose);
            graph.attach_to_component(child, parent, props).unwrap();
            (
                graph.world_transform(child).unwrap(),
                graph.relative_transform(child).unwrap(),
            )
        };

        let (world_a, rel_a) = attach(AttachmentProperties::keep_relative());
        let (world_b, rel_b) = attach(AttachmentProperties::keep_world());
        assert!(world_a.equals(&child_pose, EPS));
        assert!(world_a.equals(&world_b, EPS));
        assert!(rel_a.equals(&rel_b, EPS));
        // The old world location is not taken as the offset.
        assert!(!rel_a.location.abs_diff_eq(child_pose.location, 0.1));
    }

    #[test]
    fn attach_world_keeps_world_and_derives_relative() {
        let mut graph = SceneGraph::new();
        let parent = graph.create("parent", at(Vec3::new(10.0, 0.0, 0.0)));
        let child = graph.create("child", at(Vec3::new(12.0, 0.0, 0.0)));
        graph
            .attach_to_component(child, parent, AttachmentProperties::keep_world())
            .unwrap();
        assert_eq!(graph.world_transform(child).unwrap().location, Vec3::new(12.0, 0.0, 0.0));
        assert!(
            graph
                .relative_transform(child)
                .unwrap()
                .location
                .abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), EPS)
        );
        assert_consistent(&graph);
    }

    #[test]
    fn snap_matches_parent_on_all_axes() {
        let mut graph = SceneGraph::new();
        let parent_pose = Transform::new(
            Vec3::new(-3.0, 8.0, 1.0),
            Rotator::new(15.0, -60.0, 5.0),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let parent = graph.create("parent", parent_pose);
        let child = graph.create(
            "child",
            Transform::new(Vec3::splat(9.0), Rotator::splat(33.0), Vec3::splat(0.5)),
        );
        graph
            .attach_to_component(child, parent, AttachmentProperties::snap())
            .unwrap();

        let world = graph.world_transform(child).unwrap();
        assert!(world.equals(&parent_pose, EPS));
        let rel = graph.relative_transform(child).unwrap();
        assert!(rel.location.abs_diff_eq(Vec3::ZERO, EPS));
        assert!(rel.rotation.is_nearly_zero(EPS));
        assert!(rel.scale.abs_diff_eq(Vec3::ZERO, EPS));
        assert_consistent(&graph);
    }

    #[test]
    fn mixed_rules_apply_per_axis() {
        let mut graph = SceneGraph::new();
        let parent = graph.create(
            "parent",
            Transform::new(Vec3::new(1.0, 1.0, 1.0), Rotator::new(0.0, 30.0, 0.0), Vec3::ONE),
        );
        let child = graph.create(
            "child",
            Transform::new(Vec3::new(4.0, 0.0, 0.0), Rotator::ZERO, Vec3::splat(3.0)),
        );
        let props = AttachmentProperties {
            location: AttachmentRule::AttachWorld,
            rotation: AttachmentRule::Snap,
            scale: AttachmentRule::AttachRelative,
        };
        graph.attach_to_component(child, parent, props).unwrap();
        let world = graph.world_transform(child).unwrap();
        assert!(world.location.abs_diff_eq(Vec3::new(4.0, 0.0, 0.0), EPS));
        assert!(world.rotation.equals(Rotator::new(0.0, 30.0, 0.0), EPS));
        assert!(world.scale.abs_diff_eq(Vec3::splat(3.0), EPS));
        assert_consistent(&graph);
    }

    #[test]
    fn zero_additive_delta_changes_nothing() {
        let (mut graph, parent, child, grandchild) = family();
        let snapshot: Vec<_> = [parent, child, grandchild]
            .iter()
            .map(|&h| {
                (
                    graph.world_transform(h).unwrap(),
                    graph.relative_transform(h).unwrap(),
                )
            })
            .collect();

        graph.set_world_location(parent, Vec3::ZERO, true).unwrap();
        graph.set_world_rotation(parent, Rotator::ZERO, true).unwrap();
        graph.set_world_scale(parent, Vec3::ZERO, true).unwrap();
        graph.set_relative_location(child, Vec3::ZERO, true).unwrap();

        for (i, &h) in [parent, child, grandchild].iter().enumerate() {
            assert_eq!(graph.world_transform(h).unwrap(), snapshot[i].0);
            assert_eq!(graph.relative_transform(h).unwrap(), snapshot[i].1);
        }
    }

    #[test]
    fn parent_rotation_orbits_child() {
        let mut graph = SceneGraph::new();
        let parent = graph.create("parent", Transform::default());
        let child = graph.create("child", Transform::default());
        graph
            .attach_to_component(child, parent, AttachmentProperties::keep_world())
            .unwrap();
        graph
            .set_relative_location(child, Vec3::new(5.0, 0.0, 0.0), false)
            .unwrap();
        assert_eq!(graph.world_transform(child).unwrap().location, Vec3::new(5.0, 0.0, 0.0));

        graph
            .set_world_rotation(parent, Rotator::new(0.0, 90.0, 0.0), false)
            .unwrap();

        let world = graph.world_transform(child).unwrap();
        assert!(world.location.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), EPS));
        assert!(world.rotation.equals(Rotator::new(0.0, 90.0, 0.0), EPS));
        assert!(
            graph
                .relative_transform(child)
                .unwrap()
                .location
                .abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), EPS)
        );
        assert_consistent(&graph);
    }

    #[test]
    fn grandchild_follows_root_yaw() {
        let (mut graph, parent, child, grandchild) = family();
        graph
            .set_world_rotation(parent, Rotator::new(0.0, 90.0, 0.0), false)
            .unwrap();

        // Yaw 90 about the origin takes (5,0,2) to (2,0,-5).
        let gc = graph.world_transform(grandchild).unwrap();
        assert!(gc.location.abs_diff_eq(Vec3::new(2.0, 0.0, -5.0), EPS));
        assert!(gc.rotation.equals(Rotator::new(0.0, 90.0, 0.0), EPS));
        let c = graph.world_transform(child).unwrap();
        assert!(c.location.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), EPS));
        assert_consistent(&graph);
    }

    #[test]
    fn multi_axis_rotation_adds_per_axis_down_the_chain() {
        let mut graph = SceneGraph::new();
        let root = graph.create("root", Transform::default());
        let arm = graph.create(
            "arm",
            Transform::new(Vec3::ZERO, Rotator::new(0.0, 90.0, 0.0), Vec3::ONE),
        );
        let tip = graph.create("tip", Transform::default());
        graph
            .attach_to_component(arm, root, AttachmentProperties::keep_world())
            .unwrap();
        graph
            .attach_to_component(tip, arm, AttachmentProperties::keep_world())
            .unwrap();
        graph
            .set_relative_location(tip, Vec3::new(1.0, 0.0, 0.0), false)
            .unwrap();
        assert!(
            graph
                .world_transform(tip)
                .unwrap()
                .location
                .abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), EPS)
        );
        let rel_arm = graph.relative_transform(arm).unwrap();
        let rel_tip = graph.relative_transform(tip).unwrap();

        graph
            .set_world_rotation(root, Rotator::new(90.0, 0.0, 0.0), false)
            .unwrap();

        // The arm's rotator becomes (90, 90, 0), which still maps its local +X
        // onto -Z. A rigid pitch of the whole chain would put the tip at +Y.
        let arm_world = graph.world_transform(arm).unwrap();
        assert!(arm_world.rotation.equals(Rotator::new(90.0, 90.0, 0.0), EPS));
        let tip_world = graph.world_transform(tip).unwrap();
        assert!(tip_world.location.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), EPS));
        assert!(tip_world.rotation.equals(Rotator::new(90.0, 0.0, 0.0), EPS));

        assert!(graph.relative_transform(arm).unwrap().equals(&rel_arm, EPS));
        assert!(graph.relative_transform(tip).unwrap().equals(&rel_tip, EPS));
        assert_consistent(&graph);
    }

    #[test]
    fn deep_chains_propagate_without_recursion() {
        const DEPTH: usize = 5_000;
        let mut graph = SceneGraph::new();
        let root = graph.create("root", Transform::default());
        let mut leaf = root;
        for i in 0..DEPTH {
            let node = graph.create(
                format!("link_{i}"),
                at(Vec3::new((i + 1) as f32, 0.0, 0.0)),
            );
            graph
                .attach_to_component(node, leaf, AttachmentProperties::keep_world())
                .unwrap();
            leaf = node;
        }

        graph
            .set_world_location(root, Vec3::new(0.0, 1.0, 0.0), true)
            .unwrap();
        assert!(
            graph
                .world_transform(leaf)
                .unwrap()
                .location
                .abs_diff_eq(Vec3::new(DEPTH as f32, 1.0, 0.0), 1e-2)
        );

        graph
            .set_world_rotation(root, Rotator::new(0.0, 90.0, 0.0), false)
            .unwrap();
        let world = graph.world_transform(leaf).unwrap();
        assert!(world.location.abs_diff_eq(Vec3::new(0.0, 1.0, -(DEPTH as f32)), 1e-1));
        assert!(world.rotation.equals(Rotator::new(0.0, 90.0, 0.0), EPS));

        graph.set_world_scale(root, Vec3::ONE, true).unwrap();
        assert_eq!(graph.world_transform(leaf).unwrap().scale, Vec3::splat(2.0));
        assert_eq!(graph.depth_first(root).unwrap().len(), DEPTH + 1);
    }

    #[test]
    fn translation_cascades_with_unchanged_relatives() {
        let (mut graph, parent, child, grandchild) = family();
        let rel_child = graph.relative_transform(child).unwrap();
        let rel_gc = graph.relative_transform(grandchild).unwrap();

        graph
            .set_world_location(parent, Vec3::new(0.0, 3.0, 0.0), true)
            .unwrap();

        assert_eq!(graph.world_transform(child).unwrap().location, Vec3::new(5.0, 3.0, 0.0));
        assert_eq!(
            graph.world_transform(grandchild).unwrap().location,
            Vec3::new(5.0, 3.0, 2.0)
        );
        assert!(graph.relative_transform(child).unwrap().equals(&rel_child, EPS));
        assert!(graph.relative_transform(grandchild).unwrap().equals(&rel_gc, EPS));
        assert_consistent(&graph);
    }

    #[test]
    fn scale_cascades_additively() {
        let (mut graph, parent, child, grandchild) = family();
        graph.set_world_scale(parent, Vec3::splat(3.0), false).unwrap();
        assert_eq!(graph.world_transform(child).unwrap().scale, Vec3::splat(3.0));
        assert_eq!(graph.world_transform(grandchild).unwrap().scale, Vec3::splat(3.0));
        // Scale does not stretch child offsets.
        assert_eq!(graph.world_transform(child).unwrap().location, Vec3::new(5.0, 0.0, 0.0));
        assert_consistent(&graph);
    }

    #[test]
    fn relative_setters_use_parent_frame() {
        let mut graph = SceneGraph::new();
        let parent = graph.create(
            "parent",
            Transform::new(Vec3::new(10.0, 0.0, 0.0), Rotator::new(0.0, 90.0, 0.0), Vec3::ONE),
        );
        let child = graph.create("child", Transform::default());
        graph
            .attach_to_component(child, parent, AttachmentProperties::snap())
            .unwrap();

        graph
            .set_relative_location(child, Vec3::new(1.0, 0.0, 0.0), false)
            .unwrap();
        assert!(
            graph
                .world_transform(child)
                .unwrap()
                .location
                .abs_diff_eq(Vec3::new(10.0, 0.0, -1.0), EPS)
        );

        graph
            .set_relative_location(child, Vec3::new(1.0, 0.0, 0.0), true)
            .unwrap();
        assert!(
            graph
                .world_transform(child)
                .unwrap()
                .location
                .abs_diff_eq(Vec3::new(10.0, 0.0, -2.0), EPS)
        );

        graph
            .set_relative_rotation(child, Rotator::new(0.0, 10.0, 0.0), false)
            .unwrap();
        assert!(
            graph
                .world_transform(child)
                .unwrap()
                .rotation
                .equals(Rotator::new(0.0, 100.0, 0.0), EPS)
        );

        graph
            .set_relative_scale(child, Vec3::splat(0.5), false)
            .unwrap();
        assert!(
            graph
                .world_transform(child)
                .unwrap()
                .scale
                .abs_diff_eq(Vec3::splat(1.5), EPS)
        );
        assert_consistent(&graph);
    }

    #[test]
    fn relative_setters_on_unattached_node_set_world() {
        let mut graph = SceneGraph::new();
        let h = graph.create("solo", at(Vec3::ONE));
        graph.set_relative_location(h, Vec3::ONE, true).unwrap();
        assert_eq!(graph.world_transform(h).unwrap().location, Vec3::splat(2.0));
        graph
            .set_relative_rotation(h, Rotator::new(0.0, 5.0, 0.0), false)
            .unwrap();
        assert_eq!(graph.world_transform(h).unwrap().rotation, Rotator::new(0.0, 5.0, 0.0));
        assert_consistent(&graph);
    }

    #[test]
    fn set_world_transform_moves_subtree() {
        let (mut graph, parent, child, _) = family();
        graph
            .set_world_transform(
                parent,
                Transform::new(Vec3::new(0.0, 0.0, 1.0), Rotator::new(0.0, 180.0, 0.0), Vec3::ONE),
            )
            .unwrap();
        assert!(
            graph
                .world_transform(child)
                .unwrap()
                .location
                .abs_diff_eq(Vec3::new(-5.0, 0.0, 1.0), EPS)
        );
        assert_consistent(&graph);
    }

    #[test]
    fn rejects_self_attachment_and_cycles() {
        let (mut graph, parent, child, grandchild) = family();
        assert_eq!(
            graph.attach_to_component(parent, parent, AttachmentProperties::default()),
            Err(SceneError::SelfAttachment(parent))
        );
        assert_eq!(
            graph.attach_to_component(parent, grandchild, AttachmentProperties::default()),
            Err(SceneError::Cycle {
                child: parent,
                parent: grandchild
            })
        );
        // Rejected attaches leave the graph untouched.
        assert_eq!(graph.attach_parent(parent).unwrap(), None);
        assert_eq!(graph.attach_parent(grandchild).unwrap(), Some(child));
        assert_consistent(&graph);
    }

    #[test]
    fn stale_handles_are_errors() {
        let mut graph = SceneGraph::new();
        let h = graph.create("gone", Transform::default());
        graph.remove(h).unwrap();
        assert_eq!(
            graph.set_world_location(h, Vec3::ONE, false),
            Err(SceneError::InvalidHandle(h))
        );
        assert!(graph.world_transform(h).is_err());
        assert!(!graph.contains(h));
    }

    #[test]
    fn reattach_moves_between_parents() {
        let (mut graph, parent, child, grandchild) = family();
        graph
            .attach_to_component(grandchild, parent, AttachmentProperties::keep_world())
            .unwrap();
        assert!(!graph.get(child).unwrap().children().contains(&grandchild));
        assert_eq!(graph.get(parent).unwrap().children(), &[child, grandchild]);
        assert_eq!(
            graph.world_transform(grandchild).unwrap().location,
            Vec3::new(5.0, 0.0, 2.0)
        );
        assert_consistent(&graph);
    }

    #[test]
    fn detach_keeps_world() {
        let (mut graph, parent, child, grandchild) = family();
        graph
            .set_world_rotation(parent, Rotator::new(0.0, 45.0, 0.0), false)
            .unwrap();
        let before = graph.world_transform(child).unwrap();
        graph.detach_from_component(child).unwrap();
        assert_eq!(graph.world_transform(child).unwrap(), before);
        assert!(graph.get(parent).unwrap().children().is_empty());
        assert!(graph.is_attached_to(grandchild, child));
        assert!(!graph.is_attached_to(grandchild, parent));
        // Idempotent.
        graph.detach_from_component(child).unwrap();
        assert_consistent(&graph);
    }

    #[test]
    fn remove_orphans_children() {
        let (mut graph, parent, child, grandchild) = family();
        graph
            .set_world_location(parent, Vec3::new(1.0, 0.0, 0.0), false)
            .unwrap();
        let removed = graph.remove(child).unwrap();
        assert_eq!(removed.name(), "child");
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.attach_parent(grandchild).unwrap(), None);
        assert_eq!(
            graph.world_transform(grandchild).unwrap().location,
            Vec3::new(6.0, 0.0, 2.0)
        );
        assert!(graph.get(parent).unwrap().children().is_empty());
        assert_consistent(&graph);
    }

    #[test]
    fn depth_first_is_preorder() {
        let (mut graph, parent, child, grandchild) = family();
        let sibling = graph.create("sibling", Transform::default());
        graph
            .attach_to_component(sibling, parent, AttachmentProperties::keep_world())
            .unwrap();
        let walk = graph.depth_first(parent).unwrap();
        assert_eq!(walk, vec![(0, parent), (1, child), (2, grandchild), (1, sibling)]);
    }
}
