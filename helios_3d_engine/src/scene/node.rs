/// SceneNode - a pose provider in a parent/child hierarchy.
///
/// Nodes are shared as `Arc<SceneNode>`. A parent owns its children through
/// strong references; children and attached objects only keep `Weak` back
/// references, so the hierarchy never forms an ownership cycle.
///
/// A node's world pose is computed on demand by walking up the parent chain:
/// `orientation = parent_orientation * local_orientation` and
/// `position = parent_orientation * local_position + parent_position`.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use glam::{Mat4, Quat, Vec3};

/// Anything that exposes a world-space pose.
pub trait PoseProvider {
    fn derived_position(&self) -> Vec3;
    fn derived_orientation(&self) -> Quat;
}

#[derive(Debug, Clone, Copy)]
struct LocalPose {
    position: Vec3,
    orientation: Quat,
}

/// A node in the scene hierarchy.
#[derive(Debug)]
pub struct SceneNode {
    name: String,
    pose: Mutex<LocalPose>,
    parent: Mutex<Weak<SceneNode>>,
    children: Mutex<Vec<Arc<SceneNode>>>,
    /// Root of a scene graph: always in the scene
    is_root: bool,
    /// Set for tag points: the node carrying the entity the tag point belongs to
    tag_owner: Option<Weak<SceneNode>>,
}

/// Lock ignoring poisoning: node state is plain data and stays consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SceneNode {
    fn build(name: &str, is_root: bool, tag_owner: Option<Weak<SceneNode>>) -> Self {
        Self {
            name: name.to_string(),
            pose: Mutex::new(LocalPose { position: Vec3::ZERO, orientation: Quat::IDENTITY }),
            parent: Mutex::new(Weak::new()),
            children: Mutex::new(Vec::new()),
            is_root,
            tag_owner,
        }
    }

    /// Detached node at the origin.
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, false, None))
    }

    /// Scene graph root. Everything below it is "in the scene".
    pub fn new_root(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, true, None))
    }

    /// Tag point bound to `owner`.
    ///
    /// Its pose follows `owner`, but it is not listed among the owner's
    /// children and is never part of the scene graph itself. Objects attached
    /// to it are in the scene exactly when `owner` is.
    pub fn new_tag_point(name: &str, owner: &Arc<SceneNode>) -> Arc<Self> {
        let node = Self::build(name, false, Some(Arc::downgrade(owner)));
        *lock(&node.parent) = Arc::downgrade(owner);
        Arc::new(node)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_tag_point(&self) -> bool {
        self.tag_owner.is_some()
    }

    /// Owner of a tag point (`None` for ordinary nodes or a dropped owner).
    pub fn tag_owner(&self) -> Option<Arc<SceneNode>> {
        self.tag_owner.as_ref().and_then(Weak::upgrade)
    }

    // ===== LOCAL POSE =====

    pub fn position(&self) -> Vec3 {
        lock(&self.pose).position
    }

    pub fn orientation(&self) -> Quat {
        lock(&self.pose).orientation
    }

    pub fn set_position(&self, position: Vec3) {
        lock(&self.pose).position = position;
    }

    pub fn set_orientation(&self, orientation: Quat) {
        lock(&self.pose).orientation = orientation.normalize();
    }

    /// Move by `delta` in parent space.
    pub fn translate(&self, delta: Vec3) {
        lock(&self.pose).position += delta;
    }

    /// Rotate around the node's own axes.
    pub fn rotate(&self, rotation: Quat) {
        let mut pose = lock(&self.pose);
        pose.orientation = (pose.orientation * rotation).normalize();
    }

    // ===== HIERARCHY =====

    pub fn parent(&self) -> Option<Arc<SceneNode>> {
        lock(&self.parent).upgrade()
    }

    pub fn children(&self) -> Vec<Arc<SceneNode>> {
        lock(&self.children).clone()
    }

    pub fn child_count(&self) -> usize {
        lock(&self.children).len()
    }

    /// Create a child node with the given local pose.
    pub fn create_child(self: &Arc<Self>, name: &str, position: Vec3, orientation: Quat) -> Arc<SceneNode> {
        let child = SceneNode::new(name);
        child.set_position(position);
        child.set_orientation(orientation);
        self.add_child(child.clone());
        child
    }

    /// Reparent `child` under this node, detaching it from its previous parent.
    pub fn add_child(self: &Arc<Self>, child: Arc<SceneNode>) {
        if let Some(previous) = child.parent() {
            previous.detach_child(&child);
        }
        *lock(&child.parent) = Arc::downgrade(self);
        lock(&self.children).push(child);
    }

    /// Detach and return the first child named `name`.
    pub fn remove_child(&self, name: &str) -> Option<Arc<SceneNode>> {
        let mut children = lock(&self.children);
        let index = children.iter().position(|c| c.name() == name)?;
        let child = children.remove(index);
        *lock(&child.parent) = Weak::new();
        Some(child)
    }

    /// Drop `child` itself from the child list; siblings sharing its name stay.
    fn detach_child(&self, child: &Arc<SceneNode>) {
        lock(&self.children).retain(|c| !Arc::ptr_eq(c, child));
    }

    /// True if the parent chain ends at a scene root.
    pub fn is_in_scene_graph(&self) -> bool {
        if self.is_root {
            return true;
        }
        if self.is_tag_point() {
            return false;
        }
        self.parent().is_some_and(|parent| parent.is_in_scene_graph())
    }

    /// World transform as a matrix.
    pub fn full_transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.derived_orientation(), self.derived_position())
    }
}

impl PoseProvider for SceneNode {
    fn derived_position(&self) -> Vec3 {
        let local = *lock(&self.pose);
        match self.parent() {
            Some(parent) => parent.derived_orientation() * local.position + parent.derived_position(),
            None => local.position,
        }
    }

    fn derived_orientation(&self) -> Quat {
        let local = lock(&self.pose).orientation;
        match self.parent() {
            Some(parent) => parent.derived_orientation() * local,
            None => local,
        }
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
