/// MovableObject - the capability set shared by objects attachable to scene nodes.
///
/// Cameras, lights and renderables all attach to a `SceneNode` through a
/// non-owning `Attachment`. Their "in scene" and world-transform queries
/// chain through that link.

use std::sync::{Arc, Weak};
use bitflags::bitflags;
use glam::Mat4;
use crate::camera::Camera;
use crate::math::AABB;
use super::node::SceneNode;

// ===== ATTACHMENT =====

/// Weak link from an object to the node it is attached to.
#[derive(Debug, Clone, Default)]
pub struct Attachment {
    parent: Option<Weak<SceneNode>>,
    is_tag_point: bool,
}

impl Attachment {
    /// Record a new parent (or `None` to detach).
    pub fn notify_attached(&mut self, node: Option<&Arc<SceneNode>>, is_tag_point: bool) {
        self.parent = node.map(Arc::downgrade);
        self.is_tag_point = node.is_some() && is_tag_point;
    }

    pub fn notify_detached(&mut self) {
        self.notify_attached(None, false);
    }

    /// Parent node, or `None` if detached or the node was dropped.
    pub fn parent_node(&self) -> Option<Arc<SceneNode>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_attached(&self) -> bool {
        self.parent_node().is_some()
    }

    pub fn is_tag_point(&self) -> bool {
        self.is_tag_point
    }

    /// Attached to a node that is part of the scene graph.
    ///
    /// Objects on a tag point are in the scene when the tag point's owner is.
    pub fn is_in_scene(&self) -> bool {
        match self.parent_node() {
            None => false,
            Some(node) if self.is_tag_point => {
                node.tag_owner().is_some_and(|owner| owner.is_in_scene_graph())
            }
            Some(node) => node.is_in_scene_graph(),
        }
    }

    /// World transform of the parent node (identity when detached).
    pub fn parent_full_transform(&self) -> Mat4 {
        self.parent_node()
            .map(|node| node.full_transform())
            .unwrap_or(Mat4::IDENTITY)
    }
}

// ===== FLAGS =====

bitflags! {
    /// Per-object state bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MovableFlags: u32 {
        const VISIBLE      = 1 << 0;
        const CAST_SHADOWS = 1 << 1;
    }
}

/// State every movable object carries.
#[derive(Debug, Clone)]
pub struct MovableCore {
    name: String,
    pub attachment: Attachment,
    pub flags: MovableFlags,
    pub query_flags: u32,
}

impl MovableCore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attachment: Attachment::default(),
            flags: MovableFlags::VISIBLE | MovableFlags::CAST_SHADOWS,
            query_flags: u32::MAX,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// ===== RENDER QUEUE =====

/// One object queued for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderQueueEntry {
    pub name: String,
    pub group: u8,
}

/// Objects collected for the current frame, by render group.
#[derive(Debug, Default)]
pub struct RenderQueue {
    entries: Vec<RenderQueueEntry>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, group: u8) {
        self.entries.push(RenderQueueEntry { name: name.to_string(), group });
    }

    pub fn entries(&self) -> &[RenderQueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ===== TRAIT =====

/// Capabilities of an object that can be attached to a scene node.
pub trait MovableObject {
    fn core(&self) -> &MovableCore;
    fn core_mut(&mut self) -> &mut MovableCore;

    /// Type tag, e.g. "Camera" or "Light"
    fn movable_type(&self) -> &'static str;

    /// Local-space bounds; `None` is the null box.
    fn bounding_box(&self) -> Option<AABB>;

    fn bounding_radius(&self) -> f32;

    /// Called once per frame with the camera about to render.
    fn notify_current_camera(&mut self, _camera: &mut Camera) {}

    /// Add renderables to the queue.
    fn update_render_queue(&self, queue: &mut RenderQueue);

    // ===== PROVIDED =====

    fn name(&self) -> &str {
        self.core().name()
    }

    fn notify_attached(&mut self, node: Option<&Arc<SceneNode>>, is_tag_point: bool) {
        self.core_mut().attachment.notify_attached(node, is_tag_point);
    }

    /// Attach to `node`, taking the tag point flag from the node itself.
    fn attach_to(&mut self, node: &Arc<SceneNode>) {
        self.notify_attached(Some(node), node.is_tag_point());
    }

    fn detach(&mut self) {
        self.core_mut().attachment.notify_detached();
    }

    fn parent_node(&self) -> Option<Arc<SceneNode>> {
        self.core().attachment.parent_node()
    }

    fn is_attached(&self) -> bool {
        self.core().attachment.is_attached()
    }

    fn is_in_scene(&self) -> bool {
        self.core().attachment.is_in_scene()
    }

    fn is_visible(&self) -> bool {
        self.core().flags.contains(MovableFlags::VISIBLE)
    }

    fn set_visible(&mut self, visible: bool) {
        self.core_mut().flags.set(MovableFlags::VISIBLE, visible);
    }

    fn casts_shadows(&self) -> bool {
        self.core().flags.contains(MovableFlags::CAST_SHADOWS)
    }

    fn set_cast_shadows(&mut self, enabled: bool) {
        self.core_mut().flags.set(MovableFlags::CAST_SHADOWS, enabled);
    }

    fn query_flags(&self) -> u32 {
        self.core().query_flags
    }

    fn set_query_flags(&mut self, flags: u32) {
        self.core_mut().query_flags = flags;
    }

    /// Bounds in world space, through the parent node's transform.
    fn world_bounding_box(&self) -> Option<AABB> {
        let transform = self.core().attachment.parent_full_transform();
        self.bounding_box().map(|aabb| aabb.transformed(&transform))
    }
}

#[cfg(test)]
#[path = "movable_object_tests.rs"]
mod tests;
