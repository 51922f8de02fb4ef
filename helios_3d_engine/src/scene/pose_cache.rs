/// Lazily recomputed world-space pose.
///
/// Cameras and lights keep a local position plus a local rotation (an
/// orientation for cameras, a direction for lights) and derive their
/// world-space values from an optional parent pose provider. The parent is
/// polled: a snapshot of its last seen derived pose detects parent motion
/// without any push notification.

use std::fmt::Debug;
use glam::{Quat, Vec3};
use super::node::PoseProvider;

// ===== CACHED =====

/// A cached value that is either up to date or must be recomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cached<T> {
    Clean(T),
    Dirty,
}

impl<T> Cached<T> {
    pub fn is_dirty(&self) -> bool {
        matches!(self, Cached::Dirty)
    }

    pub fn invalidate(&mut self) {
        *self = Cached::Dirty;
    }

    /// Cached value, if clean.
    pub fn get(&self) -> Option<&T> {
        match self {
            Cached::Clean(value) => Some(value),
            Cached::Dirty => None,
        }
    }

    /// Return the cached value, computing and storing it first if dirty.
    pub fn get_or_update(&mut self, compute: impl FnOnce() -> T) -> &T {
        if let Cached::Dirty = self {
            *self = Cached::Clean(compute());
        }
        match self {
            Cached::Clean(value) => value,
            Cached::Dirty => unreachable!("cache filled above"),
        }
    }
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Cached::Dirty
    }
}

// ===== POSE COMPONENT =====

/// Rotational part of a pose, composed with a parent orientation.
pub trait PoseComponent: Copy + PartialEq + Debug {
    /// World value of `local` under a parent with world orientation `parent`.
    fn compose(parent: Quat, local: Self) -> Self;
}

impl PoseComponent for Quat {
    fn compose(parent: Quat, local: Self) -> Self {
        parent * local
    }
}

impl PoseComponent for Vec3 {
    fn compose(parent: Quat, local: Self) -> Self {
        parent * local
    }
}

// ===== POSE CACHE =====

/// World-space position and rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedPose<R> {
    pub position: Vec3,
    pub rotation: R,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ParentSnapshot {
    position: Vec3,
    orientation: Quat,
}

/// Local pose plus its cached world-space counterpart.
#[derive(Debug, Clone)]
pub struct PoseCache<R: PoseComponent> {
    local_position: Vec3,
    local_rotation: R,
    derived: Cached<DerivedPose<R>>,
    last_parent: Option<ParentSnapshot>,
}

impl<R: PoseComponent> PoseCache<R> {
    pub fn new(local_position: Vec3, local_rotation: R) -> Self {
        Self {
            local_position,
            local_rotation,
            derived: Cached::Dirty,
            last_parent: None,
        }
    }

    pub fn local_position(&self) -> Vec3 {
        self.local_position
    }

    pub fn set_local_position(&mut self, position: Vec3) {
        self.local_position = position;
        self.derived.invalidate();
    }

    pub fn local_rotation(&self) -> R {
        self.local_rotation
    }

    pub fn set_local_rotation(&mut self, rotation: R) {
        self.local_rotation = rotation;
        self.derived.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.derived.invalidate();
    }

    pub fn is_dirty(&self) -> bool {
        self.derived.is_dirty()
    }

    /// Bring the derived pose up to date.
    ///
    /// Returns `true` when the derived pose was recomputed, either because a
    /// local mutator ran or because the parent's derived pose differs from
    /// the last snapshot (including attach and detach).
    pub fn update(&mut self, parent: Option<&dyn PoseProvider>) -> bool {
        self.refresh(parent).0
    }

    /// Derived pose after bringing it up to date.
    pub fn derived(&mut self, parent: Option<&dyn PoseProvider>) -> DerivedPose<R> {
        self.refresh(parent).1
    }

    /// `update` and `derived` in one parent poll.
    pub fn refresh(&mut self, parent: Option<&dyn PoseProvider>) -> (bool, DerivedPose<R>) {
        let snapshot = parent.map(|p| ParentSnapshot {
            position: p.derived_position(),
            orientation: p.derived_orientation(),
        });

        if let (Cached::Clean(pose), true) = (self.derived, snapshot == self.last_parent) {
            return (false, pose);
        }

        let pose = match snapshot {
            Some(parent) => DerivedPose {
                position: parent.orientation * self.local_position + parent.position,
                rotation: R::compose(parent.orientation, self.local_rotation),
            },
            None => DerivedPose {
                position: self.local_position,
                rotation: self.local_rotation,
            },
        };

        self.derived = Cached::Clean(pose);
        self.last_parent = snapshot;
        (true, pose)
    }

    /// Last computed derived pose, without revalidating against the parent.
    pub fn last_derived(&self) -> Option<DerivedPose<R>> {
        self.derived.get().copied()
    }
}

#[cfg(test)]
#[path = "pose_cache_tests.rs"]
mod tests;
