//! Scene module - nodes and the objects attached to them.
//!
//! Provides the scene node hierarchy used as a pose provider, the shared
//! derived-pose cache, the `MovableObject` attachment contract, and lights.

mod node;
mod pose_cache;
mod movable_object;
mod light;

pub use node::{PoseProvider, SceneNode};
pub use pose_cache::{Cached, DerivedPose, PoseCache, PoseComponent};
pub use movable_object::{
    Attachment, MovableCore, MovableFlags, MovableObject, RenderQueue, RenderQueueEntry,
};
pub use light::{Light, LightType};
