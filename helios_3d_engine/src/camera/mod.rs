//! Camera module - viewpoint, frustum and viewport.
//!
//! Cameras derive their view state lazily from their own pose and the pose
//! of the scene node they are attached to. Nothing is pushed: every query
//! revalidates against the parent first.

mod camera;
mod frustum;
mod viewport;

pub use camera::{Camera, SceneDetailLevel, SceneRenderer, WindowRect};
pub use frustum::{
    Frustum, FrustumPlane, FrustumTest, ProjectionType, ViewState,
    reflection_matrix,
    DEFAULT_FOV_Y, DEFAULT_ASPECT_RATIO, DEFAULT_NEAR, DEFAULT_FAR, INFINITE_FAR_DISTANCE,
};
pub use viewport::Viewport;
