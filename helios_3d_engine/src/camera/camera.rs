/// Camera - a movable viewpoint with a lazily derived view.
///
/// The camera owns a local pose (position + orientation) attached through a
/// weak link to an optional parent node, and a `Frustum` holding the
/// projection parameters. Derived values are pulled on demand:
/// every query first revalidates the derived pose against the parent, and a
/// changed pose invalidates the frustum's view state and the window planes.
///
/// Conventions: right-handed, the camera looks down its local -Z axis with
/// +Y up. Angles taken by `pitch`/`yaw`/`roll`/`rotate_axis` are in degrees.

use std::f32::consts::PI;
use std::sync::{Arc, Weak};
use glam::{Mat3, Mat4, Quat, Vec3};
use crate::error::Result;
use crate::math::{AABB, Plane, Ray, Sphere};
use crate::scene::{
    Cached, DerivedPose, MovableCore, MovableObject, PoseCache, PoseProvider,
    RenderQueue, SceneNode,
};
use super::frustum::{Frustum, FrustumPlane, ProjectionType, ViewState};
use super::viewport::Viewport;

/// Squared length below which the requested direction counts as opposite
/// to the current forward axis.
const OPPOSITE_DIRECTION_EPSILON: f32 = 0.00005;

/// Rasterization detail requested from the scene renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneDetailLevel {
    Points,
    Wireframe,
    Solid,
}

/// Scene manager side of `Camera::render_scene`.
pub trait SceneRenderer {
    /// Render the scene as seen by `camera` into `viewport`.
    ///
    /// Returns the number of faces rendered.
    fn render_scene(&mut self, camera: &mut Camera, viewport: &Viewport, show_overlays: bool) -> Result<usize>;
}

/// Normalized sub-rectangle of the view (0,0 = top-left, 1,1 = bottom-right).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone)]
struct AutoTrack {
    target: Weak<SceneNode>,
    offset: Vec3,
}

#[derive(Debug, Clone)]
pub struct Camera {
    core: MovableCore,
    pose: PoseCache<Quat>,
    frustum: Frustum,
    yaw_fixed: bool,
    yaw_fixed_axis: Vec3,
    window: Option<WindowRect>,
    window_planes: Cached<[Plane; 4]>,
    auto_track: Option<AutoTrack>,
    lod_bias: f32,
    detail_level: SceneDetailLevel,
    auto_aspect_ratio: bool,
    rendered_faces: usize,
}

impl Camera {
    pub fn new(name: &str) -> Self {
        Self {
            core: MovableCore::new(name),
            pose: PoseCache::new(Vec3::ZERO, Quat::IDENTITY),
            frustum: Frustum::new(),
            yaw_fixed: true,
            yaw_fixed_axis: Vec3::Y,
            window: None,
            window_planes: Cached::Dirty,
            auto_track: None,
            lod_bias: 1.0,
            detail_level: SceneDetailLevel::Solid,
            auto_aspect_ratio: false,
            rendered_faces: 0,
        }
    }

    // ===== DERIVED POSE =====

    fn invalidate_view(&mut self) {
        self.frustum.invalidate_view();
        self.window_planes.invalidate();
    }

    /// Revalidate the derived pose against the parent node.
    fn update_pose(&mut self) -> DerivedPose<Quat> {
        let parent = self.core.attachment.parent_node();
        let (changed, pose) = self.pose.refresh(parent.as_deref().map(|n| n as &dyn PoseProvider));
        if changed {
            self.invalidate_view();
        }
        pose
    }

    /// Bring every derived cache up to date.
    ///
    /// Returns `true` if the derived pose changed since the previous call.
    pub fn update(&mut self) -> bool {
        let parent = self.core.attachment.parent_node();
        let changed = self.pose.update(parent.as_deref().map(|n| n as &dyn PoseProvider));
        if changed {
            self.invalidate_view();
        }
        changed
    }

    fn view_state(&mut self) -> ViewState {
        let pose = self.update_pose();
        *self.frustum.update_view(pose.position, pose.rotation)
    }

    pub fn derived_position(&mut self) -> Vec3 {
        self.update_pose().position
    }

    pub fn derived_orientation(&mut self) -> Quat {
        self.update_pose().rotation
    }

    pub fn derived_direction(&mut self) -> Vec3 {
        self.derived_orientation() * Vec3::NEG_Z
    }

    pub fn derived_up(&mut self) -> Vec3 {
        self.derived_orientation() * Vec3::Y
    }

    pub fn derived_right(&mut self) -> Vec3 {
        self.derived_orientation() * Vec3::X
    }

    // ===== LOCAL POSE =====

    pub fn position(&self) -> Vec3 {
        self.pose.local_position()
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.pose.set_local_position(position);
        self.invalidate_view();
    }

    /// Move by `delta` in parent space.
    pub fn move_by(&mut self, delta: Vec3) {
        self.set_position(self.position() + delta);
    }

    /// Move by `delta` expressed in the camera's own axes.
    pub fn move_relative(&mut self, delta: Vec3) {
        self.set_position(self.position() + self.orientation() * delta);
    }

    pub fn orientation(&self) -> Quat {
        self.pose.local_rotation()
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.pose.set_local_rotation(orientation.normalize());
        self.invalidate_view();
    }

    pub fn direction(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.orientation() * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.orientation() * Vec3::X
    }

    /// Apply `rotation` on the left: `orientation = rotation * orientation`.
    pub fn rotate(&mut self, rotation: Quat) {
        self.set_orientation(rotation.normalize() * self.orientation());
    }

    pub fn rotate_axis(&mut self, axis: Vec3, degrees: f32) {
        self.rotate(Quat::from_axis_angle(axis.normalize(), degrees.to_radians()));
    }

    /// Rotate about the camera's local X axis.
    pub fn pitch(&mut self, degrees: f32) {
        let axis = self.orientation() * Vec3::X;
        self.rotate_axis(axis, degrees);
    }

    /// Rotate about the fixed yaw axis if set, else the local Y axis.
    pub fn yaw(&mut self, degrees: f32) {
        let axis = if self.yaw_fixed {
            self.yaw_fixed_axis
        } else {
            self.orientation() * Vec3::Y
        };
        self.rotate_axis(axis, degrees);
    }

    /// Rotate about the camera's local Z axis.
    pub fn roll(&mut self, degrees: f32) {
        let axis = self.orientation() * Vec3::Z;
        self.rotate_axis(axis, degrees);
    }

    pub fn set_fixed_yaw_axis(&mut self, enabled: bool, axis: Vec3) {
        self.yaw_fixed = enabled;
        if enabled {
            self.yaw_fixed_axis = axis.normalize_or_zero();
        }
    }

    pub fn is_yaw_fixed(&self) -> bool {
        self.yaw_fixed
    }

    pub fn fixed_yaw_axis(&self) -> Vec3 {
        self.yaw_fixed_axis
    }

    /// Point the camera's -Z axis along the world-space `direction`.
    ///
    /// A zero vector is ignored. With a fixed yaw axis the new basis is built
    /// from that axis so the camera never rolls; otherwise the shortest arc
    /// from the current forward axis is applied.
    pub fn set_direction(&mut self, direction: Vec3) {
        if direction.length_squared() == 0.0 {
            return;
        }

        let z_adjust = -direction.normalize();

        let fixed = if self.yaw_fixed {
            fixed_yaw_basis(self.yaw_fixed_axis, z_adjust)
        } else {
            None
        };

        let world_orientation = match fixed {
            Some(orientation) => orientation,
            None => {
                let current = self.derived_orientation();
                let z_axis = current * Vec3::Z;
                let rotation = if (z_adjust + z_axis).length_squared() < OPPOSITE_DIRECTION_EPSILON {
                    // Half turn: any axis works, keep the current up
                    Quat::from_axis_angle(current * Vec3::Y, PI)
                } else {
                    Quat::from_rotation_arc(z_axis, z_adjust)
                };
                rotation * current
            }
        };

        let local = match self.core.attachment.parent_node() {
            Some(parent) => parent.derived_orientation().inverse() * world_orientation,
            None => world_orientation,
        };
        self.set_orientation(local);
    }

    /// Turn to face a world-space point.
    pub fn look_at(&mut self, target: Vec3) {
        let position = self.derived_position();
        self.set_direction(target - position);
    }

    // ===== AUTO TRACKING =====

    /// Keep looking at `target` (plus a world-space `offset`) on every `auto_track`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when enabling without a target.
    pub fn set_auto_tracking(&mut self, enabled: bool, target: Option<&Arc<SceneNode>>, offset: Vec3) -> Result<()> {
        if !enabled {
            self.auto_track = None;
            return Ok(());
        }
        let Some(target) = target else {
            crate::engine_bail!("helios3d::Camera", InvalidArgument =>
                "Camera '{}': auto tracking needs a target node", self.core.name());
        };
        self.auto_track = Some(AutoTrack { target: Arc::downgrade(target), offset });
        Ok(())
    }

    pub fn auto_track_target(&self) -> Option<Arc<SceneNode>> {
        self.auto_track.as_ref().and_then(|track| track.target.upgrade())
    }

    pub fn auto_track_offset(&self) -> Vec3 {
        self.auto_track.as_ref().map(|track| track.offset).unwrap_or(Vec3::ZERO)
    }

    /// Face the tracked node, if any is set and still alive.
    pub fn auto_track(&mut self) {
        let point = self.auto_track.as_ref().and_then(|track| {
            track.target.upgrade().map(|target| target.derived_position() + track.offset)
        });
        if let Some(point) = point {
            self.look_at(point);
        }
    }

    // ===== FRUSTUM PARAMETERS =====

    /// Projection parameters. Use the camera's setters to change them.
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn set_fov_y(&mut self, radians: f32) {
        self.frustum.set_fov_y(radians);
        self.window_planes.invalidate();
    }

    pub fn set_aspect_ratio(&mut self, ratio: f32) {
        self.frustum.set_aspect_ratio(ratio);
        self.window_planes.invalidate();
    }

    pub fn set_near_distance(&mut self, near: f32) {
        self.frustum.set_near_distance(near);
        self.window_planes.invalidate();
    }

    /// 0 gives an infinite far plane.
    pub fn set_far_distance(&mut self, far: f32) {
        self.frustum.set_far_distance(far);
    }

    pub fn set_projection_type(&mut self, projection_type: ProjectionType) {
        self.frustum.set_projection_type(projection_type);
        self.window_planes.invalidate();
    }

    pub fn enable_reflection(&mut self, plane: Plane) {
        self.frustum.enable_reflection(plane);
        self.window_planes.invalidate();
    }

    pub fn disable_reflection(&mut self) {
        self.frustum.disable_reflection();
        self.window_planes.invalidate();
    }

    pub fn is_reflected(&self) -> bool {
        self.frustum.is_reflected()
    }

    pub fn near_distance(&self) -> f32 {
        self.frustum.near_distance()
    }

    pub fn far_distance(&self) -> f32 {
        self.frustum.far_distance()
    }

    // ===== DERIVED MATRICES AND PLANES =====

    pub fn projection_matrix(&mut self) -> Mat4 {
        self.frustum.projection_matrix()
    }

    pub fn view_matrix(&mut self) -> Mat4 {
        self.view_state().view_matrix()
    }

    pub fn view_projection_matrix(&mut self) -> Mat4 {
        let view = self.view_matrix();
        self.projection_matrix() * view
    }

    pub fn frustum_plane(&mut self, plane: FrustumPlane) -> Plane {
        self.view_state().plane(plane)
    }

    pub fn frustum_planes(&mut self) -> [Plane; 6] {
        *self.view_state().planes()
    }

    /// World-space frustum corners (see `ViewState::corners` for the layout).
    pub fn world_space_corners(&mut self) -> [Vec3; 8] {
        *self.view_state().corners()
    }

    // ===== VISIBILITY =====

    pub fn culling_plane_aabb(&mut self, aabb: &AABB) -> Option<FrustumPlane> {
        self.view_state().culling_plane_aabb(aabb)
    }

    pub fn culling_plane_sphere(&mut self, sphere: &Sphere) -> Option<FrustumPlane> {
        self.view_state().culling_plane_sphere(sphere)
    }

    pub fn culling_plane_point(&mut self, point: Vec3) -> Option<FrustumPlane> {
        self.view_state().culling_plane_point(point)
    }

    pub fn is_visible_aabb(&mut self, aabb: &AABB) -> bool {
        self.culling_plane_aabb(aabb).is_none()
    }

    pub fn is_visible_sphere(&mut self, sphere: &Sphere) -> bool {
        self.culling_plane_sphere(sphere).is_none()
    }

    pub fn is_visible_point(&mut self, point: Vec3) -> bool {
        self.culling_plane_point(point).is_none()
    }

    // ===== WINDOW =====

    /// Restrict clipping to a normalized sub-rectangle of the view.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` unless `0 <= left < right <= 1` and `0 <= top < bottom <= 1`.
    pub fn set_window(&mut self, left: f32, top: f32, right: f32, bottom: f32) -> Result<()> {
        let valid = (0.0..=1.0).contains(&left)
            && (0.0..=1.0).contains(&top)
            && left < right
            && right <= 1.0
            && top < bottom
            && bottom <= 1.0;
        if !valid {
            crate::engine_bail!("helios3d::Camera", InvalidArgument =>
                "Camera '{}': invalid window ({}, {}, {}, {})",
                self.core.name(), left, top, right, bottom);
        }
        self.window = Some(WindowRect { left, top, right, bottom });
        self.window_planes.invalidate();
        Ok(())
    }

    pub fn reset_window(&mut self) {
        self.window = None;
        self.window_planes.invalidate();
    }

    pub fn window(&self) -> Option<WindowRect> {
        self.window
    }

    pub fn is_window_set(&self) -> bool {
        self.window.is_some()
    }

    /// 4 with a window set, otherwise 0.
    pub fn window_plane_count(&self) -> usize {
        if self.window.is_some() { 4 } else { 0 }
    }

    /// Window clip planes: left, top, right, bottom. Empty without a window.
    pub fn window_planes(&mut self) -> Vec<Plane> {
        let Some(rect) = self.window else {
            return Vec::new();
        };
        let state = self.view_state();
        let params = WindowParams::from_frustum(&self.frustum);
        self.window_planes
            .get_or_update(|| params.planes(&state, rect))
            .to_vec()
    }

    /// # Errors
    ///
    /// `InvalidArgument` when `index >= window_plane_count()`.
    pub fn window_plane(&mut self, index: usize) -> Result<Plane> {
        if index >= self.window_plane_count() {
            crate::engine_bail!("helios3d::Camera", InvalidArgument =>
                "Camera '{}': window plane index {} out of range ({} planes)",
                self.core.name(), index, self.window_plane_count());
        }
        Ok(self.window_planes()[index])
    }

    // ===== RAYS =====

    /// World-space ray through a normalized viewport point (0,0 = top-left).
    pub fn camera_to_viewport_ray(&mut self, screen_x: f32, screen_y: f32) -> Ray {
        let pose = self.update_pose();
        let centered_x = screen_x - 0.5;
        let centered_y = 0.5 - screen_y;

        let near = self.frustum.near_distance();
        let y_scale = (self.frustum.fov_y() * 0.5).tan() * near * 2.0;
        let x_scale = y_scale * self.frustum.aspect_ratio();
        let offset = Vec3::new(centered_x * x_scale, centered_y * y_scale, 0.0);

        match self.frustum.projection_type() {
            ProjectionType::Perspective => Ray::new(
                pose.position,
                (pose.rotation * (offset - Vec3::Z * near)).normalize(),
            ),
            ProjectionType::Orthographic => Ray::new(
                pose.position + pose.rotation * offset,
                pose.rotation * Vec3::NEG_Z,
            ),
        }
    }

    // ===== RENDERING =====

    /// # Errors
    ///
    /// `InvalidArgument` when `factor <= 0`.
    pub fn set_lod_bias(&mut self, factor: f32) -> Result<()> {
        if factor.is_nan() || factor <= 0.0 {
            crate::engine_bail!("helios3d::Camera", InvalidArgument =>
                "Camera '{}': LOD bias must be positive, got {}", self.core.name(), factor);
        }
        self.lod_bias = factor;
        Ok(())
    }

    pub fn lod_bias(&self) -> f32 {
        self.lod_bias
    }

    pub fn inverse_lod_bias(&self) -> f32 {
        1.0 / self.lod_bias
    }

    pub fn detail_level(&self) -> SceneDetailLevel {
        self.detail_level
    }

    pub fn set_detail_level(&mut self, level: SceneDetailLevel) {
        self.detail_level = level;
    }

    /// Follow the aspect ratio of every viewport this camera renders into.
    pub fn set_auto_aspect_ratio(&mut self, enabled: bool) {
        self.auto_aspect_ratio = enabled;
    }

    pub fn auto_aspect_ratio(&self) -> bool {
        self.auto_aspect_ratio
    }

    pub fn notify_viewport(&mut self, viewport: &Viewport) {
        if !self.auto_aspect_ratio {
            return;
        }
        if let Some(ratio) = viewport.aspect_ratio() {
            if ratio != self.frustum.aspect_ratio() {
                self.set_aspect_ratio(ratio);
            }
        }
    }

    /// Hand the scene to the scene manager for rendering through this camera.
    pub fn render_scene(
        &mut self,
        renderer: &mut dyn SceneRenderer,
        viewport: &Viewport,
        show_overlays: bool,
    ) -> Result<()> {
        self.notify_viewport(viewport);
        let faces = renderer.render_scene(self, viewport, show_overlays)?;
        self.notify_rendered_faces(faces);
        crate::engine_trace!("helios3d::Camera", "Camera '{}' rendered {} faces", self.core.name(), faces);
        Ok(())
    }

    pub fn notify_rendered_faces(&mut self, count: usize) {
        self.rendered_faces = count;
    }

    pub fn rendered_face_count(&self) -> usize {
        self.rendered_faces
    }
}

/// Orientation whose -Z is `-z_axis` and whose X is perpendicular to `yaw_axis`.
///
/// `None` when the direction is parallel to the yaw axis.
fn fixed_yaw_basis(yaw_axis: Vec3, z_axis: Vec3) -> Option<Quat> {
    let x_axis = yaw_axis.cross(z_axis);
    if x_axis.length_squared() < 1e-12 {
        return None;
    }
    let x_axis = x_axis.normalize();
    let y_axis = z_axis.cross(x_axis).normalize();
    Some(Quat::from_mat3(&Mat3::from_cols(x_axis, y_axis, z_axis)).normalize())
}

/// Frustum parameters the window planes depend on.
struct WindowParams {
    near: f32,
    near_half: glam::Vec2,
    projection_type: ProjectionType,
}

impl WindowParams {
    fn from_frustum(frustum: &Frustum) -> Self {
        Self {
            near: frustum.near_distance(),
            near_half: frustum.near_half_extents(),
            projection_type: frustum.projection_type(),
        }
    }

    fn planes(&self, state: &ViewState, rect: WindowRect) -> [Plane; 4] {
        let width = self.near_half.x * 2.0;
        let height = self.near_half.y * 2.0;
        let left = -self.near_half.x + rect.left * width;
        let right = -self.near_half.x + rect.right * width;
        let top = self.near_half.y - rect.top * height;
        let bottom = self.near_half.y - rect.bottom * height;

        let eye_to_world = state.inverse_view_matrix();
        let corner = |x: f32, y: f32| eye_to_world.transform_point3(Vec3::new(x, y, -self.near));
        let upper_left = corner(left, top);
        let upper_right = corner(right, top);
        let bottom_left = corner(left, bottom);
        let bottom_right = corner(right, bottom);

        match self.projection_type {
            ProjectionType::Perspective => {
                let eye = eye_to_world.transform_point3(Vec3::ZERO);
                [
                    Plane::from_points(eye, bottom_left, upper_left),
                    Plane::from_points(eye, upper_left, upper_right),
                    Plane::from_points(eye, upper_right, bottom_right),
                    Plane::from_points(eye, bottom_right, bottom_left),
                ]
            }
            ProjectionType::Orthographic => {
                let x_axis = eye_to_world.transform_vector3(Vec3::X).normalize_or_zero();
                let y_axis = eye_to_world.transform_vector3(Vec3::Y).normalize_or_zero();
                [
                    Plane::from_normal_point(x_axis, upper_left),
                    Plane::from_normal_point(-y_axis, upper_left),
                    Plane::from_normal_point(-x_axis, upper_right),
                    Plane::from_normal_point(y_axis, bottom_left),
                ]
            }
        }
    }
}

// ===== MOVABLE OBJECT =====

impl MovableObject for Camera {
    fn core(&self) -> &MovableCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut MovableCore {
        &mut self.core
    }

    fn movable_type(&self) -> &'static str {
        "Camera"
    }

    /// Cameras are not visible geometry.
    fn bounding_box(&self) -> Option<AABB> {
        None
    }

    /// Small proxy volume for bounds-dependent algorithms.
    fn bounding_radius(&self) -> f32 {
        self.frustum.near_distance() * 1.5
    }

    fn update_render_queue(&self, _queue: &mut RenderQueue) {}
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
