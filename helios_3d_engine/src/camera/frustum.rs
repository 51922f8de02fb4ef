/// Frustum - projection parameters plus lazily derived view-dependent state.
///
/// Planes are `normal · p + d >= 0` inside: normals point into the visible
/// volume. Two caches are kept:
/// - the projection matrix (depends on FOV, aspect, near, far, type)
/// - the view state: view matrix, the 6 world-space planes and the 8
///   world-space corners (depends on the projection and on the pose)
///
/// The pose is supplied by the owner (a `Camera`), which invalidates the
/// view state whenever its derived pose changes.

use std::f32::consts::FRAC_PI_4;
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use crate::math::{AABB, Plane, PlaneSide, Sphere};
use crate::scene::Cached;

pub const DEFAULT_FOV_Y: f32 = FRAC_PI_4;
pub const DEFAULT_ASPECT_RATIO: f32 = 1.33333;
pub const DEFAULT_NEAR: f32 = 100.0;
pub const DEFAULT_FAR: f32 = 100_000.0;

/// Distance used for far corners and orthographic depth when the far plane is infinite.
pub const INFINITE_FAR_DISTANCE: f32 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    Perspective,
    Orthographic,
}

/// Frustum plane identifiers, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrustumPlane {
    Near = 0,
    Far = 1,
    Left = 2,
    Right = 3,
    Top = 4,
    Bottom = 5,
}

impl FrustumPlane {
    pub const ALL: [FrustumPlane; 6] = [
        FrustumPlane::Near,
        FrustumPlane::Far,
        FrustumPlane::Left,
        FrustumPlane::Right,
        FrustumPlane::Top,
        FrustumPlane::Bottom,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Result of a 3-way frustum/AABB classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumTest {
    /// AABB is entirely outside the frustum
    Outside,
    /// AABB is entirely inside the frustum
    Inside,
    /// AABB partially overlaps the frustum
    Partial,
}

// ===== VIEW STATE =====

/// View-dependent frustum data, valid for one pose and one projection.
#[derive(Debug, Clone, Copy)]
pub struct ViewState {
    view: Mat4,
    inverse_view: Mat4,
    planes: [Plane; 6],
    corners: [Vec3; 8],
    infinite_far: bool,
}

impl ViewState {
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Eye-to-world transform.
    pub fn inverse_view_matrix(&self) -> Mat4 {
        self.inverse_view
    }

    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    pub fn plane(&self, plane: FrustumPlane) -> Plane {
        self.planes[plane.index()]
    }

    /// World-space corners.
    ///
    /// 0..4 lie on the near plane (top-right, top-left, bottom-left,
    /// bottom-right), 4..8 on the far plane in the same order.
    pub fn corners(&self) -> &[Vec3; 8] {
        &self.corners
    }

    /// Planes that take part in culling (the far plane is skipped when infinite).
    fn culling_planes(&self) -> impl Iterator<Item = (FrustumPlane, &Plane)> + '_ {
        let infinite_far = self.infinite_far;
        FrustumPlane::ALL
            .into_iter()
            .zip(self.planes.iter())
            .filter(move |(id, _)| !(infinite_far && *id == FrustumPlane::Far))
    }

    /// Plane that rejects `aabb`, or `None` if it is (potentially) visible.
    pub fn culling_plane_aabb(&self, aabb: &AABB) -> Option<FrustumPlane> {
        self.culling_planes()
            .find(|(_, plane)| plane.side_of_aabb(aabb) == PlaneSide::Negative)
            .map(|(id, _)| id)
    }

    pub fn culling_plane_sphere(&self, sphere: &Sphere) -> Option<FrustumPlane> {
        self.culling_planes()
            .find(|(_, plane)| plane.distance(sphere.center) < -sphere.radius)
            .map(|(id, _)| id)
    }

    pub fn culling_plane_point(&self, point: Vec3) -> Option<FrustumPlane> {
        self.culling_planes()
            .find(|(_, plane)| plane.side(point) == PlaneSide::Negative)
            .map(|(id, _)| id)
    }

    /// Classify an AABB against the frustum (3-way test).
    ///
    /// - p-vertex outside any plane → `Outside`
    /// - n-vertex outside any plane → at least `Partial`
    /// - otherwise → `Inside`
    pub fn classify_aabb(&self, aabb: &AABB) -> FrustumTest {
        let mut all_inside = true;

        for (_, plane) in self.culling_planes() {
            let normal = plane.normal;

            let p_vertex = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            if plane.distance(p_vertex) < 0.0 {
                return FrustumTest::Outside;
            }

            let n_vertex = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.min, aabb.max);
            if plane.distance(n_vertex) < 0.0 {
                all_inside = false;
            }
        }

        if all_inside { FrustumTest::Inside } else { FrustumTest::Partial }
    }
}

// ===== FRUSTUM =====

#[derive(Debug, Clone)]
pub struct Frustum {
    fov_y: f32,
    aspect_ratio: f32,
    near: f32,
    far: f32,
    projection_type: ProjectionType,
    reflection: Option<Plane>,
    projection: Cached<Mat4>,
    view: Cached<ViewState>,
}

impl Default for Frustum {
    fn default() -> Self {
        Self::new()
    }
}

impl Frustum {
    pub fn new() -> Self {
        Self {
            fov_y: DEFAULT_FOV_Y,
            aspect_ratio: DEFAULT_ASPECT_RATIO,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            projection_type: ProjectionType::Perspective,
            reflection: None,
            projection: Cached::Dirty,
            view: Cached::Dirty,
        }
    }

    // ===== PARAMETERS =====

    /// Vertical field of view in radians.
    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn set_fov_y(&mut self, radians: f32) {
        self.fov_y = radians;
        self.invalidate_projection();
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn set_aspect_ratio(&mut self, ratio: f32) {
        self.aspect_ratio = ratio;
        self.invalidate_projection();
    }

    pub fn near_distance(&self) -> f32 {
        self.near
    }

    pub fn set_near_distance(&mut self, near: f32) {
        self.near = near;
        self.invalidate_projection();
    }

    /// Far distance; 0 means infinite.
    pub fn far_distance(&self) -> f32 {
        self.far
    }

    pub fn set_far_distance(&mut self, far: f32) {
        self.far = far;
        self.invalidate_projection();
    }

    pub fn is_infinite_far(&self) -> bool {
        self.far == 0.0
    }

    pub fn projection_type(&self) -> ProjectionType {
        self.projection_type
    }

    pub fn set_projection_type(&mut self, projection_type: ProjectionType) {
        self.projection_type = projection_type;
        self.invalidate_projection();
    }

    /// Far distance actually used for geometry.
    pub fn effective_far_distance(&self) -> f32 {
        if self.is_infinite_far() { INFINITE_FAR_DISTANCE } else { self.far }
    }

    /// Half width and half height of the near plane rectangle.
    pub fn near_half_extents(&self) -> Vec2 {
        let half_height = (self.fov_y * 0.5).tan() * self.near;
        Vec2::new(half_height * self.aspect_ratio, half_height)
    }

    pub fn bounding_radius(&self) -> f32 {
        self.effective_far_distance()
    }

    // ===== REFLECTION =====

    /// Render as seen in a mirror lying on `plane`.
    pub fn enable_reflection(&mut self, plane: Plane) {
        self.reflection = Some(plane);
        self.view.invalidate();
    }

    pub fn disable_reflection(&mut self) {
        self.reflection = None;
        self.view.invalidate();
    }

    pub fn is_reflected(&self) -> bool {
        self.reflection.is_some()
    }

    pub fn reflection_plane(&self) -> Option<Plane> {
        self.reflection
    }

    /// Mirror transform for the reflection plane (identity when not reflected).
    pub fn reflection_matrix(&self) -> Mat4 {
        self.reflection.map(|plane| reflection_matrix(&plane)).unwrap_or(Mat4::IDENTITY)
    }

    // ===== CACHES =====

    fn invalidate_projection(&mut self) {
        self.projection.invalidate();
        self.view.invalidate();
    }

    /// Drop the view state; called by the owner when its pose changes.
    pub fn invalidate_view(&mut self) {
        self.view.invalidate();
    }

    pub fn is_projection_dirty(&self) -> bool {
        self.projection.is_dirty()
    }

    pub fn is_view_dirty(&self) -> bool {
        self.view.is_dirty()
    }

    pub fn projection_matrix(&mut self) -> Mat4 {
        let params = (self.projection_type, self.fov_y, self.aspect_ratio, self.near, self.far);
        let half = self.near_half_extents();
        let effective_far = self.effective_far_distance();

        *self.projection.get_or_update(|| {
            let (projection_type, fov_y, aspect, near, far) = params;
            match projection_type {
                ProjectionType::Perspective if far == 0.0 => {
                    Mat4::perspective_infinite_rh(fov_y, aspect, near)
                }
                ProjectionType::Perspective => Mat4::perspective_rh(fov_y, aspect, near, far),
                ProjectionType::Orthographic => Mat4::orthographic_rh(
                    -half.x, half.x, -half.y, half.y, near, effective_far,
                ),
            }
        })
    }

    /// View state for the given world pose, recomputed only if dirty.
    pub fn update_view(&mut self, position: Vec3, orientation: Quat) -> &ViewState {
        let projection = self.projection_matrix();
        let params = ViewParams {
            near: self.near,
            far: self.effective_far_distance(),
            infinite_far: self.is_infinite_far(),
            projection_type: self.projection_type,
            near_half: self.near_half_extents(),
            reflection: self.reflection,
        };
        self.view.get_or_update(|| params.compute(projection, position, orientation))
    }

    /// Last computed view state, if still valid.
    pub fn view_state(&self) -> Option<&ViewState> {
        self.view.get()
    }
}

/// Snapshot of the parameters the view state is derived from.
struct ViewParams {
    near: f32,
    far: f32,
    infinite_far: bool,
    projection_type: ProjectionType,
    near_half: Vec2,
    reflection: Option<Plane>,
}

impl ViewParams {
    fn compute(&self, projection: Mat4, position: Vec3, orientation: Quat) -> ViewState {
        let rotation = orientation.inverse();
        let mut view = Mat4::from_rotation_translation(rotation, -(rotation * position));
        if let Some(plane) = self.reflection {
            view *= reflection_matrix(&plane);
        }
        let inverse_view = view.inverse();
        let combo = projection * view;

        let forward = inverse_view.transform_vector3(Vec3::NEG_Z).normalize_or_zero();
        let near_point = inverse_view.transform_point3(Vec3::new(0.0, 0.0, -self.near));
        let far_point = inverse_view.transform_point3(Vec3::new(0.0, 0.0, -self.far));

        let mut planes = [Plane::new(Vec3::ZERO, 0.0); 6];
        planes[FrustumPlane::Near.index()] = Plane::from_normal_point(forward, near_point);
        planes[FrustumPlane::Far.index()] = Plane::from_normal_point(-forward, far_point);
        // Side planes: Gribb & Hartmann on the rows of projection * view
        planes[FrustumPlane::Left.index()] = Plane::from_vec4_normalized(combo.row(3) + combo.row(0));
        planes[FrustumPlane::Right.index()] = Plane::from_vec4_normalized(combo.row(3) - combo.row(0));
        planes[FrustumPlane::Bottom.index()] = Plane::from_vec4_normalized(combo.row(3) + combo.row(1));
        planes[FrustumPlane::Top.index()] = Plane::from_vec4_normalized(combo.row(3) - combo.row(1));

        let far_half = match self.projection_type {
            ProjectionType::Perspective => self.near_half * (self.far / self.near),
            ProjectionType::Orthographic => self.near_half,
        };
        let rectangle = |half: Vec2, depth: f32| {
            [
                Vec3::new(half.x, half.y, -depth),
                Vec3::new(-half.x, half.y, -depth),
                Vec3::new(-half.x, -half.y, -depth),
                Vec3::new(half.x, -half.y, -depth),
            ]
        };
        let mut corners = [Vec3::ZERO; 8];
        let view_corners = rectangle(self.near_half, self.near)
            .into_iter()
            .chain(rectangle(far_half, self.far));
        for (corner, view_corner) in corners.iter_mut().zip(view_corners) {
            *corner = inverse_view.transform_point3(view_corner);
        }

        ViewState {
            view,
            inverse_view,
            planes,
            corners,
            infinite_far: self.infinite_far,
        }
    }
}

/// Householder reflection about `plane` (unit normal expected).
pub fn reflection_matrix(plane: &Plane) -> Mat4 {
    let n = plane.normal;
    let d = plane.d;
    Mat4::from_cols(
        Vec4::new(1.0 - 2.0 * n.x * n.x, -2.0 * n.x * n.y, -2.0 * n.x * n.z, 0.0),
        Vec4::new(-2.0 * n.y * n.x, 1.0 - 2.0 * n.y * n.y, -2.0 * n.y * n.z, 0.0),
        Vec4::new(-2.0 * n.z * n.x, -2.0 * n.z * n.y, 1.0 - 2.0 * n.z * n.z, 0.0),
        Vec4::new(-2.0 * d * n.x, -2.0 * d * n.y, -2.0 * d * n.z, 1.0),
    )
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
