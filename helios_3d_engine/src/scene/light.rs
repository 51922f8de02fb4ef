/// Light - a movable light source with shadow clip-volume geometry.
///
/// The light keeps a local position and direction and derives their
/// world-space values from its parent node through a `PoseCache<Vec3>`.
/// The homogeneous form returned by `as_4d_vector` lets point, spot and
/// directional lights share the clip-volume math: directional lights are
/// `(-direction, 0)`, every other type is `(position, 1)`.

use glam::{Vec3, Vec4};
use crate::camera::{Camera, FrustumPlane};
use crate::math::{AABB, Color, Plane, PlaneBoundedVolume, PlaneSide};
use super::movable_object::{MovableCore, MovableObject, RenderQueue};
use super::node::PoseProvider;
use super::pose_cache::PoseCache;

/// Below this distance from the near plane the light gets a degenerate slab.
const CLIP_THRESHOLD: f32 = 1e-6;

/// Corner indices of each frustum face, wound so side normals face inwards.
///
/// Indexed like `FrustumPlane::ALL`; corners use the `ViewState::corners` layout.
const FACE_CORNERS: [[usize; 4]; 6] = [
    [3, 2, 1, 0], // Near
    [7, 6, 5, 4], // Far
    [2, 6, 5, 1], // Left
    [7, 3, 0, 4], // Right
    [0, 1, 5, 4], // Top
    [7, 6, 2, 3], // Bottom
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Point,
    Directional,
    Spotlight,
}

#[derive(Debug, Clone)]
pub struct Light {
    core: MovableCore,
    pose: PoseCache<Vec3>,
    light_type: LightType,
    diffuse: Color,
    specular: Color,
    range: f32,
    attenuation_constant: f32,
    attenuation_linear: f32,
    attenuation_quadratic: f32,
    spot_inner: f32,
    spot_outer: f32,
    spot_falloff: f32,
    power_scale: f32,
    camera_squared_distance: f32,
}

impl Light {
    pub fn new(name: &str) -> Self {
        Self {
            core: MovableCore::new(name),
            pose: PoseCache::new(Vec3::ZERO, Vec3::Z),
            light_type: LightType::Point,
            diffuse: Color::WHITE,
            specular: Color::BLACK,
            range: 100_000.0,
            attenuation_constant: 1.0,
            attenuation_linear: 0.0,
            attenuation_quadratic: 0.0,
            spot_inner: 30f32.to_radians(),
            spot_outer: 40f32.to_radians(),
            spot_falloff: 1.0,
            power_scale: 1.0,
            camera_squared_distance: 0.0,
        }
    }

    // ===== PROPERTIES =====

    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    pub fn set_light_type(&mut self, light_type: LightType) {
        self.light_type = light_type;
    }

    pub fn diffuse(&self) -> Color {
        self.diffuse
    }

    pub fn set_diffuse(&mut self, color: Color) {
        self.diffuse = color;
    }

    pub fn specular(&self) -> Color {
        self.specular
    }

    pub fn set_specular(&mut self, color: Color) {
        self.specular = color;
    }

    pub fn attenuation_range(&self) -> f32 {
        self.range
    }

    pub fn attenuation_constant(&self) -> f32 {
        self.attenuation_constant
    }

    pub fn attenuation_linear(&self) -> f32 {
        self.attenuation_linear
    }

    pub fn attenuation_quadratic(&self) -> f32 {
        self.attenuation_quadratic
    }

    pub fn set_attenuation(&mut self, range: f32, constant: f32, linear: f32, quadratic: f32) {
        self.range = range;
        self.attenuation_constant = constant;
        self.attenuation_linear = linear;
        self.attenuation_quadratic = quadratic;
    }

    /// Inner cone angle in radians.
    pub fn spotlight_inner_angle(&self) -> f32 {
        self.spot_inner
    }

    /// Outer cone angle in radians.
    pub fn spotlight_outer_angle(&self) -> f32 {
        self.spot_outer
    }

    pub fn spotlight_falloff(&self) -> f32 {
        self.spot_falloff
    }

    /// Angles in radians.
    pub fn set_spotlight_range(&mut self, inner: f32, outer: f32, falloff: f32) {
        self.spot_inner = inner;
        self.spot_outer = outer;
        self.spot_falloff = falloff;
    }

    pub fn power_scale(&self) -> f32 {
        self.power_scale
    }

    pub fn set_power_scale(&mut self, scale: f32) {
        self.power_scale = scale;
    }

    // ===== POSE =====

    pub fn position(&self) -> Vec3 {
        self.pose.local_position()
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.pose.set_local_position(position);
    }

    pub fn direction(&self) -> Vec3 {
        self.pose.local_rotation()
    }

    /// Normalized on set; a zero vector is stored as zero.
    pub fn set_direction(&mut self, direction: Vec3) {
        self.pose.set_local_rotation(direction.normalize_or_zero());
    }

    /// Revalidate the derived pose; `true` if it changed.
    pub fn update(&mut self) -> bool {
        let parent = self.core.attachment.parent_node();
        self.pose.update(parent.as_deref().map(|n| n as &dyn PoseProvider))
    }

    pub fn derived_position(&mut self) -> Vec3 {
        let parent = self.core.attachment.parent_node();
        self.pose.derived(parent.as_deref().map(|n| n as &dyn PoseProvider)).position
    }

    pub fn derived_direction(&mut self) -> Vec3 {
        let parent = self.core.attachment.parent_node();
        self.pose.derived(parent.as_deref().map(|n| n as &dyn PoseProvider)).rotation
    }

    /// Homogeneous position: `(-direction, 0)` for directional lights, else `(position, 1)`.
    pub fn as_4d_vector(&mut self) -> Vec4 {
        match self.light_type {
            LightType::Directional => (-self.derived_direction()).extend(0.0),
            LightType::Point | LightType::Spotlight => self.derived_position().extend(1.0),
        }
    }

    /// Squared distance from the light to `point`; 0 for directional lights.
    pub fn squared_distance_to(&mut self, point: Vec3) -> f32 {
        match self.light_type {
            LightType::Directional => 0.0,
            LightType::Point | LightType::Spotlight => self.derived_position().distance_squared(point),
        }
    }

    /// Squared distance to the camera last passed to `notify_current_camera`.
    pub fn camera_squared_distance(&self) -> f32 {
        self.camera_squared_distance
    }

    // ===== CLIP VOLUMES =====

    /// Volume between the camera's near-plane rectangle and the light.
    ///
    /// Objects outside it cannot cast a shadow onto the near plane. When the
    /// light lies on the near plane the volume degenerates to the slab
    /// `|z| <= near`, meaning both shadow caps are required.
    pub fn near_clip_volume(&mut self, camera: &mut Camera) -> PlaneBoundedVolume {
        let near = camera.near_distance();
        let mut volume = PlaneBoundedVolume::new(PlaneSide::Negative);

        let light = self.as_4d_vector();
        let light3 = light.truncate();

        let view = camera.view_matrix();
        let eye_to_world = view.inverse();
        let eye_space_light = view * light;
        let d = eye_space_light.dot(Vec4::new(0.0, 0.0, -1.0, -near));

        if d.abs() <= CLIP_THRESHOLD {
            volume.planes.push(Plane::new(Vec3::Z, near));
            volume.planes.push(Plane::new(Vec3::NEG_Z, near));
            return volume;
        }

        let corners = camera.world_space_corners();
        let winding: i32 = if (d < 0.0) ^ camera.is_reflected() { 1 } else { -1 };
        volume.planes.extend(side_planes(&corners[..4], winding, light));

        // Near plane of the camera, facing towards the light
        let forward = if d > 0.0 { Vec3::NEG_Z } else { Vec3::Z };
        let normal = eye_to_world.transform_vector3(forward).normalize();
        volume.planes.push(Plane::from_normal_point(normal, camera.derived_position()));

        // Reject casters behind a positional light
        if self.light_type != LightType::Directional {
            let near_center = eye_to_world.transform_point3(Vec3::new(0.0, 0.0, -near));
            let normal = (near_center - light3).normalize();
            volume.planes.push(Plane::from_normal_point(normal, light3));
        }

        volume
    }

    /// One volume per frustum face the light lies outside of.
    ///
    /// Each is a pyramid (positional light) or cuboid (directional light)
    /// extruded from the face towards the light. The far face is skipped for
    /// an infinite far plane.
    pub fn frustum_clip_volumes(&mut self, camera: &mut Camera) -> Vec<PlaneBoundedVolume> {
        let light = self.as_4d_vector();
        let light3 = light.truncate();
        let corners = camera.world_space_corners();
        let planes = camera.frustum_planes();
        let infinite_far = camera.frustum().is_infinite_far();
        let winding: i32 = if camera.is_reflected() { 1 } else { -1 };

        let mut volumes = Vec::new();
        for face in FrustumPlane::ALL {
            if infinite_far && face == FrustumPlane::Far {
                continue;
            }

            let plane = planes[face.index()];
            // Frustum planes face inwards: keep faces with the light outside
            if plane.as_vec4().dot(light) >= -CLIP_THRESHOLD {
                continue;
            }

            let face_corners = FACE_CORNERS[face.index()].map(|i| corners[i]);
            let mut volume = PlaneBoundedVolume::new(PlaneSide::Negative);
            volume.planes.extend(side_planes(&face_corners, winding, light));
            volume.planes.push(plane.flipped());

            if self.light_type != LightType::Directional {
                volume.planes.push(Plane::from_normal_point(plane.normal, light3));
            }

            volumes.push(volume);
        }

        volumes
    }
}

/// Planes through each edge of a quad and the light.
fn side_planes(quad: &[Vec3], winding: i32, light: Vec4) -> Vec<Plane> {
    let light3 = light.truncate();
    (0..quad.len() as i32)
        .map(|i| {
            let corner = quad[i as usize];
            let neighbour = quad[(i + winding).rem_euclid(quad.len() as i32) as usize];
            let to_light = light3 - corner * light.w;
            let normal = (corner - neighbour).cross(to_light).normalize_or_zero();
            Plane::from_normal_point(normal, corner)
        })
        .collect()
}

// ===== MOVABLE OBJECT =====

impl MovableObject for Light {
    fn core(&self) -> &MovableCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut MovableCore {
        &mut self.core
    }

    fn movable_type(&self) -> &'static str {
        "Light"
    }

    fn bounding_box(&self) -> Option<AABB> {
        None
    }

    fn bounding_radius(&self) -> f32 {
        0.0
    }

    fn notify_current_camera(&mut self, camera: &mut Camera) {
        let eye = camera.derived_position();
        self.camera_squared_distance = self.squared_distance_to(eye);
    }

    fn update_render_queue(&self, _queue: &mut RenderQueue) {}
}

#[cfg(test)]
#[path = "light_tests.rs"]
mod tests;
