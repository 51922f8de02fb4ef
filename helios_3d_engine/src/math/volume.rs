/// Bounding volumes and rays.

use glam::{Mat4, Vec3};
use super::plane::{Plane, PlaneSide};

// ===== AABB =====

/// Axis-Aligned Bounding Box
///
/// A "null" box (no extent at all) is represented as `Option::<AABB>::None`
/// by the APIs that can return one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl AABB {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered on `center` with the given half extents
    pub fn from_center_half_size(center: Vec3, half_size: Vec3) -> Self {
        Self { min: center - half_size, max: center + half_size }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_size(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Transform this AABB by a matrix, returning a new AABB.
    ///
    /// Uses the Arvo method: projects each matrix axis onto the AABB extents
    /// for a tight result without transforming all 8 corners.
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        let translation = matrix.col(3).truncate();
        let mut new_min = translation;
        let mut new_max = translation;

        for i in 0..3 {
            let axis = matrix.col(i).truncate();
            let a = axis * self.min[i];
            let b = axis * self.max[i];
            new_min += a.min(b);
            new_max += a.max(b);
        }

        AABB { min: new_min, max: new_max }
    }

    /// Test if this AABB fully contains another AABB.
    pub fn contains(&self, other: &AABB) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.min.cmple(point).all() && self.max.cmpge(point).all()
    }

    /// Test if this AABB intersects (overlaps or touches) another AABB.
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }
}

// ===== SPHERE =====

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

// ===== RAY =====

/// Half-line from `origin` along `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t` along the ray.
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

// ===== PLANE BOUNDED VOLUME =====

/// Convex region bounded by planes.
///
/// A point is inside when it is not on the `outside` side of any plane.
/// Clip volumes built by lights use `PlaneSide::Negative` as the outside.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneBoundedVolume {
    pub planes: Vec<Plane>,
    pub outside: PlaneSide,
}

impl PlaneBoundedVolume {
    pub fn new(outside: PlaneSide) -> Self {
        Self { planes: Vec::new(), outside }
    }

    pub fn with_planes(planes: Vec<Plane>, outside: PlaneSide) -> Self {
        Self { planes, outside }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.side(point) != self.outside)
    }

    /// Conservative box test: false only if the box is entirely outside one plane.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.planes.iter().all(|plane| plane.side_of_aabb(aabb) != self.outside)
    }

    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        self.planes.iter().all(|plane| {
            let distance = plane.distance(sphere.center);
            match self.outside {
                PlaneSide::Negative => distance >= -sphere.radius,
                _ => distance <= sphere.radius,
            }
        })
    }
}

#[cfg(test)]
#[path = "volume_tests.rs"]
mod tests;
