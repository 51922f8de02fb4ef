/// Plane - the set of points `p` where `normal · p + d == 0`.
///
/// The positive half-space is the side the normal points to.

use glam::{Vec3, Vec4};
use super::volume::AABB;

/// Which side of a plane a point or volume lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Exactly on the plane
    NoSide,
    /// In the half-space the normal points to
    Positive,
    /// In the opposite half-space
    Negative,
    /// Straddling the plane (volumes only)
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub const fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    /// Plane with the given normal passing through `point`.
    pub fn from_normal_point(normal: Vec3, point: Vec3) -> Self {
        Self { normal, d: -normal.dot(point) }
    }

    /// Plane through three points; the normal is `(p1 - p0) × (p2 - p0)`, normalized.
    pub fn from_points(p0: Vec3, p1: Vec3, p2: Vec3) -> Self {
        let normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        Self::from_normal_point(normal, p0)
    }

    /// Build from `(A, B, C, D)` and rescale so the normal has unit length.
    pub fn from_vec4_normalized(v: Vec4) -> Self {
        Self { normal: v.truncate(), d: v.w }.normalized()
    }

    /// `(A, B, C, D)` packed as a Vec4.
    pub fn as_vec4(&self) -> Vec4 {
        self.normal.extend(self.d)
    }

    /// Signed distance (exact when the normal is unit length).
    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    pub fn side(&self, point: Vec3) -> PlaneSide {
        let distance = self.distance(point);
        if distance < 0.0 {
            PlaneSide::Negative
        } else if distance > 0.0 {
            PlaneSide::Positive
        } else {
            PlaneSide::NoSide
        }
    }

    /// Side of an axis-aligned box, using its center and half extents.
    pub fn side_of_aabb(&self, aabb: &AABB) -> PlaneSide {
        let distance = self.distance(aabb.center());
        let half = aabb.half_size();
        let max_abs_distance = (self.normal * half).abs().element_sum();

        if distance < -max_abs_distance {
            PlaneSide::Negative
        } else if distance > max_abs_distance {
            PlaneSide::Positive
        } else {
            PlaneSide::Both
        }
    }

    /// Same plane with a unit normal (unchanged if the normal is zero).
    pub fn normalized(self) -> Self {
        let length = self.normal.length();
        if length > 0.0 {
            Self { normal: self.normal / length, d: self.d / length }
        } else {
            self
        }
    }

    /// Same plane with the half-spaces swapped.
    pub fn flipped(self) -> Self {
        Self { normal: -self.normal, d: -self.d }
    }

    /// Whether both planes bound the same half-space, within `tolerance`.
    pub fn approx_eq(&self, other: &Plane, tolerance: f32) -> bool {
        self.normal.abs_diff_eq(other.normal, tolerance) && (self.d - other.d).abs() <= tolerance
    }
}

#[cfg(test)]
#[path = "plane_tests.rs"]
mod tests;
