//! Math primitives shared by the scene, camera and light code.
//!
//! Thin geometric types on top of `glam`: planes, bounding volumes,
//! rays and colors.

mod color;
mod plane;
mod volume;

pub use color::Color;
pub use plane::{Plane, PlaneSide};
pub use volume::{AABB, Sphere, Ray, PlaneBoundedVolume};
