pub mod vec3;
pub mod mat4;
pub mod ray;
pub mod aabb;

pub use self::vec3::Vec3;
pub use self::mat4::Mat4;
pub use self::ray::Ray;
pub use self::aabb::AABB;
pub use std::f32::{INFINITY, NEG_INFINITY};
pub use std::f32::consts::PI;

/// Offset used as `tmin` for every secondary ray to avoid self-intersection
pub const EPSILON: f32 = 1e-4;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis { X, Y, Z }

impl Axis {
	pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

	pub fn index(self) -> usize {
		self as usize
	}
}

pub fn deg_to_rad(deg: f32) -> f32 {
	deg * (PI / 180.0)
}
