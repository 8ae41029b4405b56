use crate::math::{Mat4, Vec3};

/// Half-line `origin + t * direction`; the direction is not necessarily unit length
#[derive(Copy, Clone, Debug)]
pub struct Ray {
	pub origin: Vec3,
	pub direction: Vec3,
}

impl Ray {
	pub fn new(origin: Vec3, direction: Vec3) -> Ray {
		Ray { origin, direction }
	}

	pub fn point_at(&self, t: f32) -> Vec3 {
		self.origin + self.direction * t
	}

	/// Express the ray in another space. The direction is not renormalized so
	/// that the ray parameter `t` keeps its meaning in both spaces.
	pub fn transformed(&self, m: &Mat4) -> Ray {
		Ray {
			origin: m.transform_point(self.origin),
			direction: m.transform_vector(self.direction),
		}
	}
}
