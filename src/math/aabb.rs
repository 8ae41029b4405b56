use crate::math::*;

/// Axis-Aligned Bounding Box
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AABB {
	pub min: Vec3,
	pub max: Vec3,
}

impl AABB {
	pub fn new(min: Vec3, max: Vec3) -> AABB {
		AABB { min, max }
	}

	/// The box containing nothing; neutral element of `union`
	pub fn empty() -> AABB {
		AABB { min: Vec3::thrice(INFINITY), max: Vec3::thrice(NEG_INFINITY) }
	}

	pub fn from_points<I: IntoIterator<Item=Vec3>>(points: I) -> AABB {
		let mut aabb = AABB::empty();
		for p in points {
			aabb.extend_point(p);
		}
		aabb
	}

	pub fn is_empty(&self) -> bool {
		self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
	}

	pub fn extend_point(&mut self, p: Vec3) {
		self.min = Vec3::min(self.min, p);
		self.max = Vec3::max(self.max, p);
	}

	pub fn extend(&mut self, b: &AABB) {
		*self = self.union(b);
	}

	pub fn union(&self, b: &AABB) -> AABB {
		AABB {
			min: Vec3::min(self.min, b.min),
			max: Vec3::max(self.max, b.max),
		}
	}

	pub fn size(&self) -> Vec3 {
		self.max - self.min
	}

	/// The 8 corners, in no particular order
	pub fn corners(&self) -> [Vec3; 8] {
		let (a, b) = (self.min, self.max);
		[
			Vec3::new(a.x, a.y, a.z), Vec3::new(b.x, a.y, a.z),
			Vec3::new(a.x, b.y, a.z), Vec3::new(b.x, b.y, a.z),
			Vec3::new(a.x, a.y, b.z), Vec3::new(b.x, a.y, b.z),
			Vec3::new(a.x, b.y, b.z), Vec3::new(b.x, b.y, b.z),
		]
	}

	/// Conservative box around the transformed box
	pub fn transformed(&self, m: &Mat4) -> AABB {
		if self.is_empty() {
			return *self;
		}
		AABB::from_points(self.corners().iter().map(|&c| m.transform_point(c)))
	}

	/// Grow by `margin` on every side
	pub fn padded(&self, margin: f32) -> AABB {
		AABB {
			min: self.min - Vec3::thrice(margin),
			max: self.max + Vec3::thrice(margin),
		}
	}

	/// Slab test. Returns the parametric entry and exit distances of the
	/// (infinite) line, or `None` if it misses the box. An axis the ray is
	/// parallel to only constrains the origin.
	pub fn clip(&self, ray: &Ray) -> Option<(f32, f32)> {
		let len = ray.direction.length();
		let mut t_near = NEG_INFINITY;
		let mut t_far = INFINITY;

		for &axis in &Axis::ALL {
			let o = ray.origin[axis];
			let d = ray.direction[axis];
			if d.abs() <= std::f32::EPSILON * len {
				if o < self.min[axis] || o > self.max[axis] {
					return None;
				}
				continue;
			}
			let t1 = (self.min[axis] - o) / d;
			let t2 = (self.max[axis] - o) / d;
			t_near = t_near.max(t1.min(t2));
			t_far = t_far.min(t1.max(t2));
		}

		if t_near > t_far {
			None
		} else {
			Some((t_near, t_far))
		}
	}
}
