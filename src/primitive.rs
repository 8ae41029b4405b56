use std::sync::Arc;

use crate::geometry::*;
use crate::material::Material;
use crate::math::*;

/// Slack on the barycentric test so that rays do not slip between two
/// triangles sharing an edge
pub const TRIANGLE_SEAM_TOLERANCE: f32 = 1e-4;

#[derive(Clone, Debug)]
pub struct Sphere {
	pub center: Vec3,
	pub radius: f32,
	pub material: Arc<Material>,
}

impl Sphere {
	pub fn new(center: Vec3, radius: f32, material: Arc<Material>) -> Sphere {
		Sphere { center, radius, material }
	}

	/// Nearest root of `|o + t·d - c|² = r²` in `(tmin, tmax)`
	fn hit_distance(&self, ray: Ray, tmin: f32, tmax: f32) -> Option<f32> {
		let to_sphere = ray.origin - self.center;
		let a = Vec3::dot(ray.direction, ray.direction);
		if a == 0.0 {
			return None;
		}
		let b = 2.0 * Vec3::dot(to_sphere, ray.direction);
		let c = Vec3::dot(to_sphere, to_sphere) - self.radius * self.radius;
		let discriminant = b * b - 4.0 * a * c;
		if discriminant < 0.0 {
			return None;
		}

		let s = discriminant.sqrt();
		let t1 = (-b - s) / (2.0 * a);
		let t2 = (-b + s) / (2.0 * a);
		[t1, t2].iter().cloned().find(|&t| tmin < t && t < tmax)
	}
}

impl Surface for Sphere {
	fn intersect<'a>(&'a self, ray: Ray, hit: &mut Hit<'a>, tmin: f32) -> bool {
		match self.hit_distance(ray, tmin, hit.t) {
			Some(t) => {
				let normal = (ray.point_at(t) - self.center) / self.radius;
				hit.set(t, &self.material, normal.normalized(), ray);
				true
			}
			None => false,
		}
	}

	fn occludes(&self, ray: Ray, tmin: f32, tmax: f32) -> bool {
		self.hit_distance(ray, tmin, tmax).is_some()
	}

	fn aabb(&self) -> Option<AABB> {
		Some(AABB {
			min: self.center - Vec3::thrice(self.radius),
			max: self.center + Vec3::thrice(self.radius),
		})
	}
}

/// Infinite plane `{p | n·p = d}`
#[derive(Clone, Debug)]
pub struct Plane {
	pub normal: Vec3,
	pub d: f32,
	pub material: Arc<Material>,
}

impl Plane {
	/// `normal` need not be unit length; `d` is rescaled along with it.
	/// Returns `None` for a zero normal.
	pub fn new(normal: Vec3, d: f32, material: Arc<Material>) -> Option<Plane> {
		let len = normal.length();
		let normal = normal.try_normalized()?;
		Some(Plane { normal, d: d / len, material })
	}

	fn hit_distance(&self, ray: Ray, tmin: f32, tmax: f32) -> Option<f32> {
		let denom = Vec3::dot(self.normal, ray.direction);
		if denom.abs() <= std::f32::EPSILON * ray.direction.length() {
			return None;
		}
		let t = (self.d - Vec3::dot(self.normal, ray.origin)) / denom;
		if tmin < t && t < tmax { Some(t) } else { None }
	}
}

impl Surface for Plane {
	fn intersect<'a>(&'a self, ray: Ray, hit: &mut Hit<'a>, tmin: f32) -> bool {
		match self.hit_distance(ray, tmin, hit.t) {
			Some(t) => {
				hit.set(t, &self.material, self.normal, ray);
				true
			}
			None => false,
		}
	}

	fn occludes(&self, ray: Ray, tmin: f32, tmax: f32) -> bool {
		self.hit_distance(ray, tmin, tmax).is_some()
	}

	fn aabb(&self) -> Option<AABB> {
		None
	}
}

#[derive(Clone, Debug)]
pub struct Triangle {
	pub a: Vec3,
	pub b: Vec3,
	pub c: Vec3,
	pub material: Arc<Material>,
	// cache
	normal: Vec3,
}

impl Triangle {
	pub fn new(a: Vec3, b: Vec3, c: Vec3, material: Arc<Material>) -> Triangle {
		let normal = Vec3::cross(b - a, c - a).try_normalized().unwrap_or_default();
		Triangle { a, b, c, material, normal }
	}

	pub fn normal(&self) -> Vec3 {
		self.normal
	}

	/// Solve `o + t·d = a + β(b - a) + γ(c - a)` with Cramer's rule
	fn hit_distance(&self, ray: Ray, tmin: f32, tmax: f32) -> Option<f32> {
		let (a, b, c) = (self.a, self.b, self.c);
		let o = ray.origin;
		let d = ray.direction;

		let ab = a - b;
		let ac = a - c;
		let ao = a - o;

		let det_a = det3(ab, ac, d);
		if det_a == 0.0 || !det_a.is_finite() {
			return None;
		}

		let beta = det3(ao, ac, d) / det_a;
		let gamma = det3(ab, ao, d) / det_a;
		if !(beta > 0.0 && gamma > 0.0 && beta + gamma <= 1.0 + TRIANGLE_SEAM_TOLERANCE) {
			return None;
		}

		let t = det3(ab, ac, ao) / det_a;
		if tmin < t && t < tmax { Some(t) } else { None }
	}
}

/// Determinant of the 3x3 matrix whose columns are `c0`, `c1`, `c2`
fn det3(c0: Vec3, c1: Vec3, c2: Vec3) -> f32 {
	Vec3::dot(c0, Vec3::cross(c1, c2))
}

impl Surface for Triangle {
	fn intersect<'a>(&'a self, ray: Ray, hit: &mut Hit<'a>, tmin: f32) -> bool {
		match self.hit_distance(ray, tmin, hit.t) {
			Some(t) => {
				hit.set(t, &self.material, self.normal, ray);
				true
			}
			None => false,
		}
	}

	fn occludes(&self, ray: Ray, tmin: f32, tmax: f32) -> bool {
		self.hit_distance(ray, tmin, tmax).is_some()
	}

	fn aabb(&self) -> Option<AABB> {
		Some(AABB::from_points(vec![self.a, self.b, self.c]))
	}
}
