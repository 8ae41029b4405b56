use crate::math::*;
use crate::material::Material;

/// Closest intersection found so far along a ray.
///
/// `t` only ever decreases while a query runs: a surface commits to the
/// record only if it lies within `(tmin, t)`.
#[derive(Copy, Clone, Debug)]
pub struct Hit<'a> {
	pub t: f32,
	pub material: Option<&'a Material>,
	pub normal: Vec3,
	pub ray: Ray,
}

impl<'a> Hit<'a> {
	/// Empty record accepting anything closer than `t_max`
	pub fn new(ray: Ray, t_max: f32) -> Hit<'a> {
		Hit { t: t_max, material: None, normal: Vec3::zero(), ray }
	}

	pub fn is_hit(&self) -> bool {
		self.material.is_some()
	}

	pub fn point(&self) -> Vec3 {
		self.ray.point_at(self.t)
	}

	pub(crate) fn set(&mut self, t: f32, material: &'a Material, normal: Vec3, ray: Ray) {
		self.t = t;
		self.material = Some(material);
		self.normal = normal;
		self.ray = ray;
	}
}

pub trait Surface {
	/// Write the nearest intersection in `(tmin, hit.t)` into `hit`, returning
	/// whether there was one. `hit` is untouched on failure.
	fn intersect<'a>(&'a self, ray: Ray, hit: &mut Hit<'a>, tmin: f32) -> bool;

	/// Whether anything lies in `(tmin, tmax)` along the ray
	fn occludes(&self, ray: Ray, tmin: f32, tmax: f32) -> bool;

	/// World-space box, `None` for unbounded surfaces
	fn aabb(&self) -> Option<AABB>;
}
