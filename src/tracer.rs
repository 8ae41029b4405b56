use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::RenderConfig;
use crate::geometry::Hit;
use crate::math::*;
use crate::scene::Scene;

/// Counters of the rays cast during a rendering
#[derive(Debug, Default)]
pub struct RayStats {
	primary: AtomicUsize,
	shadow: AtomicUsize,
	reflected: AtomicUsize,
	refracted: AtomicUsize,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RayCounts {
	pub primary: usize,
	pub shadow: usize,
	pub reflected: usize,
	pub refracted: usize,
}

impl RayStats {
	pub fn counts(&self) -> RayCounts {
		RayCounts {
			primary: self.primary.load(Ordering::Relaxed),
			shadow: self.shadow.load(Ordering::Relaxed),
			reflected: self.reflected.load(Ordering::Relaxed),
			refracted: self.refracted.load(Ordering::Relaxed),
		}
	}
}

fn bump(counter: &AtomicUsize) {
	counter.fetch_add(1, Ordering::Relaxed);
}

impl fmt::Display for RayCounts {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{} primary, {} shadow, {} reflected, {} refracted rays",
			self.primary, self.shadow, self.reflected, self.refracted)
	}
}

/// Mirror image of `incoming` about `normal`, both need not be unit length
pub fn mirror_direction(normal: Vec3, incoming: Vec3) -> Vec3 {
	let n = normal.normalized();
	let d = incoming.normalized();
	(d - n * (2.0 * Vec3::dot(d, n))).normalized()
}

/// Direction of `incoming` after crossing from a medium of index `index_i`
/// into one of index `index_t` through a surface of normal `normal` (facing
/// the incoming side). `None` on total internal reflection.
pub fn transmitted_direction(normal: Vec3, incoming: Vec3, index_i: f32, index_t: f32) -> Option<Vec3> {
	let n = normal.normalized();
	let i = -incoming.normalized();
	let ratio = index_i / index_t;
	let cos_i = Vec3::dot(n, i);
	let k = 1.0 - ratio * ratio * (1.0 - cos_i * cos_i);
	if k < 0.0 {
		return None;
	}
	(n * (ratio * cos_i - k.sqrt()) - i * ratio).try_normalized()
}

/// Whitted-style recursive ray tracer over an immutable scene
pub struct RayTracer<'s> {
	scene: &'s Scene,
	config: &'s RenderConfig,
	stats: RayStats,
}

impl<'s> RayTracer<'s> {
	pub fn new(scene: &'s Scene, config: &'s RenderConfig) -> RayTracer<'s> {
		RayTracer { scene, config, stats: RayStats::default() }
	}

	pub fn scene(&self) -> &'s Scene {
		self.scene
	}

	pub fn stats(&self) -> RayCounts {
		self.stats.counts()
	}

	/// Color seen through the image-plane point `(x, y)`; `hit` receives the
	/// primary intersection.
	pub fn trace_camera_ray(&self, point: (f32, f32), hit: &mut Hit<'s>) -> Vec3 {
		let camera = &self.scene.camera;
		let ray = camera.generate_ray(point);
		*hit = Hit::new(ray, INFINITY);
		bump(&self.stats.primary);
		self.trace_ray(ray, camera.t_min(), 0, 1.0, 1.0, hit)
	}

	fn continues(&self, bounces: u32, weight: f32) -> bool {
		bounces <= self.config.max_bounces && weight >= self.config.cutoff_weight
	}

	/// Color carried back along `ray`.
	///
	/// `bounces` is the recursion depth of this ray, `weight` its contribution
	/// to the final pixel and `ior` the index of refraction of the medium it
	/// travels through.
	pub fn trace_ray(&self, ray: Ray, tmin: f32, bounces: u32, weight: f32, ior: f32, hit: &mut Hit<'s>) -> Vec3 {
		if !self.continues(bounces, weight) {
			return Vec3::zero();
		}

		let graph = &self.scene.graph;
		if !graph.intersect(ray, hit, tmin) {
			return self.scene.background;
		}
		let material = match hit.material {
			Some(m) => m,
			None => return self.scene.background,
		};

		let p = hit.point();
		let normal = hit.normal;
		let dir = ray.direction;

		let shading_normal = if self.config.shade_back && Vec3::dot(normal, dir) > 0.0 {
			-normal
		} else {
			normal
		};

		let mut color = self.scene.ambient * material.diffuse;

		for light in &self.scene.lights {
			let sample = light.illuminate(p);
			if self.config.shadows {
				bump(&self.stats.shadow);
				if graph.occluded(Ray::new(p, sample.dir), EPSILON, sample.dist) {
					continue;
				}
			}
			color += material.shade(dir, shading_normal, sample.dir, sample.color);
		}

		if material.is_reflective() {
			let w = weight * material.reflective.length();
			if self.continues(bounces + 1, w) {
				bump(&self.stats.reflected);
				let reflected = Ray::new(p, mirror_direction(normal, dir));
				let mut h = Hit::new(reflected, INFINITY);
				color += self.trace_ray(reflected, EPSILON, bounces + 1, w, ior, &mut h) * material.reflective;
			}
		}

		if material.is_transparent() {
			let w = weight * material.transparent.length();
			let (n, index_i, index_t) = if Vec3::dot(dir, normal) > 0.0 {
				// leaving the object
				(-normal, material.index_of_refraction, 1.0)
			} else {
				(normal, ior, material.index_of_refraction)
			};
			if self.continues(bounces + 1, w) {
				if let Some(t) = transmitted_direction(n, dir, index_i, index_t) {
					bump(&self.stats.refracted);
					let refracted = Ray::new(p, t);
					let mut h = Hit::new(refracted, INFINITY);
					color += self.trace_ray(refracted, EPSILON, bounces + 1, w, index_t, &mut h) * material.transparent;
				}
			}
		}

		color
	}
}
