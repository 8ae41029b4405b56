use crate::error::{Error, Result};
use crate::math::*;

/// Maps normalized image-plane coordinates to primary rays
pub trait Camera {
	/// `point` lies in `[0,1]²`, `(0, 0)` being the bottom-left corner
	fn generate_ray(&self, point: (f32, f32)) -> Ray;

	/// Smallest ray parameter a primary hit may have
	fn t_min(&self) -> f32;
}

/// Orthonormal frame `(direction, horizontal, screen_up)` of a camera
fn camera_frame(direction: Vec3, up: Vec3) -> Result<(Vec3, Vec3, Vec3)> {
	let direction = direction.try_normalized()
		.ok_or_else(|| Error::Scene("camera direction is zero".to_owned()))?;
	let horizontal = Vec3::cross(direction, up).try_normalized()
		.ok_or_else(|| Error::Scene("camera up vector is zero or parallel to the direction".to_owned()))?;
	let screen_up = Vec3::cross(horizontal, direction).normalized();
	Ok((direction, horizontal, screen_up))
}

/// Parallel projection through a square window of side `size`
#[derive(Clone, Debug)]
pub struct OrthographicCamera {
	center: Vec3,
	direction: Vec3,
	horizontal: Vec3,
	screen_up: Vec3,
	size: f32,
}

impl OrthographicCamera {
	pub fn new(center: Vec3, direction: Vec3, up: Vec3, size: f32) -> Result<OrthographicCamera> {
		if !(size > 0.0) {
			return Err(Error::Scene(format!("orthographic camera size must be positive, got {}", size)));
		}
		let (direction, horizontal, screen_up) = camera_frame(direction, up)?;
		Ok(OrthographicCamera { center, direction, horizontal, screen_up, size })
	}
}

impl Camera for OrthographicCamera {
	fn generate_ray(&self, (x, y): (f32, f32)) -> Ray {
		let origin = self.center
			+ self.horizontal * ((x - 0.5) * self.size)
			+ self.screen_up * ((y - 0.5) * self.size);
		Ray::new(origin, self.direction)
	}

	fn t_min(&self) -> f32 {
		NEG_INFINITY
	}
}

/// Pinhole camera with a square field of view of `angle` degrees
#[derive(Clone, Debug)]
pub struct PerspectiveCamera {
	center: Vec3,
	direction: Vec3,
	horizontal: Vec3,
	screen_up: Vec3,
	/// distance to an image plane of side 1
	plane_dist: f32,
}

impl PerspectiveCamera {
	pub fn new(center: Vec3, direction: Vec3, up: Vec3, angle: f32) -> Result<PerspectiveCamera> {
		if !(angle > 0.0 && angle < 180.0) {
			return Err(Error::Scene(format!("perspective camera angle must lie in (0, 180), got {}", angle)));
		}
		let (direction, horizontal, screen_up) = camera_frame(direction, up)?;
		let plane_dist = 0.5 / (deg_to_rad(angle) * 0.5).tan();
		Ok(PerspectiveCamera { center, direction, horizontal, screen_up, plane_dist })
	}
}

impl Camera for PerspectiveCamera {
	fn generate_ray(&self, (x, y): (f32, f32)) -> Ray {
		let dir = self.direction * self.plane_dist
			+ self.horizontal * (x - 0.5)
			+ self.screen_up * (y - 0.5);
		Ray::new(self.center, dir.normalized())
	}

	fn t_min(&self) -> f32 {
		0.0
	}
}
