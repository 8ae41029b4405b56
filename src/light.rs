use crate::math::*;

/// Illumination received at a point
#[derive(Copy, Clone, Debug)]
pub struct LightSample {
	/// unit direction from the point towards the light
	pub dir: Vec3,
	/// distance to the light, infinite for directional lights
	pub dist: f32,
	pub color: Vec3,
}

pub trait Light {
	fn illuminate(&self, p: Vec3) -> LightSample;
}

/// Light coming from infinitely far away along a fixed direction
#[derive(Clone, Debug)]
pub struct DirectionalLight {
	/// direction the light travels in (unit)
	direction: Vec3,
	color: Vec3,
}

impl DirectionalLight {
	/// Returns `None` for a zero direction
	pub fn new(direction: Vec3, color: Vec3) -> Option<DirectionalLight> {
		Some(DirectionalLight { direction: direction.try_normalized()?, color })
	}
}

impl Light for DirectionalLight {
	fn illuminate(&self, _p: Vec3) -> LightSample {
		LightSample { dir: -self.direction, dist: INFINITY, color: self.color }
	}
}

/// Point light whose intensity falls off as `1 / (c + l·d + q·d²)`
#[derive(Clone, Debug)]
pub struct PointLight {
	position: Vec3,
	color: Vec3,
	attenuation: [f32; 3],
}

impl PointLight {
	pub fn new(position: Vec3, color: Vec3, attenuation: [f32; 3]) -> PointLight {
		PointLight { position, color, attenuation }
	}

	/// Point light without falloff
	pub fn constant(position: Vec3, color: Vec3) -> PointLight {
		PointLight::new(position, color, [1.0, 0.0, 0.0])
	}
}

impl Light for PointLight {
	fn illuminate(&self, p: Vec3) -> LightSample {
		let (dir, dist) = Vec3::dir_and_dist(p, self.position);
		let [c, l, q] = self.attenuation;
		let falloff = c + l * dist + q * dist * dist;
		let color = if falloff > 0.0 { self.color / falloff } else { self.color };
		LightSample { dir, dist, color }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn directional_light_points_against_its_direction() {
		let light = DirectionalLight::new(Vec3::new(0.0, -2.0, 0.0), Vec3::thrice(1.0)).unwrap();
		let s = light.illuminate(Vec3::new(3.0, 4.0, 5.0));
		assert_eq!(s.dir, Vec3::new(0.0, 1.0, 0.0));
		assert_eq!(s.dist, INFINITY);
		assert!(DirectionalLight::new(Vec3::zero(), Vec3::thrice(1.0)).is_none());
	}

	#[test]
	fn point_light_attenuates_with_distance() {
		let light = PointLight::new(Vec3::new(0.0, 0.0, 2.0), Vec3::thrice(10.0), [1.0, 0.5, 0.25]);
		let s = light.illuminate(Vec3::zero());
		assert_eq!(s.dir, Vec3::new(0.0, 0.0, 1.0));
		assert!((s.dist - 2.0).abs() < 1e-6);
		// 1 + 0.5·2 + 0.25·4 = 3
		assert!((s.color.x - 10.0 / 3.0).abs() < 1e-5);
	}
}
