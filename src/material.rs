use crate::math::*;

/// Phong material with optional mirror reflection and transmission
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
	pub diffuse: Vec3,
	pub specular: Vec3,
	pub exponent: f32,
	/// zero for non-reflective materials
	pub reflective: Vec3,
	/// zero for opaque materials
	pub transparent: Vec3,
	pub index_of_refraction: f32,
}

impl Material {
	pub fn diffuse(color: Vec3) -> Material {
		Material {
			diffuse: color,
			specular: Vec3::zero(),
			exponent: 1.0,
			reflective: Vec3::zero(),
			transparent: Vec3::zero(),
			index_of_refraction: 1.0,
		}
	}

	pub fn phong(diffuse: Vec3, specular: Vec3, exponent: f32) -> Material {
		Material { specular, exponent, ..Material::diffuse(diffuse) }
	}

	pub fn is_reflective(&self) -> bool {
		!self.reflective.is_zero()
	}

	pub fn is_transparent(&self) -> bool {
		!self.transparent.is_zero()
	}

	/// Diffuse and specular contribution of one light.
	///
	/// `view_dir` is the direction of the incoming ray, `normal` the (unit)
	/// shading normal, `dir_to_light` a unit vector.
	pub fn shade(&self, view_dir: Vec3, normal: Vec3, dir_to_light: Vec3, light_color: Vec3) -> Vec3 {
		let n_dot_l = Vec3::dot(normal, dir_to_light);
		if n_dot_l <= 0.0 {
			return Vec3::zero();
		}

		let diffuse = self.diffuse * light_color * n_dot_l;

		let to_eye = -view_dir.normalized();
		let specular = match (dir_to_light + to_eye).try_normalized() {
			Some(half) => {
				let n_dot_h = Vec3::dot(normal, half).max(0.0);
				self.specular * light_color * n_dot_h.powf(self.exponent)
			}
			None => Vec3::zero(),
		};

		diffuse + specular
	}
}
