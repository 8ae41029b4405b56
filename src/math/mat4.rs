use std::ops::{Index, IndexMut, Mul};
use crate::math::{Vec3, deg_to_rad};

/// row-major 4x4 affine matrix
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Mat4([f32; 16]);

impl Mat4 {
	pub fn from_rows(m: [f32; 16]) -> Mat4 {
		Mat4(m)
	}

	pub fn identity() -> Mat4 {
		Mat4([
			1.0, 0.0, 0.0, 0.0,
			0.0, 1.0, 0.0, 0.0,
			0.0, 0.0, 1.0, 0.0,
			0.0, 0.0, 0.0, 1.0,
		])
	}

	/// Inverse matrix, or `None` if the matrix is singular
	pub fn inverse(&self) -> Option<Mat4> {
		// cofactor expansion, as done in MESA's gluInvertMatrix
		let a = &self.0;
		let mut inv = [0f32; 16];

		inv[ 0] =  a[5]*a[10]*a[15] - a[5]*a[11]*a[14] - a[9]*a[6]*a[15] + a[9]*a[7]*a[14] + a[13]*a[6]*a[11] - a[13]*a[7]*a[10];
		inv[ 1] = -a[1]*a[10]*a[15] + a[1]*a[11]*a[14] + a[9]*a[2]*a[15] - a[9]*a[3]*a[14] - a[13]*a[2]*a[11] + a[13]*a[3]*a[10];
		inv[ 2] =  a[1]*a[ 6]*a[15] - a[1]*a[ 7]*a[14] - a[5]*a[2]*a[15] + a[5]*a[3]*a[14] + a[13]*a[2]*a[ 7] - a[13]*a[3]*a[ 6];
		inv[ 3] = -a[1]*a[ 6]*a[11] + a[1]*a[ 7]*a[10] + a[5]*a[2]*a[11] - a[5]*a[3]*a[10] - a[ 9]*a[2]*a[ 7] + a[ 9]*a[3]*a[ 6];
		inv[ 4] = -a[4]*a[10]*a[15] + a[4]*a[11]*a[14] + a[8]*a[6]*a[15] - a[8]*a[7]*a[14] - a[12]*a[6]*a[11] + a[12]*a[7]*a[10];
		inv[ 5] =  a[0]*a[10]*a[15] - a[0]*a[11]*a[14] - a[8]*a[2]*a[15] + a[8]*a[3]*a[14] + a[12]*a[2]*a[11] - a[12]*a[3]*a[10];
		inv[ 6] = -a[0]*a[ 6]*a[15] + a[0]*a[ 7]*a[14] + a[4]*a[2]*a[15] - a[4]*a[3]*a[14] - a[12]*a[2]*a[ 7] + a[12]*a[3]*a[ 6];
		inv[ 7] =  a[0]*a[ 6]*a[11] - a[0]*a[ 7]*a[10] - a[4]*a[2]*a[11] + a[4]*a[3]*a[10] + a[ 8]*a[2]*a[ 7] - a[ 8]*a[3]*a[ 6];
		inv[ 8] =  a[4]*a[ 9]*a[15] - a[4]*a[11]*a[13] - a[8]*a[5]*a[15] + a[8]*a[7]*a[13] + a[12]*a[5]*a[11] - a[12]*a[7]*a[ 9];
		inv[ 9] = -a[0]*a[ 9]*a[15] + a[0]*a[11]*a[13] + a[8]*a[1]*a[15] - a[8]*a[3]*a[13] - a[12]*a[1]*a[11] + a[12]*a[3]*a[ 9];
		inv[10] =  a[0]*a[ 5]*a[15] - a[0]*a[ 7]*a[13] - a[4]*a[1]*a[15] + a[4]*a[3]*a[13] + a[12]*a[1]*a[ 7] - a[12]*a[3]*a[ 5];
		inv[11] = -a[0]*a[ 5]*a[11] + a[0]*a[ 7]*a[ 9] + a[4]*a[1]*a[11] - a[4]*a[3]*a[ 9] - a[ 8]*a[1]*a[ 7] + a[ 8]*a[3]*a[ 5];
		inv[12] = -a[4]*a[ 9]*a[14] + a[4]*a[10]*a[13] + a[8]*a[5]*a[14] - a[8]*a[6]*a[13] - a[12]*a[5]*a[10] + a[12]*a[6]*a[ 9];
		inv[13] =  a[0]*a[ 9]*a[14] - a[0]*a[10]*a[13] - a[8]*a[1]*a[14] + a[8]*a[2]*a[13] + a[12]*a[1]*a[10] - a[12]*a[2]*a[ 9];
		inv[14] = -a[0]*a[ 5]*a[14] + a[0]*a[ 6]*a[13] + a[4]*a[1]*a[14] - a[4]*a[2]*a[13] - a[12]*a[1]*a[ 6] + a[12]*a[2]*a[ 5];
		inv[15] =  a[0]*a[ 5]*a[10] - a[0]*a[ 6]*a[ 9] - a[4]*a[1]*a[10] + a[4]*a[2]*a[ 9] + a[ 8]*a[1]*a[ 6] - a[ 8]*a[2]*a[ 5];

		let det = a[0] * inv[0] + a[1] * inv[4] + a[2] * inv[8] + a[3] * inv[12];
		// singular relative to the Hadamard bound of the affine part
		let row = |r: usize, cols: usize| (0..cols).map(|c| a[4 * r + c] * a[4 * r + c]).sum::<f32>().sqrt();
		let bound = row(0, 3) * row(1, 3) * row(2, 3) * row(3, 4);
		if !det.is_finite() || det.abs() <= 1e-6 * bound {
			return None;
		}
		let inv_det = 1.0 / det;

		for x in inv.iter_mut() {
			*x *= inv_det;
		}

		Some(Mat4(inv))
	}

	pub fn transpose(&self) -> Mat4 {
		let mut t = [0f32; 16];
		for i in 0..4 {
			for j in 0..4 {
				t[4 * j + i] = self.0[4 * i + j];
			}
		}
		Mat4(t)
	}

	pub fn scale(v: Vec3) -> Mat4 {
		Mat4([
			v.x, 0.0, 0.0, 0.0,
			0.0, v.y, 0.0, 0.0,
			0.0, 0.0, v.z, 0.0,
			0.0, 0.0, 0.0, 1.0,
		])
	}

	pub fn translate(v: Vec3) -> Mat4 {
		Mat4([
			1.0, 0.0, 0.0, v.x,
			0.0, 1.0, 0.0, v.y,
			0.0, 0.0, 1.0, v.z,
			0.0, 0.0, 0.0, 1.0,
		])
	}

	/// Rotation of `deg` degrees around `axis` (right-handed)
	pub fn rotation(axis: Vec3, deg: f32) -> Mat4 {
		let a = axis.normalized();
		let (s, c) = deg_to_rad(deg).sin_cos();
		let t = 1.0 - c;

		Mat4([
			t*a.x*a.x + c,     t*a.x*a.y - s*a.z, t*a.x*a.z + s*a.y, 0.0,
			t*a.x*a.y + s*a.z, t*a.y*a.y + c,     t*a.y*a.z - s*a.x, 0.0,
			t*a.x*a.z - s*a.y, t*a.y*a.z + s*a.x, t*a.z*a.z + c,     0.0,
			0.0,               0.0,               0.0,               1.0,
		])
	}

	pub fn transform_point(&self, p: Vec3) -> Vec3 {
		let a = &self;
		let w = a[(3,0)] * p.x + a[(3,1)] * p.y + a[(3,2)] * p.z + a[(3,3)];
		let q = Vec3 {
			x: a[(0,0)] * p.x + a[(0,1)] * p.y + a[(0,2)] * p.z + a[(0,3)],
			y: a[(1,0)] * p.x + a[(1,1)] * p.y + a[(1,2)] * p.z + a[(1,3)],
			z: a[(2,0)] * p.x + a[(2,1)] * p.y + a[(2,2)] * p.z + a[(2,3)],
		};
		if w != 1.0 && w != 0.0 { q / w } else { q }
	}

	pub fn transform_vector(&self, p: Vec3) -> Vec3 {
		let a = &self;
		Vec3 {
			x: a[(0,0)] * p.x + a[(0,1)] * p.y + a[(0,2)] * p.z,
			y: a[(1,0)] * p.x + a[(1,1)] * p.y + a[(1,2)] * p.z,
			z: a[(2,0)] * p.x + a[(2,1)] * p.y + a[(2,2)] * p.z,
		}
	}
}

impl Mul for Mat4 {
	type Output = Mat4;
	fn mul(self, rhs: Mat4) -> Mat4 {
		let a = &self.0;
		let b = &rhs.0;
		let mut result = [0f32; 16];

		for i in 0..4 {
			for t in 0..4 {
				result[i*4 + t] = (0..4).map(|k| a[i*4 + k] * b[k*4 + t]).sum::<f32>();
			}
		}

		Mat4(result)
	}
}

impl Index<(usize, usize)> for Mat4 {
	type Output = f32;

	fn index(&self, coord: (usize, usize)) -> &f32 {
		&self.0[4 * coord.0 + coord.1]
	}
}

impl IndexMut<(usize, usize)> for Mat4 {
	fn index_mut(&mut self, coord: (usize, usize)) -> &mut f32 {
		&mut self.0[4 * coord.0 + coord.1]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn assert_close(a: Vec3, b: Vec3) {
		assert!((a - b).length() < 1e-5, "{:?} != {:?}", a, b);
	}

	#[test]
	fn inverse_identity() {
		assert_eq!(Mat4::identity().inverse(), Some(Mat4::identity()));
	}

	#[test]
	fn inverse_undoes_affine() {
		let m = Mat4::translate(Vec3::new(1.0, -2.0, 3.0))
			* Mat4::rotation(Vec3::new(1.0, 1.0, 0.0), 30.0)
			* Mat4::scale(Vec3::new(2.0, 0.5, 3.0));
		let inv = m.inverse().unwrap();
		let p = Vec3::new(0.3, 4.0, -1.5);
		assert_close(inv.transform_point(m.transform_point(p)), p);
	}

	#[test]
	fn singular_has_no_inverse() {
		assert_eq!(Mat4::scale(Vec3::new(1.0, 0.0, 1.0)).inverse(), None);
		assert_eq!(Mat4::scale(Vec3::new(1.0, 1.0, 1e-8)).inverse(), None);
	}

	#[test]
	fn tiny_uniform_scale_is_invertible() {
		let m = Mat4::scale(Vec3::thrice(1e-4));
		let inv = m.inverse().unwrap();
		let p = Vec3::new(1.0, 2.0, 3.0);
		assert_close(inv.transform_point(m.transform_point(p)), p);
		assert!((inv[(0, 0)] - 1e4).abs() < 1.0);
	}

	#[test]
	fn rotation_is_right_handed() {
		let m = Mat4::rotation(Vec3::new(0.0, 0.0, 1.0), 90.0);
		assert_close(m.transform_vector(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(0.0, 1.0, 0.0));
	}

	#[test]
	fn transpose_twice_is_identity_op() {
		let m = Mat4::translate(Vec3::new(1.0, 2.0, 3.0));
		assert_eq!(m.transpose().transpose(), m);
		assert_eq!(m.transpose()[(3, 0)], 1.0);
	}
}
