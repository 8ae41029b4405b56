use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::math::Vec3;

/// Destination of rendered pixels. `y = 0` is the bottom row.
pub trait ImageSink {
	fn width(&self) -> usize;
	fn height(&self) -> usize;
	fn set_pixel(&mut self, x: usize, y: usize, color: Vec3);
}

/// In-memory RGB image
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
	width: usize,
	height: usize,
	pixels: Vec<Vec3>,
}

impl Image {
	pub fn new(width: usize, height: usize, fill: Vec3) -> Image {
		Image { width, height, pixels: vec![fill; width * height] }
	}

	pub fn get(&self, x: usize, y: usize) -> Vec3 {
		self.pixels[self.width * y + x]
	}

	/// Quantized pixel, components clamped to `[0, 1]`
	pub fn get_rgb8(&self, x: usize, y: usize) -> [u8; 3] {
		let v = self.get(x, y).map(|c| c.max(0.0).min(1.0) * 255.0 + 0.5);
		[v.x as u8, v.y as u8, v.z as u8]
	}

	/// Write the image; `.ppm` files are written as binary PPM, any other
	/// extension goes through the `image` crate.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let path = path.as_ref();
		let is_ppm = path.extension()
			.and_then(|e| e.to_str())
			.map_or(false, |e| e.eq_ignore_ascii_case("ppm"));
		if is_ppm {
			self.write_ppm(path)
		} else {
			let (w, h) = (self.width as u32, self.height as u32);
			let img = image::RgbImage::from_fn(w, h, |x, row| {
				image::Rgb(self.get_rgb8(x as usize, self.height - 1 - row as usize))
			});
			img.save(path)?;
			Ok(())
		}
	}

	fn write_ppm(&self, path: &Path) -> Result<()> {
		let mut f = BufWriter::new(File::create(path)?);
		write!(f, "P6\n{} {}\n{}\n", self.width, self.height, 255)?;
		for row in (0..self.height).rev() {
			for x in 0..self.width {
				f.write_all(&self.get_rgb8(x, row))?;
			}
		}
		f.flush()?;
		Ok(())
	}
}

impl ImageSink for Image {
	fn width(&self) -> usize {
		self.width
	}

	fn height(&self) -> usize {
		self.height
	}

	fn set_pixel(&mut self, x: usize, y: usize, color: Vec3) {
		self.pixels[self.width * y + x] = color;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use std::env::temp_dir;

	#[test]
	fn colors_are_clamped_and_rounded() {
		let mut img = Image::new(2, 1, Vec3::zero());
		img.set_pixel(0, 0, Vec3::new(-1.0, 0.5, 3.0));
		assert_eq!(img.get_rgb8(0, 0), [0, 128, 255]);
		assert_eq!(img.get_rgb8(1, 0), [0, 0, 0]);
	}

	#[test]
	fn ppm_rows_start_at_the_top() {
		let mut img = Image::new(1, 2, Vec3::zero());
		img.set_pixel(0, 1, Vec3::thrice(1.0));
		let path = temp_dir().join(format!("gridtrace_sink_test_{}.ppm", std::process::id()));
		img.save(&path).unwrap();
		let bytes = fs::read(&path).unwrap();
		let _ = fs::remove_file(&path);
		let header = b"P6\n1 2\n255\n";
		assert_eq!(&bytes[..header.len()], &header[..]);
		assert_eq!(&bytes[header.len()..], &[255, 255, 255, 0, 0, 0]);
	}
}
