#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;

pub mod camera;
pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod light;
pub mod loader;
pub mod material;
pub mod math;
pub mod obj;
pub mod primitive;
pub mod scene;
pub mod sink;
pub mod tracer;

use time::PreciseTime;
use rayon::prelude::*;

pub use crate::config::RenderConfig;
pub use crate::error::{Error, Result};

use crate::geometry::Hit;
use crate::math::*;
use crate::scene::*;
use crate::sink::{Image, ImageSink};
use crate::tracer::{RayCounts, RayTracer};

/// What the primary ray of a pixel saw
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PixelSample {
	pub color: Vec3,
	/// distance to the primary hit, infinite on a miss
	pub t: f32,
	/// world-space normal at the primary hit, zero on a miss
	pub normal: Vec3,
}

impl Default for PixelSample {
	fn default() -> PixelSample {
		PixelSample { color: Vec3::zero(), t: INFINITY, normal: Vec3::zero() }
	}
}

/// Result of a rendering; row `y = 0` is the bottom of the image
pub struct Frame {
	pub width: usize,
	pub height: usize,
	pub pixels: Vec<PixelSample>,
	pub rays: RayCounts,
}

impl Frame {
	pub fn get(&self, x: usize, y: usize) -> &PixelSample {
		&self.pixels[self.width * y + x]
	}

	fn fill<S, F>(&self, sink: &mut S, f: F)
		where S: ImageSink, F: Fn(&PixelSample) -> Vec3
	{
		for y in 0..self.height {
			for x in 0..self.width {
				sink.set_pixel(x, y, f(self.get(x, y)));
			}
		}
	}

	pub fn write_color<S: ImageSink>(&self, sink: &mut S) {
		self.fill(sink, |p| p.color)
	}

	/// Gray levels going from white at `depth_min` to black at `depth_max`
	pub fn write_depth<S: ImageSink>(&self, sink: &mut S, depth_min: f32, depth_max: f32) {
		self.fill(sink, |p| {
			let t = p.t.max(depth_min).min(depth_max);
			Vec3::thrice((depth_max - t) / (depth_max - depth_min))
		})
	}

	/// Absolute value of the normal components as RGB
	pub fn write_normals<S: ImageSink>(&self, sink: &mut S) {
		self.fill(sink, |p| p.normal.abs())
	}

	pub fn color_image(&self) -> Image {
		let mut img = Image::new(self.width, self.height, Vec3::zero());
		self.write_color(&mut img);
		img
	}

	pub fn depth_image(&self, depth_min: f32, depth_max: f32) -> Image {
		let mut img = Image::new(self.width, self.height, Vec3::zero());
		self.write_depth(&mut img, depth_min, depth_max);
		img
	}

	pub fn normals_image(&self) -> Image {
		let mut img = Image::new(self.width, self.height, Vec3::zero());
		self.write_normals(&mut img);
		img
	}
}

/// Build the acceleration grid requested by `config`, if any
pub fn prepare_scene(scene: &mut Scene, config: &RenderConfig) {
	if let Some(dims) = config.grid {
		let start = PreciseTime::now();
		if scene.graph.build_grid(dims) {
			info!("built {}x{}x{} grid in {}ms", dims[0], dims[1], dims[2],
				start.to(PreciseTime::now()).num_milliseconds());
		} else {
			warn!("no grid built (unbounded scene or bad cell counts), rendering without one");
		}
	}
}

/// Image-plane coordinates of the center of pixel `(x, y)`. The camera sees
/// a square window; non-square images show its centered crop.
fn pixel_point(x: usize, y: usize, width: usize, height: usize) -> (f32, f32) {
	let s = width.max(height) as f32;
	let u = (x as f32 + 0.5 + (s - width as f32) * 0.5) / s;
	let v = (y as f32 + 0.5 + (s - height as f32) * 0.5) / s;
	(u, v)
}

/// Trace one row, returning how many pixels came out non-finite
fn render_row(tracer: &RayTracer, y: usize, row: &mut [PixelSample], width: usize, height: usize) -> usize {
	let background = tracer.scene().background;
	let mut bad = 0;
	for (x, p) in row.iter_mut().enumerate() {
		let mut hit = Hit::new(Ray::new(Vec3::zero(), Vec3::zero()), INFINITY);
		let color = tracer.trace_camera_ray(pixel_point(x, y, width, height), &mut hit);
		let color = if color.all_finite() {
			color
		} else {
			bad += 1;
			background
		};
		*p = PixelSample {
			color,
			t: hit.t,
			normal: if hit.is_hit() { hit.normal } else { Vec3::zero() },
		};
	}
	bad
}

fn render_with<F>(scene: &Scene, config: &RenderConfig, trace_rows: F) -> Frame
	where F: FnOnce(&RayTracer, &mut [PixelSample]) -> usize
{
	let (width, height) = (config.width, config.height);
	let mut pixels = vec![PixelSample::default(); width * height];
	let tracer = RayTracer::new(scene, config);

	info!("rendering {}x{} pixels, {} bounces, shadows {}", width, height, config.max_bounces,
		if config.shadows { "on" } else { "off" });
	let start = PreciseTime::now();

	let bad = trace_rows(&tracer, &mut pixels);

	let tot_s = start.to(PreciseTime::now()).num_milliseconds() as f32 / 1000.0;
	let rays = tracer.stats();
	info!("rendered in {:.3}s: {}", tot_s, rays);
	if bad > 0 {
		warn!("{} pixels had a non-finite color and were set to the background", bad);
	}

	Frame { width, height, pixels, rays }
}

/// Render with one rayon task per image row
pub fn render(scene: &Scene, config: &RenderConfig) -> Frame {
	let (width, height) = (config.width, config.height);
	render_with(scene, config, |tracer, pixels| {
		pixels.par_chunks_mut(width.max(1)).enumerate()
			.map(|(y, row)| render_row(tracer, y, row, width, height))
			.sum()
	})
}

/// Same as `render` on the calling thread only
pub fn render_seq(scene: &Scene, config: &RenderConfig) -> Frame {
	let (width, height) = (config.width, config.height);
	render_with(scene, config, |tracer, pixels| {
		pixels.chunks_mut(width.max(1)).enumerate()
			.map(|(y, row)| render_row(tracer, y, row, width, height))
			.sum()
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pixel_centers_of_a_square_image() {
		assert_eq!(pixel_point(0, 0, 2, 2), (0.25, 0.25));
		assert_eq!(pixel_point(1, 1, 2, 2), (0.75, 0.75));
	}

	#[test]
	fn wide_image_is_centered_vertically() {
		// 4x2 shows the middle band of the square window
		assert_eq!(pixel_point(0, 0, 4, 2), (0.125, 0.375));
		assert_eq!(pixel_point(3, 1, 4, 2), (0.875, 0.625));
	}

	#[test]
	fn depth_maps_near_to_white() {
		let frame = Frame {
			width: 3,
			height: 1,
			pixels: vec![
				PixelSample { color: Vec3::zero(), t: 1.0, normal: Vec3::new(0.0, -1.0, 0.0) },
				PixelSample { color: Vec3::zero(), t: 3.0, normal: Vec3::zero() },
				PixelSample::default(),
			],
			rays: RayCounts::default(),
		};
		let depth = frame.depth_image(2.0, 4.0);
		assert_eq!(depth.get(0, 0), Vec3::thrice(1.0));
		assert_eq!(depth.get(1, 0), Vec3::thrice(0.5));
		assert_eq!(depth.get(2, 0), Vec3::zero());
		assert_eq!(frame.normals_image().get(0, 0), Vec3::new(0.0, 1.0, 0.0));
	}
}
