//! JSON scene description.
//!
//! ```json
//! {
//!   "camera": { "type": "perspective", "center": [0, 0, 10], "direction": [0, 0, -1], "up": [0, 1, 0], "angle": 30 },
//!   "background": [0.2, 0.2, 0.2],
//!   "ambient": 0.1,
//!   "lights": [ { "type": "directional", "direction": [-0.5, -0.5, -1], "color": 0.9 } ],
//!   "materials": [ { "diffuse": [1, 0, 0], "specular": 0.5, "exponent": 20, "reflective": 0.3 } ],
//!   "root": { "type": "group", "children": [
//!     { "type": "sphere", "center": [0, 0, 0], "radius": 1, "material": 0 },
//!     { "type": "transform", "transforms": [ { "translate": [0, 2, 0] }, { "uniform_scale": 0.5 } ],
//!       "child": { "type": "mesh", "file": "bunny.obj", "material": 0 } }
//!   ] }
//! }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use time::PreciseTime;

use crate::camera::{self, Camera};
use crate::error::{Error, Result};
use crate::light;
use crate::material::Material;
use crate::math;
use crate::obj;
use crate::primitive::{Plane, Sphere, Triangle};
use crate::scene::{NodeId, Scene, SceneBuilder};

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(untagged)]
enum Vec3 {
	Thrice(f32),
	Explicit(f32, f32, f32),
}

#[derive(Deserialize, Debug)]
struct SceneDesc {
	camera: CameraDesc,
	#[serde(default)]
	background: Option<Vec3>,
	#[serde(default)]
	ambient: Option<Vec3>,
	#[serde(default)]
	lights: Vec<LightDesc>,
	#[serde(default)]
	materials: Vec<MaterialDesc>,
	root: NodeDesc,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CameraDesc {
	Orthographic { center: Vec3, direction: Vec3, up: Vec3, size: f32 },
	Perspective { center: Vec3, direction: Vec3, up: Vec3, angle: f32 },
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum LightDesc {
	Directional { direction: Vec3, color: Vec3 },
	Point { position: Vec3, color: Vec3, attenuation: Option<[f32; 3]> },
}

#[derive(Deserialize, Debug)]
struct MaterialDesc {
	diffuse: Vec3,
	specular: Option<Vec3>,
	exponent: Option<f32>,
	reflective: Option<Vec3>,
	transparent: Option<Vec3>,
	index_of_refraction: Option<f32>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum NodeDesc {
	Group { children: Vec<NodeDesc> },
	Sphere { center: Vec3, radius: f32, material: usize },
	Plane { normal: Vec3, offset: f32, material: usize },
	Triangle { a: Vec3, b: Vec3, c: Vec3, material: usize },
	Transform { transforms: Vec<TransformDesc>, child: Box<NodeDesc> },
	Mesh { file: String, material: usize },
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
enum TransformDesc {
	Translate(Vec3),
	Scale(Vec3),
	UniformScale(f32),
	XRotate(f32),
	YRotate(f32),
	ZRotate(f32),
	Rotate { axis: Vec3, angle: f32 },
	Matrix(Vec<f32>),
}

fn scene_error<S: Into<String>>(msg: S) -> Error {
	Error::Scene(msg.into())
}

impl Vec3 {
	fn convert(self) -> math::Vec3 {
		match self {
			Vec3::Thrice(v) => math::Vec3::thrice(v),
			Vec3::Explicit(x, y, z) => math::Vec3 { x, y, z },
		}
	}
}

impl CameraDesc {
	fn convert(self) -> Result<Box<dyn Camera + Send + Sync>> {
		Ok(match self {
			CameraDesc::Orthographic { center, direction, up, size } => Box::new(
				camera::OrthographicCamera::new(center.convert(), direction.convert(), up.convert(), size)?
			),
			CameraDesc::Perspective { center, direction, up, angle } => Box::new(
				camera::PerspectiveCamera::new(center.convert(), direction.convert(), up.convert(), angle)?
			),
		})
	}
}

impl LightDesc {
	fn convert(self) -> Result<Box<dyn light::Light + Send + Sync>> {
		Ok(match self {
			LightDesc::Directional { direction, color } => Box::new(
				light::DirectionalLight::new(direction.convert(), color.convert())
					.ok_or_else(|| scene_error("directional light with a zero direction"))?
			),
			LightDesc::Point { position, color, attenuation } => {
				let attenuation = attenuation.unwrap_or([1.0, 0.0, 0.0]);
				if attenuation.iter().any(|&a| a < 0.0) {
					return Err(scene_error(format!("negative light attenuation {:?}", attenuation)));
				}
				Box::new(light::PointLight::new(position.convert(), color.convert(), attenuation))
			}
		})
	}
}

impl MaterialDesc {
	fn convert(self) -> Result<Material> {
		let ior = self.index_of_refraction.unwrap_or(1.0);
		if !(ior > 0.0) {
			return Err(scene_error(format!("index of refraction must be positive, got {}", ior)));
		}
		let zero = math::Vec3::zero();
		Ok(Material {
			diffuse: self.diffuse.convert(),
			specular: self.specular.map_or(zero, Vec3::convert),
			exponent: self.exponent.unwrap_or(1.0),
			reflective: self.reflective.map_or(zero, Vec3::convert),
			transparent: self.transparent.map_or(zero, Vec3::convert),
			index_of_refraction: ior,
		})
	}
}

/// Shared state of a node tree conversion
struct Converter<'a> {
	dir: &'a Path,
	materials: &'a [Arc<Material>],
	builder: SceneBuilder,
}

impl<'a> Converter<'a> {
	fn material(&self, idx: usize) -> Result<Arc<Material>> {
		self.materials.get(idx).cloned().ok_or_else(|| {
			scene_error(format!("material index {} out of range ({} materials)", idx, self.materials.len()))
		})
	}

	fn node(&mut self, desc: NodeDesc) -> Result<NodeId> {
		match desc {
			NodeDesc::Group { children } => {
				let mut ids = Vec::with_capacity(children.len());
				for c in children {
					ids.push(self.node(c)?);
				}
				Ok(self.builder.group(ids))
			}
			NodeDesc::Sphere { center, radius, material } => {
				if !(radius >= 0.0) {
					return Err(scene_error(format!("sphere radius must be non-negative, got {}", radius)));
				}
				let m = self.material(material)?;
				Ok(self.builder.sphere(Sphere::new(center.convert(), radius, m)))
			}
			NodeDesc::Plane { normal, offset, material } => {
				let m = self.material(material)?;
				let plane = Plane::new(normal.convert(), offset, m)
					.ok_or_else(|| scene_error("plane with a zero normal"))?;
				Ok(self.builder.plane(plane))
			}
			NodeDesc::Triangle { a, b, c, material } => {
				let m = self.material(material)?;
				Ok(self.builder.triangle(Triangle::new(a.convert(), b.convert(), c.convert(), m)))
			}
			NodeDesc::Transform { transforms, child } => {
				let mut matrix = math::Mat4::identity();
				for t in transforms {
					matrix = matrix * t.convert()?;
				}
				let child = self.node(*child)?;
				Ok(self.builder.transform(matrix, child))
			}
			NodeDesc::Mesh { file, material } => {
				let m = self.material(material)?;
				let mesh = obj::load(self.dir.join(&file))?;
				let mut ids = Vec::with_capacity(mesh.faces.len());
				for [a, b, c] in mesh.triangles() {
					ids.push(self.builder.triangle(Triangle::new(a, b, c, m.clone())));
				}
				Ok(self.builder.group(ids))
			}
		}
	}
}

impl TransformDesc {
	fn convert(self) -> Result<math::Mat4> {
		use crate::math::Mat4;
		let x = math::Vec3::new(1.0, 0.0, 0.0);
		let y = math::Vec3::new(0.0, 1.0, 0.0);
		let z = math::Vec3::new(0.0, 0.0, 1.0);
		Ok(match self {
			TransformDesc::Translate(v) => Mat4::translate(v.convert()),
			TransformDesc::Scale(v) => Mat4::scale(v.convert()),
			TransformDesc::UniformScale(s) => Mat4::scale(math::Vec3::thrice(s)),
			TransformDesc::XRotate(deg) => Mat4::rotation(x, deg),
			TransformDesc::YRotate(deg) => Mat4::rotation(y, deg),
			TransformDesc::ZRotate(deg) => Mat4::rotation(z, deg),
			TransformDesc::Rotate { axis, angle } => {
				let axis = axis.convert().try_normalized()
					.ok_or_else(|| scene_error("rotation around a zero axis"))?;
				Mat4::rotation(axis, angle)
			}
			TransformDesc::Matrix(values) => {
				if values.len() != 16 {
					return Err(scene_error(format!("matrix needs 16 values, got {}", values.len())));
				}
				let mut m = [0f32; 16];
				m.copy_from_slice(&values);
				Mat4::from_rows(m)
			}
		})
	}
}

impl SceneDesc {
	fn convert(self, dir: &Path) -> Result<Scene> {
		let materials = self.materials.into_iter()
			.map(|m| m.convert().map(Arc::new))
			.collect::<Result<Vec<_>>>()?;
		let lights = self.lights.into_iter()
			.map(LightDesc::convert)
			.collect::<Result<Vec<_>>>()?;
		let camera = self.camera.convert()?;

		let mut conv = Converter { dir, materials: &materials, builder: SceneBuilder::new() };
		let root = conv.node(self.root)?;
		let graph = conv.builder.build(root);

		Ok(Scene {
			camera,
			lights,
			ambient: self.ambient.map_or(math::Vec3::zero(), Vec3::convert),
			background: self.background.map_or(math::Vec3::zero(), Vec3::convert),
			graph,
		})
	}
}

/// Build a scene from its JSON description. Mesh files are looked up
/// relative to `dir`.
pub fn parse_scene(json: &str, dir: &Path) -> Result<Scene> {
	let desc: SceneDesc = serde_json::from_str(json)?;
	desc.convert(dir)
}

/// Read a scene file
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<Scene> {
	let path = path.as_ref();
	let start = PreciseTime::now();
	let json = fs::read_to_string(path)?;
	let dir = path.parent().unwrap_or_else(|| Path::new("."));
	let scene = parse_scene(&json, dir)?;
	info!("loaded scene {} ({} nodes, {} lights) in {}ms",
		path.display(), scene.graph.len(), scene.lights.len(),
		start.to(PreciseTime::now()).num_milliseconds());
	Ok(scene)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::geometry::Hit;
	use crate::math::{Ray, INFINITY};
	use crate::scene::Node;

	const HEADER: &str = r#"
		"camera": { "type": "orthographic", "center": [0, 0, 10], "direction": [0, 0, -1], "up": [0, 1, 0], "size": 5 },
		"materials": [ { "diffuse": [1, 0, 0] } ],
	"#;

	fn parse(root: &str) -> Result<Scene> {
		parse_scene(&format!("{{ {} \"root\": {} }}", HEADER, root), Path::new("."))
	}

	#[test]
	fn full_description_is_loaded() {
		let json = r#"{
			"camera": { "type": "perspective", "center": [0, 0, 10], "direction": [0, 0, -1], "up": [0, 1, 0], "angle": 30 },
			"background": [0.1, 0.2, 0.3],
			"ambient": 0.25,
			"lights": [
				{ "type": "directional", "direction": [0, 0, -1], "color": 1 },
				{ "type": "point", "position": [0, 5, 0], "color": [1, 1, 1], "attenuation": [1, 0, 0.1] }
			],
			"materials": [
				{ "diffuse": [1, 0, 0], "specular": 0.5, "exponent": 20 },
				{ "diffuse": 0, "transparent": 0.9, "index_of_refraction": 1.5 }
			],
			"root": { "type": "group", "children": [
				{ "type": "sphere", "center": [0, 0, 0], "radius": 1, "material": 0 },
				{ "type": "plane", "normal": [0, 2, 0], "offset": -2, "material": 1 },
				{ "type": "triangle", "a": [0, 0, 0], "b": [1, 0, 0], "c": [0, 1, 0], "material": 1 },
				{ "type": "transform", "transforms": [ { "translate": [3, 0, 0] }, { "y_rotate": 90 }, { "uniform_scale": 2 } ],
				  "child": { "type": "sphere", "center": [0, 0, 0], "radius": 0.5, "material": 1 } }
			] }
		}"#;
		let scene = parse_scene(json, Path::new(".")).unwrap();
		assert_eq!(scene.lights.len(), 2);
		assert_eq!(scene.ambient, math::Vec3::thrice(0.25));
		assert_eq!(scene.background, math::Vec3::new(0.1, 0.2, 0.3));
		// 4 children, the transformed sphere and the group
		assert_eq!(scene.graph.len(), 6);
		match *scene.graph.node(scene.graph.root()) {
			Node::Group(ref children) => assert_eq!(children.len(), 4),
			ref other => panic!("unexpected root {:?}", other),
		}

		// the transformed sphere has radius 1 and sits at x = 3
		let ray = Ray::new(math::Vec3::new(3.0, 0.0, 10.0), math::Vec3::new(0.0, 0.0, -1.0));
		let mut hit = Hit::new(ray, INFINITY);
		assert!(scene.graph.intersect(ray, &mut hit, 0.0));
		assert!((hit.t - 9.0).abs() < 1e-4);
		let m = hit.material.unwrap();
		assert_eq!(m.index_of_refraction, 1.5);
	}

	#[test]
	fn bad_material_index_is_an_error() {
		let r = parse(r#"{ "type": "sphere", "center": [0, 0, 0], "radius": 1, "material": 3 }"#);
		match r {
			Err(Error::Scene(msg)) => assert!(msg.contains("material index 3")),
			_ => panic!("expected a scene error"),
		}
	}

	#[test]
	fn invalid_geometry_is_rejected() {
		assert!(parse(r#"{ "type": "sphere", "center": 0, "radius": -1, "material": 0 }"#).is_err());
		assert!(parse(r#"{ "type": "plane", "normal": 0, "offset": 1, "material": 0 }"#).is_err());
		assert!(parse(r#"{ "type": "transform", "transforms": [ { "matrix": [1, 0, 0] } ],
			"child": { "type": "sphere", "center": 0, "radius": 1, "material": 0 } }"#).is_err());
		assert!(parse(r#"{ "type": "cone" }"#).is_err());
	}

	#[test]
	fn zero_camera_direction_is_rejected() {
		let json = r#"{
			"camera": { "type": "orthographic", "center": [0, 0, 10], "direction": 0, "up": [0, 1, 0], "size": 5 },
			"root": { "type": "group", "children": [] }
		}"#;
		assert!(parse_scene(json, Path::new(".")).is_err());
	}
}
