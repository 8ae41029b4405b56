use std::fmt;

use crate::camera::Camera;
use crate::geometry::*;
use crate::grid::{self, Grid};
use crate::light::Light;
use crate::math::*;
use crate::primitive::*;

/// Handle of a node inside a `SceneGraph`, as stored in grid cells
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub(crate) u32);

impl NodeRef {
	fn index(self) -> usize {
		self.0 as usize
	}
}

/// Node handed out by `SceneBuilder`. It cannot be cloned: attaching it to a
/// parent consumes it, so every node ends up with a single owner.
#[derive(Debug, PartialEq, Eq)]
pub struct NodeId(NodeRef);

pub struct Transform {
	matrix: Mat4,
	inverse: Option<Mat4>,
	/// inverse transpose, brings child normals back to world space
	normal_matrix: Option<Mat4>,
	child: NodeRef,
}

impl Transform {
	pub fn matrix(&self) -> &Mat4 {
		&self.matrix
	}
}

pub enum Node {
	Sphere(Sphere),
	Plane(Plane),
	Triangle(Triangle),
	Transform(Transform),
	Group(Vec<NodeRef>),
	Grid(Grid),
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			Node::Sphere(ref s) => write!(f, "Sphere({:?}, {})", s.center, s.radius),
			Node::Plane(ref p) => write!(f, "Plane({:?}, {})", p.normal, p.d),
			Node::Triangle(ref t) => write!(f, "Triangle({:?}, {:?}, {:?})", t.a, t.b, t.c),
			Node::Transform(ref t) => write!(f, "Transform(-> {:?})", t.child),
			Node::Group(ref children) => write!(f, "Group({} children)", children.len()),
			Node::Grid(ref g) => write!(f, "Grid({:?})", g.dims()),
		}
	}
}

/// Arena in which a scene tree is assembled bottom-up
#[derive(Default)]
pub struct SceneBuilder {
	nodes: Vec<Node>,
	bboxes: Vec<Option<AABB>>,
}

impl SceneBuilder {
	pub fn new() -> SceneBuilder {
		SceneBuilder::default()
	}

	fn push(&mut self, node: Node, bbox: Option<AABB>) -> NodeId {
		let id = NodeRef(self.nodes.len() as u32);
		self.nodes.push(node);
		self.bboxes.push(bbox);
		NodeId(id)
	}

	pub fn sphere(&mut self, sphere: Sphere) -> NodeId {
		let bbox = sphere.aabb();
		self.push(Node::Sphere(sphere), bbox)
	}

	pub fn plane(&mut self, plane: Plane) -> NodeId {
		self.push(Node::Plane(plane), None)
	}

	pub fn triangle(&mut self, triangle: Triangle) -> NodeId {
		let bbox = triangle.aabb();
		self.push(Node::Triangle(triangle), bbox)
	}

	/// A singular `matrix` is accepted; the node then never reports a hit.
	pub fn transform(&mut self, matrix: Mat4, child: NodeId) -> NodeId {
		let child = child.0;
		let inverse = matrix.inverse();
		let bbox = match inverse {
			Some(_) => self.bboxes[child.index()].map(|b| b.transformed(&matrix)),
			None => None,
		};
		let node = Transform {
			matrix,
			inverse,
			normal_matrix: inverse.map(|m| m.transpose()),
			child,
		};
		self.push(Node::Transform(node), bbox)
	}

	pub fn group(&mut self, children: Vec<NodeId>) -> NodeId {
		let children: Vec<NodeRef> = children.into_iter().map(|c| c.0).collect();
		let mut bbox = AABB::empty();
		for c in &children {
			if let Some(b) = self.bboxes[c.index()] {
				bbox.extend(&b);
			}
		}
		let bbox = if bbox.is_empty() { None } else { Some(bbox) };
		self.push(Node::Group(children), bbox)
	}

	pub fn build(self, root: NodeId) -> SceneGraph {
		SceneGraph {
			nodes: self.nodes,
			bboxes: self.bboxes,
			root: root.0,
			accel: None,
		}
	}
}

/// Immutable scene tree, optionally accelerated by a uniform grid
pub struct SceneGraph {
	nodes: Vec<Node>,
	bboxes: Vec<Option<AABB>>,
	root: NodeRef,
	accel: Option<NodeRef>,
}

impl SceneGraph {
	pub fn root(&self) -> NodeRef {
		self.root
	}

	pub fn node(&self, id: NodeRef) -> &Node {
		&self.nodes[id.index()]
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// World-space box of a node, `None` when unbounded or empty
	pub fn aabb(&self, id: NodeRef) -> Option<AABB> {
		self.bboxes[id.index()]
	}

	pub fn grid(&self) -> Option<&Grid> {
		match self.accel.map(|id| self.node(id)) {
			Some(Node::Grid(g)) => Some(g),
			_ => None,
		}
	}

	/// Build a `nx * ny * nz` grid over the root's bounding box and route
	/// every later query through it, replacing any grid built before.
	/// Returns `false` (and keeps the previous state) if the scene has no
	/// finite extent or the cell count is out of range.
	pub fn build_grid(&mut self, dims: [usize; 3]) -> bool {
		let bbox = match self.aabb(self.root) {
			Some(b) => b.padded(EPSILON),
			None => return false,
		};
		if grid::cell_count(dims).is_none() {
			warn!("grid of {}x{}x{} cells is out of range", dims[0], dims[1], dims[2]);
			return false;
		}

		let mut grid = Grid::new(bbox, dims);
		self.register(self.root, &mut grid);

		let (refs, used) = grid.occupancy();
		debug!("grid {:?}: {} references in {} non-empty cells, {} unbounded nodes",
			grid.dims(), refs, used, grid.unbounded().len());

		match self.accel {
			Some(id) => {
				self.nodes[id.index()] = Node::Grid(grid);
				self.bboxes[id.index()] = Some(bbox);
			}
			None => {
				let id = NodeRef(self.nodes.len() as u32);
				self.nodes.push(Node::Grid(grid));
				self.bboxes.push(Some(bbox));
				self.accel = Some(id);
			}
		}
		true
	}

	fn register(&self, id: NodeRef, grid: &mut Grid) {
		match *self.node(id) {
			Node::Sphere(ref s) => {
				grid.register_where(id, |center, r| (center - s.center).length() <= s.radius + r)
			}
			Node::Plane(_) => grid.add_unbounded(id),
			Node::Triangle(_) | Node::Transform(_) => match self.aabb(id) {
				Some(b) => grid.register_box(id, &b),
				None => grid.add_unbounded(id),
			},
			Node::Group(ref children) => {
				for &c in children {
					self.register(c, grid);
				}
			}
			Node::Grid(_) => {}
		}
	}

	/// Closest hit in `(tmin, hit.t)`, through the grid when one is built
	pub fn intersect<'a>(&'a self, ray: Ray, hit: &mut Hit<'a>, tmin: f32) -> bool {
		self.intersect_node(self.accel.unwrap_or(self.root), ray, hit, tmin)
	}

	/// Same as `intersect`, ignoring the grid
	pub fn intersect_brute_force<'a>(&'a self, ray: Ray, hit: &mut Hit<'a>, tmin: f32) -> bool {
		self.intersect_node(self.root, ray, hit, tmin)
	}

	/// Whether anything lies in `(tmin, tmax)` along the ray
	pub fn occluded(&self, ray: Ray, tmin: f32, tmax: f32) -> bool {
		self.occludes_node(self.accel.unwrap_or(self.root), ray, tmin, tmax)
	}

	pub fn intersect_node<'a>(&'a self, id: NodeRef, ray: Ray, hit: &mut Hit<'a>, tmin: f32) -> bool {
		match *self.node(id) {
			Node::Sphere(ref s) => s.intersect(ray, hit, tmin),
			Node::Plane(ref p) => p.intersect(ray, hit, tmin),
			Node::Triangle(ref t) => t.intersect(ray, hit, tmin),
			Node::Transform(ref tr) => {
				let (inverse, normal_matrix) = match (tr.inverse, tr.normal_matrix) {
					(Some(i), Some(n)) => (i, n),
					_ => return false,
				};
				if !self.intersect_node(tr.child, ray.transformed(&inverse), hit, tmin) {
					return false;
				}
				let normal = normal_matrix.transform_vector(hit.normal);
				hit.normal = normal.try_normalized().unwrap_or(hit.normal);
				hit.ray = ray;
				true
			}
			Node::Group(ref children) => {
				let mut found = false;
				for &c in children {
					if self.intersect_node(c, ray, hit, tmin) {
						found = true;
					}
				}
				found
			}
			Node::Grid(ref grid) => {
				let mut found = false;
				for &item in grid.unbounded() {
					if self.intersect_node(item, ray, hit, tmin) {
						found = true;
					}
				}
				grid.march(ray, tmin, |cell| {
					for &item in cell.items {
						if self.intersect_node(item, ray, hit, tmin) {
							found = true;
						}
					}
					// cells come nearest first: nothing beyond this one can be closer
					hit.t <= cell.t_exit
				});
				found
			}
		}
	}

	pub fn occludes_node(&self, id: NodeRef, ray: Ray, tmin: f32, tmax: f32) -> bool {
		match *self.node(id) {
			Node::Sphere(ref s) => s.occludes(ray, tmin, tmax),
			Node::Plane(ref p) => p.occludes(ray, tmin, tmax),
			Node::Triangle(ref t) => t.occludes(ray, tmin, tmax),
			Node::Transform(ref tr) => match tr.inverse {
				Some(ref inv) => self.occludes_node(tr.child, ray.transformed(inv), tmin, tmax),
				None => false,
			},
			Node::Group(ref children) => children.iter().any(|&c| self.occludes_node(c, ray, tmin, tmax)),
			Node::Grid(ref grid) => {
				if grid.unbounded().iter().any(|&item| self.occludes_node(item, ray, tmin, tmax)) {
					return true;
				}
				let mut blocked = false;
				grid.march(ray, tmin, |cell| {
					if cell.t_enter >= tmax {
						return true;
					}
					blocked = cell.items.iter().any(|&item| self.occludes_node(item, ray, tmin, tmax));
					blocked
				});
				blocked
			}
		}
	}
}

/// Everything the tracer needs: geometry, lights and camera
pub struct Scene {
	pub camera: Box<dyn Camera + Send + Sync>,
	pub lights: Vec<Box<dyn Light + Send + Sync>>,
	pub ambient: Vec3,
	pub background: Vec3,
	pub graph: SceneGraph,
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::material::Material;

	fn gray() -> Arc<Material> {
		Arc::new(Material::diffuse(Vec3::thrice(0.5)))
	}

	fn two_spheres() -> SceneGraph {
		let mut b = SceneBuilder::new();
		let near = b.sphere(Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, gray()));
		let far = b.sphere(Sphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0, gray()));
		let root = b.group(vec![far, near]);
		b.build(root)
	}

	#[test]
	fn group_reports_closest_child() {
		let graph = two_spheres();
		let ray = Ray::new(Vec3::zero(), Vec3::new(0.0, 0.0, 1.0));
		let mut hit = Hit::new(ray, INFINITY);
		assert!(graph.intersect(ray, &mut hit, 0.0));
		assert!((hit.t - 4.0).abs() < 1e-4);
	}

	#[test]
	fn group_box_encloses_children() {
		let graph = two_spheres();
		let bbox = graph.aabb(graph.root()).unwrap();
		assert_eq!(bbox.min, Vec3::new(-1.0, -1.0, 4.0));
		assert_eq!(bbox.max, Vec3::new(1.0, 1.0, 11.0));
	}

	#[test]
	fn scaled_sphere_has_unit_world_normals() {
		let mut b = SceneBuilder::new();
		let s = b.sphere(Sphere::new(Vec3::zero(), 1.0, gray()));
		let root = b.transform(Mat4::scale(Vec3::new(1.0, 3.0, 1.0)), s);
		let graph = b.build(root);

		let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.1, 0.4, 1.0));
		let mut hit = Hit::new(ray, INFINITY);
		assert!(graph.intersect(ray, &mut hit, 0.0));
		assert!((hit.normal.length() - 1.0).abs() < 1e-5);
		assert_eq!(hit.ray.direction, ray.direction);
		// the hit point lies on the stretched surface x² + (y/3)² + z² = 1
		let p = hit.point();
		assert!((p.x * p.x + p.y * p.y / 9.0 + p.z * p.z - 1.0).abs() < 1e-3);
	}

	#[test]
	fn translated_sphere_keeps_world_distance() {
		let mut b = SceneBuilder::new();
		let s = b.sphere(Sphere::new(Vec3::zero(), 1.0, gray()));
		let root = b.transform(Mat4::translate(Vec3::new(0.0, 0.0, 5.0)), s);
		let graph = b.build(root);

		let ray = Ray::new(Vec3::zero(), Vec3::new(0.0, 0.0, 2.0));
		let mut hit = Hit::new(ray, INFINITY);
		assert!(graph.intersect(ray, &mut hit, 0.0));
		assert!((hit.t - 2.0).abs() < 1e-4);
		assert!((hit.point() - Vec3::new(0.0, 0.0, 4.0)).length() < 1e-4);
	}

	#[test]
	fn singular_transform_never_hits() {
		let mut b = SceneBuilder::new();
		let s = b.sphere(Sphere::new(Vec3::zero(), 1.0, gray()));
		let root = b.transform(Mat4::scale(Vec3::new(1.0, 0.0, 1.0)), s);
		let graph = b.build(root);

		let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
		let mut hit = Hit::new(ray, INFINITY);
		assert!(!graph.intersect(ray, &mut hit, 0.0));
		assert!(!graph.occluded(ray, 0.0, INFINITY));
		assert!(graph.aabb(graph.root()).is_none());
	}

	#[test]
	fn grid_registers_nested_primitives_only() {
		let mut graph = two_spheres();
		let nodes = graph.len();
		assert!(graph.build_grid([1, 1, 4]));
		assert_eq!(graph.len(), nodes + 1);

		let grid = graph.grid().unwrap();
		let registered: Vec<NodeRef> = (0..4).flat_map(|k| grid.cell([0, 0, k]).to_vec()).collect();
		assert!(registered.iter().all(|&id| match *graph.node(id) {
			Node::Sphere(_) => true,
			_ => false,
		}));
		assert!(registered.contains(&NodeRef(0)));
		assert!(registered.contains(&NodeRef(1)));
	}

	#[test]
	fn grid_and_tree_agree() {
		let mut graph = two_spheres();
		assert!(graph.build_grid([3, 3, 8]));
		for &(x, y) in &[(0.0, 0.0), (0.5, 0.5), (0.9, -0.2), (2.0, 0.0)] {
			let ray = Ray::new(Vec3::new(x, y, -1.0), Vec3::new(0.0, 0.0, 1.0));
			let mut a = Hit::new(ray, INFINITY);
			let mut b = Hit::new(ray, INFINITY);
			assert_eq!(graph.intersect(ray, &mut a, 0.0), graph.intersect_brute_force(ray, &mut b, 0.0));
			assert_eq!(a.t, b.t);
		}
	}

	#[test]
	fn grid_occlusion_stops_at_max_distance() {
		let mut graph = two_spheres();
		assert!(graph.build_grid([2, 2, 6]));
		let ray = Ray::new(Vec3::zero(), Vec3::new(0.0, 0.0, 1.0));
		assert!(graph.occluded(ray, EPSILON, 100.0));
		assert!(!graph.occluded(ray, EPSILON, 3.5));
		let side = Ray::new(Vec3::new(5.0, 0.0, 5.0), Vec3::new(0.0, 1.0, 0.0));
		assert!(!graph.occluded(side, EPSILON, 100.0));
	}

	#[test]
	fn floor_outside_the_grid_box_is_still_hit() {
		let mut b = SceneBuilder::new();
		let floor = b.plane(Plane::new(Vec3::new(0.0, 1.0, 0.0), 0.0, gray()).unwrap());
		let ball = b.sphere(Sphere::new(Vec3::new(0.0, 2.0, 0.0), 1.0, gray()));
		let root = b.group(vec![floor, ball]);
		let mut graph = b.build(root);
		assert!(graph.build_grid([4, 4, 4]));
		assert_eq!(graph.grid().unwrap().unbounded(), &[NodeRef(0)]);

		for i in 0..20 {
			for j in 0..20 {
				let origin = Vec3::new(-5.0 + 0.5 * i as f32, 5.0, -5.0 + 0.5 * j as f32);
				let ray = Ray::new(origin, Vec3::new(0.1, -1.0, 0.05));
				let mut a = Hit::new(ray, INFINITY);
				let mut b = Hit::new(ray, INFINITY);
				assert!(graph.intersect(ray, &mut a, 0.0));
				assert!(graph.intersect_brute_force(ray, &mut b, 0.0));
				assert!((a.t - b.t).abs() < 1e-5, "grid t {} vs tree t {} ({:?})", a.t, b.t, ray);
			}
		}

		let down = Ray::new(Vec3::new(3.0, 1.0, 3.0), Vec3::new(0.0, -1.0, 0.0));
		assert!(graph.occluded(down, EPSILON, 2.0));
		assert!(!graph.occluded(down, EPSILON, 0.5));
	}

	#[test]
	fn rebuilding_the_grid_reuses_its_node() {
		let mut graph = two_spheres();
		assert!(graph.build_grid([2, 2, 2]));
		let nodes = graph.len();
		assert!(graph.build_grid([3, 3, 6]));
		assert_eq!(graph.len(), nodes);
		assert_eq!(graph.grid().unwrap().dims(), [3, 3, 6]);

		assert!(!graph.build_grid([5000, 5000, 5000]));
		assert_eq!(graph.grid().unwrap().dims(), [3, 3, 6]);
	}

	#[test]
	fn unbounded_scene_keeps_brute_force() {
		let mut b = SceneBuilder::new();
		let p = b.plane(Plane::new(Vec3::new(0.0, 1.0, 0.0), 0.0, gray()).unwrap());
		let root = b.group(vec![p]);
		let mut graph = b.build(root);
		assert!(!graph.build_grid([4, 4, 4]));
		assert!(graph.grid().is_none());
		let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
		assert!(graph.occluded(ray, 0.0, INFINITY));
	}
}
