use crate::math::*;
use crate::scene::NodeRef;

/// Widening of a bounding box, in cell units, when computing the cells it overlaps
const CELL_SLACK: f32 = 1e-3;

/// Largest number of cells a grid may have
pub const MAX_GRID_CELLS: usize = 1 << 24;

/// Total number of cells of a `nx * ny * nz` grid, `None` if a count is zero
/// or the total exceeds `MAX_GRID_CELLS`
pub fn cell_count(dims: [usize; 3]) -> Option<usize> {
	if dims.iter().any(|&n| n == 0) {
		return None;
	}
	dims[0].checked_mul(dims[1])
		.and_then(|n| n.checked_mul(dims[2]))
		.filter(|&n| n <= MAX_GRID_CELLS)
}

/// Uniform grid over a bounding box. Each cell lists the scene nodes that may
/// overlap it; nodes without a finite extent are kept aside and tested by
/// every query. The grid indexes nodes, it does not own them.
#[derive(Debug)]
pub struct Grid {
	bbox: AABB,
	dims: [usize; 3],
	cell_size: Vec3,
	cells: Vec<Vec<NodeRef>>,
	unbounded: Vec<NodeRef>,
}

/// A cell reached by the march, handed to the visitor of `Grid::march`
pub struct GridCell<'g> {
	pub index: [usize; 3],
	pub t_enter: f32,
	pub t_exit: f32,
	/// normal of the face the ray came through, zero for the starting cell of
	/// a ray whose origin is inside the grid
	pub normal: Vec3,
	pub items: &'g [NodeRef],
}

impl Grid {
	/// Empty grid of `nx * ny * nz` cells; counts are raised to at least 1.
	/// The caller checks the total with `cell_count`.
	pub fn new(bbox: AABB, dims: [usize; 3]) -> Grid {
		let dims = [dims[0].max(1), dims[1].max(1), dims[2].max(1)];
		let size = bbox.size();
		let cell_size = Vec3::new(
			size.x / dims[0] as f32,
			size.y / dims[1] as f32,
			size.z / dims[2] as f32,
		);
		Grid {
			bbox,
			dims,
			cell_size,
			cells: vec![Vec::new(); dims[0] * dims[1] * dims[2]],
			unbounded: Vec::new(),
		}
	}

	pub fn bbox(&self) -> AABB {
		self.bbox
	}

	pub fn dims(&self) -> [usize; 3] {
		self.dims
	}

	pub fn cell_size(&self) -> Vec3 {
		self.cell_size
	}

	pub fn cell(&self, index: [usize; 3]) -> &[NodeRef] {
		&self.cells[self.flat_index(index)]
	}

	pub fn cell_center(&self, index: [usize; 3]) -> Vec3 {
		let mut c = self.bbox.min;
		for &axis in &Axis::ALL {
			let i = axis.index();
			c[axis] += (index[i] as f32 + 0.5) * self.cell_size[axis];
		}
		c
	}

	/// Nodes with no finite box, tested outside of the march
	pub fn unbounded(&self) -> &[NodeRef] {
		&self.unbounded
	}

	pub fn add_unbounded(&mut self, item: NodeRef) {
		self.unbounded.push(item);
	}

	/// Half the diagonal of one cell
	pub fn cell_radius(&self) -> f32 {
		0.5 * self.cell_size.length()
	}

	/// Number of (cell, node) pairs and of non-empty cells
	pub fn occupancy(&self) -> (usize, usize) {
		let refs = self.cells.iter().map(|c| c.len()).sum();
		let used = self.cells.iter().filter(|c| !c.is_empty()).count();
		(refs, used)
	}

	fn flat_index(&self, [i, j, k]: [usize; 3]) -> usize {
		(i * self.dims[1] + j) * self.dims[2] + k
	}

	fn insert(&mut self, index: [usize; 3], item: NodeRef) {
		let idx = self.flat_index(index);
		self.cells[idx].push(item);
	}

	fn all_indices(&self) -> Vec<[usize; 3]> {
		let mut v = Vec::with_capacity(self.cells.len());
		for i in 0..self.dims[0] {
			for j in 0..self.dims[1] {
				for k in 0..self.dims[2] {
					v.push([i, j, k]);
				}
			}
		}
		v
	}

	/// Register `item` in every cell overlapped by `aabb` (conservatively)
	pub fn register_box(&mut self, item: NodeRef, aabb: &AABB) {
		let mut lo = [0usize; 3];
		let mut hi = [0usize; 3];
		for &axis in &Axis::ALL {
			let a = axis.index();
			let n = self.dims[a];
			let to_cell = |x: f32| {
				if self.cell_size[axis] > 0.0 {
					(x - self.bbox.min[axis]) / self.cell_size[axis]
				} else {
					0.0
				}
			};
			lo[a] = clamp_cell(to_cell(aabb.min[axis]) - CELL_SLACK, n);
			hi[a] = clamp_cell(to_cell(aabb.max[axis]) + CELL_SLACK, n);
		}

		for i in lo[0]..=hi[0] {
			for j in lo[1]..=hi[1] {
				for k in lo[2]..=hi[2] {
					self.insert([i, j, k], item);
				}
			}
		}
	}

	/// Register `item` in every cell for which `overlaps(cell_center, cell_radius)` holds
	pub fn register_where<F>(&mut self, item: NodeRef, overlaps: F)
		where F: Fn(Vec3, f32) -> bool
	{
		let radius = self.cell_radius();
		for index in self.all_indices() {
			if overlaps(self.cell_center(index), radius) {
				self.insert(index, item);
			}
		}
	}

	/// Walk the cells pierced by the ray beyond `tmin`, nearest first, and
	/// call `visit` on each of them until it returns `true` or the ray leaves
	/// the grid. Returns whether the visitor stopped the march.
	pub fn march<F>(&self, ray: Ray, tmin: f32, mut visit: F) -> bool
		where F: FnMut(&GridCell) -> bool
	{
		let mut march = match GridMarch::start(self, ray, tmin) {
			Some(m) => m,
			None => return false,
		};

		loop {
			let index = match march.cell(self.dims) {
				Some(index) => index,
				None => return false,
			};
			let t_exit = march.t_exit().min(march.t_far);
			let cell = GridCell {
				index,
				t_enter: march.t,
				t_exit,
				normal: march.normal,
				items: self.cell(index),
			};
			if visit(&cell) {
				return true;
			}
			if !march.next_cell() {
				return false;
			}
		}
	}
}

fn clamp_cell(x: f32, n: usize) -> usize {
	if x.is_nan() || x <= 0.0 {
		0
	} else {
		(x.floor() as usize).min(n - 1)
	}
}

/// State of a 3D-DDA walk through the grid
#[derive(Debug)]
struct GridMarch {
	cell: [isize; 3],
	step: [isize; 3],
	/// parametric distance of the next boundary crossing, per axis
	t_next: [f32; 3],
	/// parametric distance between two crossings, per axis
	dt: [f32; 3],
	/// parametric distance at which the current cell was entered
	t: f32,
	t_far: f32,
	normal: Vec3,
}

impl GridMarch {
	fn start(grid: &Grid, ray: Ray, tmin: f32) -> Option<GridMarch> {
		let (t_near, t_far) = grid.bbox.clip(&ray)?;
		if t_far < tmin || !(t_near <= t_far) {
			return None;
		}

		let inside = t_near < tmin;
		let t = if inside { tmin } else { t_near };
		let p = ray.point_at(t);
		let len = ray.direction.length();

		let mut march = GridMarch {
			cell: [0; 3],
			step: [0; 3],
			t_next: [INFINITY; 3],
			dt: [INFINITY; 3],
			t,
			t_far,
			normal: Vec3::zero(),
		};

		let mut entry_axis = None;
		let mut entry_t = NEG_INFINITY;

		for &axis in &Axis::ALL {
			let a = axis.index();
			let n = grid.dims[a];
			let size = grid.cell_size[axis];
			let min = grid.bbox.min[axis];
			let o = ray.origin[axis];
			let d = ray.direction[axis];

			// an exact hit on the far boundary would give index n
			let rel = if size > 0.0 { (p[axis] - min) / size } else { 0.0 };
			let i = clamp_cell(rel, n);
			march.cell[a] = i as isize;

			if d.abs() <= std::f32::EPSILON * len {
				continue;
			}

			let (step, boundary) = if d > 0.0 {
				(1, min + (i + 1) as f32 * size)
			} else {
				(-1, min + i as f32 * size)
			};
			march.step[a] = step;
			march.dt[a] = size / d.abs();
			march.t_next[a] = ((boundary - o) / d).max(t);

			let slab_entry = ((grid.bbox.min[axis] - o) / d).min((grid.bbox.max[axis] - o) / d);
			if slab_entry > entry_t {
				entry_t = slab_entry;
				entry_axis = Some(axis);
			}
		}

		if !inside {
			if let Some(axis) = entry_axis {
				march.normal = -Vec3::unit(axis) * march.step[axis.index()] as f32;
			}
		}

		Some(march)
	}

	fn t_exit(&self) -> f32 {
		self.t_next[0].min(self.t_next[1]).min(self.t_next[2])
	}

	fn cell(&self, dims: [usize; 3]) -> Option<[usize; 3]> {
		let mut index = [0usize; 3];
		for a in 0..3 {
			if self.cell[a] < 0 || self.cell[a] >= dims[a] as isize {
				return None;
			}
			index[a] = self.cell[a] as usize;
		}
		Some(index)
	}

	/// Step into the neighbour cell across the nearest boundary. Returns
	/// `false` if the ray never crosses another boundary.
	fn next_cell(&mut self) -> bool {
		let mut axis = 0;
		for a in 1..3 {
			if self.t_next[a] < self.t_next[axis] {
				axis = a;
			}
		}
		if !self.t_next[axis].is_finite() || self.t_next[axis] > self.t_far {
			return false;
		}

		self.t = self.t_next[axis];
		self.t_next[axis] += self.dt[axis];
		self.cell[axis] += self.step[axis];
		self.normal = -Vec3::unit(Axis::ALL[axis]) * self.step[axis] as f32;
		true
	}
}
