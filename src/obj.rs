use std::collections::hash_map::DefaultHasher;
use std::env::temp_dir;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use time::PreciseTime;

use crate::error::{Error, Result};
use crate::math::*;

/// Represent vertex indices in faces; 2^32 vertices should be enough
pub type Index = u32;

/// Triangle soup read from an OBJ file
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct ObjMesh {
	pub vertices: Vec<Vec3>,
	pub faces: Vec<[Index; 3]>,
}

impl ObjMesh {
	/// Whether every face index points at a vertex
	pub fn is_consistent(&self) -> bool {
		let n = self.vertices.len();
		self.faces.iter().flatten().all(|&i| (i as usize) < n)
	}

	pub fn triangles<'a>(&'a self) -> impl Iterator<Item = [Vec3; 3]> + 'a {
		self.faces.iter().map(move |f| {
			[
				self.vertices[f[0] as usize],
				self.vertices[f[1] as usize],
				self.vertices[f[2] as usize],
			]
		})
	}
}

/// Load an OBJ mesh, going through the on-disk cache when it is fresh
pub fn load<P: AsRef<Path>>(path: P) -> Result<ObjMesh> {
	let path = path.as_ref();
	let cache = cache_path(path);

	if let Some(ref cache) = cache {
		if let Ok(f) = File::open(cache) {
			match bincode::deserialize_from::<_, ObjMesh>(BufReader::new(f)) {
				Ok(ref mesh) if !mesh.is_consistent() => {
					warn!("ignoring mesh cache {}: face index out of range", cache.display());
				}
				Ok(mesh) => {
					debug!("mesh {} found in cache", path.display());
					return Ok(mesh);
				}
				Err(e) => warn!("ignoring unreadable mesh cache {}: {}", cache.display(), e),
			}
		}
	}

	let start = PreciseTime::now();
	let f = File::open(path)?;
	let mesh = parse(BufReader::new(f), path)?;
	info!("loaded mesh {} with {} vertices and {} triangles in {}ms",
		path.display(), mesh.vertices.len(), mesh.faces.len(),
		start.to(PreciseTime::now()).num_milliseconds());

	if let Some(ref cache) = cache {
		if let Err(e) = store(cache, &mesh) {
			warn!("could not cache mesh {}: {}", path.display(), e);
		}
	}

	Ok(mesh)
}

/// Cache location, keyed by the mesh path and its modification time
fn cache_path(path: &Path) -> Option<PathBuf> {
	let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
	let mut hasher = DefaultHasher::new();
	path.hash(&mut hasher);
	modified.hash(&mut hasher);
	Some(cache_dir().join(format!("{:016x}", hasher.finish())))
}

fn cache_dir() -> PathBuf {
	temp_dir().join("gridtrace_obj_cache")
}

fn store(cache: &Path, mesh: &ObjMesh) -> Result<()> {
	fs::create_dir_all(cache_dir())?;
	let mut bw = BufWriter::new(File::create(cache)?);
	bincode::serialize_into(&mut bw, mesh)?;
	Ok(())
}

/// Parse `v` and `f` statements; everything else is skipped. Polygons are
/// split into triangle fans.
pub fn parse<R: BufRead>(reader: R, path: &Path) -> Result<ObjMesh> {
	let mut mesh = ObjMesh::default();

	for (n, line) in reader.lines().enumerate() {
		let line = line?;
		let err = |message: String| Error::Obj { path: path.to_owned(), line: n + 1, message };

		let mut tokens = line.split_whitespace();
		match tokens.next() {
			Some("v") => {
				let coords = tokens.take(3)
					.map(|s| s.parse::<f32>())
					.collect::<std::result::Result<Vec<f32>, _>>()
					.map_err(|e| err(format!("bad vertex coordinate: {}", e)))?;
				if coords.len() < 3 {
					return Err(err("vertex needs three coordinates".to_owned()));
				}
				mesh.vertices.push(Vec3::new(coords[0], coords[1], coords[2]));
			}
			Some("f") => {
				let mut idxs = Vec::new();
				for group in tokens {
					// only the position of `v/t/n` groups matters
					let v = group.split('/').next().unwrap_or("");
					let i = v.parse::<isize>().map_err(|e| err(format!("bad face index {:?}: {}", v, e)))?;
					let idx = normalize_obj_idx(i, mesh.vertices.len())
						.ok_or_else(|| err(format!("face index {} out of range", i)))?;
					idxs.push(idx);
				}
				if idxs.len() < 3 {
					return Err(err(format!("face needs at least three vertices, got {}", idxs.len())));
				}
				for i in 2..idxs.len() {
					mesh.faces.push([idxs[0], idxs[i - 1], idxs[i]]);
				}
			}
			_ => {}
		}
	}

	Ok(mesh)
}

/// OBJ indices are 1-based, negative ones count back from the last vertex
fn normalize_obj_idx(idx: isize, len: usize) -> Option<Index> {
	let i = if idx < 0 {
		len as isize + idx
	} else {
		idx - 1
	};
	if i < 0 || i >= len as isize {
		None
	} else {
		Some(i as Index)
	}
}
