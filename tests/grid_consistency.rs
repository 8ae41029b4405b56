use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gridtrace::geometry::Hit;
use gridtrace::material::Material;
use gridtrace::math::*;
use gridtrace::primitive::{Plane, Sphere, Triangle};
use gridtrace::scene::{NodeId, SceneBuilder, SceneGraph};

fn random_point(rng: &mut StdRng, extent: f32) -> Vec3 {
	Vec3::new(
		rng.gen_range(-extent..extent),
		rng.gen_range(-extent..extent),
		rng.gen_range(-extent..extent),
	)
}

fn random_direction(rng: &mut StdRng) -> Vec3 {
	loop {
		if let Some(d) = random_point(rng, 1.0).try_normalized() {
			return d;
		}
	}
}

/// Spheres, triangles and transformed objects scattered in a 10-wide cube,
/// above a floor lying outside of their bounding box
fn random_scene(rng: &mut StdRng) -> SceneGraph {
	let m = Arc::new(Material::diffuse(Vec3::thrice(0.5)));
	let mut b = SceneBuilder::new();
	let mut children: Vec<NodeId> = Vec::new();

	for _ in 0..30 {
		let center = random_point(rng, 5.0);
		children.push(b.sphere(Sphere::new(center, rng.gen_range(0.1..0.8), m.clone())));
	}
	for _ in 0..40 {
		let a = random_point(rng, 5.0);
		let tri = Triangle::new(a, a + random_point(rng, 1.0), a + random_point(rng, 1.0), m.clone());
		children.push(b.triangle(tri));
	}
	for _ in 0..10 {
		let s = b.sphere(Sphere::new(Vec3::zero(), 0.5, m.clone()));
		let matrix = Mat4::translate(random_point(rng, 4.0))
			* Mat4::rotation(random_direction(rng), rng.gen_range(0.0..180.0))
			* Mat4::scale(Vec3::new(rng.gen_range(0.5..2.0), rng.gen_range(0.5..2.0), rng.gen_range(0.5..2.0)));
		children.push(b.transform(matrix, s));
	}

	// nested group
	let inner: Vec<NodeId> = children.drain(..20).collect();
	let inner = b.group(inner);
	children.push(inner);

	let floor = Plane::new(Vec3::new(0.0, 1.0, 0.0), -7.0, m.clone()).unwrap();
	children.push(b.plane(floor));

	let root = b.group(children);
	b.build(root)
}

#[test]
fn grid_agrees_with_brute_force() {
	let mut rng = StdRng::seed_from_u64(0x6772_6964);
	let mut graph = random_scene(&mut rng);
	assert!(graph.build_grid([12, 10, 8]));

	let n = 2000;
	let mut agree = 0;
	for i in 0..n {
		let origin = random_point(&mut rng, 8.0);
		let ray = Ray::new(origin, random_direction(&mut rng));
		let tmin = if i % 2 == 0 { 0.0 } else { EPSILON };

		let mut grid_hit = Hit::new(ray, INFINITY);
		let mut brute_hit = Hit::new(ray, INFINITY);
		let g = graph.intersect(ray, &mut grid_hit, tmin);
		let b = graph.intersect_brute_force(ray, &mut brute_hit, tmin);

		if !b {
			assert!(!g, "grid reports a hit at t = {} where there is none ({:?})", grid_hit.t, ray);
		} else if g {
			assert!(grid_hit.t >= brute_hit.t - 1e-3, "grid hit closer than brute force ({:?})", ray);
		}
		if g == b && (!g || (grid_hit.t - brute_hit.t).abs() <= 1e-4) {
			agree += 1;
		}
	}
	assert!(agree * 100 >= n * 95, "only {} of {} rays agree", agree, n);
}

#[test]
fn grid_shadow_queries_agree_with_brute_force() {
	let mut rng = StdRng::seed_from_u64(42);
	let mut graph = random_scene(&mut rng);
	assert!(graph.build_grid([6, 6, 6]));
	let root = graph.root();

	let n = 2000;
	let mut agree = 0;
	for _ in 0..n {
		let ray = Ray::new(random_point(&mut rng, 8.0), random_direction(&mut rng));
		let tmax = rng.gen_range(0.5..20.0);
		let g = graph.occluded(ray, EPSILON, tmax);
		let b = graph.occludes_node(root, ray, EPSILON, tmax);
		if !b {
			assert!(!g, "grid reports an occluder where there is none ({:?}, tmax {})", ray, tmax);
		}
		if g == b {
			agree += 1;
		}
	}
	assert!(agree * 100 >= n * 95, "only {} of {} shadow rays agree", agree, n);
}

#[test]
fn grid_resolution_does_not_change_hits() {
	let mut rng = StdRng::seed_from_u64(7);
	let coarse = {
		let mut g = random_scene(&mut StdRng::seed_from_u64(1));
		assert!(g.build_grid([1, 1, 1]));
		g
	};
	let fine = {
		let mut g = random_scene(&mut StdRng::seed_from_u64(1));
		assert!(g.build_grid([25, 25, 25]));
		g
	};

	let n = 500;
	let mut agree = 0;
	for _ in 0..n {
		let ray = Ray::new(random_point(&mut rng, 8.0), random_direction(&mut rng));
		let mut a = Hit::new(ray, INFINITY);
		let mut b = Hit::new(ray, INFINITY);
		let ha = coarse.intersect(ray, &mut a, 0.0);
		let hb = fine.intersect(ray, &mut b, 0.0);
		if ha == hb && (!ha || (a.t - b.t).abs() <= 1e-4) {
			agree += 1;
		}
	}
	assert!(agree * 100 >= n * 95, "only {} of {} rays agree", agree, n);
}
