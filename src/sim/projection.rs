//! Perspective projection of the flock onto the canvas.

use glam::{Vec2, Vec3};
use rand::Rng;

/// Perspective camera that sways gently around the flock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
	/// Focal length in pixels.
	pub fov: f32,
	/// Distance from the camera to the world origin.
	pub distance: f32,
	/// Pitch in radians.
	pub rotation_x: f32,
	/// Yaw in radians.
	pub rotation_y: f32,
}

/// A world point on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
	/// Screen x in logical pixels.
	pub x: f32,
	/// Screen y in logical pixels.
	pub y: f32,
	/// Camera-space depth; larger is further away.
	pub depth: f32,
	/// Perspective scale; non-positive means behind the camera.
	pub scale: f32,
}

impl Projected {
	/// Whether the point is in front of the camera and finite.
	pub fn visible(&self) -> bool {
		self.scale > 0.0 && self.scale.is_finite() && self.x.is_finite() && self.y.is_finite()
	}
}

impl Camera {
	/// A level camera.
	pub fn new(fov: f32, distance: f32) -> Self {
		Self {
			fov,
			distance,
			rotation_x: 0.0,
			rotation_y: 0.0,
		}
	}

	/// Update the slow idle sway for scene time `time`.
	pub fn sway(&mut self, time: f32) {
		self.rotation_y = (time * 0.1).sin() * 0.1;
		self.rotation_x = (time * 0.15).sin() * 0.05;
	}

	/// Rotate by yaw then pitch and project around `center`.
	pub fn project(&self, p: Vec3, center: Vec2) -> Projected {
		let (sy, cy) = self.rotation_y.sin_cos();
		let (sx, cx) = self.rotation_x.sin_cos();
		let x1 = p.x * cy - p.z * sy;
		let z1 = p.z * cy + p.x * sy;
		let y2 = p.y * cx - z1 * sx;
		let z2 = z1 * cx + p.y * sx;
		let scale = self.fov / (self.fov + z2 + self.distance);
		Projected {
			x: center.x + x1 * scale,
			y: center.y + y2 * scale,
			depth: z2,
			scale,
		}
	}
}

/// Random glitch offset of up to 7.5 px on each axis.
pub fn glitch_jitter(rng: &mut impl Rng) -> Vec2 {
	Vec2::new(
		(rng.random::<f32>() - 0.5) * 15.0,
		(rng.random::<f32>() - 0.5) * 15.0,
	)
}

/// Offset a world point by `jitter`, then ripple it vertically by the
/// speaking wave of amplitude `wave`.
pub fn displace(mut p: Vec3, jitter: Vec2, wave: f32, time: f32) -> Vec3 {
	p.x += jitter.x;
	p.y += jitter.y;
	if wave != 0.0 {
		p.y += (p.x * 0.05 + time * 15.0).sin() * wave;
	}
	p
}

/// Indices of `points` ordered far to near, for painter's-algorithm drawing.
pub fn depth_order(points: &[Projected]) -> Vec<usize> {
	let mut order: Vec<usize> = (0..points.len()).collect();
	order.sort_by(|&a, &b| points[b].depth.total_cmp(&points[a].depth));
	order
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand::rngs::SmallRng;

	use super::*;

	#[test]
	fn glitch_jitter_stays_within_half_fifteen() {
		let mut rng = SmallRng::seed_from_u64(9);
		let mut widest = 0.0f32;
		for _ in 0..2000 {
			let j = glitch_jitter(&mut rng);
			assert!(j.x.abs() <= 7.5 && j.y.abs() <= 7.5);
			widest = widest.max(j.x.abs());
		}
		assert!(widest > 6.0);
	}

	#[test]
	fn speaking_wave_ripples_vertically() {
		let still = displace(Vec3::new(0.0, 10.0, 3.0), Vec2::ZERO, 0.0, 0.3);
		assert_eq!(still, Vec3::new(0.0, 10.0, 3.0));

		// sin(0 + 15t) peaks when t = pi / 30
		let t = std::f32::consts::PI / 30.0;
		let crest = displace(Vec3::new(0.0, 10.0, 3.0), Vec2::ZERO, 5.0, t);
		assert!((crest.y - 15.0).abs() < 1e-4);
		assert_eq!((crest.x, crest.z), (0.0, 3.0));

		let shaken = displace(Vec3::ZERO, Vec2::new(2.0, -3.0), 0.0, 0.0);
		assert_eq!(shaken, Vec3::new(2.0, -3.0, 0.0));
	}

	#[test]
	fn origin_projects_to_center_at_reduced_scale() {
		let cam = Camera::new(600.0, 500.0);
		let p = cam.project(Vec3::ZERO, Vec2::new(400.0, 210.0));
		assert_eq!((p.x, p.y), (400.0, 210.0));
		assert!((p.scale - 600.0 / 1100.0).abs() < 1e-6);
		assert!(p.visible());
	}

	#[test]
	fn nearer_points_appear_larger() {
		let cam = Camera::new(600.0, 500.0);
		let near = cam.project(Vec3::new(100.0, 0.0, -200.0), Vec2::ZERO);
		let far = cam.project(Vec3::new(100.0, 0.0, 200.0), Vec2::ZERO);
		assert!(near.scale > far.scale);
		assert!(near.x > far.x);
	}

	#[test]
	fn points_behind_the_camera_are_culled() {
		let cam = Camera::new(600.0, 500.0);
		assert!(!cam.project(Vec3::new(0.0, 0.0, -1200.0), Vec2::ZERO).visible());
		assert!(!cam.project(Vec3::new(0.0, 0.0, -1100.0), Vec2::ZERO).visible());
	}

	#[test]
	fn sway_stays_small() {
		let mut cam = Camera::new(600.0, 500.0);
		for t in 0..1000 {
			cam.sway(t as f32 * 0.37);
			assert!(cam.rotation_y.abs() <= 0.1 && cam.rotation_x.abs() <= 0.05);
		}
	}

	#[test]
	fn depth_order_is_far_to_near() {
		let mk = |depth| Projected {
			x: 0.0,
			y: 0.0,
			depth,
			scale: 1.0,
		};
		let pts = [mk(0.0), mk(50.0), mk(-20.0)];
		assert_eq!(depth_order(&pts), vec![1, 0, 2]);
	}
}
