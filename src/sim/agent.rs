//! A single member of the flock.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use rand::Rng;

use super::color::{Palette, Rgb};
use super::graph::GraphNode;

/// Stable handle of an agent. Agents are only ever appended, never removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub usize);

/// Visual type of a particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentKind {
	/// Larger, brighter particle.
	Primary,
	/// Small background particle.
	Secondary,
}

/// A single boid.
#[derive(Clone, Debug)]
pub struct Agent {
	/// World position; the flock centre sits at the origin.
	pub pos: Vec3,
	/// Velocity in world units per frame.
	pub vel: Vec3,
	/// Acceleration accumulated during the current frame.
	pub acc: Vec3,
	/// Visual type.
	pub kind: AgentKind,
	/// Colour currently drawn.
	pub color: Rgb,
	/// Colour the agent is easing towards.
	pub target_color: Rgb,
	/// Newborn flash timer, `1.0` at birth decaying to zero.
	pub born_time: f32,
	/// Pointer fright timer.
	pub fear: f32,
	/// Phase offset of the night-sky blink.
	pub blink_offset: f32,
	/// Angular speed of the night-sky blink.
	pub blink_speed: f32,
	/// Graph node this agent currently embodies.
	pub node: Option<GraphNode>,
}

impl Agent {
	/// A fresh agent somewhere in a disc of radius 300 cruising at `max_speed`.
	pub fn spawn(rng: &mut impl Rng, max_speed: f32, palette: &Palette) -> Self {
		let angle = rng.random::<f32>() * TAU;
		let radius = rng.random::<f32>() * 300.0;
		let pos = Vec3::new(
			angle.cos() * radius,
			angle.sin() * radius,
			(rng.random::<f32>() - 0.5) * 150.0,
		);
		let heading = rng.random::<f32>() * TAU;
		let vel = Vec3::new(
			heading.cos() * max_speed,
			heading.sin() * max_speed,
			(rng.random::<f32>() - 0.5) * 2.0,
		);
		let kind = if rng.random::<f32>() > 0.6 {
			AgentKind::Primary
		} else {
			AgentKind::Secondary
		};
		Self::with_motion(rng, pos, vel, Vec3::ZERO, kind, 0.0, palette)
	}

	/// A newborn agent hatched from digested food, launched with `burst`.
	pub fn newborn(rng: &mut impl Rng, pos: Vec2, burst: Vec2, palette: &Palette) -> Self {
		let vel = Vec3::new(burst.x, burst.y, (rng.random::<f32>() - 0.5) * 5.0);
		let acc = Vec3::new(burst.x * 0.5, burst.y * 0.5, 0.0);
		Self::with_motion(
			rng,
			pos.extend(0.0),
			vel,
			acc,
			AgentKind::Secondary,
			1.0,
			palette,
		)
	}

	fn with_motion(
		rng: &mut impl Rng,
		pos: Vec3,
		vel: Vec3,
		acc: Vec3,
		kind: AgentKind,
		born_time: f32,
		palette: &Palette,
	) -> Self {
		Self {
			pos,
			vel,
			acc,
			kind,
			color: palette.secondary,
			target_color: palette.secondary,
			born_time,
			fear: 0.0,
			blink_offset: rng.random::<f32>() * TAU,
			blink_speed: 0.5 + rng.random::<f32>() * 1.5,
			node: None,
		}
	}

	/// Add a force to this frame's acceleration.
	pub fn apply_force(&mut self, force: Vec3) {
		self.acc += force;
	}

	/// Whether the agent is available to embody a new graph node.
	pub fn is_free(&self) -> bool {
		self.node.is_none()
	}

	/// The node, when it is alive (not dissolving).
	pub fn living_node(&self) -> Option<&GraphNode> {
		self.node.as_ref().filter(|n| !n.dying)
	}

	/// Base glyph radius before projection.
	pub fn glyph_radius(&self) -> f32 {
		match self.kind {
			AgentKind::Primary => 2.5,
			AgentKind::Secondary => 1.5,
		}
	}

	/// Palette colour matching this agent's kind.
	pub fn palette_color(&self, palette: &Palette) -> Rgb {
		match self.kind {
			AgentKind::Primary => palette.primary,
			AgentKind::Secondary => palette.secondary,
		}
	}
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand::rngs::SmallRng;

	use super::*;

	#[test]
	fn spawned_agents_cruise_at_max_speed_in_the_plane() {
		let mut rng = SmallRng::seed_from_u64(1);
		for _ in 0..100 {
			let a = Agent::spawn(&mut rng, 6.0, &Palette::CHAMPAGNE);
			assert!((a.vel.truncate().length() - 6.0).abs() < 1e-3);
			assert!(a.pos.truncate().length() <= 300.0 + 1e-3);
			assert!(a.pos.z.abs() <= 75.0);
			assert!(a.is_free());
		}
	}

	#[test]
	fn newborns_are_secondary_and_flash() {
		let mut rng = SmallRng::seed_from_u64(2);
		let a = Agent::newborn(
			&mut rng,
			Vec2::new(10.0, 20.0),
			Vec2::new(4.0, -5.0),
			&Palette::CHAMPAGNE,
		);
		assert_eq!(a.kind, AgentKind::Secondary);
		assert_eq!(a.born_time, 1.0);
		assert_eq!(a.pos, Vec3::new(10.0, 20.0, 0.0));
		assert_eq!(a.acc, Vec3::new(2.0, -2.5, 0.0));
	}
}
