//! Steering model for the flock.
//!
//! Each frame every agent sums weighted steering vectors into its acceleration,
//! every steering vector clamped to [`PhysicsParams::max_force`], then
//! integrates with velocity clamped to [`PhysicsParams::max_speed`]. Agents that
//! embody a living graph node skip flocking and glide to their orbit target
//! instead, and the question and director modes replace flocking for free agents.

use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::agent::Agent;
use super::color::{Palette, Rgb};
use super::graph::NodeLevel;

/// Tunable flocking constants. These drift every frame towards the active regime.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsParams {
	/// Largest steering force applied per behaviour.
	pub max_force: f32,
	/// Cruise speed cap.
	pub max_speed: f32,
	/// Neighbour radius for alignment and cohesion.
	pub vision_radius: f32,
	/// Distance under which neighbours push apart.
	pub separation: f32,
	/// Alignment weight.
	pub align_weight: f32,
	/// Cohesion weight.
	pub cohesion_weight: f32,
	/// Separation weight.
	pub separation_weight: f32,
	/// Strength of the speaking wave field.
	pub wave_intensity: f32,
}

impl Default for PhysicsParams {
	fn default() -> Self {
		Self {
			max_force: 0.03,
			max_speed: 6.0,
			vision_radius: 120.0,
			separation: 30.0,
			align_weight: 1.5,
			cohesion_weight: 0.8,
			separation_weight: 2.0,
			wave_intensity: 0.0,
		}
	}
}

/// Per-word modulation of the flock while the voice speaks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Atmosphere {
	/// Speed multiplier.
	pub speed: f32,
	/// Separation offset.
	pub separation: f32,
	/// Alignment offset.
	pub align: f32,
	/// Wave field target.
	pub wave: f32,
}

impl Default for Atmosphere {
	fn default() -> Self {
		Self {
			speed: 1.0,
			separation: 0.0,
			align: 0.0,
			wave: 0.0,
		}
	}
}

/// Which set of targets the parameters relax towards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Regime {
	/// A word is being spoken.
	Speaking(Atmosphere),
	/// Waiting for the external collaborator.
	Thinking,
	/// Nothing happening.
	Idle,
}

impl PhysicsParams {
	/// Ease the live parameters towards the targets of `regime`, using `base`
	/// as the resting values.
	pub fn relax_towards(&mut self, regime: Regime, base: &PhysicsParams) {
		let ease = |v: &mut f32, target: f32, rate: f32| *v += (target - *v) * rate;
		match regime {
			Regime::Speaking(atm) => {
				ease(&mut self.max_speed, 7.0 * atm.speed, 0.1);
				ease(&mut self.separation, base.separation + atm.separation, 0.1);
				ease(&mut self.align_weight, base.align_weight + atm.align, 0.1);
				ease(&mut self.wave_intensity, atm.wave, 0.1);
			}
			Regime::Thinking => {
				ease(&mut self.max_speed, 9.0, 0.05);
				ease(&mut self.separation, 15.0, 0.05);
				ease(&mut self.align_weight, 2.5, 0.05);
			}
			Regime::Idle => {
				ease(&mut self.max_speed, base.max_speed, 0.05);
				ease(&mut self.separation, base.separation, 0.05);
				ease(&mut self.align_weight, base.align_weight, 0.05);
				ease(&mut self.wave_intensity, 0.0, 0.1);
			}
		}
	}
}

/// Smoothed pointer in flock coordinates.
#[derive(Clone, Copy, Debug, Default)]
pub struct Pointer {
	/// Latest raw position, `None` once released.
	pub raw: Option<Vec2>,
	/// Smoothed position.
	pub pos: Vec2,
	/// Per-frame movement of the smoothed position.
	pub vel: Vec2,
	/// Whether agents should flee.
	pub active: bool,
}

impl Pointer {
	/// Advance the smoothing by one frame.
	pub fn follow(&mut self) {
		match self.raw {
			Some(raw) => {
				let step = (raw - self.pos) * 0.15;
				self.pos += step;
				self.vel = step;
				self.active = true;
			}
			None => {
				self.active = false;
				self.vel *= 0.9;
			}
		}
	}
}

/// Position and velocity of an agent at the start of the frame.
#[derive(Clone, Copy, Debug)]
pub struct Kinematics {
	/// Position.
	pub pos: Vec3,
	/// Velocity.
	pub vel: Vec3,
}

/// A living, non-root graph node that free agents are drawn towards.
#[derive(Clone, Copy, Debug)]
pub struct Attractor {
	/// Node position.
	pub pos: Vec3,
	/// Node weight.
	pub weight: f32,
	/// Node colour.
	pub color: Rgb,
}

/// Everything an agent needs to know about the world to take one step.
pub struct StepContext<'a> {
	/// Frame-start kinematics of every agent, indexed like the flock.
	pub snapshot: &'a [Kinematics],
	/// Attracting nodes.
	pub attractors: &'a [Attractor],
	/// Live parameters.
	pub params: &'a PhysicsParams,
	/// Live palette.
	pub palette: &'a Palette,
	/// Pointer state.
	pub pointer: &'a Pointer,
	/// Logical canvas width.
	pub width: f32,
	/// Scene clock.
	pub time: f32,
	/// Whether the thinking swirl is on.
	pub thinking: bool,
}

/// Clamp `v` to a length of at most `max`.
pub fn limit(v: Vec3, max: f32) -> Vec3 {
	v.clamp_length_max(max)
}

/// Steering force towards `target`, optionally braking inside 100 units.
pub fn seek(pos: Vec3, vel: Vec3, target: Vec3, params: &PhysicsParams, slow_down: bool) -> Vec3 {
	let offset = target - pos;
	let d = offset.length();
	if d <= 0.0 {
		return Vec3::ZERO;
	}
	let speed = if slow_down && d < 100.0 {
		d / 100.0 * params.max_speed
	} else {
		params.max_speed
	};
	limit(offset / d * speed - vel, params.max_force)
}

/// Alignment, cohesion and separation for agent `index`, already weighted.
pub fn flocking_force(index: usize, snapshot: &[Kinematics], params: &PhysicsParams) -> Vec3 {
	let me = snapshot[index];
	let stride = if snapshot.len() > 400 { 2 } else { 1 };
	let (vision_sq, separation_sq) = (
		params.vision_radius * params.vision_radius,
		params.separation * params.separation,
	);
	let (mut ali, mut coh, mut sep, mut count) = (Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, 0u32);

	for (j, other) in snapshot.iter().enumerate().step_by(stride) {
		if j == index {
			continue;
		}
		let diff = me.pos - other.pos;
		let d_sq = diff.length_squared();
		if d_sq >= vision_sq {
			continue;
		}
		ali += other.vel;
		coh += other.pos;
		if d_sq < separation_sq && d_sq > 0.0 {
			sep += diff / d_sq.sqrt();
		}
		count += 1;
	}

	if count == 0 {
		return Vec3::ZERO;
	}
	let n = count as f32;
	let steer_ali = limit(
		(ali / n).normalize_or_zero() * params.max_speed - me.vel,
		params.max_force,
	);
	let steer_coh = seek(me.pos, me.vel, coh / n, params, false);
	let steer_sep = limit(
		sep.normalize_or_zero() * params.max_speed - me.vel,
		params.max_force,
	);

	steer_ali * params.align_weight
		+ steer_sep * params.separation_weight
		+ steer_coh * params.cohesion_weight
}

/// Full flocking step for a free (or dissolving) agent.
pub fn step_flocking(agent: &mut Agent, index: usize, ctx: &StepContext, rng: &mut impl Rng) {
	let params = ctx.params;
	agent.target_color = agent.palette_color(ctx.palette);

	if let Some(best) = nearest_attractor(agent.pos, ctx.attractors) {
		pull_towards(agent, best, params, ctx.time, rng);
	}
	agent.color.lerp_towards(agent.target_color, 0.05);

	let flock = flocking_force(index, ctx.snapshot, params);
	agent.apply_force(flock);

	if params.wave_intensity > 0.0 {
		let flow = Vec2::new(
			(agent.pos.y * 0.05 + ctx.time * 10.0).sin(),
			(agent.pos.x * 0.05 + ctx.time * 8.0).cos(),
		);
		agent.apply_force((flow * params.wave_intensity * 0.1).extend(0.0));
	}

	if ctx.thinking {
		let tangent = Vec2::new(-agent.pos.y, agent.pos.x);
		if tangent.length() > 1.0 {
			agent.apply_force((tangent.normalize() * 0.03).extend(0.0));
		}
	}

	if ctx.pointer.active {
		flee_pointer(agent, ctx.pointer);
	}

	// soft spherical boundary
	if agent.pos.truncate().length() > ctx.width * 0.55 {
		let desired = (-agent.pos).normalize_or_zero() * params.max_speed;
		agent.apply_force((desired - agent.vel) * 0.05);
	}

	if agent.pos.z < -250.0 {
		agent.apply_force(Vec3::Z * 0.1);
	}
	if agent.pos.z > 250.0 {
		agent.apply_force(Vec3::NEG_Z * 0.1);
	}

	integrate(agent, params.max_speed);
}

fn nearest_attractor(pos: Vec3, attractors: &[Attractor]) -> Option<&Attractor> {
	attractors
		.iter()
		.map(|a| (a, pos.truncate().distance(a.pos.truncate()) / a.weight.powf(1.5)))
		.min_by(|(_, a), (_, b)| a.total_cmp(b))
		.map(|(a, _)| a)
}

fn pull_towards(
	agent: &mut Agent,
	node: &Attractor,
	params: &PhysicsParams,
	time: f32,
	rng: &mut impl Rng,
) {
	let offset = (node.pos - agent.pos).truncate();
	let dist = offset.length();
	let pull_radius = 300.0 * node.weight;
	if dist >= pull_radius || dist <= 0.0 {
		return;
	}

	let ease = (1.0 - dist / pull_radius).powi(2);
	let desired = offset / dist * (params.max_speed * 0.4);
	let phase = time * 1.5;
	let flutter = Vec2::new(
		(phase + agent.pos.y * 0.01).sin() * 0.8,
		(phase + agent.pos.x * 0.01).cos() * 0.8,
	);
	let glide = (desired - agent.vel.truncate() + flutter) * 0.012 * ease * node.weight;
	agent.apply_force(glide.extend((rng.random::<f32>() - 0.5) * 0.05));

	// murmuration drag
	agent.vel.x *= 0.985;
	agent.vel.y *= 0.985;

	if dist < 60.0 {
		let repulse = (1.0 - dist / 60.0) * 0.05;
		agent.apply_force((-offset * repulse).extend(0.0));
	}
	agent.target_color = node.color;
}

fn flee_pointer(agent: &mut Agent, pointer: &Pointer) {
	let predicted = pointer.pos + pointer.vel * 3.0;
	let away = agent.pos.truncate() - predicted;
	let d_sq = away.length_squared();
	let fear_radius = 200.0 + (pointer.vel.x.abs() * 5.0).min(100.0);
	if d_sq >= fear_radius * fear_radius {
		return;
	}
	let force = (fear_radius * fear_radius / d_sq.max(1.0)).min(5.0);
	agent.apply_force((away.normalize_or_zero() * force * 0.8).extend(0.0));
	agent.fear = 1.0;
}

fn integrate(agent: &mut Agent, max_speed: f32) {
	agent.vel = (agent.vel + agent.acc).clamp_length_max(max_speed);
	agent.pos += agent.vel;
	agent.acc = Vec3::ZERO;
	agent.born_time = (agent.born_time - 0.02).max(0.0);
	agent.fear = (agent.fear - 0.05).max(0.0);
}

/// Night-sky step: nearly frozen, drifting stars that blink blue-white.
pub fn step_star(agent: &mut Agent, time: f32) {
	agent.vel *= 0.92;
	agent.pos.x += (time * 0.5 + agent.blink_offset).sin() * 0.1;
	agent.pos.y += (time * 0.5 + agent.blink_offset).cos() * 0.1;

	let brightness = (time * agent.blink_speed + agent.blink_offset).sin();
	let v = 150.0 + brightness * 100.0;
	agent.target_color = Rgb::new(v, v, 255.0);
	agent.color.lerp_towards(agent.target_color, 0.1);
}

const STREAM_CYAN: Rgb = Rgb::new(0.0, 255.0, 255.0);
const STREAM_ORANGE: Rgb = Rgb::new(255.0, 100.0, 0.0);

/// Data-stream step: flattened, horizontally scanning lines that wrap around.
pub fn step_stream(agent: &mut Agent, index: usize, width: f32, rng: &mut impl Rng) {
	agent.pos.z *= 0.9;
	agent.vel.x = if index % 2 == 0 { 8.0 } else { -8.0 };
	agent.vel.y *= 0.8;
	agent.vel.z = 0.0;
	agent.pos += agent.vel;

	let bound = width * 0.6;
	if agent.pos.x > bound {
		agent.pos.x = -bound;
	} else if agent.pos.x < -bound {
		agent.pos.x = bound;
	}

	if rng.random::<f32>() > 0.95 {
		agent.target_color = if rng.random_bool(0.5) {
			STREAM_CYAN
		} else {
			STREAM_ORANGE
		};
	}
	agent.color.lerp_towards(agent.target_color, 0.2);
}

/// Glide a living node towards its slot in the hierarchy.
///
/// Roots hold their anchor, branches orbit their first parent at radius 320 and
/// leaves orbit their first parent at their stagger radius. `parent_pos` is the
/// frame-start position of the first parent still carrying a node of the same
/// graph, if any.
pub fn step_node(agent: &mut Agent, parent_pos: Option<Vec3>, time: f32) {
	let Some(node) = agent.node.as_ref() else {
		return;
	};
	let (target, follow, damping) = match (node.level, parent_pos) {
		(NodeLevel::Root, _) => (node.anchor.truncate(), 0.12, 1.0),
		(NodeLevel::Branch, Some(parent)) => {
			let angle = node.angle_index * 1.5 + time * 0.08;
			(orbit(parent, angle, 320.0), 0.08, 0.95)
		}
		(NodeLevel::Leaf, Some(parent)) => {
			let angle = node.angle_index + time * 0.12;
			(orbit(parent, angle, node.orbit_radius), 0.08, 0.9)
		}
		(_, None) => (Vec2::ZERO, 0.08, 1.0),
	};
	let color = node.color;

	agent.vel.x *= damping;
	agent.vel.y *= damping;
	let pos = agent.pos.truncate();
	let next = pos + (target - pos) * follow;
	agent.pos.x = next.x;
	agent.pos.y = next.y;
	agent.target_color = color;
	agent.color.lerp_towards(color, 0.15);
}

fn orbit(center: Vec3, angle: f32, radius: f32) -> Vec2 {
	center.truncate() + Vec2::new(angle.cos(), angle.sin()) * radius
}
