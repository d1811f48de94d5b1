//! Submitted text drifting up into the flock to be digested.

use glam::Vec2;
use rand::Rng;

/// One character of submitted text floating up to be eaten.
#[derive(Clone, Debug, PartialEq)]
pub struct FoodParticle {
	/// Character drawn.
	pub glyph: char,
	/// Position relative to the flock centre.
	pub pos: Vec2,
	/// Upward speed (negative y).
	pub rise: f32,
	/// Draw scale, shrinking while digested.
	pub scale: f32,
}

/// Characters still on their way into the flock.
#[derive(Clone, Debug, Default)]
pub struct Feeding {
	particles: Vec<FoodParticle>,
	eaten: usize,
	total: usize,
}

impl Feeding {
	/// Replace any pending food with the characters of `text`, laid out in a row
	/// below the flock on a canvas of the given logical size.
	pub fn spawn(&mut self, text: &str, width: f32, height: f32, rng: &mut impl Rng) {
		let glyphs: Vec<char> = text.chars().collect();
		self.particles.clear();
		self.eaten = 0;
		self.total = glyphs.len();
		if glyphs.is_empty() {
			return;
		}

		let start_y = height * 0.5 + 100.0;
		let spread = (width * 0.8).min(glyphs.len() as f32 * 50.0);
		let step = spread / glyphs.len() as f32;
		let start_x = -spread / 2.0;
		self.particles = glyphs
			.into_iter()
			.enumerate()
			.map(|(i, glyph)| FoodParticle {
				glyph,
				pos: Vec2::new(
					start_x + i as f32 * step + (rng.random::<f32>() - 0.5) * 40.0,
					start_y + rng.random::<f32>() * 100.0,
				),
				rise: -4.0 - rng.random::<f32>() * 3.0,
				scale: 1.0,
			})
			.collect();
	}

	/// Drop all pending food.
	pub fn cancel(&mut self) {
		self.particles.clear();
		self.eaten = 0;
		self.total = 0;
	}

	/// Advance one frame. Returns where each fully digested glyph vanished.
	pub fn step(&mut self) -> Vec<Vec2> {
		let mut digested = Vec::new();
		self.particles.retain_mut(|fp| {
			fp.pos.y += fp.rise;
			fp.pos.x += -fp.pos.x * 0.04;
			if fp.pos.y.abs() < 100.0 && fp.pos.x.abs() < 200.0 {
				fp.scale -= 0.15;
				fp.rise *= 0.6;
				if fp.scale <= 0.1 {
					digested.push(fp.pos);
					return false;
				}
			}
			true
		});
		self.eaten += digested.len();
		digested
	}

	/// Glyphs still floating.
	pub fn particles(&self) -> &[FoodParticle] {
		&self.particles
	}

	/// `(eaten, total)` for the current meal.
	pub fn progress(&self) -> (usize, usize) {
		(self.eaten, self.total)
	}

	/// Whether anything is left to draw.
	pub fn is_active(&self) -> bool {
		!self.particles.is_empty()
	}
}
