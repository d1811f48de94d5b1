//! RGB colours and the three-tone palettes moods are drawn in.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Floating point RGB colour, channels nominally in `0.0..=255.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
	/// Red channel.
	pub r: f32,
	/// Green channel.
	pub g: f32,
	/// Blue channel.
	pub b: f32,
}

impl Rgb {
	/// Pure white.
	pub const WHITE: Rgb = Rgb::new(255.0, 255.0, 255.0);

	/// Build a colour from its channels.
	pub const fn new(r: f32, g: f32, b: f32) -> Self {
		Self { r, g, b }
	}

	/// Move each channel a `factor` fraction of the way towards `target`.
	pub fn lerp_towards(&mut self, target: Rgb, factor: f32) {
		self.r += (target.r - self.r) * factor;
		self.g += (target.g - self.g) * factor;
		self.b += (target.b - self.b) * factor;
	}

	/// Offset every channel independently by up to `±amount / 2`.
	pub fn jitter(self, rng: &mut impl Rng, amount: f32) -> Rgb {
		let mut wobble = || (rng.random::<f32>() - 0.5) * amount;
		Rgb::new(self.r + wobble(), self.g + wobble(), self.b + wobble())
	}

	/// Floored, clamped integer channels as used by CSS colour strings.
	pub fn channels(&self) -> (u8, u8, u8) {
		let c = |v: f32| v.floor().clamp(0.0, 255.0) as u8;
		(c(self.r), c(self.g), c(self.b))
	}

	/// CSS `rgba(...)` string with the given alpha.
	pub fn rgba(&self, alpha: f64) -> String {
		let (r, g, b) = self.channels();
		format!("rgba({}, {}, {}, {})", r, g, b, alpha)
	}
}

/// The three colours a mood paints the flock with.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Palette {
	/// Bright particles and node accents.
	pub primary: Rgb,
	/// Dim background particles.
	pub secondary: Rgb,
	/// Connective line tint.
	pub connection: Rgb,
}

impl Palette {
	/// Resting champagne and taupe palette shown before any mood arrives.
	pub const CHAMPAGNE: Palette = Palette {
		primary: Rgb::new(240.0, 230.0, 210.0),
		secondary: Rgb::new(180.0, 170.0, 155.0),
		connection: Rgb::new(120.0, 115.0, 110.0),
	};

	/// Lerp all three colours towards `target`.
	pub fn lerp_towards(&mut self, target: &Palette, factor: f32) {
		self.primary.lerp_towards(target.primary, factor);
		self.secondary.lerp_towards(target.secondary, factor);
		self.connection.lerp_towards(target.connection, factor);
	}
}

impl Default for Palette {
	fn default() -> Self {
		Palette::CHAMPAGNE
	}
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand::rngs::SmallRng;

	use super::*;

	#[test]
	fn lerp_moves_fraction_of_the_gap() {
		let mut c = Rgb::new(0.0, 100.0, 200.0);
		c.lerp_towards(Rgb::new(100.0, 100.0, 0.0), 0.25);
		assert_eq!(c, Rgb::new(25.0, 100.0, 150.0));
	}

	#[test]
	fn rgba_floors_and_clamps_channels() {
		let c = Rgb::new(300.7, -4.0, 12.9);
		assert_eq!(c.rgba(0.5), "rgba(255, 0, 12, 0.5)");
	}

	#[test]
	fn jitter_stays_within_half_amount() {
		let mut rng = SmallRng::seed_from_u64(7);
		let base = Rgb::new(100.0, 100.0, 100.0);
		for _ in 0..200 {
			let j = base.jitter(&mut rng, 20.0);
			for v in [j.r, j.g, j.b] {
				assert!((90.0..=110.0).contains(&v));
			}
		}
	}

	#[test]
	fn palette_converges_on_target() {
		let mut p = Palette::CHAMPAGNE;
		let target = Palette {
			primary: Rgb::WHITE,
			secondary: Rgb::new(0.0, 0.0, 0.0),
			connection: Rgb::new(10.0, 10.0, 10.0),
		};
		for _ in 0..200 {
			p.lerp_towards(&target, 0.15);
		}
		assert!((p.primary.r - 255.0).abs() < 0.01);
		assert!(p.secondary.g.abs() < 0.01);
	}
}
