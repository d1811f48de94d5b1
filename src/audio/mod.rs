//! Synthesized "breath" voice that hums along with the caption.

mod voice;

use rand::Rng;

use crate::sim::mood::VoiceProfile;

pub use voice::Voice;

/// Major pentatonic scale, F3 to F4, in Hz.
pub const SCALE: [f32; 6] = [174.61, 196.00, 220.00, 261.63, 293.66, 349.23];

/// Low-pass cutoff the filter settles back to between words.
pub const RESTING_CUTOFF: f32 = 200.0;

/// Note for `letter`: a scale degree picked from its code point plus a random
/// offset of up to two, bent by the mood. Glitching adds up to ±250 Hz of noise.
pub fn pitch_for(letter: char, profile: VoiceProfile, glitch: bool, rng: &mut impl Rng) -> f32 {
	let degree = (letter as usize + rng.random_range(0..3)) % SCALE.len();
	let mut pitch = SCALE[degree] * profile.pitch_shift;
	if glitch {
		pitch += (rng.random::<f32>() - 0.5) * 500.0;
	}
	pitch
}

/// Peak filter cutoff for `letter`.
pub fn brightness(letter: char, glitch: bool) -> f32 {
	if glitch {
		return 2000.0;
	}
	match letter.to_ascii_uppercase() {
		'K' | 'P' | 'T' => 1200.0,
		'A' | 'E' | 'I' | 'O' | 'U' => 800.0,
		_ => 400.0,
	}
}

/// Seconds between a release starting and its oscillators stopping.
pub const RELEASE: f64 = 0.5;

/// Take out every entry whose stop time is at or before `now`.
pub fn drain_finished<T>(retired: &mut Vec<(T, f64)>, now: f64) -> Vec<T> {
	let mut done = Vec::new();
	let mut i = 0;
	while i < retired.len() {
		if retired[i].1 <= now {
			done.push(retired.swap_remove(i).0);
		} else {
			i += 1;
		}
	}
	done
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand::rngs::SmallRng;

	use super::*;
	use crate::sim::mood::Mood;

	#[test]
	fn pitches_come_from_the_scale() {
		let mut rng = SmallRng::seed_from_u64(9);
		let neutral = Mood::Neutral.voice();
		for letter in ['A', 'I', 'O', 'z'] {
			for _ in 0..20 {
				let p = pitch_for(letter, neutral, false, &mut rng);
				assert!(SCALE.contains(&p), "{p} not in scale");
			}
		}
	}

	#[test]
	fn mood_shifts_pitch() {
		let mut rng = SmallRng::seed_from_u64(10);
		let sad = Mood::Sad.voice();
		let p = pitch_for('O', sad, false, &mut rng);
		assert!(SCALE.iter().any(|s| (s * 0.6 - p).abs() < 1e-3));
	}

	#[test]
	fn glitch_noise_is_bounded() {
		let mut rng = SmallRng::seed_from_u64(11);
		let glitch = Mood::Glitch.voice();
		for _ in 0..100 {
			let p = pitch_for('I', glitch, true, &mut rng);
			assert!(p > 174.61 * 2.0 - 250.0 && p < 349.23 * 2.0 + 250.0);
		}
	}

	#[test]
	fn only_finished_releases_are_drained() {
		let mut retired = vec![("a", 1.0), ("b", 2.5), ("c", 0.5)];
		let mut done = drain_finished(&mut retired, 1.0);
		done.sort();
		assert_eq!(done, vec!["a", "c"]);
		assert_eq!(retired, vec![("b", 2.5)]);
		assert!(drain_finished(&mut retired, 2.0).is_empty());
		assert_eq!(drain_finished(&mut retired, 2.5), vec!["b"]);
		assert!(retired.is_empty());
	}

	#[test]
	fn brightness_by_letter() {
		assert_eq!(brightness('o', false), 800.0);
		assert_eq!(brightness('K', false), 1200.0);
		assert_eq!(brightness('m', false), 400.0);
		assert_eq!(brightness('m', true), 2000.0);
	}
}
