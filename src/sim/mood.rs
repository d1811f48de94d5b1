//! Moods: their palettes and the voice shaping they imply.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use super::color::{Palette, Rgb};
use super::error::SceneError;

/// Emotional state that tints the flock and shapes the voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mood {
	/// Resting state.
	#[default]
	Neutral,
	/// Warm pinks.
	Affectionate,
	/// Terminal greens.
	Cryptic,
	/// Angry reds.
	Dislike,
	/// Golden yellows.
	Joyful,
	/// Inquisitive blues.
	Curious,
	/// Deep indigo.
	Sad,
	/// Rejected input; white and red static.
	Glitch,
	/// Night-sky interrogation mode.
	Question,
}

/// How a mood bends the synthesized voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceProfile {
	/// Multiplier applied to every pitch.
	pub pitch_shift: f32,
	/// Multiplier applied to word durations and envelope times.
	pub tempo: f32,
}

impl Mood {
	/// Every mood, in legend order.
	pub const ALL: [Mood; 9] = [
		Mood::Neutral,
		Mood::Affectionate,
		Mood::Cryptic,
		Mood::Dislike,
		Mood::Joyful,
		Mood::Curious,
		Mood::Sad,
		Mood::Glitch,
		Mood::Question,
	];

	/// Upper-case name used on the wire and in the legend.
	pub fn name(self) -> &'static str {
		match self {
			Mood::Neutral => "NEUTRAL",
			Mood::Affectionate => "AFFECTIONATE",
			Mood::Cryptic => "CRYPTIC",
			Mood::Dislike => "DISLIKE",
			Mood::Joyful => "JOYFUL",
			Mood::Curious => "CURIOUS",
			Mood::Sad => "SAD",
			Mood::Glitch => "GLITCH",
			Mood::Question => "QUESTION",
		}
	}

	/// Parse an externally supplied mood, falling back to [`Mood::Neutral`].
	pub fn parse_lenient(raw: &str) -> Mood {
		raw.parse().unwrap_or_else(|e: SceneError| {
			warn!("{}; falling back to NEUTRAL", e);
			Mood::Neutral
		})
	}

	/// Target palette the live palette drifts towards.
	pub fn palette(self) -> Palette {
		let p = |pri: (f32, f32, f32), sec: (f32, f32, f32), conn: (f32, f32, f32)| Palette {
			primary: Rgb::new(pri.0, pri.1, pri.2),
			secondary: Rgb::new(sec.0, sec.1, sec.2),
			connection: Rgb::new(conn.0, conn.1, conn.2),
		};
		match self {
			Mood::Neutral => p((255., 255., 255.), (100., 100., 100.), (80., 80., 80.)),
			Mood::Affectionate => p((255., 50., 150.), (150., 20., 80.), (100., 0., 50.)),
			Mood::Cryptic => p((0., 255., 150.), (0., 100., 60.), (0., 80., 40.)),
			Mood::Dislike => p((255., 0., 0.), (150., 0., 0.), (100., 0., 0.)),
			Mood::Joyful => p((255., 220., 0.), (180., 150., 0.), (130., 100., 0.)),
			Mood::Curious => p((0., 150., 255.), (0., 80., 180.), (0., 60., 140.)),
			Mood::Sad => p((50., 50., 255.), (20., 20., 150.), (10., 10., 100.)),
			Mood::Glitch => p((255., 255., 255.), (255., 0., 0.), (100., 0., 0.)),
			Mood::Question => p((200., 220., 255.), (20., 30., 80.), (40., 50., 100.)),
		}
	}

	/// Pitch and tempo modifiers for the voice.
	pub fn voice(self) -> VoiceProfile {
		let (pitch_shift, tempo) = match self {
			Mood::Neutral => (1.0, 1.0),
			Mood::Affectionate => (0.8, 1.3),
			Mood::Cryptic => (0.9, 1.0),
			Mood::Dislike => (1.5, 0.6),
			Mood::Joyful => (1.2, 0.9),
			Mood::Curious => (1.3, 1.1),
			Mood::Sad => (0.6, 1.8),
			Mood::Glitch => (2.0, 0.4),
			Mood::Question => (1.1, 0.9),
		};
		VoiceProfile { pitch_shift, tempo }
	}
}

impl FromStr for Mood {
	type Err = SceneError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let wanted = s.trim().to_uppercase();
		Mood::ALL
			.into_iter()
			.find(|m| m.name() == wanted)
			.ok_or(SceneError::UnknownMood(wanted))
	}
}

impl fmt::Display for Mood {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_case_insensitively_and_trims() {
		assert_eq!(" joyful\n".parse::<Mood>().unwrap(), Mood::Joyful);
		assert_eq!("Cryptic".parse::<Mood>().unwrap(), Mood::Cryptic);
	}

	#[test]
	fn unknown_mood_is_an_error_but_lenient_parse_falls_back() {
		assert!(matches!(
			"ecstatic".parse::<Mood>(),
			Err(SceneError::UnknownMood(name)) if name == "ECSTATIC"
		));
		assert_eq!(Mood::parse_lenient("ecstatic"), Mood::Neutral);
	}

	#[test]
	fn serde_uses_upper_case_names() {
		let json = serde_json::to_string(&Mood::Affectionate).unwrap();
		assert_eq!(json, "\"AFFECTIONATE\"");
		let back: Mood = serde_json::from_str("\"SAD\"").unwrap();
		assert_eq!(back, Mood::Sad);
	}

	#[test]
	fn glitch_voice_is_fast_and_high() {
		let v = Mood::Glitch.voice();
		assert!(v.pitch_shift > 1.5 && v.tempo < 0.5);
	}
}
