//! Word-by-word cadence of the voice.
//!
//! Each word holds the stage for `max(250, chars * 70) * tempo` milliseconds and
//! sets the flock's [`Atmosphere`]. Time is advanced by the animation loop, so
//! an utterance stays in lock-step with the frames that visualise it.

use super::physics::Atmosphere;

const SHARP_LETTERS: &[char] = &['K', 'T', 'P', 'X', 'Z', 'G', 'Q'];

/// Mouth shape a word is voiced with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Articulation {
	/// Short or consonant-heavy word: tight and bright.
	Sharp,
	/// Everything else: open and soft.
	Round,
}

impl Articulation {
	/// Classify an upper-cased word.
	pub fn of(word: &str) -> Self {
		let sharp = word.chars().filter(|c| SHARP_LETTERS.contains(c)).count();
		if sharp > 1 || word.chars().count() < 4 {
			Articulation::Sharp
		} else {
			Articulation::Round
		}
	}

	/// Representative vowel handed to the voice.
	pub fn vowel(self) -> char {
		match self {
			Articulation::Sharp => 'I',
			Articulation::Round => 'O',
		}
	}

	fn atmosphere(self) -> Atmosphere {
		match self {
			Articulation::Sharp => Atmosphere {
				speed: 1.2,
				separation: -5.0,
				align: 0.8,
				wave: 1.5,
			},
			Articulation::Round => Atmosphere {
				speed: 0.8,
				separation: 10.0,
				align: 0.5,
				wave: 0.5,
			},
		}
	}

	fn intensity(self) -> f32 {
		match self {
			Articulation::Sharp => 1.0,
			Articulation::Round => 0.5,
		}
	}
}

/// Something the voice and caption must react to.
#[derive(Clone, Debug, PartialEq)]
pub enum SpeechEvent {
	/// An utterance started.
	Began,
	/// A new word is on stage.
	Word {
		/// Upper-cased word.
		word: String,
		/// How to voice it.
		articulation: Articulation,
	},
	/// The utterance finished.
	Ended,
}

#[derive(Clone, Debug)]
struct Utterance {
	words: Vec<String>,
	next: usize,
	until_next_ms: f32,
	until_relax_ms: Option<f32>,
	tempo: f32,
}

/// The voice's effect on the flock.
#[derive(Clone, Debug, Default)]
pub struct Speech {
	current: Option<Utterance>,
	atmosphere: Atmosphere,
	intensity: f32,
}

impl Speech {
	/// Start speaking `text`, replacing anything still being said.
	pub fn begin(&mut self, text: &str, tempo: f32) -> Vec<SpeechEvent> {
		let words = text.split_whitespace().map(str::to_uppercase).collect();
		self.current = Some(Utterance {
			words,
			next: 0,
			until_next_ms: 0.0,
			until_relax_ms: None,
			tempo,
		});
		let mut events = vec![SpeechEvent::Began];
		events.extend(self.advance(0.0));
		events
	}

	/// Move time forward by `elapsed_ms`.
	pub fn advance(&mut self, elapsed_ms: f32) -> Vec<SpeechEvent> {
		let mut events = Vec::new();
		let Some(utt) = self.current.as_mut() else {
			return events;
		};

		if let Some(relax) = utt.until_relax_ms.as_mut() {
			*relax -= elapsed_ms;
			if *relax <= 0.0 {
				self.intensity = 0.2;
				utt.until_relax_ms = None;
			}
		}

		utt.until_next_ms -= elapsed_ms;
		if utt.until_next_ms > 0.0 {
			return events;
		}

		let Some(word) = utt.words.get(utt.next).cloned() else {
			self.current = None;
			self.atmosphere = Atmosphere::default();
			self.intensity = 0.0;
			events.push(SpeechEvent::Ended);
			return events;
		};

		let articulation = Articulation::of(&word);
		self.atmosphere = articulation.atmosphere();
		self.intensity = articulation.intensity();
		utt.next += 1;
		utt.until_relax_ms = Some(150.0 * utt.tempo);
		utt.until_next_ms = (word.chars().count() as f32 * 70.0).max(250.0) * utt.tempo;
		events.push(SpeechEvent::Word { word, articulation });
		events
	}

	/// Whether a word is currently on stage.
	pub fn is_speaking(&self) -> bool {
		self.current.is_some()
	}

	/// Flock modulation of the current word.
	pub fn atmosphere(&self) -> Atmosphere {
		self.atmosphere
	}

	/// Wave amplitude of the current word.
	pub fn intensity(&self) -> f32 {
		self.intensity
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn words(events: &[SpeechEvent]) -> Vec<&str> {
		events
			.iter()
			.filter_map(|e| match e {
				SpeechEvent::Word { word, .. } => Some(word.as_str()),
				_ => None,
			})
			.collect()
	}

	#[test]
	fn classifies_articulation() {
		assert_eq!(Articulation::of("CAT"), Articulation::Sharp);
		assert_eq!(Articulation::of("KETTLE"), Articulation::Sharp);
		assert_eq!(Articulation::of("WONDER"), Articulation::Round);
		assert_eq!(Articulation::Sharp.vowel(), 'I');
	}

	#[test]
	fn first_word_is_spoken_immediately() {
		let mut speech = Speech::default();
		let events = speech.begin("hello there", 1.0);
		assert_eq!(events[0], SpeechEvent::Began);
		assert_eq!(words(&events), vec!["HELLO"]);
		assert!(speech.is_speaking());
		assert_eq!(speech.intensity(), 0.5);
	}

	#[test]
	fn words_follow_their_durations_then_end() {
		let mut speech = Speech::default();
		speech.begin("hello there", 1.0);
		// HELLO lasts max(250, 350) = 350 ms
		assert!(speech.advance(340.0).is_empty());
		assert_eq!(speech.intensity(), 0.2);
		assert_eq!(words(&speech.advance(20.0)), vec!["THERE"]);
		assert!(speech.advance(349.0).is_empty());
		assert_eq!(speech.advance(2.0), vec![SpeechEvent::Ended]);
		assert!(!speech.is_speaking());
		assert_eq!(speech.atmosphere(), Atmosphere::default());
	}

	#[test]
	fn tempo_stretches_words() {
		let mut speech = Speech::default();
		speech.begin("hi you", 2.0);
		// HI lasts 250 * 2
		assert!(speech.advance(450.0).is_empty());
		assert_eq!(words(&speech.advance(60.0)), vec!["YOU"]);
	}

	#[test]
	fn empty_text_ends_at_once() {
		let mut speech = Speech::default();
		let events = speech.begin("   ", 1.0);
		assert_eq!(events, vec![SpeechEvent::Began, SpeechEvent::Ended]);
	}

	#[test]
	fn new_utterance_replaces_old() {
		let mut speech = Speech::default();
		speech.begin("one two three", 1.0);
		let events = speech.begin("four", 1.0);
		assert_eq!(words(&events), vec!["FOUR"]);
		// FOUR lasts 280 ms
		assert!(speech.advance(270.0).is_empty());
		assert_eq!(speech.advance(11.0), vec![SpeechEvent::Ended]);
	}
}
