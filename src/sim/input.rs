//! What the text box was asked to do.

use super::scene::Mode;

/// A classified line of user input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputIntent {
	/// Switch to the data-stream archive mode.
	EnterDirector,
	/// Switch to the night-sky interrogation mode.
	EnterQuestion,
	/// Leave whichever special mode is active.
	ExitMode,
	/// A raw graph payload to show as-is.
	Payload(String),
	/// Text to be spoken verbatim, without the leading slash.
	Recite(String),
	/// Keyboard mashing; fed to the flock and rejected.
	Garbage(String),
	/// Anything else, handed to the chat collaborator.
	Message(String),
}

impl InputIntent {
	/// Classify trimmed input given the current mode. Blank input yields `None`.
	pub fn classify(raw: &str, mode: Mode) -> Option<Self> {
		let text = raw.trim();
		if text.is_empty() {
			return None;
		}
		let lowered = text.to_lowercase();
		let intent = match lowered.as_str() {
			"director mode" => InputIntent::EnterDirector,
			"question time" => InputIntent::EnterQuestion,
			"done" if mode != Mode::Flock => InputIntent::ExitMode,
			_ if text.starts_with('{') => InputIntent::Payload(text.to_owned()),
			_ if is_garbage(text) => InputIntent::Garbage(text.to_owned()),
			_ => match text.strip_prefix('/') {
				Some(rest) => InputIntent::Recite(rest.trim().to_owned()),
				None => InputIntent::Message(text.to_owned()),
			},
		};
		Some(intent)
	}

	/// Line the voice says when a mode changes.
	pub fn announcement(&self, mode: Mode) -> Option<&'static str> {
		match (self, mode) {
			(InputIntent::EnterDirector, _) => Some("DIRECTOR MODE ENGAGED. ACCESSING ARCHIVES."),
			(InputIntent::EnterQuestion, _) => Some("MODE: INTERROGATION. WHAT SHALL WE DISCUSS?"),
			(InputIntent::ExitMode, Mode::Director) => Some("RETURNING TO STANDARD MEMORY."),
			(InputIntent::ExitMode, _) => Some("RETURNING TO HOMEOSTASIS."),
			(InputIntent::Garbage(_), _) => Some("ERR.. SYST3M... REJECT... D4TA..."),
			_ => None,
		}
	}
}

/// Longer than six characters and either vowel-free or containing a run of
/// four identical characters.
pub fn is_garbage(text: &str) -> bool {
	let chars: Vec<char> = text.chars().collect();
	if chars.len() <= 6 {
		return false;
	}
	let has_vowel = chars.iter().any(|c| "aeiouAEIOU".contains(*c));
	let has_run = chars.windows(4).any(|w| w.iter().all(|c| *c == w[0]));
	!has_vowel || has_run
}

/// Distinct alphabetic words of at least four letters, upper-cased, in order
/// of first appearance, at most `max` of them.
pub fn extract_keywords(text: &str, max: usize) -> Vec<String> {
	let mut out: Vec<String> = Vec::new();
	if max == 0 {
		return out;
	}
	for word in text.split(|c: char| !c.is_alphabetic()) {
		if word.chars().count() < 4 {
			continue;
		}
		let upper = word.to_uppercase();
		if !out.contains(&upper) {
			out.push(upper);
		}
		if out.len() == max {
			break;
		}
	}
	out
}

/// Earlier lines mentioning any of `keywords`, newest first, at most `max`.
pub fn recall(history: &[String], keywords: &[String], max: usize) -> Vec<String> {
	let needles: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
	history
		.iter()
		.rev()
		.filter(|line| {
			let lowered = line.to_lowercase();
			needles.iter().any(|n| lowered.contains(n.as_str()))
		})
		.take(max)
		.cloned()
		.collect()
}
