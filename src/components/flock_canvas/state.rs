use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use glam::Vec2;
use leptos::prelude::*;
use log::{error, info, warn};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use super::render::Tooltip;
use crate::audio::Voice;
use crate::sim::{LegendEntry, Scene, SceneCommand, SceneConfig, SpeechEvent};

/// Handle the page uses to drive the canvas. Commands are queued and applied at
/// the start of the next animation frame; results come back through signals.
#[derive(Clone)]
pub struct SceneController {
	queue: Rc<RefCell<VecDeque<SceneCommand>>>,
	voice: Rc<RefCell<Option<Voice>>>,
	/// Mood shares of the living graph.
	pub legend: RwSignal<Vec<LegendEntry>>,
	/// Words of the current utterance and the index of the one on stage.
	pub caption: RwSignal<Option<(Vec<String>, usize)>>,
	/// Memory line under the pointer.
	pub tooltip: RwSignal<Option<Tooltip>>,
}

impl SceneController {
	/// A controller with an empty queue.
	pub fn new() -> Self {
		Self {
			queue: Rc::new(RefCell::new(VecDeque::new())),
			voice: Rc::new(RefCell::new(None)),
			legend: RwSignal::new(Vec::new()),
			caption: RwSignal::new(None),
			tooltip: RwSignal::new(None),
		}
	}

	/// Queue a command for the next frame.
	pub fn send(&self, command: SceneCommand) {
		self.queue.borrow_mut().push_back(command);
	}

	/// Create or resume the audio context. Browsers only allow this while a
	/// user gesture is being handled, so call it from the event handler itself.
	pub fn unlock_audio(&self) {
		let mut slot = self.voice.borrow_mut();
		if let Some(voice) = slot.as_ref() {
			voice.resume();
			return;
		}
		match Voice::new(js_sys::Date::now() as u64) {
			Ok(voice) => {
				voice.resume();
				*slot = Some(voice);
				info!("Voice unlocked");
			}
			Err(err) => error!("Voice unavailable: {}", err),
		}
	}

	fn drain(&self) -> Vec<SceneCommand> {
		self.queue.borrow_mut().drain(..).collect()
	}
}

impl Default for SceneController {
	fn default() -> Self {
		Self::new()
	}
}

/// Everything the canvas keeps between frames.
pub struct CanvasState {
	pub scene: Scene,
	pub rng: SmallRng,
	pub mouse: Option<Vec2>,
	pub dpr: f64,
	legend_revision: u64,
}

impl CanvasState {
	pub fn new(config: SceneConfig, width: f64, height: f64, dpr: f64, seed: u64) -> Self {
		let mut scene = Scene::new(config, seed);
		scene.resize(width as f32, height as f32);
		Self {
			scene,
			rng: SmallRng::seed_from_u64(seed.rotate_left(17)),
			mouse: None,
			dpr,
			legend_revision: 0,
		}
	}

	pub fn resize(&mut self, width: f64, height: f64, dpr: f64) {
		self.dpr = dpr;
		self.scene.resize(width as f32, height as f32);
	}

	pub fn pointer_moved(&mut self, x: f64, y: f64) {
		let at = Vec2::new(x as f32, y as f32);
		self.mouse = Some(at);
		self.scene.set_pointer(at);
	}

	pub fn pointer_left(&mut self) {
		self.mouse = None;
		self.scene.release_pointer();
	}

	/// Apply queued commands, advance the scene and publish what changed.
	pub fn frame(&mut self, controller: &SceneController) {
		let mut events = Vec::new();
		for command in controller.drain() {
			events.extend(self.scene.apply(command));
		}
		events.extend(self.scene.tick());
		for event in &events {
			self.voice_event(controller, event);
			publish_caption(controller, event);
		}

		let revision = self.scene.overlay_revision();
		if revision != self.legend_revision {
			self.legend_revision = revision;
			controller.legend.set(self.scene.legend());
		}
	}

	fn voice_event(&self, controller: &SceneController, event: &SpeechEvent) {
		let profile = self.scene.voice_profile();
		let glitch = self.scene.is_glitching();
		if let Some(voice) = controller.voice.borrow_mut().as_mut() {
			if let Err(err) = voice.handle(event, profile, glitch) {
				warn!("Voice dropped a speech event: {}", err);
			}
		}
	}
}

fn publish_caption(controller: &SceneController, event: &SpeechEvent) {
	match event {
		SpeechEvent::Began => controller.caption.set(None),
		SpeechEvent::Word { word, .. } => controller.caption.update(|caption| match caption {
			Some((words, index)) => {
				words.push(word.clone());
				*index = words.len() - 1;
			}
			None => *caption = Some((vec![word.clone()], 0)),
		}),
		SpeechEvent::Ended => controller.caption.set(None),
	}
}
