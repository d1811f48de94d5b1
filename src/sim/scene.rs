//! The whole animated world, independent of the browser.
//!
//! A [`Scene`] is mutated through [`Scene::apply`] with a [`SceneCommand`], by
//! pointer and resize calls, and by [`Scene::tick`] once per animation frame.
//! After a tick, [`Scene::projected`] holds one screen point per agent, indexed
//! like [`Scene::agents`].

use glam::{Vec2, Vec3};
use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::agent::Agent;
use super::color::Palette;
use super::config::SceneConfig;
use super::feeding::Feeding;
use super::graph::{GraphContext, GraphOverlay, GraphPayload, LegendEntry};
use super::mood::{Mood, VoiceProfile};
use super::physics::{
	Kinematics, PhysicsParams, Pointer, Regime, StepContext, step_flocking, step_node, step_star,
	step_stream,
};
use super::projection::{Camera, Projected, displace, glitch_jitter};
use super::speech::{Speech, SpeechEvent};

/// Behaviour of agents that do not embody a graph node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
	/// Regular murmuration.
	#[default]
	Flock,
	/// Night sky: agents freeze into blinking stars.
	Question,
	/// Data stream: agents scan horizontally across the screen.
	Director,
}

impl Mode {
	/// Mood a mode switch puts the flock in.
	pub fn mood(self) -> Mood {
		match self {
			Mode::Flock => Mood::Neutral,
			Mode::Question => Mood::Question,
			Mode::Director => Mood::Cryptic,
		}
	}
}

/// Everything the outside world can ask of the scene.
#[derive(Clone, Debug)]
pub enum SceneCommand {
	/// Show a fresh reply: update labels and mood, dissolve the old graph and
	/// build this one.
	ApplyGraph {
		/// Graph data.
		payload: GraphPayload,
		/// Text the node weights and facts derive from.
		context: GraphContext,
	},
	/// Bring back a graph from history, discarding whatever is on screen.
	RestoreGraph {
		/// Graph data.
		payload: GraphPayload,
		/// Text the node weights and facts derive from.
		context: GraphContext,
	},
	/// Fade out the current graph.
	DissolveGraph,
	/// Set the current mood.
	SetMood(Mood),
	/// Toggle the waiting swirl.
	SetThinking(bool),
	/// Switch modes; also resets the mood to the mode's own.
	SetMode(Mode),
	/// Toggle the rejected-input static.
	SetGlitch(bool),
	/// Float text up into the flock.
	Feed(String),
	/// Start speaking text, replacing any current utterance.
	Speak(String),
}

/// Flock, graph overlay and every piece of state animated with them.
pub struct Scene {
	config: SceneConfig,
	agents: Vec<Agent>,
	overlay: GraphOverlay,
	params: PhysicsParams,
	palette: Palette,
	mood: Mood,
	mode: Mode,
	thinking: bool,
	glitch: bool,
	pointer: Pointer,
	camera: Camera,
	feeding: Feeding,
	speech: Speech,
	keywords: Vec<String>,
	glow: f32,
	time: f32,
	width: f32,
	height: f32,
	projected: Vec<Projected>,
	rng: SmallRng,
}

impl Scene {
	/// Spawn a flock of `config.flock_size` agents.
	pub fn new(config: SceneConfig, seed: u64) -> Self {
		let mut rng = SmallRng::seed_from_u64(seed);
		let palette = Palette::CHAMPAGNE;
		let agents: Vec<Agent> = (0..config.flock_size)
			.map(|_| Agent::spawn(&mut rng, config.physics.max_speed, &palette))
			.collect();
		info!("Scene created with {} agents", agents.len());
		Self {
			params: config.physics,
			camera: Camera::new(config.field_of_view, config.camera_distance),
			keywords: config.default_keywords.clone(),
			config,
			agents,
			overlay: GraphOverlay::default(),
			palette,
			mood: Mood::Neutral,
			mode: Mode::Flock,
			thinking: false,
			glitch: false,
			pointer: Pointer::default(),
			feeding: Feeding::default(),
			speech: Speech::default(),
			glow: 0.0,
			time: 0.0,
			width: 800.0,
			height: 600.0,
			projected: Vec::new(),
			rng,
		}
	}

	/// Apply one command. Returns speech events it started, if any.
	pub fn apply(&mut self, command: SceneCommand) -> Vec<SpeechEvent> {
		match command {
			SceneCommand::ApplyGraph { payload, context } => {
				let labels = payload.flat_keywords();
				if !labels.is_empty() {
					self.keywords = labels;
				}
				self.build(&payload, &context);
				self.mood = if self.mode == Mode::Question {
					Mood::Question
				} else {
					payload.parsed_mood().unwrap_or(Mood::Neutral)
				};
				self.thinking = false;
			}
			SceneCommand::RestoreGraph { payload, context } => {
				self.overlay.clear(&mut self.agents);
				self.mood = payload.parsed_mood().unwrap_or(Mood::Neutral);
				self.build(&payload, &context);
			}
			SceneCommand::DissolveGraph => self.overlay.dissolve(&mut self.agents, &mut self.rng),
			SceneCommand::SetMood(mood) => self.mood = mood,
			SceneCommand::SetThinking(on) => self.thinking = on,
			SceneCommand::SetMode(mode) => {
				info!("Mode {:?} -> {:?}", self.mode, mode);
				self.mode = mode;
				self.mood = mode.mood();
			}
			SceneCommand::SetGlitch(on) => {
				self.glitch = on;
				self.mood = if on { Mood::Glitch } else { Mood::Neutral };
			}
			SceneCommand::Feed(text) => {
				self.feeding.spawn(&text, self.width, self.height, &mut self.rng);
			}
			SceneCommand::Speak(text) => {
				self.feeding.cancel();
				let tempo = self.voice_profile().tempo;
				let events = self.speech.begin(&text, tempo);
				self.on_speech(&events);
				return events;
			}
		}
		Vec::new()
	}

	fn build(&mut self, payload: &GraphPayload, context: &GraphContext) {
		let built = self.overlay.rebuild(
			&mut self.agents,
			payload,
			context,
			self.mood,
			self.config.min_agents_for_graph,
			&mut self.rng,
		);
		if built > 0 {
			self.glow = 1.0;
		}
	}

	fn on_speech(&mut self, events: &[SpeechEvent]) {
		if events.contains(&SpeechEvent::Ended) {
			debug!("Utterance finished, dissolving graph");
			self.overlay.dissolve(&mut self.agents, &mut self.rng);
		}
	}

	/// Advance the world by one animation frame.
	pub fn tick(&mut self) -> Vec<SpeechEvent> {
		let events = self.speech.advance(self.config.frame_ms);
		self.on_speech(&events);

		self.pointer.follow();
		let regime = if self.speech.is_speaking() {
			Regime::Speaking(self.speech.atmosphere())
		} else if self.thinking {
			Regime::Thinking
		} else {
			Regime::Idle
		};
		self.params.relax_towards(regime, &self.config.physics);
		let target = if self.glitch {
			Mood::Glitch.palette()
		} else {
			self.mood.palette()
		};
		self.palette.lerp_towards(&target, 0.15);

		self.time += 0.005;
		self.camera.sway(self.time);
		if self.glow > 0.0 {
			self.glow *= 0.94;
		}

		self.step_agents();
		self.overlay.advance_lifecycle(&mut self.agents);
		self.digest();
		self.project();
		events
	}

	fn step_agents(&mut self) {
		let snapshot: Vec<Kinematics> = self
			.agents
			.iter()
			.map(|a| Kinematics {
				pos: a.pos,
				vel: a.vel,
			})
			.collect();
		let attractors = self.overlay.attractors(&self.agents);
		let parents: Vec<Option<Vec3>> = self
			.agents
			.iter()
			.map(|a| {
				let node = a.living_node()?;
				self.overlay.live_parent(&self.agents, node).map(|p| p.pos)
			})
			.collect();

		let ctx = StepContext {
			snapshot: &snapshot,
			attractors: &attractors,
			params: &self.params,
			palette: &self.palette,
			pointer: &self.pointer,
			width: self.width,
			time: self.time,
			thinking: self.thinking,
		};
		for (i, agent) in self.agents.iter_mut().enumerate() {
			if agent.living_node().is_some() {
				step_node(agent, parents[i], self.time);
				continue;
			}
			match self.mode {
				Mode::Flock => step_flocking(agent, i, &ctx, &mut self.rng),
				Mode::Question => step_star(agent, self.time),
				Mode::Director => step_stream(agent, i, self.width, &mut self.rng),
			}
		}
	}

	fn digest(&mut self) {
		if !self.feeding.is_active() {
			return;
		}
		for pos in self.feeding.step() {
			if self.agents.len() < self.config.max_flock {
				let burst = Vec2::new((self.rng.random::<f32>() - 0.5) * 10.0, -5.0);
				self.agents
					.push(Agent::newborn(&mut self.rng, pos, burst, &self.palette));
			}
			self.glow += 0.2;
		}
	}

	fn project(&mut self) {
		let center = self.center();
		let wave = if self.speech.is_speaking() {
			self.speech.intensity() * 5.0
		} else {
			0.0
		};
		self.projected.clear();
		for agent in &self.agents {
			let jitter = if self.glitch {
				glitch_jitter(&mut self.rng)
			} else {
				Vec2::ZERO
			};
			let p = displace(agent.pos, jitter, wave, self.time);
			self.projected.push(self.camera.project(p, center));
		}
	}

	/// Pointer moved to `screen` (logical canvas pixels).
	pub fn set_pointer(&mut self, screen: Vec2) {
		self.pointer.raw = Some(screen - self.center());
	}

	/// Pointer left the canvas or the touch ended.
	pub fn release_pointer(&mut self) {
		self.pointer.raw = None;
	}

	/// Canvas resized to the given logical size.
	pub fn resize(&mut self, width: f32, height: f32) {
		self.width = width;
		self.height = height;
	}

	/// Screen point the flock origin projects to.
	pub fn center(&self) -> Vec2 {
		Vec2::new(self.width / 2.0, self.height * 0.35)
	}

	/// All agents.
	pub fn agents(&self) -> &[Agent] {
		&self.agents
	}

	/// Screen points of the last tick, indexed like [`Scene::agents`].
	pub fn projected(&self) -> &[Projected] {
		&self.projected
	}

	/// Graph bookkeeping.
	pub fn overlay(&self) -> &GraphOverlay {
		&self.overlay
	}

	/// Living node share per mood.
	pub fn legend(&self) -> Vec<LegendEntry> {
		self.overlay.legend(&self.agents)
	}

	/// Changes whenever the legend may have changed.
	pub fn overlay_revision(&self) -> u64 {
		self.overlay.revision()
	}

	/// Live palette.
	pub fn palette(&self) -> &Palette {
		&self.palette
	}

	/// Current mood.
	pub fn mood(&self) -> Mood {
		self.mood
	}

	/// Pitch and tempo the voice should use right now.
	pub fn voice_profile(&self) -> VoiceProfile {
		if self.glitch {
			Mood::Glitch.voice()
		} else {
			self.mood.voice()
		}
	}

	/// Current mode.
	pub fn mode(&self) -> Mode {
		self.mode
	}

	/// Whether the waiting swirl is on.
	pub fn is_thinking(&self) -> bool {
		self.thinking
	}

	/// Whether the rejected-input static is on.
	pub fn is_glitching(&self) -> bool {
		self.glitch
	}

	/// Whether a word is on stage.
	pub fn is_speaking(&self) -> bool {
		self.speech.is_speaking()
	}

	/// Floating labels.
	pub fn keywords(&self) -> &[String] {
		&self.keywords
	}

	/// Pending food.
	pub fn feeding(&self) -> &Feeding {
		&self.feeding
	}

	/// Digestion glow strength.
	pub fn glow(&self) -> f32 {
		self.glow
	}

	/// Scene clock.
	pub fn time(&self) -> f32 {
		self.time
	}

	/// Logical canvas size.
	pub fn size(&self) -> (f32, f32) {
		(self.width, self.height)
	}

	/// Settings the scene was built with.
	pub fn config(&self) -> &SceneConfig {
		&self.config
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn scene(flock_size: usize) -> Scene {
		let config = SceneConfig {
			flock_size,
			..SceneConfig::default()
		};
		let mut scene = Scene::new(config, 42);
		scene.resize(1000.0, 800.0);
		scene
	}

	fn graph(keywords: &[&str], mood: Option<&str>) -> SceneCommand {
		let mut payload =
			GraphPayload::from_keywords(&keywords.iter().map(|k| k.to_string()).collect::<Vec<_>>());
		payload.mood = mood.map(str::to_owned);
		SceneCommand::ApplyGraph {
			payload,
			context: GraphContext::default(),
		}
	}

	fn node_count(scene: &Scene) -> usize {
		scene.agents().iter().filter(|a| a.node.is_some()).count()
	}

	#[test]
	fn new_scene_spawns_the_configured_flock() {
		let scene = scene(120);
		assert_eq!(scene.agents().len(), 120);
		assert_eq!(scene.keywords().len(), 8);
		assert_eq!(scene.mode(), Mode::Flock);
		assert_eq!(scene.center(), Vec2::new(500.0, 280.0));
	}

	#[test]
	fn tick_projects_every_agent_and_keeps_speeds_bounded() {
		let mut scene = scene(120);
		for _ in 0..30 {
			scene.tick();
		}
		assert_eq!(scene.projected().len(), 120);
		let cap = scene.config().physics.max_speed + 1e-3;
		assert!(scene.agents().iter().all(|a| a.vel.length() <= cap));
		assert!(scene.time() > 0.14);
	}

	#[test]
	fn applying_a_graph_sets_labels_mood_and_glow() {
		let mut scene = scene(120);
		scene.apply(SceneCommand::SetThinking(true));
		scene.apply(graph(&["ocean", "tide", "moon"], Some("joyful")));
		assert_eq!(node_count(&scene), 3);
		assert_eq!(scene.keywords(), ["OCEAN", "TIDE", "MOON"]);
		assert_eq!(scene.mood(), Mood::Joyful);
		assert!(!scene.is_thinking());
		assert_eq!(scene.glow(), 1.0);
		for _ in 0..60 {
			scene.tick();
		}
		assert_eq!(scene.legend()[0].count, 3);
	}

	#[test]
	fn question_mode_pins_the_mood() {
		let mut scene = scene(120);
		scene.apply(SceneCommand::SetMode(Mode::Question));
		scene.apply(graph(&["star"], Some("sad")));
		assert_eq!(scene.mood(), Mood::Question);
		scene.apply(SceneCommand::SetMode(Mode::Director));
		assert_eq!(scene.mood(), Mood::Cryptic);
	}

	#[test]
	fn director_mode_scans_free_agents_sideways() {
		let mut scene = scene(120);
		scene.apply(graph(&["archive"], None));
		scene.apply(SceneCommand::SetMode(Mode::Director));
		let before: Vec<Vec3> = scene.agents().iter().map(|a| a.pos).collect();
		scene.tick();

		let bound = 1000.0 * 0.6;
		for (i, agent) in scene.agents().iter().enumerate() {
			if agent.living_node().is_some() {
				continue;
			}
			let expected = if i % 2 == 0 { 8.0 } else { -8.0 };
			assert_eq!(agent.vel.x, expected);
			assert_eq!(agent.vel.z, 0.0);
			assert!(agent.pos.x.abs() <= bound);
			let moved = agent.pos.x - before[i].x;
			assert!(
				(moved - expected).abs() < 1e-3 || moved.abs() > bound,
				"agent {i} moved {moved}"
			);
		}
	}

	#[test]
	fn question_mode_damps_free_agents() {
		let mut scene = scene(120);
		scene.apply(SceneCommand::SetMode(Mode::Question));
		let speeds: Vec<f32> = scene.agents().iter().map(|a| a.vel.length()).collect();
		scene.tick();
		for (agent, speed) in scene.agents().iter().zip(speeds) {
			assert!((agent.vel.length() - speed * 0.92).abs() < 1e-3);
		}
	}

	#[test]
	fn restore_replaces_the_graph_at_once() {
		let mut scene = scene(120);
		scene.apply(graph(&["first", "second"], None));
		let mut payload = GraphPayload::from_keywords(&["third".to_string()]);
		payload.mood = Some("nonsense".into());
		scene.apply(SceneCommand::RestoreGraph {
			payload,
			context: GraphContext::default(),
		});
		assert_eq!(node_count(&scene), 1);
		assert_eq!(scene.mood(), Mood::Neutral);
	}

	#[test]
	fn finished_speech_dissolves_the_graph() {
		let mut scene = scene(120);
		scene.apply(graph(&["root", "leafy"], None));
		let events = scene.apply(SceneCommand::Speak("hi".into()));
		assert_eq!(events[0], SpeechEvent::Began);
		assert!(scene.is_speaking());

		let mut ended = false;
		for _ in 0..20 {
			ended |= scene.tick().contains(&SpeechEvent::Ended);
		}
		assert!(ended);
		assert!(!scene.is_speaking());
		assert!(scene.agents().iter().filter_map(|a| a.node.as_ref()).all(|n| n.dying));
	}

	#[test]
	fn digested_food_hatches_agents_up_to_the_cap() {
		let config = SceneConfig {
			flock_size: 60,
			max_flock: 62,
			..SceneConfig::default()
		};
		let mut scene = Scene::new(config, 7);
		scene.resize(1000.0, 800.0);
		scene.apply(SceneCommand::Feed("abcd".into()));
		for _ in 0..300 {
			scene.tick();
		}
		assert_eq!(scene.agents().len(), 62);
		assert_eq!(scene.feeding().progress(), (4, 4));
		assert!(!scene.feeding().is_active());
	}

	#[test]
	fn glitch_overrides_voice_and_palette() {
		let mut scene = scene(60);
		scene.apply(SceneCommand::SetGlitch(true));
		assert_eq!(scene.voice_profile(), Mood::Glitch.voice());
		for _ in 0..200 {
			scene.tick();
		}
		assert!((scene.palette().secondary.g).abs() < 1.0);
		scene.apply(SceneCommand::SetGlitch(false));
		assert_eq!(scene.mood(), Mood::Neutral);
	}

	#[test]
	fn pointer_is_relative_to_the_flock_centre() {
		let mut scene = scene(60);
		scene.set_pointer(Vec2::new(600.0, 280.0));
		scene.tick();
		assert!(scene.agents().iter().any(|a| a.fear > 0.9));

		scene.release_pointer();
		for _ in 0..25 {
			scene.tick();
		}
		assert!(scene.agents().iter().all(|a| a.fear == 0.0));
	}

	#[test]
	fn blank_speech_still_dissolves_the_graph() {
		let mut scene = scene(120);
		scene.apply(graph(&["root", "leafy"], None));
		let events = scene.apply(SceneCommand::Speak("   ".into()));
		assert_eq!(events, vec![SpeechEvent::Began, SpeechEvent::Ended]);
		assert!(!scene.is_speaking());
		assert!(scene.agents().iter().filter_map(|a| a.node.as_ref()).all(|n| n.dying));

		for _ in 0..300 {
			scene.tick();
		}
		assert_eq!(node_count(&scene), 0);
	}

	#[test]
	fn dissolve_command_fades_the_graph_and_clears_the_legend() {
		let mut scene = scene(120);
		scene.apply(graph(&["tide", "moon"], None));
		scene.tick();
		let revision = scene.overlay_revision();
		assert_eq!(scene.legend()[0].count, 2);

		scene.apply(SceneCommand::DissolveGraph);
		assert!(scene.legend().is_empty());
		assert!(scene.overlay_revision() > revision);
		for _ in 0..200 {
			scene.tick();
		}
		assert_eq!(node_count(&scene), 0);
	}
}
