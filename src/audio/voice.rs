use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use wasm_bindgen::JsValue;
use web_sys::{
	AudioContext, AudioContextState, AudioScheduledSourceNode, BiquadFilterNode, BiquadFilterType,
	DelayNode, DynamicsCompressorNode, GainNode, OscillatorNode, OscillatorType,
};

use super::{RELEASE, RESTING_CUTOFF, brightness, drain_finished, pitch_for};
use crate::sim::error::SceneError;
use crate::sim::mood::VoiceProfile;
use crate::sim::speech::SpeechEvent;

fn audio_err(err: JsValue) -> SceneError {
	SceneError::Audio(format!("{:?}", err))
}

/// Oscillators of one utterance. Rebuilt for every utterance because stopped
/// oscillators cannot be restarted.
struct Breath {
	master: GainNode,
	main: OscillatorNode,
	sub: OscillatorNode,
	filter: BiquadFilterNode,
	delay: DelayNode,
	feedback: GainNode,
}

impl Breath {
	fn disconnect(&self) -> Result<(), JsValue> {
		self.main.disconnect()?;
		self.sub.disconnect()?;
		self.filter.disconnect()?;
		self.master.disconnect()?;
		self.delay.disconnect()?;
		self.feedback.disconnect()
	}
}

/// Web Audio voice: two oscillators through a low-pass filter, a feedback
/// delay and a safety compressor.
pub struct Voice {
	ctx: AudioContext,
	compressor: DynamicsCompressorNode,
	breath: Option<Breath>,
	/// Released breaths and the time their oscillators stop.
	retired: Vec<(Breath, f64)>,
	rng: SmallRng,
}

impl Voice {
	/// Create the audio context and the always-on compressor.
	pub fn new(seed: u64) -> Result<Self, SceneError> {
		let ctx = AudioContext::new().map_err(audio_err)?;
		let compressor = ctx.create_dynamics_compressor().map_err(audio_err)?;
		compressor.threshold().set_value(-10.0);
		compressor.ratio().set_value(12.0);
		compressor
			.connect_with_audio_node(&ctx.destination())
			.map_err(audio_err)?;
		info!("Audio context created");
		Ok(Self {
			ctx,
			compressor,
			breath: None,
			retired: Vec::new(),
			rng: SmallRng::seed_from_u64(seed),
		})
	}

	/// Resume a context suspended by the autoplay policy. Call from a user gesture.
	pub fn resume(&self) {
		if self.ctx.state() == AudioContextState::Suspended {
			if let Err(err) = self.ctx.resume() {
				debug!("Audio resume rejected: {:?}", err);
			}
		}
	}

	/// React to one speech event.
	pub fn handle(
		&mut self,
		event: &SpeechEvent,
		profile: VoiceProfile,
		glitch: bool,
	) -> Result<(), SceneError> {
		match event {
			SpeechEvent::Began => self.start(),
			SpeechEvent::Word { articulation, .. } => {
				self.morph(articulation.vowel(), profile, glitch)
			}
			SpeechEvent::Ended => self.stop(),
		}
	}

	/// Fade in a fresh breath stream unless one is already running.
	pub fn start(&mut self) -> Result<(), SceneError> {
		if self.breath.is_some() {
			return Ok(());
		}
		self.sweep()?;
		let ctx = &self.ctx;
		let t = ctx.current_time();

		let master = ctx.create_gain().map_err(audio_err)?;
		master.gain().set_value_at_time(0.0, t).map_err(audio_err)?;
		master
			.gain()
			.linear_ramp_to_value_at_time(0.3, t + 0.5)
			.map_err(audio_err)?;

		let delay = ctx.create_delay().map_err(audio_err)?;
		delay.delay_time().set_value(0.15);
		let feedback = ctx.create_gain().map_err(audio_err)?;
		feedback.gain().set_value(0.3);

		master
			.connect_with_audio_node(&self.compressor)
			.map_err(audio_err)?;
		master.connect_with_audio_node(&delay).map_err(audio_err)?;
		delay.connect_with_audio_node(&feedback).map_err(audio_err)?;
		feedback.connect_with_audio_node(&delay).map_err(audio_err)?;
		delay
			.connect_with_audio_node(&self.compressor)
			.map_err(audio_err)?;

		let main = ctx.create_oscillator().map_err(audio_err)?;
		main.set_type(OscillatorType::Triangle);
		main.frequency().set_value(220.0);
		let sub = ctx.create_oscillator().map_err(audio_err)?;
		sub.set_type(OscillatorType::Sine);
		sub.frequency().set_value(220.0);

		let filter = ctx.create_biquad_filter().map_err(audio_err)?;
		filter.set_type(BiquadFilterType::Lowpass);
		filter.frequency().set_value(RESTING_CUTOFF);
		filter.q().set_value(1.0);

		main.connect_with_audio_node(&filter).map_err(audio_err)?;
		sub.connect_with_audio_node(&filter).map_err(audio_err)?;
		filter.connect_with_audio_node(&master).map_err(audio_err)?;

		for osc in [&main, &sub] {
			let source: &AudioScheduledSourceNode = osc;
			source.start_with_when(t).map_err(audio_err)?;
		}
		self.breath = Some(Breath {
			master,
			main,
			sub,
			filter,
			delay,
			feedback,
		});
		debug!("Breath stream started");
		Ok(())
	}

	/// Fade out and release the oscillators half a second later.
	pub fn stop(&mut self) -> Result<(), SceneError> {
		let Some(breath) = self.breath.take() else {
			return Ok(());
		};
		let t = self.ctx.current_time();
		let gain = breath.master.gain();
		gain.cancel_scheduled_values(t).map_err(audio_err)?;
		gain.set_target_at_time(0.0, t, 0.2).map_err(audio_err)?;
		for osc in [&breath.main, &breath.sub] {
			let source: &AudioScheduledSourceNode = osc;
			source.stop_with_when(t + RELEASE).map_err(audio_err)?;
		}
		self.retired.push((breath, t + RELEASE));
		debug!("Breath stream stopped");
		self.sweep()
	}

	/// Disconnect released breaths whose oscillators have stopped.
	fn sweep(&mut self) -> Result<(), SceneError> {
		let now = self.ctx.current_time();
		for breath in drain_finished(&mut self.retired, now) {
			breath.disconnect().map_err(audio_err)?;
		}
		Ok(())
	}

	/// Glide pitch and filter to the shape of `letter`.
	pub fn morph(
		&mut self,
		letter: char,
		profile: VoiceProfile,
		glitch: bool,
	) -> Result<(), SceneError> {
		let Some(breath) = self.breath.as_ref() else {
			return Ok(());
		};
		let t = self.ctx.current_time();
		let tempo = f64::from(profile.tempo);
		let pitch = pitch_for(letter, profile, glitch, &mut self.rng);

		breath
			.main
			.frequency()
			.set_target_at_time(pitch, t, 0.1 * tempo)
			.map_err(audio_err)?;
		breath
			.sub
			.frequency()
			.set_target_at_time(pitch / 2.0, t, 0.1 * tempo)
			.map_err(audio_err)?;

		let cutoff = breath.filter.frequency();
		cutoff.cancel_scheduled_values(t).map_err(audio_err)?;
		cutoff
			.set_value_at_time(cutoff.value(), t)
			.map_err(audio_err)?;
		cutoff
			.linear_ramp_to_value_at_time(brightness(letter, glitch), t + 0.05 * tempo)
			.map_err(audio_err)?;
		cutoff
			.set_target_at_time(RESTING_CUTOFF, t + 0.1 * tempo, 0.2 * tempo)
			.map_err(audio_err)?;
		Ok(())
	}
}
