use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use leptos::prelude::*;
use log::{info, warn};
use web_sys::KeyboardEvent;

use crate::components::flock_canvas::{FlockCanvas, SceneController};
use crate::components::mood_legend::MoodLegend;
use crate::sim::input::{extract_keywords, recall};
use crate::sim::{GraphContext, GraphPayload, InputIntent, Mode, Mood, SceneCommand};

/// Delay before the local stand-in collaborator answers a message.
const REPLY_DELAY: Duration = Duration::from_millis(1200);

/// Route one submitted line to the scene.
fn submit(
	controller: &SceneController,
	mode: RwSignal<Mode>,
	history: &Rc<RefCell<Vec<String>>>,
	raw: &str,
) {
	let current = mode.get_untracked();
	let Some(intent) = InputIntent::classify(raw, current) else {
		return;
	};
	controller.unlock_audio();
	let announcement = intent.announcement(current);

	match intent {
		InputIntent::EnterDirector | InputIntent::EnterQuestion | InputIntent::ExitMode => {
			let next = match intent {
				InputIntent::EnterDirector => Mode::Director,
				InputIntent::EnterQuestion => Mode::Question,
				_ => Mode::Flock,
			};
			info!("Switching to {:?}", next);
			mode.set(next);
			if next == Mode::Flock {
				controller.send(SceneCommand::DissolveGraph);
			}
			controller.send(SceneCommand::SetMode(next));
			if let Some(line) = announcement {
				controller.send(SceneCommand::Speak(line.to_owned()));
			}
		}
		InputIntent::Payload(raw) => match GraphPayload::parse(&raw) {
			Ok(payload) => {
				let reply = payload.response.clone();
				history.borrow_mut().push(raw);
				controller.send(SceneCommand::ApplyGraph {
					payload,
					context: GraphContext::new(history.borrow().iter(), Vec::new()),
				});
				if let Some(reply) = reply {
					controller.send(SceneCommand::Speak(reply));
				}
			}
			Err(err) => {
				warn!("Rejected graph payload: {}", err);
				controller.send(SceneCommand::SetMood(Mood::Dislike));
				controller.send(SceneCommand::Speak("SYSTEM FAILURE.".into()));
				let controller = controller.clone();
				set_timeout(
					move || controller.send(SceneCommand::SetMood(Mood::Neutral)),
					Duration::from_secs(3),
				);
			}
		},
		InputIntent::Recite(line) => {
			controller.send(SceneCommand::Feed(raw.trim().to_owned()));
			let controller = controller.clone();
			set_timeout(
				move || controller.send(SceneCommand::Speak(line)),
				Duration::from_millis(1500),
			);
		}
		InputIntent::Garbage(text) => {
			controller.send(SceneCommand::SetGlitch(true));
			controller.send(SceneCommand::Feed(text));
			let line = announcement.unwrap_or_default().to_owned();
			let controller = controller.clone();
			set_timeout(
				move || {
					controller.send(SceneCommand::Speak(line));
					set_timeout(
						move || controller.send(SceneCommand::SetGlitch(false)),
						Duration::from_secs(2),
					);
				},
				Duration::from_secs(2),
			);
		}
		InputIntent::Message(text) => {
			controller.send(SceneCommand::Feed(text.clone()));
			controller.send(SceneCommand::SetThinking(true));
			let keywords = extract_keywords(&text, 6);
			let memories = recall(&history.borrow(), &keywords, 8);
			history.borrow_mut().push(text.clone());
			let context = GraphContext::new(history.borrow().iter(), memories);
			let controller = controller.clone();
			set_timeout(
				move || {
					let reply = if keywords.is_empty() {
						"NO SIGNAL.".to_owned()
					} else {
						keywords.join(" ")
					};
					controller.send(SceneCommand::ApplyGraph {
						payload: GraphPayload::from_keywords(&keywords),
						context,
					});
					controller.send(SceneCommand::Speak(reply));
				},
				REPLY_DELAY,
			);
		}
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let controller = SceneController::new();
	let mode = RwSignal::new(Mode::Flock);
	let history: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
	let input_ref = NodeRef::<leptos::html::Input>::new();
	let (caption, tooltip) = (controller.caption, controller.tooltip);

	let controller_kd = controller.clone();
	let on_keydown = move |ev: KeyboardEvent| {
		if ev.key() != "Enter" {
			return;
		}
		let Some(input) = input_ref.get_untracked() else {
			return;
		};
		let text = input.value();
		input.set_value("");
		let _ = input.blur();
		submit(&controller_kd, mode, &history, &text);
	};

	view! {
		<div class="symbiosis-container">
			<FlockCanvas controller=controller.clone() />
			<MoodLegend entries=controller.legend />
			<div class="subtitle-track">
				{move || {
					caption
						.get()
						.map(|(words, active)| {
							words
								.into_iter()
								.enumerate()
								.map(|(i, word)| {
									let class = if i == active { "char-span active" } else { "char-span" };
									view! { <span class=class>{word}</span> }
								})
								.collect_view()
						})
				}}
			</div>
			{move || {
				tooltip
					.get()
					.map(|t| {
						view! {
							<div
								class="node-tooltip"
								style=format!("left: {}px; top: {}px;", t.x, t.y)
							>
								<strong>"SOURCE MEMORY"</strong>
								{t.fact}
							</div>
						}
					})
			}}
			<input
				node_ref=input_ref
				class="word-input"
				type="text"
				autocomplete="off"
				placeholder=move || {
					if mode.get() == Mode::Question { "DISCUSS..." } else { "COMMUNICATE..." }
				}
				on:keydown=on_keydown
			/>
		</div>
	}
}
