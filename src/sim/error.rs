//! Crate error type.

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Errors raised while feeding data into the scene or wiring it to the browser.
#[derive(Debug, Error)]
pub enum SceneError {
	/// The graph payload was not valid JSON (or did not contain an object at all).
	#[error("invalid graph payload: {0}")]
	InvalidPayload(#[from] serde_json::Error),
	/// No `{...}` object could be located in the raw payload text.
	#[error("graph payload contains no JSON object")]
	MissingObject,
	/// A mood name outside the known set.
	#[error("unknown mood `{0}`")]
	UnknownMood(String),
	/// The canvas element is not mounted yet.
	#[error("canvas element is unavailable")]
	CanvasUnavailable,
	/// `getContext("2d")` returned nothing usable.
	#[error("2d rendering context is unavailable")]
	ContextUnavailable,
	/// The Web Audio graph could not be created.
	#[error("audio setup failed: {0}")]
	Audio(String),
	/// Any other exception thrown by a browser API.
	#[error("javascript error: {0}")]
	Js(String),
}

impl From<JsValue> for SceneError {
	fn from(value: JsValue) -> Self {
		SceneError::Js(
			value
				.as_string()
				.unwrap_or_else(|| format!("{:?}", value)),
		)
	}
}
