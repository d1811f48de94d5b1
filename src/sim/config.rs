//! Scene tuning, loadable from JSON.

use serde::{Deserialize, Serialize};

use super::physics::PhysicsParams;

/// Labels floated around the flock before any conversation has happened.
pub const DEFAULT_KEYWORDS: [&str; 8] = [
	"SYSTEM", "LOCKED", "SECURE", "AUTH", "REQUIRED", "WAIT", "KEY", "VOID",
];

/// Static settings of a scene. Any field missing from a JSON document keeps its
/// default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
	/// Agents spawned at start-up.
	pub flock_size: usize,
	/// Feeding never grows the flock past this.
	pub max_flock: usize,
	/// Graphs are only built on flocks at least this large.
	pub min_agents_for_graph: usize,
	/// Camera focal length.
	pub field_of_view: f32,
	/// Camera distance from the flock centre.
	pub camera_distance: f32,
	/// Nominal frame length used to clock speech.
	pub frame_ms: f32,
	/// Seed of the scene RNG; `None` seeds from the clock.
	pub seed: Option<u64>,
	/// Resting physics parameters.
	pub physics: PhysicsParams,
	/// Labels shown before the first reply.
	pub default_keywords: Vec<String>,
}

impl Default for SceneConfig {
	fn default() -> Self {
		Self {
			flock_size: 900,
			max_flock: 1200,
			min_agents_for_graph: 50,
			field_of_view: 600.0,
			camera_distance: 500.0,
			frame_ms: 1000.0 / 60.0,
			seed: None,
			physics: PhysicsParams::default(),
			default_keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
		}
	}
}

impl SceneConfig {
	/// Parse a (possibly partial) JSON configuration.
	pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(raw)
	}
}
