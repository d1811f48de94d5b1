//! Headless murmuration model: flock physics, the knowledge-graph overlay,
//! projection and the timing of speech and feeding. Nothing in here touches the
//! browser, so it is tested natively.

pub mod agent;
pub mod color;
pub mod config;
pub mod error;
pub mod feeding;
pub mod graph;
pub mod input;
pub mod mood;
pub mod physics;
pub mod projection;
pub mod scene;
pub mod speech;

pub use agent::{Agent, AgentId, AgentKind};
pub use color::{Palette, Rgb};
pub use config::SceneConfig;
pub use error::SceneError;
pub use graph::{GraphContext, GraphNode, GraphPayload, LegendEntry, NodeLevel};
pub use input::InputIntent;
pub use mood::Mood;
pub use projection::Projected;
pub use scene::{Mode, Scene, SceneCommand};
pub use speech::{Articulation, SpeechEvent};
