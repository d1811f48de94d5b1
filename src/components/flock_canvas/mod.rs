mod component;
mod render;
mod state;

pub use component::FlockCanvas;
pub use render::Tooltip;
pub use state::SceneController;
