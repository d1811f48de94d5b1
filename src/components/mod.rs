pub mod flock_canvas;
pub mod mood_legend;
