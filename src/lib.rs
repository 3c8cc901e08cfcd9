//! Pixel glitch pipeline with coupled sonification.

pub mod audio;
pub mod config;
pub mod encode;
pub mod engine;
pub mod error;
pub mod history;
pub mod params;
pub mod render;
pub mod rng;
pub mod scheduler;

pub use engine::{EngineStatus, GlitchEngine};
pub use error::{EngineError, PlaybackError};
pub use params::GlitchParams;
pub use render::frame::{ProcessedFrame, SourceFrame};
