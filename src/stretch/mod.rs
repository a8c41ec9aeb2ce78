//! The stretch-engine seam, the built-in engine and its tuning.

pub mod engine;
pub mod params;
pub mod wsola;

pub use engine::{EngineConfig, StretchEngine, Stretcher};
pub use params::{EngineOptions, EngineTuning, PitchQuality, ProcessMode};
pub use wsola::StreamingWsola;
