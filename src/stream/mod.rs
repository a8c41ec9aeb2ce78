//! The pipeline-facing stretch stage and its sink-side driver.

pub mod chain;
pub mod processor;

pub use chain::{PlaybackParameters, ProcessorChain};
pub use processor::{StretchProcessor, CLOSE_THRESHOLD, MIN_BYTES_FOR_DURATION_SCALING};
