//! Core types, PCM conversion, frame buffering and resampling.

pub mod fifo;
pub mod pcm;
pub mod resample;
pub mod types;

pub use types::*;
