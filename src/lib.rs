#![forbid(unsafe_code)]
//! Pitch/time-stretch stage for pull-based PCM playback pipelines.
//!
//! `stretch-stage` sits between a decoder and an audio sink. It accepts
//! interleaved 16-bit PCM, runs it through a real-time stretch engine that
//! changes tempo and pitch independently, and hands the result back while
//! tracking how playout time maps to media time.
//!
//! # Quick Start
//!
//! ```
//! use stretch_stage::{AudioFormat, StretchProcessor};
//!
//! let mut processor = StretchProcessor::new();
//! processor.set_speed(1.3);
//! processor.set_pitch(1.2);
//!
//! let output_format = processor.configure(AudioFormat::pcm16(44100, 2)).unwrap();
//! assert_eq!(output_format, AudioFormat::pcm16(44100, 2));
//! processor.flush();
//!
//! // One second of silence, in 4096-byte chunks
//! let pcm = vec![0u8; 44100 * 4];
//! let mut stretched = Vec::new();
//! for chunk in pcm.chunks(4096) {
//!     processor.queue_input(chunk);
//!     stretched.extend_from_slice(processor.output());
//! }
//! processor.queue_end_of_stream();
//! while !processor.is_ended() {
//!     stretched.extend_from_slice(processor.output());
//! }
//! assert!(stretched.len() < pcm.len()); // ~1.3x faster
//! ```
//!
//! # Pipelines
//!
//! [`ProcessorChain`] drives a processor the way an audio sink does: it
//! bypasses the stage when no stretching is needed and drains output after
//! every chunk.
//!
//! Engines are pluggable through the [`Stretcher`] trait; [`StretchEngine`]
//! is the built-in WSOLA + resampler implementation.

pub mod config;
pub mod core;
pub mod error;
pub mod stream;
pub mod stretch;

pub use config::ProcessorConfig;
pub use crate::core::types::{AudioFormat, Encoding, OutputSampleRate, StretchParams};
pub use error::{ProcessorError, Result};
pub use stream::{PlaybackParameters, ProcessorChain, StretchProcessor};
pub use stretch::{EngineConfig, EngineOptions, EngineTuning, StretchEngine, Stretcher};
