//! The stretch-engine boundary and the built-in streaming engine.

use tracing::warn;

use crate::core::fifo::FrameFifo;
use crate::core::pcm::{f32_to_pcm16, pcm16_to_f32};
use crate::core::resample::Resampler;
use crate::stretch::params::{EngineOptions, EngineTuning};
use crate::stretch::wsola::StreamingWsola;

/// Everything an engine needs at construction time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Input sample rate in Hz.
    pub sample_rate: u32,
    /// Output sample rate in Hz.
    pub output_sample_rate: u32,
    /// Interleaved channel count.
    pub channels: usize,
    pub options: EngineOptions,
    /// Tempo factor.
    pub speed: f64,
    /// Frequency scale.
    pub pitch: f64,
    pub tuning: EngineTuning,
}

impl EngineConfig {
    /// Output frames produced per input frame once all latency has drained.
    #[inline]
    pub fn output_ratio(&self) -> f64 {
        self.output_sample_rate as f64 / (self.speed * self.sample_rate as f64)
    }
}

/// A real-time pitch/time-stretch engine over interleaved i16 PCM.
///
/// All counts are in frames. Dropping an engine releases everything it owns.
pub trait Stretcher {
    /// Builds an engine for the given stream shape and parameters.
    fn new(config: &EngineConfig) -> Self
    where
        Self: Sized;

    /// Feeds interleaved samples. `is_final` marks the end of the stream; the
    /// engine then makes all remaining output available.
    fn process(&mut self, samples: &[i16], is_final: bool);

    /// Copies up to `dest.len() / channels` ready frames into `dest`.
    ///
    /// Returns the number of frames written.
    fn retrieve(&mut self, dest: &mut [i16]) -> usize;

    /// Frames ready to retrieve.
    fn available(&self) -> usize;

    /// Input frames the engine still holds whose output has not been
    /// retrieved. Zero once a finished stream has been fully drained.
    fn samples_required(&self) -> usize;

    /// Clears all stream state, keeping the construction parameters.
    fn reset(&mut self);
}

/// Built-in engine: streaming WSOLA for tempo, then a streaming resampler for
/// pitch and output-rate conversion.
///
/// WSOLA stretches by `pitch / speed`; the resampler then reads
/// `pitch * in_rate / out_rate` input frames per output frame. Either stage is
/// skipped when its ratio is unity.
pub struct StretchEngine {
    config: EngineConfig,
    wsola: Option<StreamingWsola>,
    resampler: Option<Resampler>,
    input: Vec<f32>,
    stretched: FrameFifo,
    output: FrameFifo,
    scratch: Vec<f32>,
    finished: bool,
}

impl StretchEngine {
    /// Returns the construction parameters.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns true once end of stream has been signalled.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Stretcher for StretchEngine {
    fn new(config: &EngineConfig) -> Self {
        let channels = config.channels.max(1);
        let time_ratio = config.pitch / config.speed;
        let step = config.pitch * config.sample_rate as f64 / config.output_sample_rate as f64;

        let wsola = (!Resampler::is_identity_step(time_ratio)).then(|| {
            let windows = config
                .tuning
                .windows(config.sample_rate, config.options.process_mode);
            StreamingWsola::new(channels, windows, time_ratio)
        });
        let resampler = (!Resampler::is_identity_step(step)).then(|| {
            Resampler::new(channels, step, config.options.pitch_quality.interpolation())
        });

        Self {
            config: EngineConfig { channels, ..*config },
            wsola,
            resampler,
            input: Vec::new(),
            stretched: FrameFifo::new(channels),
            output: FrameFifo::new(channels),
            scratch: Vec::new(),
            finished: false,
        }
    }

    fn process(&mut self, samples: &[i16], is_final: bool) {
        if self.finished {
            if !samples.is_empty() {
                warn!(
                    samples = samples.len(),
                    "stretch engine received input after end of stream; dropping"
                );
            }
            return;
        }

        let channels = self.config.channels;
        let whole = samples.len() - samples.len() % channels;
        self.input.clear();
        pcm16_to_f32(&samples[..whole], &mut self.input);

        match self.wsola.as_mut() {
            Some(wsola) => {
                wsola.process(&self.input, &mut self.stretched);
                if is_final {
                    wsola.finish(&mut self.stretched);
                }
            }
            None => self.stretched.push_slice(&self.input),
        }

        match self.resampler.as_mut() {
            Some(resampler) => {
                resampler.process(self.stretched.as_slice(), &mut self.output);
                self.stretched.clear();
                if is_final {
                    resampler.finish(&mut self.output);
                }
            }
            None => self.stretched.drain_into(&mut self.output),
        }

        self.finished = is_final;
    }

    fn retrieve(&mut self, dest: &mut [i16]) -> usize {
        let channels = self.config.channels;
        let frames = (dest.len() / channels).min(self.output.frames());
        self.scratch.resize(frames * channels, 0.0);
        let popped = self.output.pop_slice(&mut self.scratch);
        f32_to_pcm16(&self.scratch, &mut dest[..popped * channels]);
        popped
    }

    fn available(&self) -> usize {
        self.output.frames()
    }

    fn samples_required(&self) -> usize {
        if self.finished && self.output.is_empty() {
            return 0;
        }
        // Each stage's backlog, mapped back to input frames.
        let time_ratio = self.wsola.as_ref().map_or(1.0, StreamingWsola::ratio);
        let in_wsola = self.wsola.as_ref().map_or(0, StreamingWsola::buffered_frames) as f64;
        let in_resampler = self
            .resampler
            .as_ref()
            .map_or(0, Resampler::buffered_frames) as f64
            / time_ratio;
        let unretrieved = self.output.frames() as f64 / self.config.output_ratio();
        (in_wsola + in_resampler + unretrieved).ceil() as usize
    }

    fn reset(&mut self) {
        if let Some(wsola) = self.wsola.as_mut() {
            wsola.reset();
        }
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
        self.input.clear();
        self.stretched.clear();
        self.output.clear();
        self.finished = false;
    }
}
