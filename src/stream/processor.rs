use tracing::{debug, trace};

use crate::config::ProcessorConfig;
use crate::core::pcm::{bytes_as_pcm16, StagingBuffer};
use crate::core::types::{AudioFormat, FormatPair, OutputSampleRate, StretchParams};
use crate::error::{ProcessorError, Result};
use crate::stretch::engine::{EngineConfig, StretchEngine, Stretcher};
use crate::stretch::params::{EngineOptions, EngineTuning};

/// Speed or pitch within this distance of 1.0 counts as unity.
pub const CLOSE_THRESHOLD: f64 = 1e-4;

/// Output bytes needed before duration scaling uses measured byte counts
/// instead of the nominal speed.
pub const MIN_BYTES_FOR_DURATION_SCALING: u64 = 1024;

/// Audio-pipeline stage that routes 16-bit PCM through a stretch engine.
///
/// Format and parameter changes are staged and only take effect at the next
/// [`flush`](Self::flush), which promotes the pending format to active and
/// rebuilds the engine if anything changed since the previous flush.
///
/// Typical call sequence:
///
/// ```
/// use stretch_stage::{AudioFormat, StretchProcessor};
///
/// let mut processor = StretchProcessor::new();
/// processor.set_speed(1.3);
/// processor.set_pitch(1.2);
/// processor.configure(AudioFormat::pcm16(48000, 2)).unwrap();
/// processor.flush();
/// assert!(processor.is_active());
///
/// processor.queue_input(&[0u8; 4096]);
/// processor.queue_end_of_stream();
/// let mut out = Vec::new();
/// while !processor.is_ended() {
///     out.extend_from_slice(processor.output());
/// }
/// ```
pub struct StretchProcessor<E: Stretcher = StretchEngine> {
    params: StretchParams,
    pending_output_rate: OutputSampleRate,
    pending: Option<FormatPair>,
    active: Option<FormatPair>,
    recreate_pending: bool,
    tuning: EngineTuning,
    engine: Option<E>,
    staging: StagingBuffer,
    input_scratch: Vec<i16>,
    input_bytes: u64,
    output_bytes: u64,
    input_ended: bool,
}

impl StretchProcessor<StretchEngine> {
    /// Creates a processor backed by the built-in engine with default settings.
    pub fn new() -> Self {
        Self::with_config(&ProcessorConfig::default())
    }
}

impl Default for StretchProcessor<StretchEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Stretcher> StretchProcessor<E> {
    /// Creates a processor with initial parameters and engine tuning from `config`.
    ///
    /// `config` is assumed valid; see [`ProcessorConfig::validate`].
    pub fn with_config(config: &ProcessorConfig) -> Self {
        Self {
            params: StretchParams {
                speed: config.speed,
                pitch: config.pitch,
            },
            pending_output_rate: config.output_sample_rate_hz.into(),
            pending: None,
            active: None,
            recreate_pending: false,
            tuning: config.engine,
            engine: None,
            staging: StagingBuffer::new(),
            input_scratch: Vec::new(),
            input_bytes: 0,
            output_bytes: 0,
            input_ended: false,
        }
    }

    /// Sets the target speed. Takes effect at the next flush.
    ///
    /// # Panics
    /// Panics if `speed` is not finite and positive. In debug builds, also
    /// panics if the value changes while queued input has not been drained.
    pub fn set_speed(&mut self, speed: f64) {
        assert!(speed.is_finite() && speed > 0.0, "speed must be positive, got {speed}");
        if self.params.speed != speed {
            self.assert_drained("set_speed");
            self.params.speed = speed;
            self.recreate_pending = true;
        }
    }

    /// Sets the target pitch. Takes effect at the next flush.
    ///
    /// # Panics
    /// Same conditions as [`set_speed`](Self::set_speed).
    pub fn set_pitch(&mut self, pitch: f64) {
        assert!(pitch.is_finite() && pitch > 0.0, "pitch must be positive, got {pitch}");
        if self.params.pitch != pitch {
            self.assert_drained("set_pitch");
            self.params.pitch = pitch;
            self.recreate_pending = true;
        }
    }

    /// Pins the output sample rate used by the next [`configure`](Self::configure).
    pub fn set_output_sample_rate(&mut self, rate: OutputSampleRate) {
        self.pending_output_rate = rate;
    }

    /// Current speed.
    #[inline]
    pub fn speed(&self) -> f64 {
        self.params.speed
    }

    /// Current pitch.
    #[inline]
    pub fn pitch(&self) -> f64 {
        self.params.pitch
    }

    /// Input format in effect since the last flush.
    #[inline]
    pub fn input_format(&self) -> Option<AudioFormat> {
        self.active.map(|f| f.input)
    }

    /// Output format in effect since the last flush.
    #[inline]
    pub fn output_format(&self) -> Option<AudioFormat> {
        self.active.map(|f| f.output)
    }

    /// The current engine, if one has been built.
    #[inline]
    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    /// Negotiates formats and returns the format this stage will output.
    ///
    /// # Errors
    /// Returns `ProcessorError::UnsupportedFormat` unless `input` is 16-bit PCM
    /// with a non-zero rate and channel count, or if the pinned output rate is
    /// zero. A rejected format leaves the pending formats untouched.
    pub fn configure(&mut self, input: AudioFormat) -> Result<AudioFormat> {
        if !input.is_supported() {
            return Err(ProcessorError::UnsupportedFormat(input));
        }
        let output = input.with_sample_rate(self.pending_output_rate.resolve(input.sample_rate_hz));
        if !output.is_supported() {
            return Err(ProcessorError::UnsupportedFormat(output));
        }
        debug!(%input, %output, "stretch processor configured");
        self.pending = Some(FormatPair { input, output });
        self.recreate_pending = true;
        Ok(output)
    }

    /// Returns true if audio should be routed through this stage.
    pub fn is_active(&self) -> bool {
        self.pending.is_some_and(|formats| {
            (self.params.speed - 1.0).abs() >= CLOSE_THRESHOLD
                || (self.params.pitch - 1.0).abs() >= CLOSE_THRESHOLD
                || formats.changes_rate()
        })
    }

    /// Queues interleaved native-endian i16 PCM. Consumes the whole buffer.
    ///
    /// # Panics
    /// Panics if the processor has not been flushed since becoming active.
    pub fn queue_input(&mut self, input: &[u8]) {
        if input.is_empty() {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            panic!("queue_input called before the active processor was flushed");
        };
        debug_assert!(
            self.active
                .map_or(true, |f| input.len() % f.input.bytes_per_frame() == 0),
            "queued input is not a whole number of frames"
        );

        self.input_bytes += input.len() as u64;
        let samples = bytes_as_pcm16(input, &mut self.input_scratch);
        engine.process(samples, false);
    }

    /// Signals that no more input will be queued before the next flush.
    pub fn queue_end_of_stream(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.process(&[], true);
        }
        self.input_ended = true;
    }

    /// Returns the stretched PCM ready since the previous call, possibly empty.
    ///
    /// The returned bytes are delivered once; calling again without new engine
    /// output returns an empty slice.
    pub fn output(&mut self) -> &[u8] {
        if let (Some(engine), Some(formats)) = (self.engine.as_mut(), self.active) {
            let available = engine.available();
            if available > 0 {
                let channels = formats.input.channel_count as usize;
                let dest = self.staging.prepare(available * channels);
                let retrieved = engine.retrieve(dest);
                self.output_bytes += (retrieved * formats.input.bytes_per_frame()) as u64;
                self.staging.commit(retrieved * channels);
                trace!(frames = retrieved, "retrieved stretched output");
            }
        }
        self.staging.take()
    }

    /// Maps a duration at the output back to the corresponding media duration.
    ///
    /// Uses the ratio actually achieved since the last flush once enough output
    /// has been produced, and the nominal speed before that.
    pub fn media_duration(&self, playout_duration: u64) -> u64 {
        let (Some(engine), Some(formats)) = (self.engine.as_ref(), self.active) else {
            return self.nominal_media_duration(playout_duration);
        };
        if self.output_bytes < MIN_BYTES_FOR_DURATION_SCALING {
            return self.nominal_media_duration(playout_duration);
        }

        let held_bytes = engine.samples_required() as u64 * formats.input.bytes_per_frame() as u64;
        let processed_input_bytes = self.input_bytes.saturating_sub(held_bytes);
        if formats.changes_rate() {
            scale_large(
                playout_duration,
                processed_input_bytes as u128 * formats.output.sample_rate_hz as u128,
                self.output_bytes as u128 * formats.input.sample_rate_hz as u128,
            )
        } else {
            scale_large(
                playout_duration,
                processed_input_bytes as u128,
                self.output_bytes as u128,
            )
        }
    }

    /// Returns true once end of stream was queued and all output has drained.
    pub fn is_ended(&self) -> bool {
        self.input_ended
            && self
                .engine
                .as_ref()
                .map_or(true, |engine| engine.samples_required() == 0)
    }

    /// Applies pending format and parameter changes and clears stream state.
    pub fn flush(&mut self) {
        if self.is_active() {
            self.active = self.pending;
            if self.recreate_pending || self.engine.is_none() {
                self.rebuild_engine();
            } else if let Some(engine) = self.engine.as_mut() {
                debug!("soft-resetting stretch engine");
                engine.reset();
            }
        } else if self.engine.take().is_some() {
            debug!("stretch processor inactive; released engine");
        }

        self.staging.clear();
        self.input_bytes = 0;
        self.output_bytes = 0;
        self.input_ended = false;
    }

    /// Returns the processor to its freshly constructed state.
    ///
    /// Speed and pitch go back to 1.0 and the output rate to
    /// [`OutputSampleRate::NoChange`]; engine tuning is kept.
    pub fn reset(&mut self) {
        self.params = StretchParams::UNITY;
        self.pending = None;
        self.active = None;
        self.staging.release();
        self.input_scratch = Vec::new();
        self.pending_output_rate = OutputSampleRate::NoChange;
        self.recreate_pending = false;
        self.engine = None;
        self.input_bytes = 0;
        self.output_bytes = 0;
        self.input_ended = false;
        debug!("stretch processor reset");
    }

    fn rebuild_engine(&mut self) {
        // Release the previous engine before building its replacement.
        self.engine = None;
        let Some(formats) = self.active else {
            return;
        };
        let config = EngineConfig {
            sample_rate: formats.input.sample_rate_hz,
            output_sample_rate: formats.output.sample_rate_hz,
            channels: formats.input.channel_count as usize,
            options: EngineOptions::REALTIME_HIGH_QUALITY_PITCH,
            speed: self.params.speed,
            pitch: self.params.pitch,
            tuning: self.tuning,
        };
        debug!(
            sample_rate = config.sample_rate,
            output_sample_rate = config.output_sample_rate,
            channels = config.channels,
            speed = config.speed,
            pitch = config.pitch,
            "building stretch engine"
        );
        self.engine = Some(E::new(&config));
        self.recreate_pending = false;
    }

    /// `speed * playout`, rounded to the nearest unit so that values such as
    /// `0.29 * 100` land on 29 rather than truncating to 28.
    #[inline]
    fn nominal_media_duration(&self, playout_duration: u64) -> u64 {
        (self.params.speed * playout_duration as f64).round() as u64
    }

    fn assert_drained(&self, setter: &str) {
        debug_assert!(
            self.input_bytes == 0 || self.is_ended(),
            "{setter} called with undrained input; drain and flush first"
        );
    }
}

/// Computes `value * numerator / denominator` without intermediate overflow.
///
/// Exact in 128-bit arithmetic, truncating toward zero; falls back to `f64`
/// only if the 128-bit product overflows. Saturates at `u64::MAX`.
fn scale_large(value: u64, numerator: u128, denominator: u128) -> u64 {
    if denominator == 0 {
        return value;
    }
    match (value as u128).checked_mul(numerator) {
        Some(product) => u64::try_from(product / denominator).unwrap_or(u64::MAX),
        None => (value as f64 * (numerator as f64 / denominator as f64)) as u64,
    }
}
