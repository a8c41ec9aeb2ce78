use std::fmt;

use crate::error::{ProcessorError, Result};

/// Bytes in one signed 16-bit PCM sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Sample encodings a decoder may hand to the stage.
///
/// Only [`Encoding::Pcm16Bit`] is processed; the others exist so that format
/// negotiation can reject them explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Pcm8Bit,
    Pcm16Bit,
    Pcm24Bit,
    Pcm32Bit,
    PcmFloat,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Pcm8Bit => "pcm8",
            Encoding::Pcm16Bit => "pcm16",
            Encoding::Pcm24Bit => "pcm24",
            Encoding::Pcm32Bit => "pcm32",
            Encoding::PcmFloat => "pcm-float",
        };
        f.write_str(name)
    }
}

/// Shape of the PCM stream on one side of the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate_hz: u32,
    /// Number of interleaved channels.
    pub channel_count: u16,
    /// Sample encoding.
    pub encoding: Encoding,
}

impl AudioFormat {
    /// Creates a format description.
    pub const fn new(sample_rate_hz: u32, channel_count: u16, encoding: Encoding) -> Self {
        Self {
            sample_rate_hz,
            channel_count,
            encoding,
        }
    }

    /// Creates a signed 16-bit PCM format.
    pub const fn pcm16(sample_rate_hz: u32, channel_count: u16) -> Self {
        Self::new(sample_rate_hz, channel_count, Encoding::Pcm16Bit)
    }

    /// Returns true for 16-bit PCM with a non-zero rate and channel count.
    #[inline]
    pub fn is_supported(&self) -> bool {
        self.encoding == Encoding::Pcm16Bit && self.sample_rate_hz > 0 && self.channel_count > 0
    }

    /// Bytes per interleaved frame, assuming 16-bit samples.
    #[inline]
    pub fn bytes_per_frame(&self) -> usize {
        self.channel_count as usize * BYTES_PER_SAMPLE
    }

    /// Returns the same format at a different sample rate.
    #[inline]
    pub fn with_sample_rate(self, sample_rate_hz: u32) -> Self {
        Self {
            sample_rate_hz,
            ..self
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {}",
            self.sample_rate_hz, self.channel_count, self.encoding
        )
    }
}

/// Input and output formats negotiated together by one `configure` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatPair {
    pub input: AudioFormat,
    pub output: AudioFormat,
}

impl FormatPair {
    /// Returns true when the stage converts between sample rates.
    #[inline]
    pub fn changes_rate(&self) -> bool {
        self.input.sample_rate_hz != self.output.sample_rate_hz
    }
}

/// Requested output sample rate for the next `configure` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputSampleRate {
    /// Output at the input sample rate.
    #[default]
    NoChange,
    /// Output at a fixed rate in Hz.
    Hz(u32),
}

impl OutputSampleRate {
    /// Resolves the output rate for a given input rate.
    #[inline]
    pub fn resolve(self, input_rate_hz: u32) -> u32 {
        match self {
            OutputSampleRate::NoChange => input_rate_hz,
            OutputSampleRate::Hz(hz) => hz,
        }
    }
}

impl From<Option<u32>> for OutputSampleRate {
    fn from(hz: Option<u32>) -> Self {
        hz.map_or(OutputSampleRate::NoChange, OutputSampleRate::Hz)
    }
}

/// Speed and pitch applied by the stretch stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchParams {
    /// Tempo factor: 2.0 plays twice as fast.
    pub speed: f64,
    /// Frequency scale: 2.0 raises by an octave.
    pub pitch: f64,
}

impl StretchParams {
    /// Unity speed and pitch.
    pub const UNITY: Self = Self {
        speed: 1.0,
        pitch: 1.0,
    };

    /// Creates validated parameters.
    ///
    /// # Errors
    /// Returns `ProcessorError::InvalidParameter` if either value is not finite and positive.
    pub fn new(speed: f64, pitch: f64) -> Result<Self> {
        validate_positive("speed", speed)?;
        validate_positive("pitch", pitch)?;
        Ok(Self { speed, pitch })
    }

    /// Time ratio of the stretch stage (output length / input length before resampling).
    #[inline]
    pub fn time_ratio(&self) -> f64 {
        self.pitch / self.speed
    }
}

impl Default for StretchParams {
    fn default() -> Self {
        Self::UNITY
    }
}

/// Fails with `InvalidParameter` unless `value` is finite and strictly positive.
pub(crate) fn validate_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ProcessorError::InvalidParameter { name, value })
    }
}
