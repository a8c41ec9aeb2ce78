//! Sink-side driver that routes PCM through a [`StretchProcessor`] when it is active.

use tracing::debug;

use crate::config::ProcessorConfig;
use crate::core::types::{AudioFormat, StretchParams};
use crate::error::Result;
use crate::stream::processor::StretchProcessor;
use crate::stretch::engine::{StretchEngine, Stretcher};

/// Speed and pitch requested by the player.
pub type PlaybackParameters = StretchParams;

/// Owns one stretch processor and drives it the way an audio sink does.
///
/// The routing decision is latched at [`flush`](Self::flush): when the
/// processor is inactive the chain copies input straight to the sink and
/// reports media time equal to playout time.
pub struct ProcessorChain<E: Stretcher = StretchEngine> {
    processor: StretchProcessor<E>,
    parameters: PlaybackParameters,
    input_format: Option<AudioFormat>,
    routed: bool,
}

impl ProcessorChain<StretchEngine> {
    /// Creates a chain around the built-in engine with default settings.
    pub fn new() -> Self {
        Self::with_config(&ProcessorConfig::default())
    }
}

impl Default for ProcessorChain<StretchEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Stretcher> ProcessorChain<E> {
    /// Creates a chain whose processor starts from `config`.
    pub fn with_config(config: &ProcessorConfig) -> Self {
        let processor = StretchProcessor::with_config(config);
        let parameters = PlaybackParameters {
            speed: processor.speed(),
            pitch: processor.pitch(),
        };
        Self {
            processor,
            parameters,
            input_format: None,
            routed: false,
        }
    }

    /// The wrapped processor.
    #[inline]
    pub fn processor(&self) -> &StretchProcessor<E> {
        &self.processor
    }

    /// Parameters most recently applied.
    #[inline]
    pub fn playback_parameters(&self) -> PlaybackParameters {
        self.parameters
    }

    /// Format of the decoded stream, as last configured.
    #[inline]
    pub fn input_format(&self) -> Option<AudioFormat> {
        self.input_format
    }

    /// Returns true if audio is currently routed through the processor.
    #[inline]
    pub fn is_routed(&self) -> bool {
        self.routed
    }

    /// Hands new speed and pitch to the processor; they apply at the next flush.
    ///
    /// Returns the parameters now in effect.
    pub fn apply_playback_parameters(&mut self, parameters: PlaybackParameters) -> PlaybackParameters {
        self.processor.set_speed(parameters.speed);
        self.processor.set_pitch(parameters.pitch);
        self.parameters = parameters;
        parameters
    }

    /// Negotiates the stream format and returns what the sink will receive.
    ///
    /// # Errors
    /// Propagates `ProcessorError::UnsupportedFormat` from the processor.
    pub fn configure(&mut self, input: AudioFormat) -> Result<AudioFormat> {
        let output = self.processor.configure(input)?;
        self.input_format = Some(input);
        Ok(if self.processor.is_active() { output } else { input })
    }

    /// Flushes the processor and latches the routing decision.
    pub fn flush(&mut self) {
        self.processor.flush();
        let routed = self.processor.is_active();
        if routed != self.routed {
            debug!(routed, "stretch routing changed");
        }
        self.routed = routed;
    }

    /// Feeds one decoded chunk and appends everything ready to `sink`.
    pub fn process(&mut self, input: &[u8], sink: &mut Vec<u8>) {
        if !self.routed {
            sink.extend_from_slice(input);
            return;
        }
        self.processor.queue_input(input);
        self.drain(sink);
    }

    /// Signals end of stream and drains the processor completely into `sink`.
    pub fn end_of_stream(&mut self, sink: &mut Vec<u8>) {
        if !self.routed {
            return;
        }
        self.processor.queue_end_of_stream();
        while !self.processor.is_ended() {
            if self.drain(sink) == 0 {
                break;
            }
        }
    }

    /// Maps playout time to media time.
    pub fn media_duration(&self, playout_duration: u64) -> u64 {
        if self.routed {
            self.processor.media_duration(playout_duration)
        } else {
            playout_duration
        }
    }

    /// Resets the processor, then re-applies the current playback parameters.
    ///
    /// The sink must `configure` and `flush` again before processing.
    pub fn reset(&mut self) {
        self.processor.reset();
        self.input_format = None;
        self.routed = false;
        let parameters = self.parameters;
        self.apply_playback_parameters(parameters);
    }

    /// Moves all ready output into `sink`. Returns the number of bytes moved.
    fn drain(&mut self, sink: &mut Vec<u8>) -> usize {
        let mut moved = 0;
        loop {
            let chunk = self.processor.output();
            if chunk.is_empty() {
                return moved;
            }
            moved += chunk.len();
            sink.extend_from_slice(chunk);
        }
    }
}
