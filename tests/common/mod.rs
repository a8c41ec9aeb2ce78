#![allow(dead_code)]

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};

use stretch_stage::{EngineConfig, Stretcher};

static NEXT_ENGINE_ID: AtomicUsize = AtomicUsize::new(0);

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Interleaved 16-bit sine with the same tone on every channel.
pub fn gen_sine_pcm16(freq_hz: f32, sr: u32, frames: usize, channels: usize) -> Vec<i16> {
    (0..frames)
        .flat_map(|i| {
            let s = 0.5 * (2.0 * PI * freq_hz * i as f32 / sr as f32).sin();
            std::iter::repeat((s * 32767.0) as i16).take(channels)
        })
        .collect()
}

pub fn to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_ne_bytes()).collect()
}

pub fn from_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_ne_bytes([pair[0], pair[1]]))
        .collect()
}

/// Identity engine that records how it was built and driven.
///
/// Holds back `latency` frames until end of stream, like a real engine's
/// look-ahead.
pub struct RecordingStretcher {
    pub id: usize,
    pub config: EngineConfig,
    pub resets: usize,
    pub latency: usize,
    pub finished: bool,
    queue: VecDeque<i16>,
}

pub const MOCK_LATENCY_FRAMES: usize = 128;

impl RecordingStretcher {
    fn frames_queued(&self) -> usize {
        self.queue.len() / self.config.channels
    }
}

impl Stretcher for RecordingStretcher {
    fn new(config: &EngineConfig) -> Self {
        Self {
            id: NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed),
            config: *config,
            resets: 0,
            latency: MOCK_LATENCY_FRAMES,
            finished: false,
            queue: VecDeque::new(),
        }
    }

    fn process(&mut self, samples: &[i16], is_final: bool) {
        self.queue.extend(samples.iter().copied());
        self.finished |= is_final;
    }

    fn retrieve(&mut self, dest: &mut [i16]) -> usize {
        let frames = (dest.len() / self.config.channels).min(self.available());
        let n = frames * self.config.channels;
        for (slot, sample) in dest[..n].iter_mut().zip(self.queue.drain(..n)) {
            *slot = sample;
        }
        frames
    }

    fn available(&self) -> usize {
        if self.finished {
            self.frames_queued()
        } else {
            self.frames_queued().saturating_sub(self.latency)
        }
    }

    fn samples_required(&self) -> usize {
        if self.finished {
            self.frames_queued()
        } else {
            self.frames_queued().min(self.latency)
        }
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.finished = false;
        self.queue.clear();
    }
}
