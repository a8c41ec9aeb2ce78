//! Streaming sample-rate conversion via linear and cubic interpolation.

use crate::core::fifo::FrameFifo;

/// Steps closer to 1.0 than this are treated as a pass-through.
pub const IDENTITY_STEP_EPSILON: f64 = 1e-9;

/// Interpolation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    /// 4-point Hermite.
    Cubic,
}

/// Streaming fractional-phase resampler over interleaved frames.
///
/// Reads input at `step` input frames per output frame, so `step > 1`
/// shortens the signal and raises its pitch. The read phase is carried across
/// calls, so chunk boundaries are inaudible.
#[derive(Debug, Clone)]
pub struct Resampler {
    step: f64,
    interpolation: Interpolation,
    history: FrameFifo,
    /// Read position in frames relative to the start of `history`.
    pos: f64,
    frame: Vec<f32>,
}

impl Resampler {
    /// Creates a resampler.
    pub fn new(channels: usize, step: f64, interpolation: Interpolation) -> Self {
        let mut resampler = Self {
            step,
            interpolation,
            history: FrameFifo::new(channels),
            pos: 0.0,
            frame: vec![0.0; channels.max(1)],
        };
        resampler.reset();
        resampler
    }

    /// Returns true if `step` is close enough to 1.0 that resampling can be skipped.
    #[inline]
    pub fn is_identity_step(step: f64) -> bool {
        (step - 1.0).abs() < IDENTITY_STEP_EPSILON
    }

    /// Returns the step in input frames per output frame.
    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Input frames held back for interpolation look-ahead.
    #[inline]
    pub fn buffered_frames(&self) -> usize {
        self.history.frames().saturating_sub(1)
    }

    /// Consumes interleaved input and appends every output frame it can
    /// produce without look-ahead past the end of the input.
    pub fn process(&mut self, input: &[f32], output: &mut FrameFifo) {
        self.history.push_slice(input);
        self.render(output, f64::INFINITY);
    }

    /// Flushes the tail of the stream, then rewinds for a new one.
    pub fn finish(&mut self, output: &mut FrameFifo) {
        let end = self.history.frames() as f64;
        // Two frames of silence let the cubic kernel reach the final sample.
        self.history.push_silence(2);
        self.render(output, end);
        self.reset();
    }

    /// Clears history and rewinds the phase.
    pub fn reset(&mut self) {
        self.history.clear();
        // One frame of leading silence gives the first output frame a left neighbour.
        self.history.push_silence(1);
        self.pos = 1.0;
    }

    fn render(&mut self, output: &mut FrameFifo, limit: f64) {
        let channels = self.history.channels();
        let frames = self.history.frames();

        while self.pos < limit {
            let idx = self.pos as usize;
            if idx + 2 >= frames {
                break;
            }
            let frac = (self.pos - idx as f64) as f32;
            let data = self.history.as_slice();

            for (ch, out) in self.frame.iter_mut().enumerate() {
                let at = |i: usize| data[i * channels + ch];
                *out = match self.interpolation {
                    Interpolation::Linear => at(idx) * (1.0 - frac) + at(idx + 1) * frac,
                    Interpolation::Cubic => {
                        hermite(at(idx - 1), at(idx), at(idx + 1), at(idx + 2), frac)
                    }
                };
            }
            output.push_slice(&self.frame);
            self.pos += self.step;
        }

        // Keep one frame behind the read position for the cubic kernel.
        let keep_from = (self.pos as usize).saturating_sub(1).min(frames);
        let dropped = self.history.discard(keep_from);
        self.pos -= dropped as f64;
    }
}

/// 4-point, 3rd-order Hermite interpolation between `s1` and `s2`.
#[inline]
fn hermite(s0: f32, s1: f32, s2: f32, s3: f32, frac: f32) -> f32 {
    let c0 = s1;
    let c1 = 0.5 * (s2 - s0);
    let c2 = s0 - 2.5 * s1 + 2.0 * s2 - 0.5 * s3;
    let c3 = 0.5 * (s3 - s0) + 1.5 * (s1 - s2);
    ((c3 * frac + c2) * frac + c1) * frac + c0
}
