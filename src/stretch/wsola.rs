//! Streaming WSOLA (Waveform Similarity Overlap-Add) time stretching.

use std::f32::consts::PI;

use rustfft::{num_complex::Complex, FftPlanner};

use crate::core::fifo::FrameFifo;
use crate::stretch::params::WsolaWindows;

/// Minimum energy threshold to avoid division by near-zero in correlation normalization.
const ENERGY_EPSILON: f64 = 1e-12;
/// Minimum number of candidates to justify FFT-based correlation over direct computation.
const FFT_CANDIDATE_THRESHOLD: usize = 64;
/// Minimum overlap length for FFT-based correlation to be worthwhile.
const FFT_OVERLAP_THRESHOLD: usize = 32;

/// Streaming WSOLA over interleaved frames.
///
/// Each step splices one segment of two overlaps onto the output: the first
/// half is cross-faded with the held-back second half of the previous segment,
/// the second half becomes the new held-back tail. The output hop is one
/// overlap; the nominal input hop is `overlap / ratio`, and the actual splice
/// point is searched within `±search` frames for the best waveform match.
pub struct StreamingWsola {
    channels: usize,
    windows: WsolaWindows,
    ratio: f64,
    hop_in: f64,
    input: FrameFifo,
    /// Nominal read position in frames relative to the start of `input`.
    input_pos: f64,
    tail: Vec<f32>,
    has_tail: bool,
    fade_in: Vec<f32>,
    mix: Vec<f32>,
    ref_mono: Vec<f32>,
    region_mono: Vec<f32>,
    frames_in: u64,
    frames_out: u64,
    planner: FftPlanner<f32>,
}

impl StreamingWsola {
    /// Creates a stretcher with time ratio `ratio` (output length / input length).
    pub fn new(channels: usize, windows: WsolaWindows, ratio: f64) -> Self {
        let channels = channels.max(1);
        let overlap = windows.overlap.max(1);
        let windows = WsolaWindows { overlap, ..windows };
        let fade_in = (0..overlap)
            .map(|i| 0.5 - 0.5 * (PI * (i as f32 + 0.5) / overlap as f32).cos())
            .collect();
        Self {
            channels,
            windows,
            ratio,
            hop_in: overlap as f64 / ratio,
            input: FrameFifo::new(channels),
            input_pos: 0.0,
            tail: vec![0.0; overlap * channels],
            has_tail: false,
            fade_in,
            mix: vec![0.0; overlap * channels],
            ref_mono: Vec::with_capacity(overlap),
            region_mono: Vec::new(),
            frames_in: 0,
            frames_out: 0,
            planner: FftPlanner::new(),
        }
    }

    /// Returns the time ratio.
    #[inline]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Returns the window sizes in frames.
    #[inline]
    pub fn windows(&self) -> WsolaWindows {
        self.windows
    }

    /// Input frames buffered and not yet released by a splice.
    #[inline]
    pub fn buffered_frames(&self) -> usize {
        self.input.frames()
    }

    /// Input frames needed before the first segment can be spliced.
    #[inline]
    pub fn latency_frames(&self) -> usize {
        self.windows.search + self.windows.segment()
    }

    /// Consumes interleaved input, appending every segment that can be spliced.
    pub fn process(&mut self, input: &[f32], output: &mut FrameFifo) {
        self.input.push_slice(input);
        self.frames_in += (input.len() / self.channels) as u64;
        while self.can_step() {
            self.step(output, None);
        }
    }

    /// Splices the remaining input and the held-back tail, then rewinds.
    ///
    /// Splicing stops once the stream has produced `round(frames_in * ratio)` frames.
    pub fn finish(&mut self, output: &mut FrameFifo) {
        let target = (self.frames_in as f64 * self.ratio).round() as u64;
        let mut remaining = self.input.frames();
        self.input
            .push_silence(self.windows.search + self.windows.segment());

        while self.nominal() < remaining && self.frames_out < target {
            let dropped = self.step(output, Some(target));
            remaining = remaining.saturating_sub(dropped);
        }

        if self.has_tail && self.frames_out < target {
            let frames = ((target - self.frames_out) as usize).min(self.windows.overlap);
            output.push_slice(&self.tail[..frames * self.channels]);
            self.frames_out += frames as u64;
        }

        self.reset();
    }

    /// Drops buffered input and the held-back tail.
    pub fn reset(&mut self) {
        self.input.clear();
        self.input_pos = 0.0;
        self.has_tail = false;
        self.frames_in = 0;
        self.frames_out = 0;
    }

    #[inline]
    fn nominal(&self) -> usize {
        self.input_pos.round() as usize
    }

    #[inline]
    fn can_step(&self) -> bool {
        self.input.frames() >= self.nominal() + self.windows.search + self.windows.segment()
    }

    /// Splices one segment. Returns the number of input frames released.
    fn step(&mut self, output: &mut FrameFifo, budget: Option<u64>) -> usize {
        let ch = self.channels;
        let overlap = self.windows.overlap;
        let nominal = self.nominal();
        let best = if self.has_tail {
            self.find_best_position(nominal)
        } else {
            nominal
        };

        let data = self.input.as_slice();
        let segment = &data[best * ch..(best + 2 * overlap) * ch];
        let (head, rest) = segment.split_at(overlap * ch);

        if self.has_tail {
            for (i, fade) in self.fade_in.iter().enumerate() {
                for c in 0..ch {
                    let idx = i * ch + c;
                    self.mix[idx] = self.tail[idx] * (1.0 - fade) + head[idx] * fade;
                }
            }
        } else {
            self.mix.copy_from_slice(head);
        }
        self.tail.copy_from_slice(rest);
        self.has_tail = true;

        let frames = match budget {
            Some(target) => (target.saturating_sub(self.frames_out) as usize).min(overlap),
            None => overlap,
        };
        output.push_slice(&self.mix[..frames * ch]);
        self.frames_out += frames as u64;

        self.input_pos += self.hop_in;
        let release = (self.input_pos.floor() as usize).saturating_sub(self.windows.search);
        let dropped = self.input.discard(release);
        self.input_pos -= dropped as f64;
        dropped
    }

    /// Finds the splice point around `nominal` whose head best continues the tail.
    fn find_best_position(&mut self, nominal: usize) -> usize {
        let overlap = self.windows.overlap;
        let start = nominal.saturating_sub(self.windows.search);
        let end = nominal + self.windows.search;
        let candidates = end - start + 1;

        let data = self.input.as_slice();
        downmix(&self.tail, self.channels, &mut self.ref_mono);
        downmix(
            &data[start * self.channels..(end + overlap) * self.channels],
            self.channels,
            &mut self.region_mono,
        );

        let preferred = nominal - start;
        let lag = if candidates > FFT_CANDIDATE_THRESHOLD && overlap >= FFT_OVERLAP_THRESHOLD {
            best_lag_fft(
                &mut self.planner,
                &self.ref_mono,
                &self.region_mono,
                candidates,
                preferred,
            )
        } else {
            best_lag_direct(&self.ref_mono, &self.region_mono, candidates, preferred)
        };
        start + lag
    }
}

/// Sums interleaved channels into `out`.
fn downmix(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    out.clear();
    out.extend(interleaved.chunks_exact(channels).map(|f| f.iter().sum::<f32>()));
}

/// Direct time-domain search (used for small search ranges).
///
/// Ties resolve to `preferred` so silent or flat material keeps nominal timing.
fn best_lag_direct(reference: &[f32], region: &[f32], candidates: usize, preferred: usize) -> usize {
    let len = reference.len();
    let mut best = preferred;
    let mut best_corr = normalized_cross_correlation(reference, &region[preferred..preferred + len]);

    for lag in 0..candidates {
        let corr = normalized_cross_correlation(reference, &region[lag..lag + len]);
        if corr > best_corr {
            best_corr = corr;
            best = lag;
        }
    }
    best
}

/// FFT-accelerated search: correlates the reference against every candidate
/// lag at once, then normalizes each lag by its window energy.
fn best_lag_fft(
    planner: &mut FftPlanner<f32>,
    reference: &[f32],
    region: &[f32],
    candidates: usize,
    preferred: usize,
) -> usize {
    let ref_energy: f64 = reference.iter().map(|&s| (s as f64) * (s as f64)).sum();
    if ref_energy < ENERGY_EPSILON {
        return preferred;
    }

    let conv_len = region.len() + reference.len() - 1;
    let fft_size = conv_len.next_power_of_two();
    let fft_fwd = planner.plan_fft_forward(fft_size);
    let fft_inv = planner.plan_fft_inverse(fft_size);

    let mut ref_buf = vec![Complex::new(0.0f32, 0.0); fft_size];
    for (dst, &s) in ref_buf.iter_mut().zip(reference) {
        dst.re = s;
    }
    let mut region_buf = vec![Complex::new(0.0f32, 0.0); fft_size];
    for (dst, &s) in region_buf.iter_mut().zip(region) {
        dst.re = s;
    }

    // conj(Ref) * Region, inverse FFT => raw correlation at every lag
    fft_fwd.process(&mut ref_buf);
    fft_fwd.process(&mut region_buf);
    for (r, s) in ref_buf.iter_mut().zip(&region_buf) {
        *r = r.conj() * s;
    }
    fft_inv.process(&mut ref_buf);

    let norm = 1.0 / fft_size as f64;
    let mut prefix_sq = vec![0.0f64; region.len() + 1];
    for (i, &s) in region.iter().enumerate() {
        prefix_sq[i + 1] = prefix_sq[i] + (s as f64) * (s as f64);
    }

    let len = reference.len();
    let ncorr = |lag: usize| {
        let window_energy = prefix_sq[lag + len] - prefix_sq[lag];
        let denom = (ref_energy * window_energy).sqrt();
        if denom > ENERGY_EPSILON {
            ref_buf[lag].re as f64 * norm / denom
        } else {
            0.0
        }
    };

    let mut best = preferred;
    let mut best_ncorr = ncorr(preferred);
    for lag in 0..candidates {
        let value = ncorr(lag);
        if value > best_ncorr {
            best_ncorr = value;
            best = lag;
        }
    }
    best
}

/// Normalized cross-correlation between two signals.
#[inline]
fn normalized_cross_correlation(a: &[f32], b: &[f32]) -> f64 {
    let mut sum_ab = 0.0f64;
    let mut sum_a2 = 0.0f64;
    let mut sum_b2 = 0.0f64;

    for (&va, &vb) in a.iter().zip(b) {
        let (va, vb) = (va as f64, vb as f64);
        sum_ab += va * vb;
        sum_a2 += va * va;
        sum_b2 += vb * vb;
    }

    let denom = (sum_a2 * sum_b2).sqrt();
    if denom < ENERGY_EPSILON {
        return 0.0;
    }
    sum_ab / denom
}
