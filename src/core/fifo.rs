//! Growable FIFO of interleaved audio frames.

/// FIFO of interleaved `f32` frames.
///
/// Reads advance a start offset instead of shifting memory; the consumed
/// prefix is compacted away once it outgrows the live data, so steady-state
/// streaming stops allocating after the first few calls.
#[derive(Debug, Clone)]
pub struct FrameFifo {
    data: Vec<f32>,
    start: usize,
    channels: usize,
}

impl FrameFifo {
    /// Creates an empty FIFO for `channels` interleaved channels.
    pub fn new(channels: usize) -> Self {
        Self {
            data: Vec::new(),
            start: 0,
            channels: channels.max(1),
        }
    }

    /// Returns the channel count.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the number of whole frames stored.
    #[inline]
    pub fn frames(&self) -> usize {
        (self.data.len() - self.start) / self.channels
    }

    /// Returns true when no frames are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.len() == self.start
    }

    /// Removes all frames, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
        self.start = 0;
    }

    /// Returns the stored samples, oldest first.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data[self.start..]
    }

    /// Appends interleaved samples. `samples.len()` must be a multiple of the channel count.
    pub fn push_slice(&mut self, samples: &[f32]) {
        debug_assert_eq!(samples.len() % self.channels, 0, "partial frame pushed");
        self.data.extend_from_slice(samples);
    }

    /// Appends `frames` frames of silence.
    pub fn push_silence(&mut self, frames: usize) {
        let new_len = self.data.len() + frames * self.channels;
        self.data.resize(new_len, 0.0);
    }

    /// Discards up to `frames` frames from the front.
    ///
    /// Returns the number of frames discarded.
    pub fn discard(&mut self, frames: usize) -> usize {
        let dropped = frames.min(self.frames());
        self.start += dropped * self.channels;
        self.compact();
        dropped
    }

    /// Drops up to `frames` frames from the back.
    ///
    /// Returns the number of frames dropped.
    pub fn truncate_back(&mut self, frames: usize) -> usize {
        let dropped = frames.min(self.frames());
        let new_len = self.data.len() - dropped * self.channels;
        self.data.truncate(new_len);
        if self.data.len() == self.start {
            self.clear();
        }
        dropped
    }

    /// Pops as many whole frames as fit into `output`.
    ///
    /// Returns the number of frames popped.
    pub fn pop_slice(&mut self, output: &mut [f32]) -> usize {
        let frames = (output.len() / self.channels).min(self.frames());
        let n = frames * self.channels;
        output[..n].copy_from_slice(&self.data[self.start..self.start + n]);
        self.start += n;
        self.compact();
        frames
    }

    /// Moves every frame from `self` to the back of `dest`.
    pub fn drain_into(&mut self, dest: &mut FrameFifo) {
        dest.push_slice(self.as_slice());
        self.clear();
    }

    fn compact(&mut self) {
        if self.start == self.data.len() {
            self.clear();
        } else if self.start > self.data.len() - self.start {
            self.data.drain(..self.start);
            self.start = 0;
        }
    }
}
