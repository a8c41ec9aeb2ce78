//! 16-bit PCM conversions and the output staging buffer.

/// Scale between i16 PCM and normalized `f32` samples.
const PCM16_SCALE: f32 = 32768.0;

/// Converts i16 samples to normalized `f32`, appending to `out`.
#[inline]
pub fn pcm16_to_f32(input: &[i16], out: &mut Vec<f32>) {
    out.extend(input.iter().map(|&s| s as f32 / PCM16_SCALE));
}

/// Converts normalized `f32` samples to i16 with rounding and clamping.
///
/// Writes `min(input.len(), out.len())` samples.
#[inline]
pub fn f32_to_pcm16(input: &[f32], out: &mut [i16]) {
    for (dst, &s) in out.iter_mut().zip(input) {
        *dst = (s * PCM16_SCALE).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    }
}

/// Views native-endian PCM bytes as i16 samples.
///
/// Borrows `bytes` directly when it is 2-byte aligned, otherwise decodes into
/// `scratch`. A trailing odd byte is ignored.
pub fn bytes_as_pcm16<'a>(bytes: &'a [u8], scratch: &'a mut Vec<i16>) -> &'a [i16] {
    let even = &bytes[..bytes.len() & !1];
    match bytemuck::try_cast_slice::<u8, i16>(even) {
        Ok(samples) => samples,
        Err(_) => {
            scratch.clear();
            scratch.extend(
                even.chunks_exact(2)
                    .map(|pair| i16::from_ne_bytes([pair[0], pair[1]])),
            );
            scratch.as_slice()
        }
    }
}

/// Owned i16 buffer that stages engine output for exactly one delivery.
///
/// The byte view handed to the caller shares storage with the sample view the
/// engine writes into. Capacity only grows; after a delivery the buffer is
/// logically empty until the next fill.
#[derive(Debug, Default)]
pub struct StagingBuffer {
    samples: Vec<i16>,
    filled: usize,
}

impl StagingBuffer {
    /// Creates an empty buffer with no allocation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity in bytes.
    #[inline]
    pub fn capacity_bytes(&self) -> usize {
        self.samples.len() * std::mem::size_of::<i16>()
    }

    /// Returns true when nothing is staged for delivery.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Prepares room for `samples` samples and returns it for writing.
    ///
    /// Allocates a larger backing store only when the request exceeds the
    /// current capacity; otherwise rewinds the existing one.
    pub fn prepare(&mut self, samples: usize) -> &mut [i16] {
        if samples > self.samples.len() {
            self.samples = vec![0; samples];
        }
        self.filled = 0;
        &mut self.samples[..samples]
    }

    /// Marks the first `samples` samples as staged for delivery.
    #[inline]
    pub fn commit(&mut self, samples: usize) {
        self.filled = samples.min(self.samples.len());
    }

    /// Delivers the staged bytes and marks them consumed.
    pub fn take(&mut self) -> &[u8] {
        let filled = std::mem::take(&mut self.filled);
        bytemuck::cast_slice(&self.samples[..filled])
    }

    /// Drops staged data, keeping capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.filled = 0;
    }

    /// Drops staged data and releases the allocation.
    pub fn release(&mut self) {
        self.samples = Vec::new();
        self.filled = 0;
    }
}
