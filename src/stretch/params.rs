use serde::{Deserialize, Serialize};

use crate::core::resample::Interpolation;
use crate::core::types::validate_positive;
use crate::error::Result;

/// Smallest WSOLA overlap in frames, whatever the tuning asks for.
const MIN_OVERLAP_FRAMES: usize = 16;

/// Whether the engine is fed in real time or may trade latency for quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessMode {
    #[default]
    RealTime,
    /// Doubles the splice search range.
    Offline,
}

/// Quality of the pitch-shifting resampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PitchQuality {
    /// Linear interpolation.
    HighSpeed,
    /// Cubic Hermite interpolation.
    #[default]
    HighQuality,
}

impl PitchQuality {
    #[inline]
    pub(crate) fn interpolation(self) -> Interpolation {
        match self {
            PitchQuality::HighSpeed => Interpolation::Linear,
            PitchQuality::HighQuality => Interpolation::Cubic,
        }
    }
}

/// Option profile an engine is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineOptions {
    pub process_mode: ProcessMode,
    pub pitch_quality: PitchQuality,
}

impl EngineOptions {
    /// Real-time processing with high-quality pitch shifting.
    pub const REALTIME_HIGH_QUALITY_PITCH: Self = Self {
        process_mode: ProcessMode::RealTime,
        pitch_quality: PitchQuality::HighQuality,
    };
}

/// Window sizes for the WSOLA stage, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineTuning {
    /// Length of one splice segment (two overlaps).
    pub segment_ms: f64,
    /// Half-width of the splice-point search window.
    pub search_ms: f64,
    /// Pitch quality for engines built from this tuning.
    pub pitch_quality: PitchQuality,
    /// Process mode for engines built from this tuning.
    pub process_mode: ProcessMode,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            segment_ms: 20.0,
            search_ms: 10.0,
            pitch_quality: PitchQuality::default(),
            process_mode: ProcessMode::default(),
        }
    }
}

impl EngineTuning {
    /// Checks that the window sizes are usable.
    ///
    /// # Errors
    /// Returns `ProcessorError::InvalidParameter` for non-finite or non-positive windows.
    pub fn validate(&self) -> Result<()> {
        validate_positive("segment_ms", self.segment_ms)?;
        validate_positive("search_ms", self.search_ms)
    }

    /// Option profile described by this tuning.
    pub fn options(&self) -> EngineOptions {
        EngineOptions {
            process_mode: self.process_mode,
            pitch_quality: self.pitch_quality,
        }
    }

    /// Resolves the windows to frame counts at `sample_rate`.
    pub fn windows(&self, sample_rate: u32, mode: ProcessMode) -> WsolaWindows {
        let frames = |ms: f64| (ms * 0.001 * sample_rate as f64).round() as usize;
        let overlap = (frames(self.segment_ms) / 2).max(MIN_OVERLAP_FRAMES);
        let search = match mode {
            ProcessMode::RealTime => frames(self.search_ms),
            ProcessMode::Offline => frames(self.search_ms) * 2,
        };
        WsolaWindows { overlap, search }
    }
}

/// WSOLA window sizes in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WsolaWindows {
    /// Cross-fade length; also the output hop.
    pub overlap: usize,
    /// Half-width of the splice-point search.
    pub search: usize,
}

impl WsolaWindows {
    /// Full segment length.
    #[inline]
    pub fn segment(&self) -> usize {
        self.overlap * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_windows() {
        let windows = EngineTuning::default().windows(48000, ProcessMode::RealTime);
        // 20ms at 48kHz = 960 frames, split into two 480-frame halves
        assert_eq!(windows.overlap, 480);
        assert_eq!(windows.segment(), 960);
        // 10ms at 48kHz
        assert_eq!(windows.search, 480);
    }

    #[test]
    fn test_offline_doubles_search() {
        let tuning = EngineTuning::default();
        let rt = tuning.windows(44100, ProcessMode::RealTime);
        let offline = tuning.windows(44100, ProcessMode::Offline);
        assert_eq!(offline.search, rt.search * 2);
        assert_eq!(offline.overlap, rt.overlap);
    }

    #[test]
    fn test_overlap_floor() {
        let tuning = EngineTuning {
            segment_ms: 0.1,
            ..EngineTuning::default()
        };
        assert_eq!(tuning.windows(8000, ProcessMode::RealTime).overlap, MIN_OVERLAP_FRAMES);
    }

    #[test]
    fn test_validate() {
        assert!(EngineTuning::default().validate().is_ok());
        let bad = EngineTuning {
            search_ms: 0.0,
            ..EngineTuning::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_realtime_high_quality_profile() {
        let opts = EngineOptions::REALTIME_HIGH_QUALITY_PITCH;
        assert_eq!(opts.process_mode, ProcessMode::RealTime);
        assert_eq!(opts.pitch_quality.interpolation(), Interpolation::Cubic);
        assert_eq!(EngineTuning::default().options(), opts);
    }
}
