//! Transcription metadata structures

use serde::{Deserialize, Serialize};

/// Facts about one transcription run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionMetadata {
    /// Audio duration in seconds
    pub duration_seconds: f64,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Frame hop in seconds
    pub hop_seconds: f64,

    /// Pitch frames produced by the frame analyzer
    pub frames_analyzed: usize,

    /// Frames still voiced after smoothing
    pub voiced_frames: usize,

    /// Energy onsets used as extra note boundaries
    pub onsets_detected: usize,

    /// Note segments found before quantization
    pub segments: usize,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,
}

impl TranscriptionMetadata {
    /// Fraction of frames that are voiced (0.0 when no frames were analyzed)
    pub fn voiced_ratio(&self) -> f32 {
        if self.frames_analyzed == 0 {
            0.0
        } else {
            self.voiced_frames as f32 / self.frames_analyzed as f32
        }
    }
}

impl Default for TranscriptionMetadata {
    fn default() -> Self {
        Self {
            duration_seconds: 0.0,
            sample_rate: 0,
            hop_seconds: 0.0,
            frames_analyzed: 0,
            voiced_frames: 0,
            onsets_detected: 0,
            segments: 0,
            processing_time_ms: 0.0,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
