//! Configuration parameters for transcription

use serde::{Deserialize, Serialize};

use crate::error::{Result, TranscriptionError};

/// Transcription configuration parameters
///
/// Every heuristic threshold used by the pipeline lives here so it can be
/// tuned and tested independently of the algorithms that use it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    // Frame analysis
    /// Hop between pitch frames in seconds (default: 0.01)
    pub hop_seconds: f64,

    /// Estimator confidence below which a frame is treated as unvoiced (default: 0.5)
    pub confidence_floor: f32,

    /// Lowest frequency the built-in estimator searches (default: 50.0 Hz)
    pub min_frequency_hz: f32,

    /// Highest frequency the built-in estimator searches (default: 2000.0 Hz)
    pub max_frequency_hz: f32,

    // Smoothing
    /// Median filter width in frames (default: 5)
    pub median_window: usize,

    /// Allowed deviation from an exact octave when correcting octave slips,
    /// in semitones (default: 1.0)
    pub octave_tolerance_semitones: f32,

    /// Longest unvoiced gap, in hops, that is bridged between voiced frames (default: 3)
    pub max_gap_hops: usize,

    // Segmentation
    /// Pitch change between consecutive voiced frames that starts a new note,
    /// in semitones (default: 0.5)
    pub note_change_semitones: f32,

    /// Segments shorter than this are dropped as noise, in seconds (default: 0.1)
    pub min_note_duration: f64,

    // Onset detection
    /// Split notes at energy onsets as well as at pitch changes (default: true)
    ///
    /// Catches a re-attacked note of the same pitch with no silence between.
    pub onset_detection: bool,

    /// Onset flux threshold relative to the strongest flux in the recording,
    /// in dB (default: -20.0)
    pub onset_threshold_db: f32,

    /// Minimum frame-to-frame energy rise for an onset, in dB (default: 3.0)
    pub onset_min_rise_db: f32,

    // Quantization
    /// Grid resolution as a note-value denominator: 32 = 1/32 note (default: 32)
    ///
    /// Must be a power of two between 1 and 32.
    pub grid_division: u32,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            hop_seconds: 0.01,
            confidence_floor: 0.5,
            min_frequency_hz: 50.0,
            max_frequency_hz: 2000.0,
            median_window: 5,
            octave_tolerance_semitones: 1.0,
            max_gap_hops: 3,
            note_change_semitones: 0.5,
            min_note_duration: 0.1,
            onset_detection: true,
            onset_threshold_db: -20.0,
            onset_min_rise_db: 3.0,
            grid_division: 32,
        }
    }
}

impl TranscriptionConfig {
    /// Load a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TranscriptionError::InvalidInput(format!("Bad configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter is inside its usable range
    pub fn validate(&self) -> Result<()> {
        if !(self.hop_seconds > 0.0) || !self.hop_seconds.is_finite() {
            return Err(TranscriptionError::InvalidInput(format!(
                "hop_seconds must be positive, got {}",
                self.hop_seconds
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(TranscriptionError::InvalidInput(format!(
                "confidence_floor must be within [0, 1], got {}",
                self.confidence_floor
            )));
        }
        if !(self.min_frequency_hz > 0.0) || self.min_frequency_hz >= self.max_frequency_hz {
            return Err(TranscriptionError::InvalidInput(format!(
                "Invalid estimator frequency range: [{:.1}, {:.1}] Hz",
                self.min_frequency_hz, self.max_frequency_hz
            )));
        }
        if self.median_window == 0 {
            return Err(TranscriptionError::InvalidInput(
                "median_window must be at least 1".to_string(),
            ));
        }
        if self.octave_tolerance_semitones < 0.0 || self.octave_tolerance_semitones >= 6.0 {
            return Err(TranscriptionError::InvalidInput(format!(
                "octave_tolerance_semitones must be within [0, 6), got {}",
                self.octave_tolerance_semitones
            )));
        }
        if !(self.note_change_semitones > 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "note_change_semitones must be positive, got {}",
                self.note_change_semitones
            )));
        }
        if !(self.min_note_duration >= 0.0) || !self.min_note_duration.is_finite() {
            return Err(TranscriptionError::InvalidInput(format!(
                "min_note_duration must not be negative, got {}",
                self.min_note_duration
            )));
        }
        if !(self.onset_threshold_db <= 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "onset_threshold_db must be <= 0 dB, got {}",
                self.onset_threshold_db
            )));
        }
        if !(self.onset_min_rise_db > 0.0) || !self.onset_min_rise_db.is_finite() {
            return Err(TranscriptionError::InvalidInput(format!(
                "onset_min_rise_db must be positive, got {}",
                self.onset_min_rise_db
            )));
        }
        if !self.grid_division.is_power_of_two() || self.grid_division > 32 {
            return Err(TranscriptionError::InvalidInput(format!(
                "grid_division must be a power of two up to 32, got {}",
                self.grid_division
            )));
        }
        Ok(())
    }
}
