//! Key detection modules
//!
//! Detect musical key using:
//! - Krumhansl-Kessler templates (24 keys)
//! - Pearson correlation against a duration-weighted pitch-class histogram
//! - Key clarity scoring

pub mod detector;
pub mod key_clarity;
pub mod templates;

pub use detector::{
    detect_key, detect_key_from_histogram, detect_key_from_histogram_with_scores,
    detect_key_with_scores, pitch_class_histogram,
};
pub use key_clarity::compute_key_clarity;
pub use templates::KeyTemplates;

use crate::analysis::result::{Key, KeyEstimate};

/// Key detection result with the full score table
#[derive(Debug, Clone)]
pub struct KeyDetectionResult {
    /// Winning key estimate
    pub estimate: KeyEstimate,

    /// All 24 key scores, winner first then descending
    ///
    /// Empty when the histogram was flat and detection fell back to C major.
    pub all_scores: Vec<(Key, f32)>,
}
