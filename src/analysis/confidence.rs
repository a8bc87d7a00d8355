//! Confidence scoring module
//!
//! Summarizes how far a transcription can be trusted.
//!
//! # Confidence Components
//!
//! 1. **Pitch Confidence**: Duration-weighted mean confidence of the notes
//! 2. **Key Confidence**: Correlation of the winning key template, scaled by clarity
//! 3. **Voicing Ratio**: Fraction of analyzed frames that were voiced
//! 4. **Overall Confidence**: Weighted combination of all components

use serde::{Deserialize, Serialize};

use super::metadata::TranscriptionMetadata;
use super::result::{AnalysisFlag, KeyEstimate, KeySource};
use crate::notation::model::NoteModel;

/// Key clarity below this raises [`AnalysisFlag::WeakTonality`]
const WEAK_CLARITY: f32 = 0.1;

/// Key correlation below this raises [`AnalysisFlag::WeakTonality`]
const WEAK_CORRELATION: f32 = 0.5;

/// Pitch confidence below this raises [`AnalysisFlag::LowPitchConfidence`]
const LOW_PITCH_CONFIDENCE: f32 = 0.6;

/// Voiced ratio below this raises [`AnalysisFlag::SparseVoicing`]
const SPARSE_VOICING: f32 = 0.2;

/// Transcription confidence scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionConfidence {
    /// Pitch confidence (0.0-1.0)
    pub pitch_confidence: f32,

    /// Key confidence (0.0-1.0); 1.0 for manual keys
    pub key_confidence: f32,

    /// Voiced frames / analyzed frames (0.0-1.0)
    pub voicing_ratio: f32,

    /// Overall confidence (weighted average)
    ///
    /// - Pitch: 50% weight
    /// - Key: 25% weight
    /// - Voicing: 25% weight
    ///
    /// 0.0 when the model holds no notes.
    pub overall_confidence: f32,

    /// Confidence flags indicating specific issues
    pub flags: Vec<AnalysisFlag>,
}

/// Compute confidence scores for a finished transcription
pub fn compute_confidence(
    model: &NoteModel,
    key: &KeyEstimate,
    metadata: &TranscriptionMetadata,
) -> TranscriptionConfidence {
    let pitch_confidence = compute_pitch_confidence(model);
    let key_confidence = compute_key_confidence(key);
    let voicing_ratio = metadata.voiced_ratio().clamp(0.0, 1.0);
    let has_notes = model.notes().next().is_some();

    let overall_confidence = if has_notes {
        (pitch_confidence * 0.5 + key_confidence * 0.25 + voicing_ratio * 0.25).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let mut flags = Vec::new();
    if has_notes
        && key.source == KeySource::Detected
        && (key.clarity < WEAK_CLARITY || key.correlation_score < WEAK_CORRELATION)
    {
        flags.push(AnalysisFlag::WeakTonality);
    }
    if has_notes && pitch_confidence < LOW_PITCH_CONFIDENCE {
        flags.push(AnalysisFlag::LowPitchConfidence);
    }
    if metadata.frames_analyzed > 0 && voicing_ratio < SPARSE_VOICING {
        flags.push(AnalysisFlag::SparseVoicing);
    }

    log::debug!(
        "Confidence scores: Pitch={:.3}, Key={:.3}, Voicing={:.3}, Overall={:.3}",
        pitch_confidence,
        key_confidence,
        voicing_ratio,
        overall_confidence
    );

    TranscriptionConfidence {
        pitch_confidence,
        key_confidence,
        voicing_ratio,
        overall_confidence,
        flags,
    }
}

impl TranscriptionConfidence {
    /// Check if overall confidence is high (>= 0.7)
    pub fn is_high_confidence(&self) -> bool {
        self.overall_confidence >= 0.7
    }

    /// Check if overall confidence is low (< 0.5)
    pub fn is_low_confidence(&self) -> bool {
        self.overall_confidence < 0.5
    }

    /// "High", "Medium", or "Low"
    pub fn confidence_level(&self) -> &'static str {
        if self.is_high_confidence() {
            "High"
        } else if self.is_low_confidence() {
            "Low"
        } else {
            "Medium"
        }
    }
}

fn compute_pitch_confidence(model: &NoteModel) -> f32 {
    let (sum, weight) = model.notes().fold((0.0f64, 0.0f64), |(sum, weight), n| {
        let w = n.duration_ticks as f64;
        (sum + n.confidence as f64 * w, weight + w)
    });
    if weight > 0.0 {
        ((sum / weight) as f32).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn compute_key_confidence(key: &KeyEstimate) -> f32 {
    if key.source == KeySource::Manual {
        return 1.0;
    }
    let base = key.correlation_score.clamp(0.0, 1.0);
    // Ambiguous winners are discounted
    let clarity_adjustment = if key.clarity < WEAK_CLARITY {
        0.6
    } else if key.clarity < 0.3 {
        0.85
    } else {
        1.0
    };
    base * clarity_adjustment
}
