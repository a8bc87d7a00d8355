//! Note segmentation
//!
//! Groups a smoothed pitch track into discrete note candidates.
//!
//! A segment starts on an unvoiced → voiced transition, when the pitch
//! moves by more than `note_change_semitones` between consecutive voiced
//! frames, or at an energy onset that falls inside a voiced run. It ends on
//! the complementary transition or at the end of the track. Segments shorter
//! than `min_note_duration` are dropped and their frames count as silence.
//!
//! Segment pitch is the confidence-weighted median of the frame
//! frequencies, which keeps vibrato extremes and surviving octave slips from
//! pulling the estimate.

use serde::{Deserialize, Serialize};

use crate::config::TranscriptionConfig;
use crate::features::pitch::PitchFrame;
use crate::notation::pitch::hz_to_midi;

/// A note candidate in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteSegment {
    /// Start time in seconds
    pub onset: f64,
    /// End time in seconds (always > onset)
    pub offset: f64,
    /// Segment pitch in Hz
    pub pitch_hz: f32,
    /// Mean frame confidence (0.0-1.0)
    pub confidence_mean: f32,
}

impl NoteSegment {
    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.offset - self.onset
    }
}

/// Note segmenter
#[derive(Debug, Clone)]
pub struct NoteSegmenter {
    hop_seconds: f64,
    note_change: f32,
    min_duration: f64,
    onsets: Vec<f64>,
}

impl NoteSegmenter {
    /// Build a segmenter for frames spaced `hop_seconds` apart
    pub fn new(config: &TranscriptionConfig, hop_seconds: f64) -> Self {
        Self {
            hop_seconds,
            note_change: config.note_change_semitones,
            min_duration: config.min_note_duration,
            onsets: Vec::new(),
        }
    }

    /// Also start a new segment at each onset time (seconds, ascending)
    ///
    /// An onset matches the frame whose start lies within half a hop of it.
    pub fn with_onsets(mut self, onsets: Vec<f64>) -> Self {
        self.onsets = onsets;
        self
    }

    /// Segment a smoothed frame sequence
    ///
    /// Output is ordered by onset and never overlaps.
    pub fn segment(&self, frames: &[PitchFrame]) -> Vec<NoteSegment> {
        let mut segments = Vec::new();
        let mut current: Vec<(f64, f32, f32)> = Vec::new(); // (time, hz, confidence)
        let mut last_midi: Option<f32> = None;
        let mut dropped = 0usize;
        let mut reattacks = 0usize;
        let tolerance = self.hop_seconds / 2.0;
        let mut next_onset = 0usize;

        for frame in frames {
            let mut attack = false;
            while let Some(&onset) = self.onsets.get(next_onset) {
                if onset > frame.time + tolerance {
                    break;
                }
                attack |= onset >= frame.time - tolerance;
                next_onset += 1;
            }

            match frame.frequency {
                Some(hz) => {
                    let midi = hz_to_midi(hz);
                    let pitch_jump =
                        last_midi.is_some_and(|prev| (midi - prev).abs() > self.note_change);
                    if pitch_jump || attack {
                        if attack && !pitch_jump && !current.is_empty() {
                            reattacks += 1;
                        }
                        self.close(&mut current, &mut segments, &mut dropped);
                    }
                    current.push((frame.time, hz, frame.confidence));
                    last_midi = Some(midi);
                }
                None => {
                    self.close(&mut current, &mut segments, &mut dropped);
                    last_midi = None;
                }
            }
        }
        self.close(&mut current, &mut segments, &mut dropped);

        log::debug!(
            "Segmented {} frames into {} notes ({} re-attacks, {} dropped below {:.3}s)",
            frames.len(),
            segments.len(),
            reattacks,
            dropped,
            self.min_duration
        );

        segments
    }

    fn close(
        &self,
        current: &mut Vec<(f64, f32, f32)>,
        segments: &mut Vec<NoteSegment>,
        dropped: &mut usize,
    ) {
        if current.is_empty() {
            return;
        }
        let onset = current[0].0;
        let offset = current[current.len() - 1].0 + self.hop_seconds;

        if offset - onset < self.min_duration {
            *dropped += 1;
        } else {
            let confidence_mean =
                current.iter().map(|&(_, _, c)| c).sum::<f32>() / current.len() as f32;
            let pitch_hz = weighted_median(
                &current.iter().map(|&(_, hz, c)| (hz, c)).collect::<Vec<_>>(),
            );
            segments.push(NoteSegment {
                onset,
                offset,
                pitch_hz,
                confidence_mean,
            });
        }
        current.clear();
    }
}

/// Weighted median of `(value, weight)` pairs
///
/// Returns the smallest value at which the cumulative weight reaches half the
/// total. Falls back to the plain (lower) median when all weights are zero.
fn weighted_median(values: &[(f32, f32)]) -> f32 {
    let mut sorted: Vec<(f32, f32)> = values
        .iter()
        .map(|&(v, w)| (v, if w.is_finite() { w.max(0.0) } else { 0.0 }))
        .collect();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let total: f32 = sorted.iter().map(|&(_, w)| w).sum();
    if total <= 0.0 {
        return sorted[(sorted.len() - 1) / 2].0;
    }

    let half = total / 2.0;
    let mut cumulative = 0.0;
    for &(value, weight) in &sorted {
        cumulative += weight;
        if cumulative >= half {
            return value;
        }
    }
    sorted[sorted.len() - 1].0
}
