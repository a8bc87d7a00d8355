//! Pitch track smoothing
//!
//! Cleans a raw frame sequence before segmentation. All work happens in
//! continuous semitone space (MIDI pitch), in three left-to-right passes:
//!
//! 1. **Octave correction**: a voiced frame sitting an octave above (or
//!    below) both voiced neighbours, within a tolerance, is moved back to the
//!    neighbours' octave. Catches single-frame doubling/halving errors.
//! 2. **Gap bridging**: unvoiced runs of at most `max_gap_hops` frames with
//!    voiced frames on both sides are filled. Nearby pitches are linearly
//!    interpolated; pitches further apart than a note change are filled by
//!    nearest neighbour so the note boundary survives. A bridged frame takes
//!    the lower confidence of its two bounding frames.
//! 3. **Median filter** over each voiced run (never across unvoiced frames),
//!    absorbing vibrato and residual jitter.

use super::frames::PitchFrame;
use crate::config::TranscriptionConfig;
use crate::notation::pitch::{hz_to_midi, midi_to_hz};

/// Pitch track smoother with thresholds taken from [`TranscriptionConfig`]
#[derive(Debug, Clone)]
pub struct PitchTrackSmoother {
    median_window: usize,
    octave_tolerance: f32,
    max_gap_hops: usize,
    note_change: f32,
}

impl PitchTrackSmoother {
    /// Build a smoother from configuration
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        Self {
            median_window: config.median_window.max(1),
            octave_tolerance: config.octave_tolerance_semitones,
            max_gap_hops: config.max_gap_hops,
            note_change: config.note_change_semitones,
        }
    }

    /// Smooth a frame sequence
    ///
    /// Frame times are preserved; only frequencies and the confidence of
    /// bridged frames change. The input is collected first since the passes
    /// read neighbours on both sides of each frame.
    pub fn smooth(&self, frames: impl IntoIterator<Item = PitchFrame>) -> Vec<PitchFrame> {
        let mut frames: Vec<PitchFrame> = frames.into_iter().collect();
        let mut pitches: Vec<Option<f32>> = frames
            .iter()
            .map(|f| f.frequency.map(hz_to_midi))
            .collect();
        let mut confidences: Vec<f32> = frames.iter().map(|f| f.confidence).collect();

        let corrected = self.correct_octaves(&mut pitches);
        let bridged = self.bridge_gaps(&mut pitches, &mut confidences);
        let filtered = self.median_filter(&pitches);

        log::debug!(
            "Smoothed {} frames: {} octave corrections, {} bridged frames",
            frames.len(),
            corrected,
            bridged
        );

        for ((frame, pitch), confidence) in frames.iter_mut().zip(filtered).zip(confidences) {
            frame.frequency = pitch.map(midi_to_hz);
            frame.confidence = confidence;
        }
        frames
    }

    fn correct_octaves(&self, pitches: &mut [Option<f32>]) -> usize {
        let mut corrected = 0;
        for i in 1..pitches.len().saturating_sub(1) {
            let (prev, cur, next) = match (pitches[i - 1], pitches[i], pitches[i + 1]) {
                (Some(p), Some(c), Some(n)) => (p, c, n),
                _ => continue,
            };
            for shift in [12.0f32, -12.0] {
                if ((cur - prev) - shift).abs() <= self.octave_tolerance
                    && ((cur - next) - shift).abs() <= self.octave_tolerance
                {
                    pitches[i] = Some(cur - shift);
                    corrected += 1;
                    break;
                }
            }
        }
        corrected
    }

    fn bridge_gaps(&self, pitches: &mut [Option<f32>], confidences: &mut [f32]) -> usize {
        let n = pitches.len();
        let mut bridged = 0;
        let mut i = 0;

        while i < n {
            if pitches[i].is_some() {
                i += 1;
                continue;
            }
            let start = i;
            while i < n && pitches[i].is_none() {
                i += 1;
            }
            let end = i;
            let len = end - start;

            if start == 0 || end == n || len > self.max_gap_hops {
                continue;
            }
            let (left, right) = match (pitches[start - 1], pitches[end]) {
                (Some(l), Some(r)) => (l, r),
                _ => continue,
            };
            let confidence = confidences[start - 1].min(confidences[end]);
            let interpolate = (right - left).abs() <= self.note_change;

            for k in 0..len {
                let t = (k + 1) as f32 / (len + 1) as f32;
                let pitch = if interpolate {
                    left + (right - left) * t
                } else if t <= 0.5 {
                    left
                } else {
                    right
                };
                pitches[start + k] = Some(pitch);
                confidences[start + k] = confidence;
            }
            bridged += len;
        }
        bridged
    }

    fn median_filter(&self, pitches: &[Option<f32>]) -> Vec<Option<f32>> {
        let half = self.median_window / 2;
        let n = pitches.len();
        let mut out = pitches.to_vec();
        let mut window: Vec<f32> = Vec::with_capacity(self.median_window);

        let mut i = 0;
        while i < n {
            if pitches[i].is_none() {
                i += 1;
                continue;
            }
            let run_start = i;
            while i < n && pitches[i].is_some() {
                i += 1;
            }
            let run_end = i;

            for j in run_start..run_end {
                let lo = j.saturating_sub(half).max(run_start);
                let hi = (j + half + 1).min(run_end);
                window.clear();
                window.extend(pitches[lo..hi].iter().flatten());
                out[j] = Some(median(&mut window));
            }
        }
        out
    }
}

/// Median of a non-empty slice (mean of the middle pair for even lengths)
fn median(values: &mut [f32]) -> f32 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
