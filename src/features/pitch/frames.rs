//! Frame analysis: PCM buffer → fixed-hop pitch frames
//!
//! [`analyze`] validates the buffer against the estimator and returns a lazy
//! [`FrameAnalyzer`] iterator. The iterator is single-pass: it borrows the
//! estimator mutably and cannot be restarted, so re-analysis means a fresh
//! call. Estimator windows are borrowed from the buffer one hop at a time;
//! the smoother then collects the resulting frames (a few values per hop)
//! because its passes look at neighbours on both sides.

use serde::{Deserialize, Serialize};

use super::estimator::PitchEstimator;
use crate::config::TranscriptionConfig;
use crate::error::{Result, TranscriptionError};
use crate::io::AudioBuffer;

/// One hop of pitch analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchFrame {
    /// Frame start in seconds
    pub time: f64,
    /// Fundamental frequency in Hz, `None` = unvoiced/silent
    pub frequency: Option<f32>,
    /// Estimator certainty (0.0-1.0)
    pub confidence: f32,
}

impl PitchFrame {
    /// True when the frame carries a frequency
    pub fn is_voiced(&self) -> bool {
        self.frequency.is_some()
    }
}

/// Lazy iterator over the pitch frames of one buffer
pub struct FrameAnalyzer<'a, E: PitchEstimator> {
    buffer: &'a AudioBuffer,
    estimator: E,
    hop_samples: usize,
    frame_samples: usize,
    confidence_floor: f32,
    next_frame: usize,
    total_frames: usize,
}

impl<'a, E: PitchEstimator> FrameAnalyzer<'a, E> {
    /// Hop length in samples
    pub fn hop_samples(&self) -> usize {
        self.hop_samples
    }

    /// Hop length in seconds (exact, after rounding to whole samples)
    pub fn hop_seconds(&self) -> f64 {
        self.hop_samples as f64 / self.buffer.sample_rate() as f64
    }

    /// Total number of frames this analyzer yields
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }
}

impl<'a, E: PitchEstimator> Iterator for FrameAnalyzer<'a, E> {
    type Item = PitchFrame;

    fn next(&mut self) -> Option<PitchFrame> {
        if self.next_frame >= self.total_frames {
            return None;
        }
        let index = self.next_frame;
        self.next_frame += 1;

        let start = index * self.hop_samples;
        let window = self.buffer.window(start, self.frame_samples);
        let estimate = self.estimator.estimate(window);

        let confidence = if estimate.confidence.is_finite() {
            estimate.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let frequency = estimate
            .frequency
            .filter(|f| f.is_finite() && *f > 0.0 && confidence >= self.confidence_floor);

        Some(PitchFrame {
            time: start as f64 / self.buffer.sample_rate() as f64,
            frequency,
            confidence,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_frames - self.next_frame;
        (remaining, Some(remaining))
    }
}

impl<'a, E: PitchEstimator> ExactSizeIterator for FrameAnalyzer<'a, E> {}

/// Start frame analysis of `buffer`
///
/// # Arguments
///
/// * `buffer` - Mono recording; must be at the estimator's expected sample rate
/// * `hop_seconds` - Hop between frames in seconds
/// * `estimator` - Frame-pitch estimator (pass `&mut estimator` to keep ownership)
/// * `config` - Supplies the confidence floor
///
/// # Errors
///
/// * `UnsupportedSampleRate` if the buffer rate differs from the estimator's
/// * `InvalidInput` if the hop is not positive or the buffer is shorter than one hop
pub fn analyze<'a, E: PitchEstimator>(
    buffer: &'a AudioBuffer,
    hop_seconds: f64,
    estimator: E,
    config: &TranscriptionConfig,
) -> Result<FrameAnalyzer<'a, E>> {
    let expected = estimator.expected_sample_rate();
    if buffer.sample_rate() != expected {
        return Err(TranscriptionError::UnsupportedSampleRate {
            actual: buffer.sample_rate(),
            expected,
        });
    }

    if !(hop_seconds > 0.0) || !hop_seconds.is_finite() {
        return Err(TranscriptionError::InvalidInput(format!(
            "Hop must be positive, got {}s",
            hop_seconds
        )));
    }

    let hop_samples = (hop_seconds * buffer.sample_rate() as f64).round() as usize;
    if hop_samples == 0 {
        return Err(TranscriptionError::InvalidInput(format!(
            "Hop of {}s is shorter than one sample at {} Hz",
            hop_seconds,
            buffer.sample_rate()
        )));
    }

    if buffer.len() < hop_samples {
        return Err(TranscriptionError::InvalidInput(format!(
            "Buffer of {} samples is shorter than one hop ({} samples)",
            buffer.len(),
            hop_samples
        )));
    }

    let total_frames = buffer.len() / hop_samples;
    let frame_samples = hop_samples.max(estimator.window_size());

    log::debug!(
        "Analyzing {} frames: {} samples at {} Hz, hop={}, window={}, floor={:.2}",
        total_frames,
        buffer.len(),
        buffer.sample_rate(),
        hop_samples,
        frame_samples,
        config.confidence_floor
    );

    Ok(FrameAnalyzer {
        buffer,
        estimator,
        hop_samples,
        frame_samples,
        confidence_floor: config.confidence_floor,
        next_frame: 0,
        total_frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pitch::estimator::PitchEstimate;

    /// Reports the mean sample value as frequency, confidence fixed
    struct MeanEstimator {
        rate: u32,
        confidence: f32,
        calls: usize,
    }

    impl PitchEstimator for MeanEstimator {
        fn expected_sample_rate(&self) -> u32 {
            self.rate
        }

        fn estimate(&mut self, frame: &[f32]) -> PitchEstimate {
            self.calls += 1;
            let mean = frame.iter().sum::<f32>() / frame.len() as f32;
            PitchEstimate::voiced(mean, self.confidence)
        }
    }

    fn config() -> TranscriptionConfig {
        TranscriptionConfig::default()
    }

    #[test]
    fn test_rejects_mismatched_sample_rate() {
        let buffer = AudioBuffer::new(vec![0.0f32; 48000], 48000).unwrap();
        let estimator = MeanEstimator {
            rate: 44100,
            confidence: 1.0,
            calls: 0,
        };
        let result = analyze(&buffer, 0.01, estimator, &config());
        assert!(matches!(
            result,
            Err(TranscriptionError::UnsupportedSampleRate { actual: 48000, expected: 44100 })
        ));
    }

    #[test]
    fn test_rejects_buffer_shorter_than_hop() {
        let buffer = AudioBuffer::new(vec![0.0f32; 50], 1000).unwrap();
        let estimator = MeanEstimator {
            rate: 1000,
            confidence: 1.0,
            calls: 0,
        };
        assert!(analyze(&buffer, 0.1, estimator, &config()).is_err());
    }

    #[test]
    fn test_frames_are_fixed_hop_and_lazy() {
        let buffer = AudioBuffer::new(vec![200.0f32; 1050], 1000).unwrap();
        let mut estimator = MeanEstimator {
            rate: 1000,
            confidence: 0.9,
            calls: 0,
        };
        {
            let mut frames = analyze(&buffer, 0.1, &mut estimator, &config()).unwrap();
            assert_eq!(frames.total_frames(), 10);
            assert_eq!(frames.hop_samples(), 100);
            let first = frames.next().unwrap();
            assert_eq!(first.time, 0.0);
            assert_eq!(first.frequency, Some(200.0));
            assert_eq!(frames.len(), 9);
        }
        // Only one frame was pulled
        assert_eq!(estimator.calls, 1);

        let frames: Vec<PitchFrame> = analyze(&buffer, 0.1, &mut estimator, &config())
            .unwrap()
            .collect();
        assert_eq!(frames.len(), 10);
        for pair in frames.windows(2) {
            assert!(pair[1].time > pair[0].time);
            assert!((pair[1].time - pair[0].time - 0.1).abs() < 1e-9);
        }
    }

    #[test]
    fn test_low_confidence_becomes_unvoiced() {
        let buffer = AudioBuffer::new(vec![300.0f32; 1000], 1000).unwrap();
        let estimator = MeanEstimator {
            rate: 1000,
            confidence: 0.2,
            calls: 0,
        };
        let frames: Vec<PitchFrame> = analyze(&buffer, 0.1, estimator, &config())
            .unwrap()
            .collect();
        assert!(frames.iter().all(|f| !f.is_voiced()));
        assert!(frames.iter().all(|f| (f.confidence - 0.2).abs() < 1e-6));
    }
}
