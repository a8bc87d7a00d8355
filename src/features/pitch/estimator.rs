//! Frame-pitch estimator seam
//!
//! The pipeline never looks inside the model that turns a window of samples
//! into a fundamental frequency. Anything implementing [`PitchEstimator`]
//! can be plugged in without touching smoothing or segmentation.

/// Output of one estimator call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    /// Fundamental frequency in Hz, `None` when the frame is unvoiced
    pub frequency: Option<f32>,
    /// Estimator certainty (0.0-1.0)
    pub confidence: f32,
}

impl PitchEstimate {
    /// Voiced estimate
    pub fn voiced(frequency: f32, confidence: f32) -> Self {
        Self {
            frequency: Some(frequency),
            confidence,
        }
    }

    /// Unvoiced estimate with the given confidence
    pub fn unvoiced(confidence: f32) -> Self {
        Self {
            frequency: None,
            confidence,
        }
    }
}

/// Monophonic fundamental-frequency estimator
pub trait PitchEstimator {
    /// Sample rate the estimator was built for
    ///
    /// Buffers at any other rate are rejected with
    /// `TranscriptionError::UnsupportedSampleRate`.
    fn expected_sample_rate(&self) -> u32;

    /// Number of samples the estimator wants per call
    ///
    /// The analyzer passes `max(hop, window_size)` samples starting at each
    /// hop. Defaults to 0, meaning exactly one hop.
    fn window_size(&self) -> usize {
        0
    }

    /// Estimate the fundamental of one frame of samples
    fn estimate(&mut self, frame: &[f32]) -> PitchEstimate;
}

impl<E: PitchEstimator + ?Sized> PitchEstimator for &mut E {
    fn expected_sample_rate(&self) -> u32 {
        (**self).expected_sample_rate()
    }

    fn window_size(&self) -> usize {
        (**self).window_size()
    }

    fn estimate(&mut self, frame: &[f32]) -> PitchEstimate {
        (**self).estimate(frame)
    }
}

impl<E: PitchEstimator + ?Sized> PitchEstimator for Box<E> {
    fn expected_sample_rate(&self) -> u32 {
        (**self).expected_sample_rate()
    }

    fn window_size(&self) -> usize {
        (**self).window_size()
    }

    fn estimate(&mut self, frame: &[f32]) -> PitchEstimate {
        (**self).estimate(frame)
    }
}
