//! Immutable mono PCM buffer handed to the pipeline

use std::sync::Arc;

use crate::error::{Result, TranscriptionError};

/// Finalized mono recording
///
/// Samples are shared behind an `Arc`, so cloning is cheap and the capture
/// side can hand a copy to a worker without any shared mutable state.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Wrap mono samples recorded at `sample_rate`
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(TranscriptionError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }
        Ok(Self {
            samples: samples.into(),
            sample_rate,
        })
    }

    /// Samples, normalized to [-1.0, 1.0]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Window of up to `window_size` samples starting at `start`, clipped at the end
    pub fn window(&self, start: usize, window_size: usize) -> &[f32] {
        let start = start.min(self.samples.len());
        let end = start.saturating_add(window_size).min(self.samples.len());
        &self.samples[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_sample_rate() {
        assert!(AudioBuffer::new(vec![0.0f32; 10], 0).is_err());
    }

    #[test]
    fn test_duration_and_window() {
        let buffer = AudioBuffer::new(vec![0.25f32; 44100], 44100).unwrap();
        assert!((buffer.duration_seconds() - 1.0).abs() < 1e-12);
        assert_eq!(buffer.window(0, 512).len(), 512);
        assert_eq!(buffer.window(44000, 512).len(), 100);
        assert!(buffer.window(50000, 512).is_empty());
    }

    #[test]
    fn test_clone_shares_samples() {
        let buffer = AudioBuffer::new(vec![1.0f32, 2.0, 3.0], 8000).unwrap();
        let copy = buffer.clone();
        assert_eq!(buffer.samples().as_ptr(), copy.samples().as_ptr());
    }
}
