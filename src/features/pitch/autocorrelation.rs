//! Autocorrelation-based frame pitch estimator
//!
//! Built-in [`PitchEstimator`] so the crate works without an external model.
//!
//! # Algorithm
//!
//! 1. Remove DC and reject near-silent frames (RMS gate)
//! 2. Compute autocorrelation using FFT acceleration: `ACF = IFFT(|FFT(frame)|²)`
//! 3. Normalize each lag by `ACF[0]` and by the overlap length (unbiased)
//! 4. Take the first local maximum reaching `peak_fraction` of the global
//!    maximum inside the lag range; picking the first rather than the highest
//!    keeps sub-octave lags from winning
//! 5. Refine the lag with parabolic interpolation; `f0 = sample_rate / lag`
//!
//! The normalized peak height doubles as the confidence.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use super::estimator::{PitchEstimate, PitchEstimator};
use crate::config::TranscriptionConfig;
use crate::error::{Result, TranscriptionError};

/// Frames quieter than this RMS are treated as silence
const SILENCE_RMS: f32 = 1e-4;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Default analysis window in samples
pub const DEFAULT_WINDOW_SIZE: usize = 2048;

/// FFT-accelerated autocorrelation pitch estimator
pub struct AutocorrelationEstimator {
    sample_rate: u32,
    window_size: usize,
    min_lag: usize,
    max_lag: usize,
    peak_fraction: f32,
    planner: FftPlanner<f32>,
}

impl std::fmt::Debug for AutocorrelationEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutocorrelationEstimator")
            .field("sample_rate", &self.sample_rate)
            .field("window_size", &self.window_size)
            .field("min_lag", &self.min_lag)
            .field("max_lag", &self.max_lag)
            .field("peak_fraction", &self.peak_fraction)
            .finish()
    }
}

impl AutocorrelationEstimator {
    /// Create an estimator searching `[min_hz, max_hz]`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the sample rate or window is zero, the
    /// frequency range is empty, or the window cannot hold two periods of
    /// `min_hz`.
    pub fn new(sample_rate: u32, window_size: usize, min_hz: f32, max_hz: f32) -> Result<Self> {
        if sample_rate == 0 || window_size == 0 {
            return Err(TranscriptionError::InvalidInput(
                "Sample rate and window size must be > 0".to_string(),
            ));
        }
        if !(min_hz > 0.0) || min_hz >= max_hz {
            return Err(TranscriptionError::InvalidInput(format!(
                "Invalid frequency range: [{:.1}, {:.1}] Hz",
                min_hz, max_hz
            )));
        }

        let min_lag = ((sample_rate as f32 / max_hz).floor() as usize).max(2);
        let max_lag = (sample_rate as f32 / min_hz).ceil() as usize;
        if max_lag * 2 > window_size {
            return Err(TranscriptionError::InvalidInput(format!(
                "Window of {} samples cannot resolve {:.1} Hz at {} Hz (needs {})",
                window_size,
                min_hz,
                sample_rate,
                max_lag * 2
            )));
        }

        Ok(Self {
            sample_rate,
            window_size,
            min_lag,
            max_lag,
            peak_fraction: 0.9,
            planner: FftPlanner::new(),
        })
    }

    /// Create an estimator from the frequency range in `config`
    ///
    /// The window is the smallest power of two holding two periods of the
    /// lowest frequency, and at least [`DEFAULT_WINDOW_SIZE`].
    pub fn from_config(sample_rate: u32, config: &TranscriptionConfig) -> Result<Self> {
        if !(config.min_frequency_hz > 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "min_frequency_hz must be positive, got {}",
                config.min_frequency_hz
            )));
        }
        let needed = (2.0 * sample_rate as f32 / config.min_frequency_hz).ceil() as usize + 2;
        let window_size = needed.next_power_of_two().max(DEFAULT_WINDOW_SIZE);
        Self::new(
            sample_rate,
            window_size,
            config.min_frequency_hz,
            config.max_frequency_hz,
        )
    }

    /// Fraction of the global maximum a peak must reach to be picked (default: 0.9)
    pub fn with_peak_fraction(mut self, fraction: f32) -> Self {
        self.peak_fraction = fraction.clamp(0.1, 1.0);
        self
    }

    /// Unbiased normalized autocorrelation of `frame` for lags `0..frame.len()`
    fn normalized_autocorrelation(&mut self, frame: &[f32]) -> Option<Vec<f32>> {
        let n = frame.len();
        let mean = frame.iter().sum::<f32>() / n as f32;

        let fft_size = (2 * n).next_power_of_two();
        let mut buffer: Vec<Complex<f32>> = frame
            .iter()
            .map(|&x| Complex::new(x - mean, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(fft_size)
            .collect();

        let forward = self.planner.plan_fft_forward(fft_size);
        forward.process(&mut buffer);
        for bin in buffer.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        let inverse = self.planner.plan_fft_inverse(fft_size);
        inverse.process(&mut buffer);

        let energy = buffer[0].re;
        if energy <= EPSILON {
            return None;
        }

        Some(
            (0..n)
                .map(|lag| {
                    let overlap = (n - lag) as f32;
                    buffer[lag].re / energy * (n as f32 / overlap)
                })
                .collect(),
        )
    }
}

impl PitchEstimator for AutocorrelationEstimator {
    fn expected_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn window_size(&self) -> usize {
        self.window_size
    }

    fn estimate(&mut self, frame: &[f32]) -> PitchEstimate {
        let n = frame.len();
        // Need two periods of the candidate lag inside the frame.
        let max_lag = self.max_lag.min(n / 2);
        if max_lag <= self.min_lag + 1 {
            return PitchEstimate::unvoiced(0.0);
        }

        let rms = (frame.iter().map(|&x| x * x).sum::<f32>() / n as f32).sqrt();
        if rms < SILENCE_RMS {
            return PitchEstimate::unvoiced(0.0);
        }

        let acf = match self.normalized_autocorrelation(frame) {
            Some(acf) => acf,
            None => return PitchEstimate::unvoiced(0.0),
        };

        let global_max = acf[self.min_lag..=max_lag]
            .iter()
            .copied()
            .fold(f32::MIN, f32::max);
        if global_max <= 0.0 {
            return PitchEstimate::unvoiced(0.0);
        }
        let threshold = global_max * self.peak_fraction;

        let peak = (self.min_lag.max(1)..max_lag).find(|&lag| {
            acf[lag] >= threshold && acf[lag] > acf[lag - 1] && acf[lag] >= acf[lag + 1]
        });

        let lag = match peak {
            Some(lag) => lag,
            None => return PitchEstimate::unvoiced(global_max.clamp(0.0, 1.0)),
        };

        // Parabolic interpolation around the peak
        let (a, b, c) = (acf[lag - 1], acf[lag], acf[lag + 1]);
        let denom = a - 2.0 * b + c;
        let offset = if denom.abs() > EPSILON {
            (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        let refined_lag = lag as f32 + offset;

        PitchEstimate::voiced(self.sample_rate as f32 / refined_lag, b.clamp(0.0, 1.0))
    }
}
