//! Energy flux onset detection
//!
//! Detects attacks by finding peaks in the frame-by-frame RMS energy rise.
//!
//! Algorithm:
//! 1. Divide audio into frames (frame_size, hop_size)
//! 2. Compute RMS energy per frame
//! 3. Compute energy flux: E_flux[n] = max(0, E[n] - E[n-1])
//! 4. Keep local flux peaks above a threshold relative to the strongest flux
//!    whose energy rise over the previous frame is at least `min_rise_db`
//!
//! The rise gate keeps the small RMS ripple of a steady tone (a frame rarely
//! holds a whole number of periods) from registering as an attack when the
//! recording has no stronger onset to normalize against.

use crate::error::{Result, TranscriptionError};

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Detect onsets using energy flux
///
/// # Reference
///
/// Bello, J. P., Daudet, L., Abdallah, S., Duxbury, C., Davies, M., & Sandler, M. B. (2005).
/// A Tutorial on Onset Detection in Music Signals.
/// *IEEE Transactions on Speech and Audio Processing*, 13(5), 1035-1047.
///
/// # Arguments
///
/// * `samples` - Audio samples (mono, normalized to [-1.0, 1.0])
/// * `frame_size` - Frame size for analysis
/// * `hop_size` - Hop size between frames
/// * `threshold_db` - Threshold in dB relative to the maximum flux (typically -20 to -30 dB)
/// * `min_rise_db` - Minimum energy rise over the previous frame, in dB
///
/// # Returns
///
/// Onset positions in samples (frame starts), sorted by time
///
/// # Errors
///
/// `InvalidInput` if the frame or hop size is zero
///
/// # Example
///
/// ```
/// use melody_transcriber::features::onset::energy_flux::detect_energy_flux_onsets;
///
/// let mut samples = vec![0.0f32; 4410];
/// samples.extend(std::iter::repeat(0.5).take(4410));
/// let onsets = detect_energy_flux_onsets(&samples, 441, 441, -20.0, 3.0)?;
/// assert_eq!(onsets, vec![4410]);
/// # Ok::<(), melody_transcriber::TranscriptionError>(())
/// ```
pub fn detect_energy_flux_onsets(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
    threshold_db: f32,
    min_rise_db: f32,
) -> Result<Vec<usize>> {
    if frame_size == 0 {
        return Err(TranscriptionError::InvalidInput(
            "Frame size must be > 0".to_string(),
        ));
    }

    if hop_size == 0 {
        return Err(TranscriptionError::InvalidInput(
            "Hop size must be > 0".to_string(),
        ));
    }

    if samples.len() < frame_size {
        return Ok(Vec::new());
    }

    let num_frames = (samples.len() - frame_size) / hop_size + 1;
    if num_frames < 2 {
        // Need at least 2 frames to compute flux
        return Ok(Vec::new());
    }

    log::debug!(
        "Detecting onsets: {} samples, frame={}, hop={}, threshold={:.1} dB, rise={:.1} dB",
        samples.len(),
        frame_size,
        hop_size,
        threshold_db,
        min_rise_db
    );

    let energies: Vec<f32> = (0..num_frames)
        .map(|i| {
            let frame = &samples[i * hop_size..i * hop_size + frame_size];
            (frame.iter().map(|&x| x * x).sum::<f32>() / frame_size as f32).sqrt()
        })
        .collect();

    // flux[i] is the rise into frame i; frame 0 has no predecessor
    let mut flux = vec![0.0f32; num_frames];
    for i in 1..num_frames {
        flux[i] = (energies[i] - energies[i - 1]).max(0.0);
    }

    let max_flux = flux.iter().copied().fold(0.0f32, f32::max);
    if max_flux <= EPSILON {
        log::debug!("No positive energy flux, no onsets detected");
        return Ok(Vec::new());
    }
    let threshold_linear = max_flux * 10.0_f32.powf(threshold_db / 20.0);

    let mut onsets = Vec::new();
    for i in 1..num_frames {
        let value = flux[i];
        let next = if i + 1 < num_frames { flux[i + 1] } else { 0.0 };
        if value <= threshold_linear || value <= flux[i - 1] || value < next {
            continue;
        }
        let previous = energies[i - 1];
        let rise_db = if previous <= EPSILON {
            f32::INFINITY
        } else {
            20.0 * (energies[i] / previous).log10()
        };
        if rise_db >= min_rise_db {
            onsets.push(i * hop_size);
        }
    }

    log::debug!(
        "Energy flux: max={:.6}, threshold={:.6}, {} onsets",
        max_flux,
        threshold_linear,
        onsets.len()
    );

    Ok(onsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sine with an exponential decay that restarts every `period` seconds
    fn reattacked_tone(seconds: f32, period: f32, decay: f32) -> Vec<f32> {
        let sr = 44100.0;
        (0..(seconds * sr) as usize)
            .map(|i| {
                let t = i as f32 / sr;
                let envelope = 0.8 * (-decay * (t % period)).exp();
                envelope * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_step_from_silence() {
        let mut samples = vec![0.0f32; 44100];
        for s in samples.iter_mut().skip(22050) {
            *s = 0.5;
        }
        let onsets = detect_energy_flux_onsets(&samples, 441, 441, -20.0, 3.0).unwrap();
        assert_eq!(onsets, vec![22050]);
    }

    #[test]
    fn test_reattacks_are_found_on_frame_boundaries() {
        let samples = reattacked_tone(2.0, 0.5, 3.0);
        let onsets = detect_energy_flux_onsets(&samples, 441, 441, -20.0, 3.0).unwrap();
        assert_eq!(onsets, vec![22050, 44100, 66150]);
    }

    #[test]
    fn test_steady_tone_has_no_onsets() {
        let samples: Vec<f32> = (0..88200)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 261.63 * i as f32 / 44100.0).sin())
            .collect();
        let onsets = detect_energy_flux_onsets(&samples, 441, 441, -20.0, 3.0).unwrap();
        assert!(onsets.is_empty(), "{:?}", onsets);
    }

    #[test]
    fn test_silent_and_short_audio() {
        assert!(detect_energy_flux_onsets(&[], 441, 441, -20.0, 3.0)
            .unwrap()
            .is_empty());
        assert!(detect_energy_flux_onsets(&[0.0; 44100], 441, 441, -20.0, 3.0)
            .unwrap()
            .is_empty());
        assert!(detect_energy_flux_onsets(&[0.5; 400], 441, 441, -20.0, 3.0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        let samples = vec![0.5f32; 44100];
        assert!(detect_energy_flux_onsets(&samples, 0, 441, -20.0, 3.0).is_err());
        assert!(detect_energy_flux_onsets(&samples, 441, 0, -20.0, 3.0).is_err());
    }

    #[test]
    fn test_rise_gate_filters_gentle_swells() {
        // 2 dB step: above the relative threshold, below a 3 dB rise
        let mut samples = vec![0.4f32; 22050];
        samples.extend(std::iter::repeat(0.4 * 10f32.powf(2.0 / 20.0)).take(22050));
        let onsets = detect_energy_flux_onsets(&samples, 441, 441, -20.0, 3.0).unwrap();
        assert!(onsets.is_empty());
        let onsets = detect_energy_flux_onsets(&samples, 441, 441, -20.0, 1.0).unwrap();
        assert_eq!(onsets, vec![22050]);
    }
}
