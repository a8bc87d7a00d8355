//! Onset detection
//!
//! Finds note attacks from the signal energy so that a re-attacked note of
//! unchanged pitch still starts a new segment.

pub mod energy_flux;

pub use energy_flux::detect_energy_flux_onsets;

use crate::config::TranscriptionConfig;
use crate::error::Result;
use crate::io::AudioBuffer;

/// Onset times in seconds, aligned to the pitch-frame hop
///
/// Uses one hop per energy frame so every onset lands on a pitch frame
/// start. Returns nothing when `config.onset_detection` is off.
pub fn detect_onsets(
    buffer: &AudioBuffer,
    hop_samples: usize,
    config: &TranscriptionConfig,
) -> Result<Vec<f64>> {
    if !config.onset_detection {
        return Ok(Vec::new());
    }
    let onsets = detect_energy_flux_onsets(
        buffer.samples(),
        hop_samples,
        hop_samples,
        config.onset_threshold_db,
        config.onset_min_rise_db,
    )?;
    let sample_rate = buffer.sample_rate() as f64;
    Ok(onsets.into_iter().map(|s| s as f64 / sample_rate).collect())
}
