//! Channel mixing utilities (multichannel to mono conversion)

use crate::error::{Result, TranscriptionError};

/// Channel mixing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMixMode {
    /// Simple average of all channels
    #[default]
    Average,
    /// Keep the first channel only
    First,
    /// Keep the louder channel per frame
    Dominant,
}

/// Downmix interleaved samples to mono
///
/// # Arguments
///
/// * `interleaved` - Interleaved samples (`channels` samples per frame)
/// * `channels` - Number of channels
/// * `mode` - Mixing mode
///
/// # Returns
///
/// Mono samples, one per frame. A trailing partial frame is ignored.
pub fn downmix_interleaved(
    interleaved: &[f32],
    channels: usize,
    mode: ChannelMixMode,
) -> Result<Vec<f32>> {
    if channels == 0 {
        return Err(TranscriptionError::InvalidInput(
            "Channel count must be > 0".to_string(),
        ));
    }
    if channels == 1 {
        return Ok(interleaved.to_vec());
    }

    log::debug!(
        "Downmixing {} samples from {} channels using {:?}",
        interleaved.len(),
        channels,
        mode
    );

    let mono = interleaved
        .chunks_exact(channels)
        .map(|frame| match mode {
            ChannelMixMode::Average => frame.iter().sum::<f32>() / channels as f32,
            ChannelMixMode::First => frame[0],
            ChannelMixMode::Dominant => frame
                .iter()
                .copied()
                .fold(0.0f32, |acc, x| if x.abs() > acc.abs() { x } else { acc }),
        })
        .collect();

    Ok(mono)
}
