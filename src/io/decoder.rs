//! Audio decoding using Symphonia
//!
//! Buffer acquisition is one of the two I/O edges of the pipeline. Decoded
//! audio is downmixed to mono; resampling is left to the caller.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::audio_buffer::AudioBuffer;
use crate::error::{Result, TranscriptionError};
use crate::preprocessing::channel_mixer::{downmix_interleaved, ChannelMixMode};

/// Decode an audio file to a mono buffer
///
/// # Arguments
///
/// * `path` - Path to audio file (any container/codec Symphonia supports)
///
/// # Errors
///
/// Returns `TranscriptionError::Decoding` if the file cannot be opened or
/// contains no decodable audio track.
pub fn decode_audio(path: impl AsRef<Path>) -> Result<AudioBuffer> {
    let path = path.as_ref();
    log::debug!("Decoding audio file: {}", path.display());

    let file = File::open(path)?;
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    decode_source(Box::new(file), hint)
}

/// Decode an in-memory encoded stream (e.g. the bytes of a WAV file)
///
/// `extension` is an optional format hint such as `"wav"`.
pub fn decode_audio_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioBuffer> {
    log::debug!("Decoding {} bytes of in-memory audio", bytes.len());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }
    decode_source(Box::new(Cursor::new(bytes)), hint)
}

fn decode_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<AudioBuffer> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            TranscriptionError::Decoding("No supported audio tracks found".to_string())
        })?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| TranscriptionError::Decoding("Track has no sample rate".to_string()))?;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count();
                let mut interleaved = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                interleaved.copy_interleaved_ref(decoded);
                mono.extend(downmix_interleaved(
                    interleaved.samples(),
                    channels,
                    ChannelMixMode::Average,
                )?);
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet: {}", msg);
            }
            Err(e) => return Err(e.into()),
        }
    }

    log::debug!(
        "Decoded {} mono samples at {} Hz ({:.2}s)",
        mono.len(),
        sample_rate,
        mono.len() as f64 / sample_rate as f64
    );

    AudioBuffer::new(mono, sample_rate)
}
