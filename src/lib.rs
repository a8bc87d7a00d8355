//! # Melody Transcriber
//!
//! Offline transcription of monophonic recordings (voice or a single
//! instrument) into symbolic notation: pitch, rhythm, key, and
//! instrument-appropriate transposed spelling.
//!
//! ## Features
//!
//! - **Pitch Tracking**: Pluggable frame-pitch estimator, FFT autocorrelation built in
//! - **Smoothing**: Octave-slip correction, gap bridging and median filtering
//! - **Onsets**: Energy-flux attacks split re-struck notes of the same pitch
//! - **Rhythm**: Drift-correcting quantization to a tick grid, with barline ties
//! - **Key Detection**: Krumhansl-Kessler template correlation, or a manual override
//! - **Transposition**: Concert and written spellings for a catalog of instruments
//!
//! ## Quick Start
//!
//! ```no_run
//! use melody_transcriber::{
//!     transcribe_audio, CancellationToken, TranscriptionConfig, TranscriptionRequest,
//! };
//! use melody_transcriber::io::decode_audio;
//!
//! let buffer = decode_audio("take.wav")?;
//! let request = TranscriptionRequest::new("horn_f", 96);
//! let outcome = transcribe_audio(
//!     &buffer,
//!     &request,
//!     &TranscriptionConfig::default(),
//!     &CancellationToken::new(),
//! )?;
//!
//! println!("Key: {} ({} measures)", outcome.key.key, outcome.model.measures.len());
//! # Ok::<(), melody_transcriber::TranscriptionError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! AudioBuffer → FrameAnalyzer → PitchTrackSmoother → NoteSegmenter
//!     (+ energy-flux onsets) → RhythmQuantizer → KeyDetector
//!     → TranspositionEngine → NoteModelBuilder → exporter
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod notation;
pub mod preprocessing;
pub mod worker;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use analysis::result::{Key, KeyEstimate, KeySource, TranscriptionOutcome};
pub use config::TranscriptionConfig;
pub use error::{TranscriptionError, TranscriptionWarning};
pub use features::pitch::{AutocorrelationEstimator, PitchEstimate, PitchEstimator};
pub use features::rhythm::TimeSignature;
pub use io::AudioBuffer;
pub use notation::{NotationExporter, NoteModel};
pub use worker::{spawn_transcription, CancellationToken, TranscriptionHandle};

use analysis::confidence::compute_confidence;
use analysis::metadata::TranscriptionMetadata;
use error::Result;
use features::key::detect_key;
use features::onset::detect_onsets;
use features::pitch::{analyze, PitchTrackSmoother};
use features::rhythm::RhythmQuantizer;
use features::segmentation::NoteSegmenter;
use notation::NoteModelBuilder;

/// What to transcribe the recording as
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionRequest {
    /// Tempo in quarter notes per minute
    pub tempo_bpm: u32,

    /// Time signature (default: 4/4)
    pub time_signature: TimeSignature,

    /// Instrument catalog id
    pub instrument: String,

    /// Key to use instead of detecting one
    pub key_override: Option<Key>,
}

impl TranscriptionRequest {
    /// Request for an instrument at a tempo, in 4/4 with key detection
    pub fn new(instrument: impl Into<String>, tempo_bpm: u32) -> Self {
        Self {
            tempo_bpm,
            time_signature: TimeSignature::default(),
            instrument: instrument.into(),
            key_override: None,
        }
    }

    /// Set the time signature
    pub fn with_time_signature(mut self, time_signature: TimeSignature) -> Self {
        self.time_signature = time_signature;
        self
    }

    /// Skip key detection and use `key`
    pub fn with_key(mut self, key: Key) -> Self {
        self.key_override = Some(key);
        self
    }
}

/// Main transcription function
///
/// Runs the whole pipeline synchronously on the calling thread, checking
/// `cancel` between stages.
///
/// # Arguments
///
/// * `buffer` - Mono recording at the estimator's sample rate
/// * `request` - Tempo, meter, instrument and optional key override
/// * `estimator` - Frame-pitch estimator
/// * `config` - Heuristic thresholds
/// * `cancel` - Cooperative cancellation flag
///
/// # Returns
///
/// The note model with its key, warnings, confidence summary and metadata.
/// A recording with no voiced frames yields an empty model and a
/// [`TranscriptionWarning::NoVoicedAudio`] warning rather than an error.
///
/// # Errors
///
/// The first fatal error of the run: invalid configuration or request,
/// `UnknownInstrument`, `UnsupportedSampleRate`, `TranscriptionCancelled`,
/// or `InvariantViolation`.
pub fn transcribe<E: PitchEstimator>(
    buffer: &AudioBuffer,
    request: &TranscriptionRequest,
    mut estimator: E,
    config: &TranscriptionConfig,
    cancel: &CancellationToken,
) -> Result<TranscriptionOutcome> {
    use std::time::Instant;
    let start_time = Instant::now();

    log::debug!(
        "Starting transcription: {} samples at {} Hz, {} BPM {}, instrument {}",
        buffer.len(),
        buffer.sample_rate(),
        request.tempo_bpm,
        request.time_signature.name(),
        request.instrument
    );

    config.validate()?;
    if request.tempo_bpm == 0 {
        return Err(TranscriptionError::InvalidInput(
            "Tempo must be > 0 BPM".to_string(),
        ));
    }
    request.time_signature.validate()?;
    let profile = notation::instrument(&request.instrument)?;
    let quantizer = RhythmQuantizer::from_config(config)?;

    // Pitch tracking
    cancel.check()?;
    let frames = analyze(buffer, config.hop_seconds, &mut estimator, config)?;
    let hop_seconds = frames.hop_seconds();
    let hop_samples = frames.hop_samples();
    let smoothed = PitchTrackSmoother::from_config(config).smooth(frames);
    let voiced_frames = smoothed.iter().filter(|f| f.is_voiced()).count();

    let mut warnings = Vec::new();
    if voiced_frames == 0 {
        log::warn!("No voiced audio in {} frames", smoothed.len());
        warnings.push(TranscriptionWarning::NoVoicedAudio);
    }

    // Onsets
    cancel.check()?;
    let onsets = detect_onsets(buffer, hop_samples, config)?;
    let onsets_detected = onsets.len();

    // Segmentation
    cancel.check()?;
    let segments = NoteSegmenter::new(config, hop_seconds)
        .with_onsets(onsets)
        .segment(&smoothed);

    // Quantization
    cancel.check()?;
    let quantized = quantizer.quantize(&segments, request.tempo_bpm, request.time_signature)?;
    warnings.extend(quantized.warnings());

    // Key
    cancel.check()?;
    let key = match request.key_override {
        Some(key) => {
            log::debug!("Using manual key {}", key.name());
            KeyEstimate::manual(key)
        }
        None => detect_key(&quantized.events),
    };

    // Note model
    cancel.check()?;
    let (model, range_warnings) = NoteModelBuilder::new(profile).build(&quantized, key.key)?;
    warnings.extend(range_warnings);

    let metadata = TranscriptionMetadata {
        duration_seconds: buffer.duration_seconds(),
        sample_rate: buffer.sample_rate(),
        hop_seconds,
        frames_analyzed: smoothed.len(),
        voiced_frames,
        onsets_detected,
        segments: segments.len(),
        processing_time_ms: start_time.elapsed().as_secs_f32() * 1000.0,
        ..TranscriptionMetadata::default()
    };
    let confidence = compute_confidence(&model, &key, &metadata);

    log::debug!(
        "Transcription finished: {} notes in {} measures, key {}, {} warnings, {:.1} ms",
        model.note_count(),
        model.measures.len(),
        key.key.name(),
        warnings.len(),
        metadata.processing_time_ms
    );

    Ok(TranscriptionOutcome {
        model,
        key,
        warnings,
        confidence,
        metadata,
    })
}

/// [`transcribe`] with the built-in [`AutocorrelationEstimator`]
///
/// The estimator is built for the buffer's sample rate and the configured
/// frequency range.
pub fn transcribe_audio(
    buffer: &AudioBuffer,
    request: &TranscriptionRequest,
    config: &TranscriptionConfig,
    cancel: &CancellationToken,
) -> Result<TranscriptionOutcome> {
    let estimator = AutocorrelationEstimator::from_config(buffer.sample_rate(), config)?;
    transcribe(buffer, request, estimator, config, cancel)
}
