//! Error and warning types for the transcription pipeline
//!
//! Fatal conditions are [`TranscriptionError`]s and abort the run. Advisory
//! conditions are [`TranscriptionWarning`]s and travel alongside a successful
//! result so the caller can decide what to show the user.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a transcription run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranscriptionError {
    /// Buffer sample rate does not match the pitch estimator's expected rate.
    ///
    /// Resample upstream and retry.
    #[error("Unsupported sample rate: {actual} Hz (estimator expects {expected} Hz)")]
    UnsupportedSampleRate {
        /// Sample rate of the supplied buffer
        actual: u32,
        /// Sample rate the estimator was built for
        expected: u32,
    },

    /// Cooperative cancellation was observed between stages
    #[error("Transcription cancelled")]
    TranscriptionCancelled,

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Instrument id not present in the catalog
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    /// Internal ordering/measure invariant broken while building the note model
    #[error("Note model invariant violated: {0}")]
    InvariantViolation(String),

    /// Audio decoding error
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Instrument catalog could not be parsed
    #[error("Instrument catalog error: {0}")]
    Catalog(String),

    /// Background worker could not be started or panicked
    #[error("Transcription worker failed: {0}")]
    Worker(String),
}

impl From<symphonia::core::errors::Error> for TranscriptionError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        TranscriptionError::Decoding(err.to_string())
    }
}

impl From<std::io::Error> for TranscriptionError {
    fn from(err: std::io::Error) -> Self {
        TranscriptionError::Decoding(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for TranscriptionError {
    fn from(err: serde_json::Error) -> Self {
        TranscriptionError::Catalog(err.to_string())
    }
}

/// Advisory conditions attached to a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum TranscriptionWarning {
    /// No frame rose above the confidence floor; the note model is empty
    #[error("No voiced audio detected")]
    NoVoicedAudio,

    /// Drift-corrected durations overflowed a measure; the crossing note was
    /// truncated at the barline and continued (tied) in the next measure
    #[error("Measure {measure} overfilled; crossing note tied into the next measure")]
    OverfilledMeasure {
        /// Zero-based index of the truncated measure
        measure: u32,
    },

    /// A note lies outside the instrument's playable range
    #[error("Note {midi} at measure {measure}, tick {start_tick} is outside the instrument range")]
    InstrumentRangeExceeded {
        /// Zero-based measure index
        measure: u32,
        /// Absolute start tick of the note
        start_tick: u32,
        /// Concert MIDI number of the note
        midi: u8,
    },
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, TranscriptionError>;
