//! Background transcription with cooperative cancellation
//!
//! A run is handed a finalized, moved [`AudioBuffer`] and executes on its own
//! named thread. Cancellation is a shared flag checked between pipeline
//! stages, so a cancelled run stops at the next stage boundary and returns
//! [`TranscriptionError::TranscriptionCancelled`] without a partial model.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::analysis::result::TranscriptionOutcome;
use crate::config::TranscriptionConfig;
use crate::error::{Result, TranscriptionError};
use crate::features::pitch::PitchEstimator;
use crate::io::AudioBuffer;
use crate::TranscriptionRequest;

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// New, not-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(TranscriptionCancelled)` once cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            log::debug!("Cancellation observed");
            Err(TranscriptionError::TranscriptionCancelled)
        } else {
            Ok(())
        }
    }
}

/// Handle to a transcription running in the background
#[derive(Debug)]
pub struct TranscriptionHandle {
    token: CancellationToken,
    thread: JoinHandle<Result<TranscriptionOutcome>>,
}

impl TranscriptionHandle {
    /// Request cancellation; takes effect at the next stage boundary
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The run's cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether the run has finished (successfully or not)
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the run and return its outcome
    pub fn join(self) -> Result<TranscriptionOutcome> {
        match self.thread.join() {
            Ok(result) => result,
            Err(_) => Err(TranscriptionError::Worker(
                "transcription thread panicked".to_string(),
            )),
        }
    }
}

/// Start a transcription on a background thread
///
/// # Errors
///
/// `Worker` if the thread cannot be spawned. Pipeline errors are returned by
/// [`TranscriptionHandle::join`].
pub fn spawn_transcription<E>(
    buffer: AudioBuffer,
    request: TranscriptionRequest,
    estimator: E,
    config: TranscriptionConfig,
) -> Result<TranscriptionHandle>
where
    E: PitchEstimator + Send + 'static,
{
    let token = CancellationToken::new();
    let worker_token = token.clone();

    log::debug!(
        "Spawning transcription worker: {:.2}s of audio for {}",
        buffer.duration_seconds(),
        request.instrument
    );

    let thread = std::thread::Builder::new()
        .name("melody-transcriber".to_string())
        .spawn(move || crate::transcribe(&buffer, &request, estimator, &config, &worker_token))
        .map_err(|e| TranscriptionError::Worker(e.to_string()))?;

    Ok(TranscriptionHandle { token, thread })
}
