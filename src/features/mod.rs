//! Feature extraction modules
//!
//! This module contains the per-stage analysis algorithms:
//! - Pitch tracking (frame analysis + smoothing)
//! - Onset detection (energy flux)
//! - Note segmentation
//! - Rhythm quantization
//! - Key detection

pub mod key;
pub mod onset;
pub mod pitch;
pub mod rhythm;
pub mod segmentation;
