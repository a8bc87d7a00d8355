//! Audio I/O modules
//!
//! Immutable sample buffers and audio decoding using Symphonia.

pub mod audio_buffer;
pub mod decoder;

pub use audio_buffer::AudioBuffer;
pub use decoder::{decode_audio, decode_audio_bytes};
