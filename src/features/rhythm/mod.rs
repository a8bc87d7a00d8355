//! Rhythm quantization
//!
//! - Tick grid and time signatures
//! - Drift-correcting quantizer (segments → notes and rests)

pub mod grid;
pub mod quantizer;

pub use grid::{DurationGrid, TimeSignature, MAX_GRID_DIVISION, TICKS_PER_BEAT, TICKS_PER_WHOLE};
pub use quantizer::{QuantizationResult, QuantizedEvent, QuantizedNote, Rest, RhythmQuantizer, Tie};
