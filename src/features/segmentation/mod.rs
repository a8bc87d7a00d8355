//! Note segmentation modules
//!
//! Turns a smoothed pitch track into note candidates (onset, offset, pitch,
//! confidence).

pub mod segmenter;

pub use segmenter::{NoteSegment, NoteSegmenter};
