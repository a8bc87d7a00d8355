//! Notation modules
//!
//! - Pitch units and note names
//! - Instrument catalog and clef choice
//! - Key-aware spelling and concert ↔ written transposition
//! - Note model, its builder, and the exporter seam

pub mod builder;
pub mod export;
pub mod instruments;
pub mod model;
pub mod pitch;
pub mod spelling;
pub mod transposition;

pub use builder::NoteModelBuilder;
pub use export::{ExportViews, NotationExporter};
pub use instruments::{catalog, instrument, Clef, InstrumentCatalog, InstrumentProfile};
pub use model::{Measure, MeasureEvent, NoteEntry, NoteModel, PitchView, ScoreView, ViewPitch};
pub use spelling::{spell, Spelling};
pub use transposition::TranspositionEngine;
