//! Note model: measures of spelled notes and rests
//!
//! Every note carries both its concert and its written spelling, so either
//! view is a projection of the same data with no further pitch arithmetic.

use serde::{Deserialize, Serialize};

use super::instruments::Clef;
use super::spelling::Spelling;
use crate::analysis::result::Key;
use crate::features::rhythm::{TimeSignature, Tie};

/// Which pitch view to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchView {
    /// Sounding pitch
    Concert,
    /// Pitch as written for the instrument
    Written,
}

/// A pitch in one view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPitch {
    /// Pitch number (written pitches may fall outside 0..=127)
    pub midi: i32,
    /// Spelled pitch
    pub spelling: Spelling,
}

/// A note inside a measure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    /// Absolute start tick
    pub start_tick: u32,
    /// Duration in ticks
    pub duration_ticks: u32,
    /// Sounding pitch
    pub concert: ViewPitch,
    /// Written pitch
    pub written: ViewPitch,
    /// Barline tie state
    pub tie: Tie,
    /// Segment confidence (0.0-1.0)
    pub confidence: f32,
    /// Outside the instrument's sounding range
    pub out_of_range: bool,
}

impl NoteEntry {
    /// Pitch for a view
    pub fn pitch(&self, view: PitchView) -> &ViewPitch {
        match view {
            PitchView::Concert => &self.concert,
            PitchView::Written => &self.written,
        }
    }
}

/// Measure content
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MeasureEvent {
    /// Sounding note
    Note(NoteEntry),
    /// Rest
    Rest {
        /// Absolute start tick
        start_tick: u32,
        /// Duration in ticks
        duration_ticks: u32,
    },
}

impl MeasureEvent {
    /// Absolute start tick
    pub fn start_tick(&self) -> u32 {
        match self {
            MeasureEvent::Note(n) => n.start_tick,
            MeasureEvent::Rest { start_tick, .. } => *start_tick,
        }
    }

    /// Duration in ticks
    pub fn duration_ticks(&self) -> u32 {
        match self {
            MeasureEvent::Note(n) => n.duration_ticks,
            MeasureEvent::Rest { duration_ticks, .. } => *duration_ticks,
        }
    }

    /// First tick after the event
    pub fn end_tick(&self) -> u32 {
        self.start_tick() + self.duration_ticks()
    }

    /// The note, if any
    pub fn as_note(&self) -> Option<&NoteEntry> {
        match self {
            MeasureEvent::Note(n) => Some(n),
            MeasureEvent::Rest { .. } => None,
        }
    }
}

/// One measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Zero-based measure number
    pub index: u32,
    /// Absolute tick of the downbeat
    pub start_tick: u32,
    /// Events in order; durations sum to the measure capacity
    pub events: Vec<MeasureEvent>,
}

impl Measure {
    /// Notes in this measure
    pub fn notes(&self) -> impl Iterator<Item = &NoteEntry> {
        self.events.iter().filter_map(MeasureEvent::as_note)
    }

    /// Sum of event durations
    pub fn filled_ticks(&self) -> u32 {
        self.events.iter().map(MeasureEvent::duration_ticks).sum()
    }
}

/// Complete note model for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteModel {
    /// Instrument catalog id
    pub instrument_id: String,
    /// Tempo, quarter notes per minute
    pub tempo_bpm: u32,
    /// Time signature
    pub time_signature: TimeSignature,
    /// Key of the sounding pitches
    pub concert_key: Key,
    /// Key of the written part
    pub written_key: Key,
    /// Clef for the concert view
    pub concert_clef: Clef,
    /// Clef for the written view
    pub written_clef: Clef,
    /// Whether the instrument's written pitch differs from concert pitch
    pub transposing: bool,
    /// Measures in order
    pub measures: Vec<Measure>,
}

impl NoteModel {
    /// Model without any measures, for runs with no detected notes
    pub fn empty(
        instrument_id: impl Into<String>,
        tempo_bpm: u32,
        time_signature: TimeSignature,
        key: Key,
    ) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            tempo_bpm,
            time_signature,
            concert_key: key,
            written_key: key,
            concert_clef: Clef::Treble,
            written_clef: Clef::Treble,
            transposing: false,
            measures: Vec::new(),
        }
    }

    /// Whether the model holds no measures
    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    /// All notes in order
    pub fn notes(&self) -> impl Iterator<Item = &NoteEntry> {
        self.measures.iter().flat_map(Measure::notes)
    }

    /// Number of notes (tied pieces counted separately)
    pub fn note_count(&self) -> usize {
        self.notes().count()
    }

    /// Borrow the model in one pitch view
    pub fn view(&self, view: PitchView) -> ScoreView<'_> {
        ScoreView { model: self, view }
    }
}

/// Read-only projection of a [`NoteModel`] in one pitch view
#[derive(Debug, Clone, Copy)]
pub struct ScoreView<'a> {
    model: &'a NoteModel,
    view: PitchView,
}

impl<'a> ScoreView<'a> {
    /// The view
    pub fn pitch_view(&self) -> PitchView {
        self.view
    }

    /// True for the written view of a transposing instrument
    pub fn is_transposed_view(&self) -> bool {
        self.view == PitchView::Written && self.model.transposing
    }

    /// Key in this view
    pub fn key(&self) -> Key {
        match self.view {
            PitchView::Concert => self.model.concert_key,
            PitchView::Written => self.model.written_key,
        }
    }

    /// Key signature in this view
    pub fn fifths(&self) -> i8 {
        self.key().fifths()
    }

    /// Clef in this view
    pub fn clef(&self) -> Clef {
        match self.view {
            PitchView::Concert => self.model.concert_clef,
            PitchView::Written => self.model.written_clef,
        }
    }

    /// Measures (pitches read through [`ScoreView::pitch`])
    pub fn measures(&self) -> &'a [Measure] {
        &self.model.measures
    }

    /// Pitch of a note in this view
    pub fn pitch(&self, note: &'a NoteEntry) -> &'a ViewPitch {
        note.pitch(self.view)
    }

    /// Pitches of all notes in order
    pub fn pitches(&self) -> impl Iterator<Item = &'a ViewPitch> + 'a {
        let view = self.view;
        self.model.notes().map(move |n| n.pitch(view))
    }
}
