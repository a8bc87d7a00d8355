//! Rhythm quantization with drift correction
//!
//! Converts note segments (seconds) into a contiguous stream of notes and
//! rests on the tick grid.
//!
//! # Algorithm
//!
//! 1. Build the raw event stream: leading rest, note, gap rest, note, ...
//!    with lengths converted to ticks at the given tempo
//! 2. For each event, add the running carry to its raw length and snap to
//!    the nearest grid multiple (midpoints go shorter)
//! 3. Carry `raw + carry - quantized` into the next event, so cumulative
//!    error stays within one grid unit instead of compounding
//! 4. A note that snaps to zero is held for one grid unit while the timeline
//!    has not yet passed its end (`raw + carry > 0`); otherwise it lies
//!    entirely inside time already written out and merges into the previous
//!    event. Rests that snap to zero vanish. Either way the length stays in
//!    the carry, which therefore never drops below minus one unit
//! 5. A note crossing a barline is truncated at the barline and continues
//!    as a tied note at the start of the next measure; the measure is
//!    reported as overfilled

use serde::{Deserialize, Serialize};

use super::grid::{DurationGrid, TimeSignature, TICKS_PER_BEAT};
use crate::config::TranscriptionConfig;
use crate::error::{Result, TranscriptionError, TranscriptionWarning};
use crate::features::segmentation::NoteSegment;
use crate::notation::pitch::hz_to_midi_note;

/// Tie state of a note piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tie {
    /// Continues a note from the previous measure
    pub from_previous: bool,
    /// Continues into the next measure
    pub to_next: bool,
}

/// A note on the tick grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantizedNote {
    /// Absolute start tick
    pub start_tick: u32,
    /// Duration in ticks (positive multiple of the grid unit)
    pub duration_ticks: u32,
    /// Concert MIDI note number
    pub midi: u8,
    /// Segment confidence (0.0-1.0)
    pub confidence: f32,
    /// Tie state when the note was split at a barline
    pub tie: Tie,
}

/// A rest on the tick grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rest {
    /// Absolute start tick
    pub start_tick: u32,
    /// Duration in ticks
    pub duration_ticks: u32,
}

/// Quantizer output element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum QuantizedEvent {
    /// Sounding note
    Note(QuantizedNote),
    /// Silence
    Rest(Rest),
}

impl QuantizedEvent {
    /// Absolute start tick
    pub fn start_tick(&self) -> u32 {
        match self {
            QuantizedEvent::Note(n) => n.start_tick,
            QuantizedEvent::Rest(r) => r.start_tick,
        }
    }

    /// Duration in ticks
    pub fn duration_ticks(&self) -> u32 {
        match self {
            QuantizedEvent::Note(n) => n.duration_ticks,
            QuantizedEvent::Rest(r) => r.duration_ticks,
        }
    }

    /// First tick after the event
    pub fn end_tick(&self) -> u32 {
        self.start_tick() + self.duration_ticks()
    }

    /// The note, if this event is one
    pub fn as_note(&self) -> Option<&QuantizedNote> {
        match self {
            QuantizedEvent::Note(n) => Some(n),
            QuantizedEvent::Rest(_) => None,
        }
    }
}

/// Quantized event stream plus drift diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizationResult {
    /// Contiguous events starting at tick 0; none crosses a barline
    pub events: Vec<QuantizedEvent>,
    /// Zero-based indices of measures whose crossing note was truncated
    pub overfilled_measures: Vec<u32>,
    /// Tempo used, quarter notes per minute
    pub tempo_bpm: u32,
    /// Time signature used
    pub time_signature: TimeSignature,
    /// Grid unit in ticks
    pub grid_unit_ticks: u32,
    /// Final carry: total raw ticks minus total quantized ticks
    pub residual_ticks: f64,
}

impl QuantizationResult {
    /// Notes only, in order
    pub fn notes(&self) -> impl Iterator<Item = &QuantizedNote> {
        self.events.iter().filter_map(QuantizedEvent::as_note)
    }

    /// First tick after the last event
    pub fn total_ticks(&self) -> u32 {
        self.events.last().map(QuantizedEvent::end_tick).unwrap_or(0)
    }

    /// Overfilled measures as advisory warnings
    pub fn warnings(&self) -> Vec<TranscriptionWarning> {
        self.overfilled_measures
            .iter()
            .map(|&measure| TranscriptionWarning::OverfilledMeasure { measure })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum RawEvent {
    Note { ticks: f64, midi: u8, confidence: f32 },
    Rest { ticks: f64 },
}

/// Rhythm quantizer
#[derive(Debug, Clone)]
pub struct RhythmQuantizer {
    grid: DurationGrid,
}

impl RhythmQuantizer {
    /// Quantizer on a `1/grid_division` note grid
    pub fn new(grid_division: u32) -> Result<Self> {
        Ok(Self {
            grid: DurationGrid::new(grid_division)?,
        })
    }

    /// Quantizer using `config.grid_division`
    pub fn from_config(config: &TranscriptionConfig) -> Result<Self> {
        Self::new(config.grid_division)
    }

    /// The duration grid in use
    pub fn grid(&self) -> DurationGrid {
        self.grid
    }

    /// Quantize segments at `tempo_bpm` (quarter notes per minute)
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a zero tempo or an invalid time signature.
    pub fn quantize(
        &self,
        segments: &[NoteSegment],
        tempo_bpm: u32,
        time_signature: TimeSignature,
    ) -> Result<QuantizationResult> {
        if tempo_bpm == 0 {
            return Err(TranscriptionError::InvalidInput(
                "Tempo must be > 0 BPM".to_string(),
            ));
        }
        time_signature.validate()?;

        let ticks_per_second = tempo_bpm as f64 * TICKS_PER_BEAT as f64 / 60.0;
        let measure_ticks = time_signature.measure_ticks();
        let unit = self.grid.unit_ticks();

        log::debug!(
            "Quantizing {} segments: {} BPM, {}, grid unit {} ticks",
            segments.len(),
            tempo_bpm,
            time_signature.name(),
            unit
        );

        let raw = raw_events(segments, ticks_per_second);

        let mut events = Vec::with_capacity(raw.len() + 4);
        let mut overfilled: Vec<u32> = Vec::new();
        let mut carry = 0.0f64;
        let mut position: u32 = 0;
        let mut merged = 0usize;

        for event in raw {
            let (raw_ticks, is_note) = match event {
                RawEvent::Note { ticks, .. } => (ticks, true),
                RawEvent::Rest { ticks } => (ticks, false),
            };
            let target = raw_ticks + carry;
            let mut quantized = self.grid.snap(target);
            if is_note && quantized == 0 {
                if target > 0.0 {
                    quantized = unit;
                } else {
                    merged += 1;
                }
            }
            carry = target - quantized as f64;
            if quantized == 0 {
                continue;
            }

            let mut remaining = quantized;
            let mut first_piece = true;
            while remaining > 0 {
                let space = measure_ticks - position % measure_ticks;
                let piece = remaining.min(space);
                let crosses = remaining > space;

                match event {
                    RawEvent::Note { midi, confidence, .. } => {
                        if crosses {
                            let measure = position / measure_ticks;
                            log::warn!(
                                "Measure {} overfilled by {} ticks; tying note {} into measure {}",
                                measure,
                                remaining - space,
                                midi,
                                measure + 1
                            );
                            if overfilled.last() != Some(&measure) {
                                overfilled.push(measure);
                            }
                        }
                        events.push(QuantizedEvent::Note(QuantizedNote {
                            start_tick: position,
                            duration_ticks: piece,
                            midi,
                            confidence,
                            tie: Tie {
                                from_previous: !first_piece,
                                to_next: crosses,
                            },
                        }));
                    }
                    RawEvent::Rest { .. } => {
                        events.push(QuantizedEvent::Rest(Rest {
                            start_tick: position,
                            duration_ticks: piece,
                        }));
                    }
                }

                position += piece;
                remaining -= piece;
                first_piece = false;
            }
        }

        if merged > 0 {
            log::debug!(
                "Merged {} sub-unit notes into the preceding event to bound drift",
                merged
            );
        }
        log::debug!(
            "Quantized into {} events over {} ticks, residual {:.2} ticks, {} overfilled measures",
            events.len(),
            position,
            carry,
            overfilled.len()
        );

        Ok(QuantizationResult {
            events,
            overfilled_measures: overfilled,
            tempo_bpm,
            time_signature,
            grid_unit_ticks: unit,
            residual_ticks: carry,
        })
    }
}

/// Leading rest, notes and gap rests in raw ticks
fn raw_events(segments: &[NoteSegment], ticks_per_second: f64) -> Vec<RawEvent> {
    let mut raw = Vec::with_capacity(segments.len() * 2);
    let mut cursor = 0.0f64;

    for segment in segments {
        let onset = segment.onset.max(cursor);
        if onset > cursor {
            raw.push(RawEvent::Rest {
                ticks: (onset - cursor) * ticks_per_second,
            });
        }
        let offset = segment.offset.max(onset);
        raw.push(RawEvent::Note {
            ticks: (offset - onset) * ticks_per_second,
            midi: hz_to_midi_note(segment.pitch_hz),
            confidence: segment.confidence_mean,
        });
        cursor = offset;
    }
    raw
}
