//! Note model construction
//!
//! Partitions the quantized event stream into measures, spells every note in
//! both views, flags notes outside the instrument's range and checks the
//! structural invariants of the result before handing it out.

use super::instruments::InstrumentProfile;
use super::model::{Measure, MeasureEvent, NoteEntry, NoteModel, ViewPitch};
use super::transposition::TranspositionEngine;
use crate::analysis::result::Key;
use crate::error::{Result, TranscriptionError, TranscriptionWarning};
use crate::features::rhythm::{QuantizationResult, QuantizedEvent, TimeSignature};

/// Builds [`NoteModel`]s for one instrument
#[derive(Debug, Clone)]
pub struct NoteModelBuilder<'a> {
    profile: &'a InstrumentProfile,
    engine: TranspositionEngine,
}

impl<'a> NoteModelBuilder<'a> {
    /// Builder for an instrument profile
    pub fn new(profile: &'a InstrumentProfile) -> Self {
        Self {
            profile,
            engine: TranspositionEngine::new(profile),
        }
    }

    /// Build from a quantization result
    ///
    /// Returns the model and any range warnings.
    pub fn build(
        &self,
        quantized: &QuantizationResult,
        key: Key,
    ) -> Result<(NoteModel, Vec<TranscriptionWarning>)> {
        self.build_from_events(
            &quantized.events,
            key,
            quantized.time_signature,
            quantized.tempo_bpm,
        )
    }

    /// Build from a raw event stream
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when the events overlap, leave gaps, run out of
    /// order or cross a barline.
    pub fn build_from_events(
        &self,
        events: &[QuantizedEvent],
        key: Key,
        time_signature: TimeSignature,
        tempo_bpm: u32,
    ) -> Result<(NoteModel, Vec<TranscriptionWarning>)> {
        time_signature.validate()?;
        let capacity = time_signature.measure_ticks();
        let mut warnings = Vec::new();
        let mut measures: Vec<Measure> = Vec::new();

        log::debug!(
            "Building note model: {} events, {} in {}, instrument {}",
            events.len(),
            time_signature.name(),
            key.name(),
            self.profile.id
        );

        for event in events {
            let index = event.start_tick() / capacity;
            while measures.len() as u32 <= index {
                let next = measures.len() as u32;
                measures.push(Measure {
                    index: next,
                    start_tick: next * capacity,
                    events: Vec::new(),
                });
            }

            let entry = match event {
                QuantizedEvent::Note(note) => {
                    let out_of_range = !self.profile.in_range(note.midi);
                    if out_of_range {
                        log::warn!(
                            "Note {} at measure {} is outside the {} range ({}..={})",
                            note.midi,
                            index,
                            self.profile.name,
                            self.profile.range_low,
                            self.profile.range_high
                        );
                        warnings.push(TranscriptionWarning::InstrumentRangeExceeded {
                            measure: index,
                            start_tick: note.start_tick,
                            midi: note.midi,
                        });
                    }
                    let concert = note.midi as i32;
                    MeasureEvent::Note(NoteEntry {
                        start_tick: note.start_tick,
                        duration_ticks: note.duration_ticks,
                        concert: ViewPitch {
                            midi: concert,
                            spelling: self.engine.spell_concert(concert, key),
                        },
                        written: ViewPitch {
                            midi: self.engine.to_written(concert),
                            spelling: self.engine.spell_written(concert, key),
                        },
                        tie: note.tie,
                        confidence: note.confidence,
                        out_of_range,
                    })
                }
                QuantizedEvent::Rest(rest) => MeasureEvent::Rest {
                    start_tick: rest.start_tick,
                    duration_ticks: rest.duration_ticks,
                },
            };
            measures[index as usize].events.push(entry);
        }

        if let Some(last) = measures.last_mut() {
            let end = last.events.last().map(MeasureEvent::end_tick).unwrap_or(last.start_tick);
            let measure_end = last.start_tick + capacity;
            if end < measure_end {
                last.events.push(MeasureEvent::Rest {
                    start_tick: end,
                    duration_ticks: measure_end - end,
                });
            }
        }

        verify_measures(&measures, capacity)?;

        let (concert_clef, written_clef) = match average_pitch(events) {
            Some(avg) => (
                self.profile.preferred_clef(Some(avg)),
                self.profile
                    .preferred_clef(Some(avg + self.engine.written_offset() as f32)),
            ),
            None => (
                self.profile.preferred_clef(None),
                self.profile.preferred_clef(None),
            ),
        };

        let model = NoteModel {
            instrument_id: self.profile.id.clone(),
            tempo_bpm,
            time_signature,
            concert_key: key,
            written_key: self.engine.written_key(key),
            concert_clef,
            written_clef,
            transposing: self.engine.is_transposing(),
            measures,
        };

        log::debug!(
            "Built {} measures with {} notes ({} range warnings)",
            model.measures.len(),
            model.note_count(),
            warnings.len()
        );

        Ok((model, warnings))
    }
}

/// Duration-weighted mean concert pitch of the notes
fn average_pitch(events: &[QuantizedEvent]) -> Option<f32> {
    let (sum, weight) = events
        .iter()
        .filter_map(QuantizedEvent::as_note)
        .fold((0.0f64, 0.0f64), |(sum, weight), n| {
            let w = n.duration_ticks as f64;
            (sum + n.midi as f64 * w, weight + w)
        });
    if weight > 0.0 {
        Some((sum / weight) as f32)
    } else {
        None
    }
}

fn violation(message: String) -> TranscriptionError {
    TranscriptionError::InvariantViolation(message)
}

/// Check ordering, contiguity, barline containment and measure fill
fn verify_measures(measures: &[Measure], capacity: u32) -> Result<()> {
    let mut expected_start = 0u32;
    for (i, measure) in measures.iter().enumerate() {
        if measure.index != i as u32 || measure.start_tick != i as u32 * capacity {
            return Err(violation(format!(
                "Measure {} has index {} and start tick {}",
                i, measure.index, measure.start_tick
            )));
        }
        let measure_end = measure.start_tick + capacity;
        for event in &measure.events {
            if event.duration_ticks() == 0 {
                return Err(violation(format!(
                    "Zero-length event at tick {}",
                    event.start_tick()
                )));
            }
            if event.start_tick() != expected_start {
                return Err(violation(format!(
                    "Event at tick {} in measure {}, expected tick {}",
                    event.start_tick(),
                    i,
                    expected_start
                )));
            }
            if event.start_tick() < measure.start_tick || event.end_tick() > measure_end {
                return Err(violation(format!(
                    "Event {}..{} crosses the boundary of measure {}",
                    event.start_tick(),
                    event.end_tick(),
                    i
                )));
            }
            expected_start = event.end_tick();
        }
        if measure.filled_ticks() != capacity {
            return Err(violation(format!(
                "Measure {} holds {} ticks, capacity is {}",
                i,
                measure.filled_ticks(),
                capacity
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::rhythm::{QuantizedNote, Rest, Tie};
    use crate::notation::instruments::instrument;
    use crate::notation::model::PitchView;

    fn note(start: u32, duration: u32, midi: u8) -> QuantizedEvent {
        QuantizedEvent::Note(QuantizedNote {
            start_tick: start,
            duration_ticks: duration,
            midi,
            confidence: 0.8,
            tie: Tie::default(),
        })
    }

    fn rest(start: u32, duration: u32) -> QuantizedEvent {
        QuantizedEvent::Rest(Rest {
            start_tick: start,
            duration_ticks: duration,
        })
    }

    #[test]
    fn test_partitions_and_pads_last_measure() {
        let builder = NoteModelBuilder::new(instrument("flute").unwrap());
        let events = [note(0, 960, 72), note(960, 960, 74), note(1920, 480, 76)];
        let (model, warnings) = builder
            .build_from_events(&events, Key::Major(0), TimeSignature::FOUR_FOUR, 120)
            .unwrap();

        assert!(warnings.is_empty());
        assert_eq!(model.measures.len(), 2);
        assert_eq!(model.measures[0].events.len(), 2);
        let last = &model.measures[1];
        assert_eq!(last.filled_ticks(), 1920);
        assert_eq!(
            last.events.last(),
            Some(&MeasureEvent::Rest {
                start_tick: 2400,
                duration_ticks: 1440
            })
        );
    }

    #[test]
    fn test_both_views_are_spelled() {
        let builder = NoteModelBuilder::new(instrument("horn_f").unwrap());
        let events = [note(0, 1920, 69)];
        let (model, _) = builder
            .build_from_events(&events, Key::Major(0), TimeSignature::FOUR_FOUR, 90)
            .unwrap();

        let entry = model.notes().next().unwrap();
        assert_eq!(entry.concert.spelling.to_string(), "A4");
        assert_eq!(entry.written.midi, 76);
        assert_eq!(entry.written.spelling.to_string(), "E5");
        assert_eq!(model.written_key, Key::Major(7));

        let written = model.view(PitchView::Written);
        assert!(written.is_transposed_view());
        assert_eq!(written.fifths(), 1);
        assert!(!model.view(PitchView::Concert).is_transposed_view());
    }

    #[test]
    fn test_out_of_range_notes_are_flagged_not_rejected() {
        let builder = NoteModelBuilder::new(instrument("violin").unwrap());
        let events = [note(0, 960, 50), note(960, 960, 67)];
        let (model, warnings) = builder
            .build_from_events(&events, Key::Major(0), TimeSignature::FOUR_FOUR, 120)
            .unwrap();

        assert_eq!(model.note_count(), 2);
        assert_eq!(
            warnings,
            vec![TranscriptionWarning::InstrumentRangeExceeded {
                measure: 0,
                start_tick: 0,
                midi: 50
            }]
        );
        assert!(model.notes().next().unwrap().out_of_range);
    }

    #[test]
    fn test_overlapping_events_are_an_invariant_violation() {
        let builder = NoteModelBuilder::new(instrument("flute").unwrap());
        let events = [note(0, 960, 72), note(480, 960, 74)];
        let result =
            builder.build_from_events(&events, Key::Major(0), TimeSignature::FOUR_FOUR, 120);
        assert!(matches!(result, Err(TranscriptionError::InvariantViolation(_))));
    }

    #[test]
    fn test_barline_crossing_event_is_an_invariant_violation() {
        let builder = NoteModelBuilder::new(instrument("flute").unwrap());
        let events = [rest(0, 1440), note(1440, 960, 72)];
        let result =
            builder.build_from_events(&events, Key::Major(0), TimeSignature::FOUR_FOUR, 120);
        assert!(matches!(result, Err(TranscriptionError::InvariantViolation(_))));
    }

    #[test]
    fn test_gap_is_an_invariant_violation() {
        let builder = NoteModelBuilder::new(instrument("flute").unwrap());
        let events = [note(0, 480, 72), note(960, 480, 74)];
        let result =
            builder.build_from_events(&events, Key::Major(0), TimeSignature::FOUR_FOUR, 120);
        assert!(matches!(result, Err(TranscriptionError::InvariantViolation(_))));
    }

    #[test]
    fn test_no_events_give_an_empty_model() {
        let builder = NoteModelBuilder::new(instrument("flute").unwrap());
        let (model, warnings) = builder
            .build_from_events(&[], Key::Major(0), TimeSignature::THREE_FOUR, 100)
            .unwrap();
        assert!(model.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_clef_follows_register() {
        let builder = NoteModelBuilder::new(instrument("cello").unwrap());
        let (low, _) = builder
            .build_from_events(&[note(0, 1920, 43)], Key::Major(0), TimeSignature::FOUR_FOUR, 60)
            .unwrap();
        assert_eq!(low.concert_clef, crate::notation::instruments::Clef::Bass);
        let (high, _) = builder
            .build_from_events(&[note(0, 1920, 76)], Key::Major(0), TimeSignature::FOUR_FOUR, 60)
            .unwrap();
        assert_eq!(high.concert_clef, crate::notation::instruments::Clef::Treble);
    }
}
