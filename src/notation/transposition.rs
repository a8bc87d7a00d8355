//! Concert ↔ written pitch mapping
//!
//! `transposition_semitones` is the interval the instrument sounds relative
//! to its written pitch (Horn in F sounds a fifth below: -7).
//! `written_octave_shift` counts octaves the part is written above sounding
//! pitch (guitar +1, piccolo -1). So:
//!
//! ```text
//! written = concert - transposition_semitones + 12 * written_octave_shift
//! concert = written + transposition_semitones - 12 * written_octave_shift
//! ```
//!
//! Pitches are plain integers here so the mapping is an exact bijection even
//! when a written pitch lands outside the MIDI range.

use super::instruments::InstrumentProfile;
use super::spelling::{spell, Spelling};
use crate::analysis::result::Key;

/// Pitch mapping for one instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranspositionEngine {
    transposition_semitones: i32,
    written_octave_shift: i32,
}

impl TranspositionEngine {
    /// Engine for an instrument profile
    pub fn new(profile: &InstrumentProfile) -> Self {
        Self {
            transposition_semitones: profile.transposition_semitones as i32,
            written_octave_shift: profile.written_octave_shift as i32,
        }
    }

    /// Total written offset (`written = concert + offset`)
    pub fn written_offset(&self) -> i32 {
        12 * self.written_octave_shift - self.transposition_semitones
    }

    /// Whether written and concert pitch differ
    pub fn is_transposing(&self) -> bool {
        self.written_offset() != 0
    }

    /// Written pitch for a concert pitch
    ///
    /// # Example
    ///
    /// ```
    /// use melody_transcriber::notation::instruments::instrument;
    /// use melody_transcriber::notation::transposition::TranspositionEngine;
    ///
    /// let horn = TranspositionEngine::new(instrument("horn_f")?);
    /// assert_eq!(horn.to_written(69), 76); // concert A4 -> written E5
    /// # Ok::<(), melody_transcriber::TranscriptionError>(())
    /// ```
    pub fn to_written(&self, concert: i32) -> i32 {
        concert - self.transposition_semitones + 12 * self.written_octave_shift
    }

    /// Concert pitch for a written pitch
    pub fn to_concert(&self, written: i32) -> i32 {
        written + self.transposition_semitones - 12 * self.written_octave_shift
    }

    /// Key of the written part for a concert key
    pub fn written_key(&self, concert_key: Key) -> Key {
        concert_key.transpose(self.written_offset())
    }

    /// Spell a concert pitch in the concert key
    pub fn spell_concert(&self, concert: i32, concert_key: Key) -> Spelling {
        spell(concert, concert_key.fifths())
    }

    /// Spell the written counterpart of a concert pitch in the written key
    pub fn spell_written(&self, concert: i32, concert_key: Key) -> Spelling {
        spell(self.to_written(concert), self.written_key(concert_key).fifths())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::instruments::{catalog, instrument};

    #[test]
    fn test_horn_in_f_a4_is_written_e5() {
        let horn = TranspositionEngine::new(instrument("horn_f").unwrap());
        assert_eq!(horn.to_written(69), 76);
        assert_eq!(horn.to_concert(76), 69);
        assert_eq!(horn.spell_written(69, Key::Major(0)).to_string(), "E5");
    }

    #[test]
    fn test_bb_clarinet_writes_a_tone_higher() {
        let clarinet = TranspositionEngine::new(instrument("clarinet_bb").unwrap());
        assert_eq!(clarinet.to_written(58), 60);
        // Concert F major is written G major
        assert_eq!(clarinet.written_key(Key::Major(5)), Key::Major(7));
        // Concert Bb4 in F major -> written C5 in G major
        assert_eq!(clarinet.spell_written(70, Key::Major(5)).to_string(), "C5");
        // Concert Eb4 in F major -> written F4
        assert_eq!(clarinet.spell_written(63, Key::Major(5)).to_string(), "F4");
    }

    #[test]
    fn test_octave_shifts() {
        let guitar = TranspositionEngine::new(instrument("classical_guitar").unwrap());
        assert_eq!(guitar.to_written(40), 52);
        let piccolo = TranspositionEngine::new(instrument("piccolo").unwrap());
        assert_eq!(piccolo.to_written(86), 74);
        let tenor_sax = TranspositionEngine::new(instrument("tenor_sax").unwrap());
        assert_eq!(tenor_sax.to_written(58), 72);
    }

    #[test]
    fn test_round_trip_for_every_profile_and_pitch() {
        for profile in catalog().unwrap().all() {
            let engine = TranspositionEngine::new(profile);
            for midi in 0..=127 {
                assert_eq!(
                    engine.to_concert(engine.to_written(midi)),
                    midi,
                    "{} failed for {}",
                    profile.id,
                    midi
                );
            }
        }
    }

    #[test]
    fn test_non_transposing_instrument_is_identity() {
        let violin = TranspositionEngine::new(instrument("violin").unwrap());
        assert!(!violin.is_transposing());
        assert_eq!(violin.written_key(Key::Minor(2)), Key::Minor(2));
        assert_eq!(
            violin.spell_written(66, Key::Major(1)),
            violin.spell_concert(66, Key::Major(1))
        );
        assert_eq!(violin.spell_concert(66, Key::Major(1)).to_string(), "Gb4");
    }
}
