//! Enharmonic spelling from key signatures
//!
//! Every key signature from 7 flats to 7 sharps gets a fixed 12-entry
//! table mapping pitch class to letter + alteration. Pitch classes inside the
//! key's major scale take the scale's own spelling (so C# major spells
//! pitch class 0 as B#). The remaining chromatic pitch classes are sharpened
//! in sharp and natural keys and flattened in flat keys.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Most flats/sharps in a supported key signature
pub const MAX_FIFTHS: i8 = 7;

const LETTERS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];
const LETTER_PCS: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Letters ordered along the line of fifths, starting at F
const FIFTHS_LETTERS: [char; 7] = ['F', 'C', 'G', 'D', 'A', 'E', 'B'];

const SHARP_SPELLINGS: [(char, i8); 12] = [
    ('C', 0), ('C', 1), ('D', 0), ('D', 1), ('E', 0), ('F', 0),
    ('F', 1), ('G', 0), ('G', 1), ('A', 0), ('A', 1), ('B', 0),
];

const FLAT_SPELLINGS: [(char, i8); 12] = [
    ('C', 0), ('D', -1), ('D', 0), ('E', -1), ('E', 0), ('F', 0),
    ('G', -1), ('G', 0), ('A', -1), ('A', 0), ('B', -1), ('B', 0),
];

/// `(letter, alter)` per pitch class, one row per key signature (index = fifths + 7)
static SPELLING_TABLE: Lazy<[[(char, i8); 12]; 15]> = Lazy::new(|| {
    let mut table = [[('C', 0i8); 12]; 15];
    for (row, fifths) in (-MAX_FIFTHS..=MAX_FIFTHS).enumerate() {
        let chromatic = if fifths >= 0 {
            &SHARP_SPELLINGS
        } else {
            &FLAT_SPELLINGS
        };
        table[row] = *chromatic;
        // Major scale of the key: line-of-fifths positions fifths-1 ..= fifths+5
        for position in (fifths as i32 - 1)..=(fifths as i32 + 5) {
            let pc = (7 * position).rem_euclid(12) as usize;
            table[row][pc] = line_of_fifths_spelling(position);
        }
    }
    table
});

/// Spelling of a line-of-fifths position (0 = C, 1 = G, -1 = F, 6 = F#)
fn line_of_fifths_spelling(position: i32) -> (char, i8) {
    let shifted = position + 1;
    let letter = FIFTHS_LETTERS[shifted.rem_euclid(7) as usize];
    let alter = shifted.div_euclid(7) as i8;
    (letter, alter)
}

fn letter_pc(letter: char) -> i32 {
    LETTERS
        .iter()
        .position(|&l| l == letter)
        .map(|i| LETTER_PCS[i])
        .unwrap_or(0)
}

/// A spelled pitch: letter, alteration and octave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spelling {
    /// Note letter, `'A'..='G'`
    pub letter: char,
    /// Alteration in semitones (-1 = flat, +1 = sharp)
    pub alter: i8,
    /// Scientific octave (C4 = middle C)
    pub octave: i32,
}

impl Spelling {
    /// MIDI number the spelling denotes
    pub fn midi(&self) -> i32 {
        (self.octave + 1) * 12 + letter_pc(self.letter) + self.alter as i32
    }

    /// Pitch name without octave ("F#", "Bb", "C")
    pub fn pitch_name(&self) -> String {
        let accidental = match self.alter {
            -2 => "bb",
            -1 => "b",
            1 => "#",
            2 => "x",
            _ => "",
        };
        format!("{}{}", self.letter, accidental)
    }
}

impl std::fmt::Display for Spelling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.pitch_name(), self.octave)
    }
}

/// `(letter, alter)` for a pitch class under a key signature
///
/// `fifths` outside -7..=7 is clamped.
pub fn spell_pitch_class(pc: u8, fifths: i8) -> (char, i8) {
    let row = (fifths.clamp(-MAX_FIFTHS, MAX_FIFTHS) + MAX_FIFTHS) as usize;
    SPELLING_TABLE[row][pc as usize % 12]
}

/// Spell a MIDI pitch under a key signature
///
/// Accepts any integer pitch so written pitches pushed outside 0..=127 by a
/// transposition still spell consistently.
pub fn spell(midi: i32, fifths: i8) -> Spelling {
    let (letter, alter) = spell_pitch_class(midi.rem_euclid(12) as u8, fifths);
    let octave = (midi - letter_pc(letter) - alter as i32).div_euclid(12) - 1;
    Spelling {
        letter,
        alter,
        octave,
    }
}
