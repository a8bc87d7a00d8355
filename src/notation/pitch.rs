//! Pitch unit conversions and note names

use crate::error::{Result, TranscriptionError};

/// Reference pitch for A4 in Hz
pub const A4_HZ: f32 = 440.0;

/// MIDI number of A4
pub const A4_MIDI: f32 = 69.0;

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Continuous MIDI pitch (semitones) for a frequency in Hz
pub fn hz_to_midi(frequency: f32) -> f32 {
    A4_MIDI + 12.0 * (frequency.max(1e-10) / A4_HZ).log2()
}

/// Frequency in Hz for a continuous MIDI pitch
pub fn midi_to_hz(midi: f32) -> f32 {
    A4_HZ * 2.0f32.powf((midi - A4_MIDI) / 12.0)
}

/// Nearest MIDI note number for a frequency, clamped to 0..=127
pub fn hz_to_midi_note(frequency: f32) -> u8 {
    hz_to_midi(frequency).round().clamp(0.0, 127.0) as u8
}

/// Sharp-spelled note name with octave (60 → "C4")
pub fn midi_to_note_name(midi: u8) -> String {
    let octave = (midi as i32 / 12) - 1;
    format!("{}{}", SHARP_NAMES[midi as usize % 12], octave)
}

/// Parse a note name such as `"C4"`, `"F#3"`, `"Bb1"` or `"B♭1"` to MIDI
///
/// # Errors
///
/// Returns `InvalidInput` for unknown letters, missing octaves, or results
/// outside 0..=127.
pub fn parse_note_name(name: &str) -> Result<u8> {
    let invalid = || TranscriptionError::InvalidInput(format!("Invalid note name: {:?}", name));

    let mut chars = name.trim().chars().peekable();
    let letter = chars.next().ok_or_else(invalid)?;
    let base: i32 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(invalid()),
    };

    let mut alter = 0i32;
    while let Some(&c) = chars.peek() {
        match c {
            '#' | '♯' => alter += 1,
            'b' | '♭' => alter -= 1,
            _ => break,
        }
        chars.next();
    }

    let octave: i32 = chars.collect::<String>().parse().map_err(|_| invalid())?;
    let midi = (octave + 1) * 12 + base + alter;
    if !(0..=127).contains(&midi) {
        return Err(invalid());
    }
    Ok(midi as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hz_midi_reference_points() {
        assert!((hz_to_midi(440.0) - 69.0).abs() < 1e-4);
        assert!((hz_to_midi(261.6256) - 60.0).abs() < 1e-3);
        assert!((midi_to_hz(81.0) - 880.0).abs() < 1e-2);
        assert_eq!(hz_to_midi_note(445.0), 69);
    }

    #[test]
    fn test_note_names() {
        assert_eq!(midi_to_note_name(60), "C4");
        assert_eq!(midi_to_note_name(69), "A4");
        assert_eq!(midi_to_note_name(61), "C#4");
        assert_eq!(midi_to_note_name(0), "C-1");
    }

    #[test]
    fn test_parse_note_name() {
        assert_eq!(parse_note_name("C4").unwrap(), 60);
        assert_eq!(parse_note_name("A4").unwrap(), 69);
        assert_eq!(parse_note_name("F#3").unwrap(), 54);
        assert_eq!(parse_note_name("B♭1").unwrap(), 34);
        assert_eq!(parse_note_name("Bb1").unwrap(), 34);
        assert_eq!(parse_note_name("C-1").unwrap(), 0);
        assert!(parse_note_name("H2").is_err());
        assert!(parse_note_name("C").is_err());
        assert_eq!(parse_note_name("G9").unwrap(), 127);
        assert!(parse_note_name("G#9").is_err());
    }
}
