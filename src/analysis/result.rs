//! Transcription result types

use serde::{Deserialize, Serialize};

use super::confidence::TranscriptionConfidence;
use super::metadata::TranscriptionMetadata;
use crate::error::{TranscriptionError, TranscriptionWarning};
use crate::notation::model::NoteModel;
use crate::notation::spelling::spell_pitch_class;

/// Key signature (circle-of-fifths count) of each major tonic, C..B
const MAJOR_FIFTHS: [i8; 12] = [0, -5, 2, -3, 4, -1, 6, 1, -4, 3, -2, 5];

/// Musical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Major key (0 = C, 1 = C#/Db, ..., 11 = B)
    Major(u32),
    /// Minor key (0 = C, 1 = C#/Db, ..., 11 = B)
    Minor(u32),
}

impl Key {
    /// Tonic pitch class (0-11)
    pub fn tonic(&self) -> u32 {
        match self {
            Key::Major(i) | Key::Minor(i) => *i % 12,
        }
    }

    /// Whether the key is minor
    pub fn is_minor(&self) -> bool {
        matches!(self, Key::Minor(_))
    }

    /// Key signature as a circle-of-fifths count (-7..=7, negative = flats)
    ///
    /// Minor keys share the signature of their relative major.
    ///
    /// # Example
    ///
    /// ```
    /// use melody_transcriber::analysis::result::Key;
    ///
    /// assert_eq!(Key::Major(7).fifths(), 1);   // G major
    /// assert_eq!(Key::Minor(9).fifths(), 0);   // A minor
    /// assert_eq!(Key::Minor(2).fifths(), -1);  // D minor
    /// ```
    pub fn fifths(&self) -> i8 {
        match self {
            Key::Major(i) => MAJOR_FIFTHS[*i as usize % 12],
            Key::Minor(i) => MAJOR_FIFTHS[(*i as usize + 3) % 12],
        }
    }

    /// The same mode with the tonic moved by `semitones`
    pub fn transpose(&self, semitones: i32) -> Key {
        let tonic = (self.tonic() as i32 + semitones).rem_euclid(12) as u32;
        match self {
            Key::Major(_) => Key::Major(tonic),
            Key::Minor(_) => Key::Minor(tonic),
        }
    }

    /// Tonic spelled for the key's own signature ("F#", "Bb")
    pub fn tonic_name(&self) -> String {
        let (letter, alter) = spell_pitch_class(self.tonic() as u8, self.fifths());
        match alter {
            1 => format!("{}#", letter),
            -1 => format!("{}b", letter),
            _ => letter.to_string(),
        }
    }

    /// Short key name (e.g., "C", "Am", "F#", "Bb", "C#m")
    ///
    /// # Example
    ///
    /// ```
    /// use melody_transcriber::analysis::result::Key;
    ///
    /// assert_eq!(Key::Major(0).name(), "C");
    /// assert_eq!(Key::Major(6).name(), "F#");
    /// assert_eq!(Key::Major(10).name(), "Bb");
    /// assert_eq!(Key::Minor(9).name(), "Am");
    /// assert_eq!(Key::Minor(1).name(), "C#m");
    /// ```
    pub fn name(&self) -> String {
        match self {
            Key::Major(_) => self.tonic_name(),
            Key::Minor(_) => format!("{}m", self.tonic_name()),
        }
    }

    /// Long key name (e.g., "C major", "A minor")
    pub fn long_name(&self) -> String {
        match self {
            Key::Major(_) => format!("{} major", self.tonic_name()),
            Key::Minor(_) => format!("{} minor", self.tonic_name()),
        }
    }

    /// Parse a key name
    ///
    /// Accepts short ("Am", "F#", "Bbm") and long ("A minor", "Eb major")
    /// forms; `#`/`♯`/`b`/`♭` accidentals; case-insensitive mode words.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for anything else.
    pub fn parse(text: &str) -> Result<Key, TranscriptionError> {
        let invalid = || TranscriptionError::InvalidInput(format!("Invalid key name: {:?}", text));
        let text = text.trim();
        let mut chars = text.chars();
        let letter = chars.next().ok_or_else(invalid)?;
        let mut pc: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(invalid()),
        };

        let mut rest = chars.as_str();
        loop {
            if let Some(r) = rest.strip_prefix('#').or_else(|| rest.strip_prefix('♯')) {
                pc += 1;
                rest = r;
            } else if let Some(r) = rest.strip_prefix('b').or_else(|| rest.strip_prefix('♭')) {
                pc -= 1;
                rest = r;
            } else {
                break;
            }
        }
        let tonic = pc.rem_euclid(12) as u32;

        match rest.trim().to_ascii_lowercase().as_str() {
            "" | "maj" | "major" => Ok(Key::Major(tonic)),
            "m" | "min" | "minor" => Ok(Key::Minor(tonic)),
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.long_name())
    }
}

/// Where a key estimate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeySource {
    /// Template correlation over the quantized notes
    Detected,
    /// Caller-supplied override
    Manual,
}

/// Key estimate for one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyEstimate {
    /// Estimated (or overridden) key
    pub key: Key,

    /// Pearson correlation of the winning template (-1.0-1.0)
    ///
    /// 1.0 for manual overrides; 0.0 when there were no notes.
    pub correlation_score: f32,

    /// Key clarity (0.0-1.0)
    ///
    /// Normalized gap between the best and second-best template:
    /// - High (>0.3): one key clearly dominates
    /// - Low (<0.1): several keys fit about equally well
    pub clarity: f32,

    /// Detected or manual
    pub source: KeySource,
}

impl KeyEstimate {
    /// Manual override: replaces detection entirely
    pub fn manual(key: Key) -> Self {
        Self {
            key,
            correlation_score: 1.0,
            clarity: 1.0,
            source: KeySource::Manual,
        }
    }
}

/// Analysis flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisFlag {
    /// Low key clarity (atonal/ambiguous material)
    WeakTonality,
    /// Mean note confidence is low; pitches may be unreliable
    LowPitchConfidence,
    /// Few voiced frames relative to the recording length
    SparseVoicing,
}

/// Complete transcription result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionOutcome {
    /// Measures of spelled notes and rests
    pub model: NoteModel,

    /// Key used for spelling
    pub key: KeyEstimate,

    /// Advisory conditions, in pipeline order
    pub warnings: Vec<TranscriptionWarning>,

    /// Confidence summary
    pub confidence: TranscriptionConfidence,

    /// Run metadata
    pub metadata: TranscriptionMetadata,
}
