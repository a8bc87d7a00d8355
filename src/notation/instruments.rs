//! Instrument profiles and the built-in catalog
//!
//! The catalog ships as JSON (`data/instruments.json`) and is parsed once per
//! process into a read-only table. Sounding ranges are stored as note names
//! ("B1", "F5") and converted to MIDI numbers on load.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::pitch::parse_note_name;
use crate::error::{Result, TranscriptionError};

static CATALOG: Lazy<Result<InstrumentCatalog>> = Lazy::new(|| {
    InstrumentCatalog::from_json_str(include_str!("data/instruments.json"))
});

/// The process-wide built-in instrument catalog
///
/// Parsed on first access; later calls return the same table.
pub fn catalog() -> Result<&'static InstrumentCatalog> {
    CATALOG.as_ref().map_err(Clone::clone)
}

/// Look up a built-in profile by id
pub fn instrument(id: &str) -> Result<&'static InstrumentProfile> {
    catalog()?
        .get(id)
        .ok_or_else(|| TranscriptionError::UnknownInstrument(id.to_string()))
}

/// Staff clef
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clef {
    /// G clef on the second line
    Treble,
    /// F clef on the fourth line
    Bass,
    /// C clef on the middle line
    Alto,
    /// C clef on the fourth line
    Tenor,
    /// Unpitched percussion clef
    Percussion,
}

impl Clef {
    /// Lowercase name ("treble", "bass", ...)
    pub fn name(&self) -> &'static str {
        match self {
            Clef::Treble => "treble",
            Clef::Bass => "bass",
            Clef::Alto => "alto",
            Clef::Tenor => "tenor",
            Clef::Percussion => "percussion",
        }
    }
}

/// Immutable description of an instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentProfile {
    /// Catalog key, e.g. `"horn_f"`
    pub id: String,
    /// Display name, e.g. `"Horn in F"`
    pub name: String,
    /// Family, e.g. `"Brass"`
    pub family: String,
    /// Sounding interval relative to written pitch, excluding whole octaves
    /// (Horn in F = -7, Clarinet in Bb = -2)
    pub transposition_semitones: i8,
    /// Octaves the part is written above sounding pitch (guitar +1, piccolo -1)
    pub written_octave_shift: i8,
    /// Usable clefs, most common first
    pub clefs: Vec<Clef>,
    /// Lowest sounding MIDI note
    pub range_low: u8,
    /// Highest sounding MIDI note
    pub range_high: u8,
    /// Comfortable sounding range, when known
    pub preferred_range: Option<(u8, u8)>,
    /// General MIDI program number (0-127)
    pub midi_program: u8,
}

impl InstrumentProfile {
    /// Whether written pitch differs from concert pitch
    pub fn is_transposing(&self) -> bool {
        self.transposition_semitones != 0 || self.written_octave_shift != 0
    }

    /// Total written offset in semitones (`written = concert + offset`)
    pub fn written_offset(&self) -> i32 {
        -(self.transposition_semitones as i32) + 12 * self.written_octave_shift as i32
    }

    /// Whether a concert MIDI note lies inside the playable range
    pub fn in_range(&self, midi: u8) -> bool {
        (self.range_low..=self.range_high).contains(&midi)
    }

    /// Clef for a passage with the given average concert pitch
    ///
    /// A single clef always wins. Otherwise treble at or above middle C,
    /// bass below it, then alto (48-66) and tenor (50-63) when only those
    /// are available, else the first listed clef.
    pub fn preferred_clef(&self, average_midi: Option<f32>) -> Clef {
        let first = match self.clefs.first() {
            Some(&clef) => clef,
            None => return Clef::Treble,
        };
        if self.clefs.len() == 1 {
            return first;
        }
        let avg = match average_midi {
            Some(avg) if avg.is_finite() => avg,
            _ => return first,
        };
        let has = |clef: Clef| self.clefs.contains(&clef);

        if has(Clef::Treble) && avg >= 60.0 {
            Clef::Treble
        } else if has(Clef::Bass) && avg < 60.0 {
            Clef::Bass
        } else if has(Clef::Alto) && (48.0..67.0).contains(&avg) {
            Clef::Alto
        } else if has(Clef::Tenor) && (50.0..64.0).contains(&avg) {
            Clef::Tenor
        } else {
            first
        }
    }
}

/// Read-only table of instrument profiles
#[derive(Debug, Clone)]
pub struct InstrumentCatalog {
    profiles: Vec<InstrumentProfile>,
    by_id: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct CatalogFile {
    instruments: Vec<InstrumentEntry>,
}

#[derive(Deserialize)]
struct InstrumentEntry {
    id: String,
    name: String,
    family: String,
    transposition: TranspositionEntry,
    #[serde(default)]
    octave_displacement: i8,
    clefs: Vec<Clef>,
    sounding_range: RangeEntry,
    #[serde(default)]
    preferred_range: Option<RangeEntry>,
    midi_program: u8,
}

#[derive(Deserialize)]
struct TranspositionEntry {
    semitones: i8,
}

#[derive(Deserialize)]
struct RangeEntry {
    lowest: String,
    highest: String,
}

impl RangeEntry {
    fn parse(&self, id: &str) -> Result<(u8, u8)> {
        let low = parse_note_name(&self.lowest).map_err(|e| catalog_error(id, e))?;
        let high = parse_note_name(&self.highest).map_err(|e| catalog_error(id, e))?;
        if low > high {
            return Err(TranscriptionError::Catalog(format!(
                "{}: range {}..{} is inverted",
                id, self.lowest, self.highest
            )));
        }
        Ok((low, high))
    }
}

fn catalog_error(id: &str, err: TranscriptionError) -> TranscriptionError {
    TranscriptionError::Catalog(format!("{}: {}", id, err))
}

impl InstrumentEntry {
    fn into_profile(self) -> Result<InstrumentProfile> {
        let (range_low, range_high) = self.sounding_range.parse(&self.id)?;
        let preferred_range = match &self.preferred_range {
            Some(range) => Some(range.parse(&self.id)?),
            None => None,
        };
        if self.clefs.is_empty() {
            return Err(TranscriptionError::Catalog(format!("{}: no clefs", self.id)));
        }
        if self.midi_program > 127 {
            return Err(TranscriptionError::Catalog(format!(
                "{}: MIDI program {} out of range",
                self.id, self.midi_program
            )));
        }
        if self.transposition.semitones.abs() > 11 || self.octave_displacement.abs() > 3 {
            return Err(TranscriptionError::Catalog(format!(
                "{}: transposition {} / octave shift {} out of range",
                self.id, self.transposition.semitones, self.octave_displacement
            )));
        }
        Ok(InstrumentProfile {
            id: self.id,
            name: self.name,
            family: self.family,
            transposition_semitones: self.transposition.semitones,
            written_octave_shift: self.octave_displacement,
            clefs: self.clefs,
            range_low,
            range_high,
            preferred_range,
            midi_program: self.midi_program,
        })
    }
}

impl InstrumentCatalog {
    /// Parse a catalog from its JSON form
    ///
    /// # Errors
    ///
    /// `Catalog` for malformed JSON, unparseable ranges or duplicate ids.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let profiles = file
            .instruments
            .into_iter()
            .map(InstrumentEntry::into_profile)
            .collect::<Result<Vec<_>>>()?;
        let catalog = Self::from_profiles(profiles)?;
        log::debug!("Loaded instrument catalog with {} profiles", catalog.len());
        Ok(catalog)
    }

    /// Build a catalog from profiles, sorted by family then name
    pub fn from_profiles(mut profiles: Vec<InstrumentProfile>) -> Result<Self> {
        profiles.sort_by(|a, b| (&a.family, &a.name).cmp(&(&b.family, &b.name)));
        let mut by_id = HashMap::with_capacity(profiles.len());
        for (i, profile) in profiles.iter().enumerate() {
            if by_id.insert(profile.id.clone(), i).is_some() {
                return Err(TranscriptionError::Catalog(format!(
                    "Duplicate instrument id: {}",
                    profile.id
                )));
            }
        }
        Ok(Self { profiles, by_id })
    }

    /// Profile by id
    pub fn get(&self, id: &str) -> Option<&InstrumentProfile> {
        self.by_id.get(id).map(|&i| &self.profiles[i])
    }

    /// All profiles, sorted by family then name
    pub fn all(&self) -> &[InstrumentProfile] {
        &self.profiles
    }

    /// Profiles in one family, sorted by name
    pub fn by_family<'a>(&'a self, family: &'a str) -> impl Iterator<Item = &'a InstrumentProfile> {
        self.profiles.iter().filter(move |p| p.family == family)
    }

    /// Distinct family names, sorted
    pub fn families(&self) -> Vec<&str> {
        let mut families: Vec<&str> = self.profiles.iter().map(|p| p.family.as_str()).collect();
        families.dedup();
        families
    }

    /// Number of profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
