//! Time signature and quantization grid
//!
//! Ticks are counted at [`TICKS_PER_BEAT`] per quarter note. A measure
//! holds `beats_per_measure * (4 / beat_unit)` quarter notes.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TranscriptionError};

/// Ticks per quarter note
pub const TICKS_PER_BEAT: u32 = 480;

/// Ticks in a whole note
pub const TICKS_PER_WHOLE: u32 = TICKS_PER_BEAT * 4;

/// Finest supported grid, as a note-value denominator (1/32 note)
pub const MAX_GRID_DIVISION: u32 = 32;

/// Raw lengths within this many grid units of an exact midpoint count as the
/// midpoint and snap to the shorter value
const MIDPOINT_EPSILON: f64 = 1e-9;

/// Musical time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator: beats per measure
    pub beats_per_measure: u32,
    /// Denominator: note value of one beat (4 = quarter note)
    pub beat_unit: u32,
}

impl TimeSignature {
    /// 4/4 time (common time)
    pub const FOUR_FOUR: TimeSignature = TimeSignature {
        beats_per_measure: 4,
        beat_unit: 4,
    };

    /// 3/4 time (waltz time)
    pub const THREE_FOUR: TimeSignature = TimeSignature {
        beats_per_measure: 3,
        beat_unit: 4,
    };

    /// 6/8 time (compound duple)
    pub const SIX_EIGHT: TimeSignature = TimeSignature {
        beats_per_measure: 6,
        beat_unit: 8,
    };

    /// Create a time signature
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the numerator is 0 or the denominator is not a power
    /// of two up to 32.
    pub fn new(beats_per_measure: u32, beat_unit: u32) -> Result<Self> {
        let ts = Self {
            beats_per_measure,
            beat_unit,
        };
        ts.validate()?;
        Ok(ts)
    }

    /// Check the signature is representable on the tick grid
    pub fn validate(&self) -> Result<()> {
        if self.beats_per_measure == 0 || self.beats_per_measure > 64 {
            return Err(TranscriptionError::InvalidInput(format!(
                "Invalid beats per measure: {}",
                self.beats_per_measure
            )));
        }
        if !self.beat_unit.is_power_of_two() || self.beat_unit > MAX_GRID_DIVISION {
            return Err(TranscriptionError::InvalidInput(format!(
                "Invalid beat unit: {}",
                self.beat_unit
            )));
        }
        Ok(())
    }

    /// Tick capacity of one measure
    pub fn measure_ticks(&self) -> u32 {
        self.beats_per_measure * (TICKS_PER_WHOLE / self.beat_unit)
    }

    /// Name as string (e.g., "4/4", "6/8")
    pub fn name(&self) -> String {
        format!("{}/{}", self.beats_per_measure, self.beat_unit)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::FOUR_FOUR
    }
}

/// Allowed durations: positive multiples of one grid unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationGrid {
    unit_ticks: u32,
}

impl DurationGrid {
    /// Grid whose unit is a `1/division` note (`division` a power of two ≤ 32)
    pub fn new(division: u32) -> Result<Self> {
        if !division.is_power_of_two() || division > MAX_GRID_DIVISION {
            return Err(TranscriptionError::InvalidInput(format!(
                "Grid division must be a power of two up to {}, got {}",
                MAX_GRID_DIVISION, division
            )));
        }
        Ok(Self {
            unit_ticks: TICKS_PER_WHOLE / division,
        })
    }

    /// Length of one grid unit in ticks
    pub fn unit_ticks(&self) -> u32 {
        self.unit_ticks
    }

    /// Snap a raw tick length to the nearest grid multiple
    ///
    /// Exact midpoints round toward the shorter value so systematic
    /// lengthening cannot build up. Non-positive input snaps to 0.
    pub fn snap(&self, raw_ticks: f64) -> u32 {
        if !(raw_ticks > 0.0) {
            return 0;
        }
        let units = raw_ticks / self.unit_ticks as f64;
        let lower = units.floor();
        let n = if units - lower > 0.5 + MIDPOINT_EPSILON {
            lower + 1.0
        } else {
            lower
        };
        (n as u32).saturating_mul(self.unit_ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_ticks() {
        assert_eq!(TimeSignature::FOUR_FOUR.measure_ticks(), 1920);
        assert_eq!(TimeSignature::THREE_FOUR.measure_ticks(), 1440);
        assert_eq!(TimeSignature::SIX_EIGHT.measure_ticks(), 1440);
        assert_eq!(TimeSignature::new(5, 16).unwrap().measure_ticks(), 600);
    }

    #[test]
    fn test_invalid_time_signatures() {
        assert!(TimeSignature::new(0, 4).is_err());
        assert!(TimeSignature::new(4, 3).is_err());
        assert!(TimeSignature::new(4, 64).is_err());
    }

    #[test]
    fn test_grid_units() {
        assert_eq!(DurationGrid::new(32).unwrap().unit_ticks(), 60);
        assert_eq!(DurationGrid::new(16).unwrap().unit_ticks(), 120);
        assert_eq!(DurationGrid::new(1).unwrap().unit_ticks(), 1920);
        assert!(DurationGrid::new(24).is_err());
        assert!(DurationGrid::new(64).is_err());
    }

    #[test]
    fn test_snap_nearest_and_midpoint_goes_shorter() {
        let grid = DurationGrid::new(16).unwrap();
        assert_eq!(grid.snap(249.6), 240);
        assert_eq!(grid.snap(181.0), 240);
        assert_eq!(grid.snap(180.0), 120);
        assert_eq!(grid.snap(59.9), 0);
        assert_eq!(grid.snap(60.0), 0);
        assert_eq!(grid.snap(-10.0), 0);
    }
}
