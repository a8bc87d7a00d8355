//! Krumhansl-Kessler key templates
//!
//! Tonal profiles for 24 keys (12 major + 12 minor). The C major and C minor
//! probe-tone ratings are rotated to every tonic.

/// Krumhansl-Kessler C major profile (C, C#, D, ..., B)
pub const KK_MAJOR: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Kessler C minor profile (C, C#, D, ..., B)
pub const KK_MINOR: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Key templates for all 24 keys
#[derive(Debug, Clone)]
pub struct KeyTemplates {
    /// Major key templates indexed by tonic pitch class
    pub major: [[f32; 12]; 12],

    /// Minor key templates indexed by tonic pitch class
    pub minor: [[f32; 12]; 12],
}

impl KeyTemplates {
    /// Create templates with Krumhansl-Kessler profiles
    pub fn new() -> Self {
        let mut major = [[0.0f32; 12]; 12];
        let mut minor = [[0.0f32; 12]; 12];
        for tonic in 0..12 {
            major[tonic] = rotate(&KK_MAJOR, tonic);
            minor[tonic] = rotate(&KK_MINOR, tonic);
        }
        Self { major, minor }
    }

    /// Template for a major key (0 = C, ..., 11 = B)
    pub fn get_major_template(&self, tonic: u32) -> &[f32; 12] {
        &self.major[tonic as usize % 12]
    }

    /// Template for a minor key (0 = C, ..., 11 = B)
    pub fn get_minor_template(&self, tonic: u32) -> &[f32; 12] {
        &self.minor[tonic as usize % 12]
    }
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotate a C-based profile so index `tonic` holds the tonic weight
fn rotate(profile: &[f32; 12], tonic: usize) -> [f32; 12] {
    let mut out = [0.0f32; 12];
    for (pc, slot) in out.iter_mut().enumerate() {
        *slot = profile[(pc + 12 - tonic) % 12];
    }
    out
}
