//! Key detection algorithm
//!
//! Builds a duration-weighted pitch-class histogram from the quantized notes
//! and correlates it against the 24 Krumhansl-Kessler templates.
//!
//! # Reference
//!
//! Krumhansl, C. L., & Kessler, E. J. (1982). Tracing the Dynamic Changes in Perceived
//! Tonal Organization in a Spatial Representation of Musical Keys. *Psychological Review*,
//! 89(4), 334-368.

use super::{compute_key_clarity, templates::KeyTemplates, KeyDetectionResult};
use crate::analysis::result::{Key, KeyEstimate, KeySource};
use crate::features::rhythm::QuantizedEvent;

/// Histograms whose bins differ by less than this are treated as flat
const FLAT_EPSILON: f32 = 1e-9;

/// Detect the key of a quantized note stream
///
/// Rests are ignored. Each note contributes its duration in ticks to the bin
/// of its pitch class.
///
/// # Example
///
/// ```
/// use melody_transcriber::features::key::detect_key;
/// use melody_transcriber::analysis::result::Key;
///
/// let estimate = detect_key(&[]);
/// assert_eq!(estimate.key, Key::Major(0));
/// assert_eq!(estimate.correlation_score, 0.0);
/// ```
pub fn detect_key(events: &[QuantizedEvent]) -> KeyEstimate {
    detect_key_with_scores(events).estimate
}

/// Like [`detect_key`], also returning all 24 scores
pub fn detect_key_with_scores(events: &[QuantizedEvent]) -> KeyDetectionResult {
    let histogram = pitch_class_histogram(events);
    detect_key_from_histogram_with_scores(&histogram)
}

/// Duration-weighted pitch-class histogram (index 0 = C)
pub fn pitch_class_histogram(events: &[QuantizedEvent]) -> [f32; 12] {
    let mut histogram = [0.0f32; 12];
    for note in events.iter().filter_map(QuantizedEvent::as_note) {
        histogram[(note.midi % 12) as usize] += note.duration_ticks as f32;
    }
    histogram
}

/// Detect the key from a precomputed 12-bin histogram
pub fn detect_key_from_histogram(histogram: &[f32; 12]) -> KeyEstimate {
    detect_key_from_histogram_with_scores(histogram).estimate
}

/// Like [`detect_key_from_histogram`], also returning all 24 scores
pub fn detect_key_from_histogram_with_scores(histogram: &[f32; 12]) -> KeyDetectionResult {
    log::debug!("Detecting key from histogram {:?}", histogram);

    if is_flat(histogram) {
        log::debug!("Flat or empty pitch-class histogram, defaulting to C major");
        return KeyDetectionResult {
            estimate: KeyEstimate {
                key: Key::Major(0),
                correlation_score: 0.0,
                clarity: 0.0,
                source: KeySource::Detected,
            },
            all_scores: Vec::new(),
        };
    }

    let templates = KeyTemplates::new();
    let mut scores: Vec<(Key, f32)> = Vec::with_capacity(24);
    for tonic in 0..12 {
        scores.push((
            Key::Major(tonic),
            pearson(histogram, templates.get_major_template(tonic)),
        ));
    }
    for tonic in 0..12 {
        scores.push((
            Key::Minor(tonic),
            pearson(histogram, templates.get_minor_template(tonic)),
        ));
    }

    // Majors come first in `scores`, lower tonics first within a mode, so a
    // strict comparison keeps the preferred key on ties.
    let mut best = 0;
    for (i, (_, score)) in scores.iter().enumerate().skip(1) {
        if *score > scores[best].1 {
            best = i;
        }
    }
    let (key, correlation_score) = scores[best];

    let mut ranked = scores.clone();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    if let Some(pos) = ranked.iter().position(|(k, _)| *k == key) {
        let winner = ranked.remove(pos);
        ranked.insert(0, winner);
    }
    let clarity = compute_key_clarity(&ranked);

    log::debug!(
        "Detected key: {}, score: {:.4}, clarity: {:.4}",
        key.name(),
        correlation_score,
        clarity
    );

    KeyDetectionResult {
        estimate: KeyEstimate {
            key,
            correlation_score,
            clarity,
            source: KeySource::Detected,
        },
        all_scores: ranked,
    }
}

fn is_flat(histogram: &[f32; 12]) -> bool {
    let max = histogram.iter().cloned().fold(f32::MIN, f32::max);
    let min = histogram.iter().cloned().fold(f32::MAX, f32::min);
    !(max - min > FLAT_EPSILON) || !histogram.iter().all(|v| v.is_finite())
}

/// Pearson correlation coefficient of two 12-element vectors
fn pearson(a: &[f32; 12], b: &[f32; 12]) -> f32 {
    let mean_a = a.iter().sum::<f32>() / 12.0;
    let mean_b = b.iter().sum::<f32>() / 12.0;
    let mut cov = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for i in 0..12 {
        let da = (a[i] - mean_a) as f64;
        let db = (b[i] - mean_b) as f64;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    if denom <= 0.0 {
        0.0
    } else {
        (cov / denom) as f32
    }
}
