//! Key clarity scoring
//!
//! Estimates how unambiguous the winning key is.

use crate::analysis::result::Key;

/// Compute key clarity from ranked key scores (winner first)
///
/// Clarity is the gap between the best and second-best correlation,
/// normalized by the best correlation and clamped to 0.0-1.0. A winner with a
/// non-positive correlation has no clarity.
pub fn compute_key_clarity(scores: &[(Key, f32)]) -> f32 {
    let best = match scores.first() {
        Some(&(_, s)) => s,
        None => return 0.0,
    };
    if !(best > 0.0) {
        return 0.0;
    }
    let second = scores.get(1).map(|&(_, s)| s).unwrap_or(0.0);
    ((best - second) / best).clamp(0.0, 1.0)
}
