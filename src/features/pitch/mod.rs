//! Pitch tracking modules
//!
//! - Estimator seam (`PitchEstimator`) and a built-in autocorrelation estimator
//! - Frame analysis (buffer → fixed-hop pitch frames)
//! - Track smoothing (octave correction, gap bridging, median filter)

pub mod autocorrelation;
pub mod estimator;
pub mod frames;
pub mod smoothing;

pub use autocorrelation::AutocorrelationEstimator;
pub use estimator::{PitchEstimate, PitchEstimator};
pub use frames::{analyze, FrameAnalyzer, PitchFrame};
pub use smoothing::PitchTrackSmoother;
