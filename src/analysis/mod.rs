//! Analysis and result aggregation modules
//!
//! Combines the pipeline stages into the final outcome:
//! - Result types (keys, estimates, outcome)
//! - Confidence scoring
//! - Metadata

pub mod confidence;
pub mod metadata;
pub mod result;
