//! Audio preprocessing modules
//!
//! - Channel mixing (multichannel → mono)

pub mod channel_mixer;
