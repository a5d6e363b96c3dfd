//! Product exclusion classification

pub mod free_to_play;

pub use free_to_play::*;
