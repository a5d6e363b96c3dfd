//! Currency normalization

pub mod normalizer;

pub use normalizer::*;
