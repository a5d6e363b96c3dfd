//! Error handling and recovery mechanisms

pub mod circuit_breaker;
pub mod pipeline_error;

pub use circuit_breaker::*;
pub use pipeline_error::*;
