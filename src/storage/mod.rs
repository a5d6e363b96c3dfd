//! Output persistence

pub mod opportunities;

pub use opportunities::*;
