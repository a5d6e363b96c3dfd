//! Opportunity notification channels and dispatch

pub mod channels;
pub mod dispatcher;
pub mod retry;

pub use channels::*;
pub use dispatcher::*;
pub use retry::*;
