//! Custom error types for the detection pipeline

use thiserror::Error;
use crate::store::StoreError;

/// Errors surfaced by the pipeline. Only some of these abort a detection
/// pass; per-item problems are logged and skipped at the call site, and
/// `is_fatal` tells the pass driver which is which so an empty result is
/// never confused with a failed pass.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("backing store failure: {0}")]
    Store(#[from] StoreError),

    #[error("missing {context} (id {id})")]
    DanglingReference { id: i64, context: String },
}

impl PipelineError {
    /// True when the whole pass must abort and be retried by the next
    /// scheduled run. Recoverable variants only ever skip one item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
