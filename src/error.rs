//! Typed failures for the interaction engine.
//!
//! Validation happens before any state changes: a returned error means the
//! store/session is exactly as it was before the call. None of these are
//! fatal — the host is expected to show them as a non-fatal notice.

use thiserror::Error;

use crate::data::document::DocumentId;
use crate::integration::RegionId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid region bounds: start {start} must be less than end {end}")]
    InvalidRange { start: f64, end: f64 },

    #[error("region [{start}, {end}] overlaps existing region {existing}")]
    Overlap {
        start: f64,
        end: f64,
        existing: RegionId,
    },

    #[error("no integration region with id {0}")]
    RegionNotFound(RegionId),

    #[error("no document with id {0}")]
    DocumentNotFound(DocumentId),

    #[error("no active document in session")]
    EmptySession,

    #[error("samples must be strictly increasing in x (violation at index {index})")]
    NonMonotonicSamples { index: usize },

    #[error("a spectrum needs at least two samples, got {got}")]
    TooFewSamples { got: usize },
}
