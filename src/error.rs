//! Closed, disjoint error kinds for the SVVE pipeline.
//!
//! Every variant carries a stable tag plus a short detail string suitable
//! for logs. No message rewriting happens above this layer — a host
//! language binding maps these tags to its own exception/result idiom.

use crate::DocId;

#[derive(Debug, thiserror::Error)]
pub enum SvveError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("query has zero L2 norm")]
    ZeroQuery,

    #[error("adapter protocol violation in field `{field}`: {detail}")]
    AdapterProtocolViolation { field: String, detail: String },

    #[error("no cached vector for document {0}")]
    CacheMiss(DocId),

    #[error("no surviving (non-Noise) documents after voting")]
    NoSurvivors,

    #[error("PRF-corrected query has zero or non-finite norm")]
    DegeneratePRF,

    #[error("refinement produced an empty candidate pool")]
    NoResults,

    #[error("search canceled")]
    Canceled,
}

impl SvveError {
    pub fn adapter_violation(field: impl Into<String>, detail: impl Into<String>) -> Self {
        SvveError::AdapterProtocolViolation {
            field: field.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SvveError>;
