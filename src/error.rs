//! Error taxonomy for the analysis core.

use thiserror::Error;

/// Errors raised by the analysis core.
///
/// Expected conditions (end of stream, not enough history yet) are never
/// reported through this type; they surface as explicit result states.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Window shorter than the minimum needed for statistics.
    #[error("insufficient data: {len} samples, need at least {min}")]
    InsufficientData { len: usize, min: usize },

    /// Operation on a session that has no samples loaded.
    #[error("no samples loaded for this session")]
    EmptySequence,

    /// Non-finite values reached the classifier.
    #[error("invalid window: {0}")]
    InvalidWindow(String),
}

impl AnalysisError {
    /// Stable machine-readable code for the boundary layer.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            AnalysisError::EmptySequence => "EMPTY_SEQUENCE",
            AnalysisError::InvalidWindow(_) => "INVALID_WINDOW",
        }
    }
}
