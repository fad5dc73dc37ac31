//! Errors raised while encoding requests or decoding responses.

use thiserror::Error;

pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Data format string outside the supported set.
    #[error("Unsupported data format: {0} (expected NPY, GEO_TIFF or TF_RECORD_IMAGE)")]
    UnsupportedFormat(String),

    /// Recognised but unimplemented feature.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Invalid NPY payload: {0}")]
    InvalidNpy(String),

    #[error("Unsupported NPY dtype: {0}")]
    UnsupportedDtype(String),

    #[error("Array shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Invalid feature table: {0}")]
    InvalidTable(String),

    /// Scalar response without a `result` member.
    #[error("Value response has no 'result' field")]
    MissingResult,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    pub fn invalid_npy(msg: impl Into<String>) -> Self {
        Self::InvalidNpy(msg.into())
    }

    pub fn shape_mismatch(expected: (usize, usize), actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: vec![expected.0, expected.1],
            actual: actual.to_vec(),
        }
    }

    /// Errors caused by the request itself rather than by what came back.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_) | Self::NotImplemented(_) | Self::InvalidExpression(_)
        )
    }
}
