//! Error types for domain construction and manipulation.

use thiserror::Error;

/// Result type alias using DomainError.
pub type DomainResult<T> = Result<T, DomainError>;

/// Invalid caller input to the grid model.
///
/// Every variant is a configuration problem: it is detected before any
/// request is built and is never worth retrying.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("resolution must be a positive finite number, got {0}")]
    InvalidResolution(f64),

    #[error("invalid bounding box: {0}")]
    InvalidBbox(String),

    #[error("resample factor must be a positive finite number, got {0}")]
    InvalidFactor(f64),

    #[error("provided mask has a shape of {actual:?} which does not match the domain shape of {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("geometry has no coordinates to derive a domain from")]
    EmptyGeometry,
}

impl DomainError {
    pub fn invalid_bbox(msg: impl Into<String>) -> Self {
        Self::InvalidBbox(msg.into())
    }
}
