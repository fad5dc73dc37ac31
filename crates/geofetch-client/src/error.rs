//! Error types for fetching from the compute service.

use geofetch_common::DomainError;
use geofetch_protocol::ProtocolError;
use thiserror::Error;

pub type FetchResult<T> = Result<T, FetchError>;

/// Coarse classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input or setup, detected before any request was sent.
    Configuration,
    /// Network failure or retryable status that outlived the retry budget.
    Transport,
    /// HTTP 404.
    NotFound,
    /// The service rejected or failed the computation.
    RemoteCompute,
    /// One item of a multi-item fetch failed.
    BatchAborted,
    /// A response body could not be interpreted.
    Decode,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("request to {url} failed after {attempts} attempt(s): {message}")]
    Transport {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("remote compute failed (HTTP {status}): {message}")]
    RemoteCompute { status: u16, message: String },

    #[error("item {index} of {total} failed: {source}")]
    BatchAborted {
        index: usize,
        total: usize,
        source: Box<FetchError>,
    },

    /// Collection with no images.
    #[error("collection {0} is empty")]
    EmptyCollection(String),

    #[error("band mismatch at item {index}: expected {expected:?}, got {actual:?}")]
    BandMismatch {
        index: usize,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoTIFF encoding error: {0}")]
    Tiff(#[from] tiff::TiffError),
}

impl FetchError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::UnexpectedResponse(msg.into())
    }

    pub fn batch_aborted(index: usize, total: usize, source: FetchError) -> Self {
        Self::BatchAborted {
            index,
            total,
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Config(_) | FetchError::Auth(_) | FetchError::Domain(_) => {
                ErrorKind::Configuration
            }
            FetchError::Protocol(e) if e.is_configuration() => ErrorKind::Configuration,
            FetchError::Protocol(_) => ErrorKind::Decode,
            FetchError::Transport { .. } => ErrorKind::Transport,
            FetchError::NotFound { .. } | FetchError::EmptyCollection(_) => ErrorKind::NotFound,
            FetchError::RemoteCompute { .. } => ErrorKind::RemoteCompute,
            FetchError::BatchAborted { .. } => ErrorKind::BatchAborted,
            FetchError::BandMismatch { .. } | FetchError::UnexpectedResponse(_) => {
                ErrorKind::Decode
            }
            FetchError::Io(_) => ErrorKind::Configuration,
            FetchError::Tiff(_) => ErrorKind::Decode,
        }
    }

    /// The innermost error of a batch failure, or `self`.
    pub fn root_cause(&self) -> &FetchError {
        match self {
            FetchError::BatchAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
