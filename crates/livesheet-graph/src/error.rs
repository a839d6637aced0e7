//! Error types for the live-editing engine.

use std::fmt;

use graph_transport::{FailureKind, TransportError};
use thiserror::Error;

/// Caller-facing classification of every failure the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAddress,
    InvalidSection,
    MarkerNotFound,
    Locked,
    Throttled,
    TransientServerFault,
    PermanentClientError,
    NetworkFault,
    Timeout,
    UnexpectedResponse,
    StructuralEditUnverified,
    Internal,
}

impl From<FailureKind> for ErrorKind {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Locked => ErrorKind::Locked,
            FailureKind::Throttled => ErrorKind::Throttled,
            FailureKind::TransientServerFault => ErrorKind::TransientServerFault,
            FailureKind::PermanentClientError => ErrorKind::PermanentClientError,
            FailureKind::NetworkFault => ErrorKind::NetworkFault,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Error)]
pub enum LiveError {
    #[error(transparent)]
    Core(#[from] livesheet_core::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Worksheet not found: {0}")]
    SheetNotFound(String),

    #[error("Marker '{marker}' not found in {sheet}")]
    MarkerNotFound { marker: String, sheet: String },

    #[error("Values are not rectangular: {0}")]
    NotRectangular(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A row insertion failed ambiguously and the document state could not
    /// confirm whether it was applied.
    #[error("Row insertion at {rows} could not be verified: {reason}")]
    StructuralEditUnverified {
        rows: String,
        reason: String,
        request_id: Option<String>,
    },

    #[error("Failed to build workbook package: {0}")]
    Package(String),
}

impl LiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LiveError::Core(livesheet_core::Error::InvalidAddress(_)) => ErrorKind::InvalidAddress,
            LiveError::Core(_) => ErrorKind::InvalidSection,
            LiveError::Transport(TransportError::Remote { kind, .. }) => (*kind).into(),
            LiveError::Transport(TransportError::Timeout { .. }) => ErrorKind::Timeout,
            LiveError::Transport(TransportError::InvalidRequest(_)) => ErrorKind::Internal,
            LiveError::Transport(TransportError::Decode(_)) => ErrorKind::UnexpectedResponse,
            LiveError::SheetNotFound(_) => ErrorKind::PermanentClientError,
            LiveError::MarkerNotFound { .. } => ErrorKind::MarkerNotFound,
            LiveError::NotRectangular(_) => ErrorKind::InvalidSection,
            LiveError::UnexpectedResponse(_) => ErrorKind::UnexpectedResponse,
            LiveError::StructuralEditUnverified { .. } => ErrorKind::StructuralEditUnverified,
            LiveError::Package(_) => ErrorKind::Internal,
        }
    }

    /// Remote correlation id of the last attempt, when the service supplied one
    pub fn request_id(&self) -> Option<&str> {
        match self {
            LiveError::Transport(e) => e.request_id(),
            LiveError::StructuralEditUnverified { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// Whether the failed call may nonetheless have changed the document
    pub fn outcome_unknown(&self) -> bool {
        match self {
            LiveError::Transport(e) => e.outcome_unknown(),
            LiveError::StructuralEditUnverified { .. } => true,
            _ => false,
        }
    }
}

impl From<zip::result::ZipError> for LiveError {
    fn from(e: zip::result::ZipError) -> Self {
        LiveError::Package(e.to_string())
    }
}

impl From<std::io::Error> for LiveError {
    fn from(e: std::io::Error) -> Self {
        LiveError::Package(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LiveError>;
