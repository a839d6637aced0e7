//! Failure classification and error types for the transport.

use std::fmt;

use thiserror::Error;

/// How a failed remote call is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// 423: another actor holds the resource
    Locked,
    /// 429: rate limit exceeded
    Throttled,
    /// 500, 502, 503, 504
    TransientServerFault,
    /// Any other non-success status. Never retried.
    PermanentClientError,
    /// The request never produced an HTTP response
    NetworkFault,
}

impl FailureKind {
    /// Classify an HTTP status code. Returns `None` for 2xx.
    ///
    /// | status | kind |
    /// |---|---|
    /// | 423 | `Locked` |
    /// | 429 | `Throttled` |
    /// | 500, 502, 503, 504 | `TransientServerFault` |
    /// | everything else | `PermanentClientError` |
    pub fn classify_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            423 => Some(FailureKind::Locked),
            429 => Some(FailureKind::Throttled),
            500 | 502 | 503 | 504 => Some(FailureKind::TransientServerFault),
            _ => Some(FailureKind::PermanentClientError),
        }
    }

    /// Whether the failure is expected to clear up on its own.
    pub fn is_transient(self) -> bool {
        !matches!(self, FailureKind::PermanentClientError)
    }

    /// Whether the remote service may have applied the request despite the failure.
    ///
    /// Locked and throttled requests are rejected before they are applied; a
    /// server fault or a lost connection leaves the outcome unknown.
    pub fn outcome_unknown(self) -> bool {
        matches!(
            self,
            FailureKind::TransientServerFault | FailureKind::NetworkFault
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Locked => "resource locked",
            FailureKind::Throttled => "throttled",
            FailureKind::TransientServerFault => "transient server fault",
            FailureKind::PermanentClientError => "permanent client error",
            FailureKind::NetworkFault => "network fault",
        };
        f.write_str(name)
    }
}

/// A connection-level failure reported by an [`HttpClient`](crate::HttpClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NetworkError {
    pub message: String,
    /// The per-request timeout elapsed before a response arrived
    pub timed_out: bool,
}

impl NetworkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }
}

/// Terminal failure of one logical request.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The remote call failed and was not (or no longer) retried.
    #[error("{kind} after {attempts} attempt(s): {message}")]
    Remote {
        kind: FailureKind,
        status: Option<u16>,
        message: String,
        /// Last remote-assigned correlation id, when the service supplied one
        request_id: Option<String>,
        attempts: u32,
    },

    /// The caller's deadline passed while the request was in flight or waiting to retry.
    #[error("deadline exceeded after {attempts} attempt(s)")]
    Timeout {
        attempts: u32,
        last_kind: Option<FailureKind>,
        request_id: Option<String>,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Malformed response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Classification of a remote failure, if this is one
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TransportError::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Remote correlation id of the last attempt
    pub fn request_id(&self) -> Option<&str> {
        match self {
            TransportError::Remote { request_id, .. } | TransportError::Timeout { request_id, .. } => {
                request_id.as_deref()
            }
            _ => None,
        }
    }

    /// HTTP status of the last attempt
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Remote { status, .. } => *status,
            _ => None,
        }
    }

    /// The remote service may have applied the request even though it failed.
    pub fn outcome_unknown(&self) -> bool {
        match self {
            TransportError::Remote { kind, .. } => kind.outcome_unknown(),
            TransportError::Timeout { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status_table() {
        assert_eq!(FailureKind::classify_status(200), None);
        assert_eq!(FailureKind::classify_status(204), None);
        assert_eq!(FailureKind::classify_status(423), Some(FailureKind::Locked));
        assert_eq!(FailureKind::classify_status(429), Some(FailureKind::Throttled));
        for status in [500, 502, 503, 504] {
            assert_eq!(
                FailureKind::classify_status(status),
                Some(FailureKind::TransientServerFault)
            );
        }
        for status in [400, 401, 403, 404, 409, 422, 501, 302] {
            assert_eq!(
                FailureKind::classify_status(status),
                Some(FailureKind::PermanentClientError)
            );
        }
    }

    #[test]
    fn test_outcome_unknown() {
        assert!(!FailureKind::Locked.outcome_unknown());
        assert!(!FailureKind::Throttled.outcome_unknown());
        assert!(FailureKind::TransientServerFault.outcome_unknown());
        assert!(FailureKind::NetworkFault.outcome_unknown());
        assert!(!FailureKind::PermanentClientError.is_transient());
    }
}
