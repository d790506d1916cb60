use thiserror::Error;

use crate::remote::mentions_credential;

/// Failure raised by a [`RemoteSource`](crate::remote::RemoteSource) when no
/// envelope could be produced at all.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The backend could not be reached
    #[error("remote unreachable: {0}")]
    Unreachable(String),
    /// The transport delivered a reply the client refused before decoding it
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    /// The transport gave up waiting for a reply
    #[error("request timed out")]
    Timeout,
}

impl TransportError {
    /// Whether this failure means the stored credential is no longer valid.
    ///
    /// A rejection with HTTP 401, or one whose message mentions the credential
    /// token, both count. Unreachable backends and timeouts do not: they say
    /// nothing about the credential, so the cached value stays trustworthy.
    pub fn credential_rejected(&self) -> bool {
        match self {
            TransportError::Rejected { status, message } => *status == 401 || mentions_credential(message),
            TransportError::Unreachable(_) | TransportError::Timeout => false,
        }
    }
}
