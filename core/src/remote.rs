use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Application-level code reported alongside a successful transport exchange.
pub const CODE_OK: i64 = 0;
/// Generic application failure code; paired with a credential-flavored message
/// it means the session token was rejected.
pub const CODE_FAILED: i64 = -1;

const STATUS_OK: u16 = 200;
const STATUS_UNAUTHORIZED: u16 = 401;

/// Case-insensitive check for credential talk in backend messages. The backend
/// does not use a dedicated code for expired sessions; it reuses
/// [`CODE_FAILED`] with a message naming the token.
pub(crate) fn mentions_credential(message: &str) -> bool {
    message.to_ascii_lowercase().contains("token")
}

/// The envelope every backend reply arrives in: an HTTP-style status from the
/// transport, an application `code`, and an optional payload or error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteResponse {
    pub status: u16,
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RemoteResponse {
    /// A fully successful reply carrying `data`.
    pub fn ok(data: impl Into<serde_json::Value>) -> Self {
        Self { status: STATUS_OK, code: CODE_OK, data: Some(data.into()), message: None }
    }

    /// A reply that was delivered but reports an application failure.
    pub fn failed(code: i64, message: impl Into<String>) -> Self {
        Self { status: STATUS_OK, code, data: None, message: Some(message.into()) }
    }

    /// A reply rejecting the caller's session outright.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self { status: STATUS_UNAUTHORIZED, code: CODE_FAILED, data: None, message: Some(message.into()) }
    }

    /// Both the transport and the application accepted the request.
    pub fn is_success(&self) -> bool { self.status == STATUS_OK && self.code == CODE_OK }

    /// The backend is telling us the stored credential is no longer valid,
    /// either via a 401 status or via [`CODE_FAILED`] plus a token-flavored
    /// message.
    pub fn credential_rejected(&self) -> bool {
        self.status == STATUS_UNAUTHORIZED || (self.code == CODE_FAILED && self.message.as_deref().is_some_and(mentions_credential))
    }
}

/// The backend a coordinator refreshes from.
///
/// Implementations own transport details (base URL, headers, retries at the
/// connection level). A fetch resolves to a [`RemoteResponse`] whenever the
/// backend answered at all, even with an error envelope; [`TransportError`] is
/// reserved for exchanges that produced no envelope.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the current authoritative value.
    async fn fetch_value(&self) -> Result<RemoteResponse, TransportError>;
}
