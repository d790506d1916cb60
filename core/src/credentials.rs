use std::sync::RwLock;

use tracing::debug;

/// Where the session credential lives.
///
/// The coordinator only ever asks two things of it: is a credential present,
/// and discard it. Reading the actual token stays the transport's business.
pub trait CredentialStore: Send + Sync {
    /// Whether a credential is currently on file.
    fn has_credential(&self) -> bool;

    /// Discard the stored credential. Called when the backend rejects it, so
    /// the next refresh short-circuits instead of retrying a dead session.
    fn purge(&self);
}

/// In-memory credential holder, standing in for a platform keystore.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    /// Starts with no credential on file.
    pub fn new() -> Self { Self::default() }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: RwLock::new(Some(token.into())) }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap() = Some(token.into());
    }

    pub fn token(&self) -> Option<String> { self.token.read().unwrap().clone() }
}

impl CredentialStore for MemoryCredentialStore {
    fn has_credential(&self) -> bool { self.token.read().unwrap().is_some() }

    fn purge(&self) {
        debug!("purging stored credential");
        *self.token.write().unwrap() = None;
    }
}
