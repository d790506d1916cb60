use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tally_core::{CredentialStore, MemoryCredentialStore, RemoteResponse, RemoteSource, TransportError};

/// Backend double that replays scripted replies in order, each after its
/// scripted delay, and counts how many fetches were actually issued.
#[allow(unused)]
pub struct ScriptedSource {
    scripts: Mutex<VecDeque<(Duration, Result<RemoteResponse, TransportError>)>>,
    calls: AtomicUsize,
}

#[allow(unused)]
impl ScriptedSource {
    pub fn new() -> Self {
        Self { scripts: Mutex::new(VecDeque::new()), calls: AtomicUsize::new(0) }
    }

    pub fn reply(self, reply: Result<RemoteResponse, TransportError>) -> Self { self.reply_after(Duration::ZERO, reply) }

    pub fn reply_after(self, delay: Duration, reply: Result<RemoteResponse, TransportError>) -> Self {
        self.scripts.lock().unwrap().push_back((delay, reply));
        self
    }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

#[async_trait]
impl RemoteSource for ScriptedSource {
    async fn fetch_value(&self) -> Result<RemoteResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, reply) = self.scripts.lock().unwrap().pop_front().expect("fetch_value called with no scripted reply left");
        tokio::time::sleep(delay).await;
        reply
    }
}

/// Credential store that counts purges on top of the in-memory one.
#[allow(unused)]
pub struct SpyCredentials {
    inner: MemoryCredentialStore,
    purges: AtomicUsize,
}

#[allow(unused)]
impl SpyCredentials {
    pub fn signed_in() -> Self {
        Self { inner: MemoryCredentialStore::with_token("test-session-token"), purges: AtomicUsize::new(0) }
    }

    pub fn signed_out() -> Self {
        Self { inner: MemoryCredentialStore::new(), purges: AtomicUsize::new(0) }
    }

    pub fn purges(&self) -> usize { self.purges.load(Ordering::SeqCst) }
}

impl CredentialStore for SpyCredentials {
    fn has_credential(&self) -> bool { self.inner.has_credential() }

    fn purge(&self) {
        self.purges.fetch_add(1, Ordering::SeqCst);
        self.inner.purge();
    }
}

#[allow(unused)]
pub fn change_watcher<T: Send + Sync + 'static>() -> (Box<dyn Fn(T) + Send + Sync>, Box<dyn Fn() -> Vec<T> + Send + Sync>) {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let changes = changes.clone();
        Box::new(move |value: T| {
            changes.lock().unwrap().push(value);
        })
    };

    let check = Box::new(move || {
        let changes: Vec<T> = changes.lock().unwrap().drain(..).collect();
        changes
    });

    (watcher, check)
}
