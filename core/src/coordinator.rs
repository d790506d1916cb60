use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::credentials::CredentialStore;
use crate::remote::RemoteSource;
use crate::store::ValueStore;
use crate::value::StoreValue;

/// Coordinates refreshes of a [`ValueStore`] against a [`RemoteSource`].
///
/// At most one fetch is outstanding per coordinator. Callers that ask for a
/// refresh while one is in flight share its outcome instead of issuing a
/// second request; a forced refresh bypasses the sharing and starts a fresh
/// fetch immediately. Fetches run as detached tasks, so a caller that stops
/// awaiting does not cancel the fetch for everyone else.
///
/// When two fetches overlap (only possible through forcing), the one launched
/// later wins: an older fetch that settles afterwards resolves its own callers
/// but no longer touches the store.
pub struct SyncCoordinator<V: StoreValue>(Arc<Inner<V>>);

struct Inner<V: StoreValue> {
    store: ValueStore<V>,
    source: Arc<dyn RemoteSource>,
    credentials: Arc<dyn CredentialStore>,
    flights: Mutex<Flights<V>>,
}

/// Fetch bookkeeping, all under one lock. A settling fetch checks its epoch
/// and performs its store mutation inside a single critical section, so two
/// settlements racing on different runtime threads can never land their
/// writes out of epoch order.
struct Flights<V> {
    /// The fetch new callers currently join. Its receiver settles to `Some`
    /// exactly once, after the fetch has released this slot.
    pending: Option<Inflight<V>>,
    /// Epoch handed to the most recently launched fetch.
    issued: u64,
    /// Newest epoch whose settlement has mutated shared state.
    applied: u64,
}

struct Inflight<V> {
    epoch: u64,
    outcome: watch::Receiver<Option<V>>,
}

impl<V: StoreValue> Clone for SyncCoordinator<V> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<V: StoreValue> SyncCoordinator<V> {
    pub fn new(store: ValueStore<V>, source: Arc<dyn RemoteSource>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self(Arc::new(Inner {
            store,
            source,
            credentials,
            flights: Mutex::new(Flights { pending: None, issued: 0, applied: 0 }),
        }))
    }

    /// The store this coordinator refreshes.
    pub fn store(&self) -> &ValueStore<V> { &self.0.store }

    /// Bring the store up to date, sharing any fetch already in flight.
    ///
    /// Resolves to the refreshed value on success, to the cached value when
    /// the backend misbehaves in a non-credential way, and to `V::default()`
    /// when no credential is on file or the backend rejects it. It never
    /// returns an error; failures degrade and are logged instead, since every
    /// caller wants a displayable value more than a diagnosis.
    pub async fn refresh(&self) -> V { self.refresh_inner(false).await }

    /// Like [`refresh`](Self::refresh), but always issues a fresh fetch, even
    /// if one is already in flight.
    pub async fn force_refresh(&self) -> V { self.refresh_inner(true).await }

    /// Populate the store on activation. Deliberately not memoized: every
    /// activation revalidates against the backend rather than trusting a
    /// value from the previous session.
    pub async fn initialize(&self) -> V {
        debug!("initializing value store");
        self.refresh_inner(false).await
    }

    async fn refresh_inner(&self, force: bool) -> V {
        if !self.0.credentials.has_credential() {
            debug!("no credential on file, clearing the store instead of fetching");
            self.0.store.clear();
            return V::default();
        }

        let mut rx = {
            let mut flights = self.0.flights.lock().unwrap();
            let joinable = match flights.pending.as_ref() {
                // A dead receiver means the fetch task went away without
                // settling; relaunch rather than joining a fetch that will
                // never resolve
                Some(inflight) if !force && inflight.outcome.has_changed().is_ok() => Some(inflight.outcome.clone()),
                _ => None,
            };
            match joinable {
                Some(rx) => {
                    debug!("refresh already in flight, joining it");
                    rx
                }
                None => self.launch(&mut flights),
            }
        };

        let settled = match rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => outcome.clone(),
            // The fetch task died without settling; the cached value is the
            // best answer left
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.0.store.get())
    }

    /// Start a detached fetch and install it as the pending flight. Callers
    /// must hold the flight lock.
    fn launch(&self, flights: &mut Flights<V>) -> watch::Receiver<Option<V>> {
        if flights.pending.is_some() {
            debug!("superseding the fetch in flight");
        }
        flights.issued += 1;
        let epoch = flights.issued;
        let (tx, rx) = watch::channel(None);
        flights.pending = Some(Inflight { epoch, outcome: rx.clone() });
        self.0.store.set_loading(true);

        let inner = self.0.clone();
        tokio::spawn(async move {
            let outcome = inner.run_fetch(epoch).await;
            // Slot and loading flag are released before the outcome settles,
            // so a caller woken by the settlement observes the fetch as done
            inner.release(epoch);
            let _ = tx.send(Some(outcome)); // Ignore send errors (all awaiters departed)
        });
        rx
    }
}

impl<V: StoreValue> Inner<V> {
    async fn run_fetch(&self, epoch: u64) -> V {
        match self.source.fetch_value().await {
            Ok(reply) if reply.is_success() => match reply.data.as_ref() {
                Some(payload) => {
                    let value = V::from_payload(Some(payload)).sanitize();
                    if self.apply(epoch, || self.store.set(value.clone())) {
                        debug!(value = ?value, "refresh complete");
                    } else {
                        debug!("refresh result superseded by a newer fetch, not storing it");
                    }
                    value
                }
                // A success envelope with no payload is a malformed reply, not
                // an update
                None => {
                    warn!("refresh succeeded without a payload, keeping the cached value");
                    self.store.get()
                }
            },
            Ok(reply) if reply.credential_rejected() => {
                warn!(status = reply.status, code = reply.code, "backend rejected the credential, clearing the store");
                self.reject_credential(epoch)
            }
            Ok(reply) => {
                warn!(
                    status = reply.status,
                    code = reply.code,
                    message = reply.message.as_deref().unwrap_or(""),
                    "refresh failed, keeping the cached value"
                );
                self.store.get()
            }
            Err(error) if error.credential_rejected() => {
                warn!(%error, "transport rejected the credential, clearing the store");
                self.reject_credential(epoch)
            }
            Err(error) => {
                warn!(%error, "refresh transport failed, keeping the cached value");
                self.store.get()
            }
        }
    }

    /// Credential is dead: reset the store and drop the credential so later
    /// refreshes short-circuit instead of retrying a dead session.
    fn reject_credential(&self, epoch: u64) -> V {
        let applied = self.apply(epoch, || {
            self.store.clear();
            self.credentials.purge();
        });
        if !applied {
            debug!("credential rejection superseded by a newer fetch, leaving state alone");
        }
        V::default()
    }

    /// Run `mutate` unless a newer fetch has already landed its own mutation.
    /// The epoch check and the mutation share one critical section.
    fn apply(&self, epoch: u64, mutate: impl FnOnce()) -> bool {
        let mut flights = self.flights.lock().unwrap();
        if flights.applied < epoch {
            flights.applied = epoch;
            mutate();
            true
        } else {
            false
        }
    }

    fn release(&self, epoch: u64) {
        let mut flights = self.flights.lock().unwrap();
        // A forced refresh may have replaced this fetch's claim; leave the
        // newer fetch's slot alone
        if flights.pending.as_ref().is_some_and(|inflight| inflight.epoch == epoch) {
            flights.pending = None;
            self.store.set_loading(false);
        }
    }
}
