/*!
Observable cache for remotely-owned values.

A [`ValueStore`] holds the client's copy of a value the backend owns, with a
timestamp of the last update and a loading flag. A [`SyncCoordinator`] keeps
the store fresh: concurrent refreshes share one fetch, forced refreshes start a
new one, and a rejected credential clears both the store and the credential.
Subscribers hear about changes through a bounded listener registry with
debounced delivery, so bursts of writes arrive as one notification.

# Quickstart

```rust,no_run
use std::sync::Arc;
use tally::{Balance, MemoryCredentialStore, SyncCoordinator, ValueStore};
# use tally::{RemoteResponse, RemoteSource, TransportError};
# struct Backend;
# #[async_trait::async_trait]
# impl RemoteSource for Backend {
#     async fn fetch_value(&self) -> Result<RemoteResponse, TransportError> {
#         Ok(RemoteResponse::ok(serde_json::json!({ "balance": "42.50" })))
#     }
# }

#[tokio::main]
async fn main() {
    let store = ValueStore::<Balance>::new();
    let credentials = Arc::new(MemoryCredentialStore::with_token("session-token"));
    let coordinator = SyncCoordinator::new(store.clone(), Arc::new(Backend), credentials);

    // Invoked with the current balance now, and with every change after
    let _subscription = store.subscribe(|balance: Balance| println!("balance: {balance}"));

    coordinator.initialize().await;
}
```

Implement [`RemoteSource`] against your transport, and [`CredentialStore`]
against wherever your session token lives. Values beyond [`Balance`] only need
a [`StoreValue`] impl describing how to decode the backend payload.
*/

pub use tally_core::{
    Balance, CredentialStore, MemoryCredentialStore, RemoteResponse, RemoteSource, StoreValue, SyncCoordinator, TransportError, ValueStore,
};

pub use tally_core::{coordinator, credentials, error, remote, store, value};

pub use tally_signals as signals;
pub use tally_signals::{Debounced, IntoListener, Listener, ListenerGuard, ListenerSet, ValueCell};
