pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod remote;
pub mod store;
pub mod value;

pub use coordinator::SyncCoordinator;
pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use error::TransportError;
pub use remote::{RemoteResponse, RemoteSource};
pub use store::ValueStore;
pub use value::{Balance, StoreValue};

pub use tally_signals as signals;
