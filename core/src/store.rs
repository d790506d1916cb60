use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tally_signals::{DEFAULT_DEBOUNCE, Debounced, IntoListener, ListenerGuard, ListenerSet, MAX_LISTENERS, ValueCell, invoke_guarded};

use crate::value::StoreValue;

/// A shared cache of one remotely-owned value.
///
/// Every write sanitizes the value, stamps the update time, and schedules a
/// debounced notification, so a burst of writes reaches listeners as a single
/// delivery carrying the final value. Reads are synchronous and never block on
/// a refresh.
///
/// Clones share state: one handle can live in a refresh task while others
/// serve reads and subscriptions. Writes schedule their notification on the
/// ambient tokio runtime, so `set` and `clear` must be called within one.
pub struct ValueStore<V: StoreValue>(Arc<Inner<V>>);

struct Inner<V: StoreValue> {
    state: ValueCell<State<V>>,
    loading: AtomicBool,
    changes: Debounced<V>,
}

struct State<V> {
    value: V,
    last_updated: Option<DateTime<Utc>>,
}

impl<V: StoreValue> Clone for ValueStore<V> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<V: StoreValue> std::fmt::Debug for ValueStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStore")
            .field("value", &self.get())
            .field("loading", &self.is_loading())
            .field("listeners", &self.0.changes.listeners().len())
            .finish()
    }
}

impl<V: StoreValue> Default for ValueStore<V> {
    fn default() -> Self { Self::new() }
}

impl<V: StoreValue> ValueStore<V> {
    /// A store with the stock listener cap and debounce window.
    pub fn new() -> Self { Self::with_settings(MAX_LISTENERS, DEFAULT_DEBOUNCE) }

    /// A store with explicit listener capacity and notification debounce.
    pub fn with_settings(listener_capacity: usize, debounce_window: Duration) -> Self {
        Self(Arc::new(Inner {
            state: ValueCell::new(State { value: V::default(), last_updated: None }),
            loading: AtomicBool::new(false),
            changes: Debounced::new(ListenerSet::with_capacity(listener_capacity), debounce_window),
        }))
    }

    /// Current value. Defaults to `V::default()` until something lands.
    pub fn get(&self) -> V { self.0.state.with(|state| state.value.clone()) }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&V) -> R) -> R { self.0.state.with(|state| f(&state.value)) }

    /// When the value last changed, `None` until the first write (and again
    /// after [`clear`](Self::clear)).
    pub fn last_updated(&self) -> Option<DateTime<Utc>> { self.0.state.with(|state| state.last_updated) }

    /// Whether a refresh is currently fetching on behalf of this store.
    pub fn is_loading(&self) -> bool { self.0.loading.load(Ordering::Acquire) }

    pub(crate) fn set_loading(&self, loading: bool) { self.0.loading.store(loading, Ordering::Release); }

    /// Replace the value. The value is sanitized, the update time stamped, and
    /// a debounced notification scheduled; the notification is ordered with
    /// the write, so racing writes notify in the order they landed.
    pub fn set(&self, value: V) {
        let state = State { value: value.sanitize(), last_updated: Some(Utc::now()) };
        self.0.state.set_with(state, |current| self.0.changes.notify(current.value.clone()));
    }

    /// Reset to `V::default()` and forget the update time, as if nothing had
    /// ever been fetched. Listeners are notified of the reset value.
    pub fn clear(&self) {
        let state = State { value: V::default(), last_updated: None };
        self.0.state.set_with(state, |current| self.0.changes.notify(current.value.clone()));
    }

    /// Register a listener for value changes.
    ///
    /// The listener is invoked synchronously, once, with the current value
    /// before this returns; subsequent invocations are debounced change
    /// notifications. A panic in the initial invocation is logged and does not
    /// undo the registration. Re-subscribing a shared callback `Arc` that is
    /// already registered changes nothing (and skips the initial invocation);
    /// the returned guard then refers to the existing registration.
    ///
    /// Dropping the guard unsubscribes, as does
    /// [`unsubscribe`](ListenerGuard::unsubscribe).
    pub fn subscribe<L>(&self, listener: L) -> ListenerGuard<V>
    where L: IntoListener<V> {
        let listener = listener.into_listener();
        let (guard, added) = self.0.changes.listeners().subscribe_listener(listener.clone());
        if added {
            invoke_guarded(&listener, self.get());
        }
        guard
    }

    /// Number of live listener registrations.
    pub fn listener_count(&self) -> usize { self.0.changes.listeners().len() }

    /// Most listeners this store will hold before evicting the oldest.
    pub fn listener_capacity(&self) -> usize { self.0.changes.listeners().capacity() }
}
