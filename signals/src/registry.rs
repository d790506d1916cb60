use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::warn;

use crate::listener::{IntoListener, Listener, invoke_guarded, same_listener};

/// Hard cap on concurrently registered listeners. Registering past the cap
/// evicts the oldest registration rather than failing.
pub const MAX_LISTENERS: usize = 50;

/// An ordered, bounded set of listeners sharing one value type.
///
/// Listeners are invoked in registration order. The set holds at most its
/// configured capacity; registering one more evicts the oldest. Registering a
/// callback `Arc` that is already present is a no-op, so callers that keep
/// their listener in an `Arc` get duplicate suppression for free.
#[derive(Clone)]
pub struct ListenerSet<T>(Arc<Inner<T>>);

struct Inner<T> {
    entries: Mutex<Vec<Entry<T>>>,
    next_id: AtomicUsize,
    capacity: usize,
}

struct Entry<T> {
    id: usize,
    listener: Listener<T>,
}

impl<T> std::fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.0.entries.lock().unwrap().len())
            .field("capacity", &self.0.capacity)
            .finish()
    }
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self { Self::new() }
}

impl<T> ListenerSet<T> {
    /// Creates a set bounded at [`MAX_LISTENERS`].
    pub fn new() -> Self { Self::with_capacity(MAX_LISTENERS) }

    /// Creates a set bounded at `capacity` registrations (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Arc::new(Inner { entries: Mutex::new(Vec::new()), next_id: AtomicUsize::new(0), capacity: capacity.max(1) }))
    }

    /// Registers a listener and returns the guard controlling its lifetime.
    pub fn subscribe<L>(&self, listener: L) -> ListenerGuard<T>
    where L: IntoListener<T> {
        self.subscribe_listener(listener.into_listener()).0
    }

    /// Registers an already-shared listener. The flag is `false` when the same
    /// `Arc` was already registered and the call changed nothing; the returned
    /// guard then controls the existing registration.
    pub fn subscribe_listener(&self, listener: Listener<T>) -> (ListenerGuard<T>, bool) {
        let mut entries = self.0.entries.lock().unwrap();
        if let Some(existing) = entries.iter().find(|entry| same_listener(&entry.listener, &listener)) {
            warn!("listener already registered, ignoring duplicate");
            return (ListenerGuard { inner: Arc::downgrade(&self.0), id: existing.id }, false);
        }
        if entries.len() >= self.0.capacity {
            warn!(capacity = self.0.capacity, "listener capacity reached, evicting the oldest listener");
            entries.remove(0);
        }
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        entries.push(Entry { id, listener });
        (ListenerGuard { inner: Arc::downgrade(&self.0), id }, true)
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize { self.0.entries.lock().unwrap().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn capacity(&self) -> usize { self.0.capacity }
}

impl<T> ListenerSet<T>
where T: Clone
{
    /// Sends a value to every listener, in registration order.
    ///
    /// The entries are snapshotted before any callback runs, so a listener may
    /// subscribe or unsubscribe re-entrantly; mutations take effect from the
    /// next send onward. A listener that panics is logged, skipped past, and
    /// removed from the set.
    pub fn send(&self, value: T) {
        // Clone the listeners to avoid holding the lock during callback execution
        let snapshot = {
            let entries = self.0.entries.lock().unwrap();
            entries.iter().map(|entry| (entry.id, entry.listener.clone())).collect::<Vec<_>>()
        };

        let mut faulted = Vec::new();
        // Call all listeners without holding any locks
        // clone the value for each listener except the last one
        if let Some(((last_id, last), rest)) = snapshot.split_last() {
            for (id, listener) in rest {
                if !invoke_guarded(listener, value.clone()) {
                    faulted.push(*id);
                }
            }
            if !invoke_guarded(last, value) {
                faulted.push(*last_id);
            }
        }

        if !faulted.is_empty() {
            warn!(removed = faulted.len(), "removing listeners that panicked during send");
            self.0.entries.lock().unwrap().retain(|entry| !faulted.contains(&entry.id));
        }
    }
}

impl<T> Inner<T> {
    fn remove(&self, id: usize) {
        self.entries.lock().unwrap().retain(|entry| entry.id != id);
    }
}

/// A subscription handle that can be used to unsubscribe from future sends.
pub struct ListenerGuard<T> {
    inner: Weak<Inner<T>>,
    id: usize,
}

impl<T> ListenerGuard<T> {
    /// Removes the listener now. Calling this more than once, or after the set
    /// itself has been dropped, is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.remove(self.id);
        }
    }
}

impl<T> Drop for ListenerGuard<T> {
    /// Automatically unsubscribes when the subscription handle is dropped.
    fn drop(&mut self) { self.unsubscribe(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_capacity_is_clamped_to_one() {
        let set: ListenerSet<i32> = ListenerSet::with_capacity(0);
        let _a = set.subscribe(|_: i32| {});
        let _b = set.subscribe(|_: i32| {});
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_send_in_registration_order() {
        let set: ListenerSet<i32> = ListenerSet::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s1 = seen.clone();
        let _g1 = set.subscribe(move |v: i32| s1.lock().unwrap().push(("first", v)));
        let s2 = seen.clone();
        let _g2 = set.subscribe(move |v: i32| s2.lock().unwrap().push(("second", v)));

        set.send(7);
        assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_guard_drop_unsubscribes() {
        let set: ListenerSet<i32> = ListenerSet::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s1 = seen.clone();
        let _g1 = set.subscribe(move |v: i32| s1.lock().unwrap().push(v));
        let s2 = seen.clone();
        let g2 = set.subscribe(move |v: i32| s2.lock().unwrap().push(v * 10));

        set.send(1);
        drop(g2);
        set.send(2);

        assert_eq!(*seen.lock().unwrap(), vec![1, 10, 2]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let set: ListenerSet<i32> = ListenerSet::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s1 = seen.clone();
        let g1 = set.subscribe(move |v: i32| s1.lock().unwrap().push(v));
        let s2 = seen.clone();
        let _g2 = set.subscribe(move |v: i32| s2.lock().unwrap().push(v * 10));

        g1.unsubscribe();
        g1.unsubscribe();
        set.send(3);

        assert_eq!(set.len(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![30]);
    }

    #[test]
    fn test_duplicate_arc_is_suppressed() {
        let set: ListenerSet<i32> = ListenerSet::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        let listener: Listener<i32> = Arc::new(move |v| s.lock().unwrap().push(v));
        let (_g1, added1) = set.subscribe_listener(listener.clone());
        let (_g2, added2) = set.subscribe_listener(listener);

        assert!(added1);
        assert!(!added2);
        assert_eq!(set.len(), 1);

        set.send(5);
        assert_eq!(*seen.lock().unwrap(), vec![5]);
    }

    #[test]
    fn test_overflow_evicts_the_oldest() {
        let set: ListenerSet<i32> = ListenerSet::with_capacity(2);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s1 = seen.clone();
        let _g1 = set.subscribe(move |v: i32| s1.lock().unwrap().push(("oldest", v)));
        let s2 = seen.clone();
        let _g2 = set.subscribe(move |v: i32| s2.lock().unwrap().push(("second", v)));
        let s3 = seen.clone();
        let _g3 = set.subscribe(move |v: i32| s3.lock().unwrap().push(("third", v)));

        assert_eq!(set.len(), 2);
        set.send(9);
        assert_eq!(*seen.lock().unwrap(), vec![("second", 9), ("third", 9)]);

        // Unsubscribing the evicted listener is a silent no-op
        _g1.unsubscribe();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_panicking_listener_is_removed_but_others_run() {
        let set: ListenerSet<i32> = ListenerSet::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _bad = set.subscribe(|_: i32| panic!("listener bug"));
        let s = seen.clone();
        let _good = set.subscribe(move |v: i32| s.lock().unwrap().push(v));

        set.send(1);
        assert_eq!(set.len(), 1, "the panicking listener should be gone");
        set.send(2);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_reentrant_subscription_during_send() {
        let set: ListenerSet<i32> = ListenerSet::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let late_guard = Arc::new(Mutex::new(None));

        let reentrant_set = set.clone();
        let reentrant_seen = seen.clone();
        let stash = late_guard.clone();
        let _g1 = set.subscribe(move |v: i32| {
            reentrant_seen.lock().unwrap().push(("outer", v));
            let inner_seen = reentrant_seen.clone();
            let guard = reentrant_set.subscribe(move |v: i32| inner_seen.lock().unwrap().push(("inner", v)));
            stash.lock().unwrap().replace(guard);
        });

        // The listener registered mid-send does not hear the current send...
        set.send(1);
        assert_eq!(*seen.lock().unwrap(), vec![("outer", 1)]);

        // ...but does hear the next one
        set.send(2);
        assert_eq!(*seen.lock().unwrap(), vec![("outer", 1), ("outer", 2), ("inner", 2)]);
    }

    #[test]
    fn test_channel_senders_as_listeners() {
        let set: ListenerSet<i32> = ListenerSet::new();

        let (std_tx, std_rx) = std::sync::mpsc::channel();
        let _g1 = set.subscribe(std_tx);

        let (tokio_tx, mut tokio_rx) = tokio::sync::mpsc::unbounded_channel();
        let _g2 = set.subscribe(tokio_tx);

        set.send(11);
        assert_eq!(std_rx.try_recv().unwrap(), 11);
        assert_eq!(tokio_rx.try_recv().unwrap(), 11);
    }
}
