use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::error;

/// A registered callback. Listeners are shared so a registry can hand the same
/// callback to a dispatch snapshot while the caller still holds it.
pub type Listener<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// Conversion into a [`Listener`], so `subscribe` can accept closures,
/// already-shared callbacks, or channel senders.
pub trait IntoListener<T> {
    fn into_listener(self) -> Listener<T>;
}

// Implementation for function types
impl<F, T> IntoListener<T> for F
where F: Fn(T) + Send + Sync + 'static
{
    fn into_listener(self) -> Listener<T> { Arc::new(self) }
}

// Implementation for Listener itself - subscribing the same Arc twice is how a
// caller opts in to duplicate suppression
impl<T> IntoListener<T> for Listener<T> {
    fn into_listener(self) -> Listener<T> { self }
}

// Implementation for std::sync::mpsc channels
impl<T> IntoListener<T> for std::sync::mpsc::Sender<T>
where T: Send + Sync + 'static
{
    fn into_listener(self) -> Listener<T> {
        Arc::new(move |value| {
            let _ = self.send(value); // Ignore send errors
        })
    }
}

// Implementation for tokio channels
impl<T> IntoListener<T> for tokio::sync::mpsc::UnboundedSender<T>
where T: Send + Sync + 'static
{
    fn into_listener(self) -> Listener<T> {
        Arc::new(move |value| {
            let _ = self.send(value); // Ignore send errors
        })
    }
}

/// Two listeners are the same registration iff they share an allocation.
pub(crate) fn same_listener<T>(a: &Listener<T>, b: &Listener<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Invoke a listener, catching any panic it raises. Returns `false` if the listener panicked;
/// the panic is logged rather than propagated, so one faulty listener cannot take down the
/// dispatching party or its sibling listeners.
pub fn invoke_guarded<T>(listener: &Listener<T>, value: T) -> bool {
    match catch_unwind(AssertUnwindSafe(|| listener(value))) {
        Ok(()) => true,
        Err(payload) => {
            error!(reason = panic_message(payload.as_ref()), "listener panicked");
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("opaque panic payload")
}
