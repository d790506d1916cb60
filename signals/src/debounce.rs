use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::registry::ListenerSet;

/// Default quiet period before a pending value is sent to listeners.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Debounced fan-out over a [`ListenerSet`].
///
/// Each [`notify`](Debounced::notify) arms a single timer for the configured
/// window and remembers the value. A notify arriving inside the window replaces
/// both: the timer restarts and the earlier value is discarded, so a burst of
/// writes collapses into one send carrying the last value. Quiet windows are
/// independent; values separated by more than the window each get their own
/// send.
///
/// `notify` must be called from within a tokio runtime, since the timer runs
/// as a spawned task.
pub struct Debounced<T>(Arc<Inner<T>>);

struct Inner<T> {
    listeners: ListenerSet<T>,
    window: Duration,
    timer: Mutex<Timer<T>>,
}

struct Timer<T> {
    pending: Option<T>,
    // Increments on every notify; a fire whose sequence number is no longer
    // current was superseded and must not send.
    seq: u64,
    handle: Option<JoinHandle<()>>,
}

impl<T> Clone for Debounced<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> std::fmt::Debug for Debounced<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debounced").field("window", &self.0.window).field("armed", &self.0.timer.lock().unwrap().handle.is_some()).finish()
    }
}

impl<T> Debounced<T>
where T: Clone + Send + Sync + 'static
{
    pub fn new(listeners: ListenerSet<T>, window: Duration) -> Self {
        Self(Arc::new(Inner { listeners, window, timer: Mutex::new(Timer { pending: None, seq: 0, handle: None }) }))
    }

    /// Schedules `value` for delivery once the window elapses with no newer
    /// notify. Replaces any value still waiting.
    pub fn notify(&self, value: T) {
        let mut timer = self.0.timer.lock().unwrap();
        timer.pending = Some(value);
        timer.seq += 1;
        let seq = timer.seq;
        if let Some(handle) = timer.handle.take() {
            handle.abort();
        }
        let inner = self.0.clone();
        timer.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.window).await;
            inner.fire(seq);
        }));
    }

    /// The listener set this debouncer delivers to.
    pub fn listeners(&self) -> &ListenerSet<T> { &self.0.listeners }
}

impl<T> Inner<T>
where T: Clone
{
    fn fire(&self, seq: u64) {
        let value = {
            let mut timer = self.timer.lock().unwrap();
            // abort() can lose the race with an already-running timer task, so
            // the sequence check is what actually cancels a superseded send
            if timer.seq != seq {
                debug!("debounce timer superseded, skipping send");
                return;
            }
            timer.handle = None;
            match timer.pending.take() {
                Some(value) => value,
                None => return,
            }
        };
        self.listeners.send(value);
    }
}
