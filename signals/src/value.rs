use std::sync::Arc;

/// A shared, lock-guarded value slot.
///
/// Clones share storage, so one handle can live inside a long-lived task while
/// another serves synchronous reads. Readers never observe a torn value: `with`
/// and `value` take the read lock, `set` and `set_with` the write lock.
pub struct ValueCell<T>(Arc<std::sync::RwLock<T>>);

impl<T> Clone for ValueCell<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> ValueCell<T> {
    pub fn new(value: T) -> Self { Self(Arc::new(std::sync::RwLock::new(value))) }

    pub fn set(&self, value: T) {
        let mut current = self.0.write().unwrap();
        *current = value;
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.0.read().unwrap();
        f(&*guard)
    }

    /// Replace the value, then run `f` against the replacement while the write
    /// lock is still held. Anything sequenced inside `f` is ordered before the
    /// next read of the cell.
    pub fn set_with<R>(&self, value: T, f: impl FnOnce(&T) -> R) -> R {
        let mut current = self.0.write().unwrap();
        *current = value;
        f(&*current)
    }
}

impl<T: Clone> ValueCell<T> {
    pub fn value(&self) -> T { self.0.read().unwrap().clone() }
}
