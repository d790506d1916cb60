use std::sync::{Arc, Mutex};

use tally_signals::Listener;

/// Records every value delivered to one subscription, in arrival order.
pub struct DeliveryLog<T> {
    deliveries: Arc<Mutex<Vec<T>>>,
}

impl<T: Send + Sync + 'static> DeliveryLog<T> {
    pub fn new() -> Self {
        Self { deliveries: Arc::new(Mutex::new(Vec::new())) }
    }

    /// The listener to subscribe; everything it gets handed lands in this log.
    pub fn listener(&self) -> Listener<T> {
        let deliveries = self.deliveries.clone();
        Arc::new(move |value| deliveries.lock().unwrap().push(value))
    }

    /// Takes everything delivered since the last drain.
    pub fn drain(&self) -> Vec<T> {
        self.deliveries.lock().unwrap().drain(..).collect()
    }

    /// Deliveries currently in the log.
    pub fn len(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}
