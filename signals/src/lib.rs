/*!
Listener plumbing for tally value stores.

# Design requirements:
- Listener callbacks are plain `Fn(T)` - no trait objects for subscribers to implement
- Registration order is observable: sends reach listeners oldest-first
- The registry is bounded; overflowing it evicts the oldest listener instead of erroring
- Re-registering the same shared callback is suppressed rather than doubled
- A panicking listener is isolated: logged, removed, and the remaining listeners still run
- Sends can be debounced so a burst of updates collapses into one delivery

# Basic usage

```rust
use tally_signals::ListenerSet;

let set: ListenerSet<i32> = ListenerSet::new();
let _guard = set.subscribe(|value: i32| println!("value changed: {value}"));
set.send(42);
// Should print:
// value changed: 42
```

Dropping the returned guard unsubscribes; [`ListenerGuard::unsubscribe`] does the
same eagerly and is safe to call repeatedly.

# Debounced sends

[`Debounced`] wraps a [`ListenerSet`] and delays delivery until its window has
been quiet, keeping only the newest value. It needs a tokio runtime for its
timer task.
*/

pub mod debounce;
pub mod listener;
pub mod registry;
pub mod value;

pub use debounce::{DEFAULT_DEBOUNCE, Debounced};
pub use listener::{IntoListener, Listener, invoke_guarded};
pub use registry::{ListenerGuard, ListenerSet, MAX_LISTENERS};
pub use value::ValueCell;
