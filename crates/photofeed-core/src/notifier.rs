//! Change notification
//!
//! [`ChangeNotifier`] is a named, payload-less broadcast. Observers re-read
//! the store themselves after being told something changed.
//!
//! Two ways to listen:
//! - [`ChangeNotifier::subscribe`]: synchronous callback, invoked on the
//!   publisher's task in registration order. Only a weak reference is kept.
//! - [`ChangeNotifier::watch`]: async stream with one item per publish.

use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

/// Name of the event fired when the photo list grows
pub const DID_CHANGE: &str = "PhotoStoreDidChange";

/// Default capacity of the `watch()` broadcast buffer
const DEFAULT_WATCH_CAPACITY: usize = 16;

/// Receives change notifications
pub trait ChangeObserver: Send + Sync {
    /// Called once per publish with the event name
    fn on_change(&self, event: &str);
}

/// Handle returned by [`ChangeNotifier::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Inner {
    name: &'static str,
    observers: Mutex<Registry>,
    ticks: broadcast::Sender<()>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(ObserverId, Weak<dyn ChangeObserver>)>,
}

/// Process-wide broadcast of a single named event
///
/// Cloning is cheap and every clone publishes to the same observers.
#[derive(Clone)]
pub struct ChangeNotifier {
    inner: Arc<Inner>,
}

impl ChangeNotifier {
    /// Create a notifier for [`DID_CHANGE`]
    pub fn new() -> Self {
        Self::with_capacity(DID_CHANGE, DEFAULT_WATCH_CAPACITY)
    }

    /// Create a notifier with a custom event name and `watch()` buffer size
    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        let (ticks, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                name,
                observers: Mutex::new(Registry::default()),
                ticks,
            }),
        }
    }

    /// Event name
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Register an observer
    ///
    /// The notifier keeps a weak reference: dropping the last `Arc` of the
    /// observer unregisters it implicitly.
    pub fn subscribe(&self, observer: &Arc<dyn ChangeObserver>) -> ObserverId {
        let mut registry = self.registry();
        let id = ObserverId(registry.next_id);
        registry.next_id += 1;
        registry.entries.push((id, Arc::downgrade(observer)));
        id
    }

    /// Unregister an observer; unknown ids are ignored
    pub fn unsubscribe(&self, id: ObserverId) {
        self.registry().entries.retain(|(entry, _)| *entry != id);
    }

    /// Number of registered observers that are still alive
    pub fn observer_count(&self) -> usize {
        self.registry()
            .entries
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    /// Stream yielding `()` once per publish
    ///
    /// A consumer that falls behind by more than the buffer capacity skips
    /// the missed ticks rather than erroring.
    pub fn watch(&self) -> impl Stream<Item = ()> + Send + use<> {
        let name = self.inner.name;
        BroadcastStream::new(self.inner.ticks.subscribe()).filter_map(move |tick| match tick {
            Ok(()) => Some(()),
            Err(lagged) => {
                debug!("{} watcher lagged: {}", name, lagged);
                None
            }
        })
    }

    /// Deliver the event to every live observer, in registration order
    ///
    /// Observers run synchronously on the caller's task. Dropped observers
    /// are pruned.
    pub fn publish(&self) {
        let live: Vec<Arc<dyn ChangeObserver>> = {
            let mut registry = self.registry();
            registry.entries.retain(|(_, weak)| weak.strong_count() > 0);
            registry
                .entries
                .iter()
                .filter_map(|(_, weak)| weak.upgrade())
                .collect()
        };

        debug!("Publishing {} to {} observer(s)", self.inner.name, live.len());
        for observer in live {
            observer.on_change(self.inner.name);
        }

        // No receivers is fine
        let _ = self.inner.ticks.send(());
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        match self.inner.observers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Observer registry lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("name", &self.inner.name)
            .field("observers", &self.observer_count())
            .finish()
    }
}
