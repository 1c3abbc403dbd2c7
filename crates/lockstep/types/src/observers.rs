//! Ordered, synchronous listener registry.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Callback type for event listeners
pub type Listener<E> = Box<dyn FnMut(&E) + Send>;

struct Registry<E> {
    next_id: u64,
    listeners: Vec<(u64, Listener<E>)>,
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64) -> bool;
}

impl<E: 'static> Detach for Mutex<Registry<E>> {
    fn detach(&self, id: u64) -> bool {
        let mut registry = self.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(listener_id, _)| *listener_id != id);
        registry.listeners.len() != before
    }
}

/// Listeners invoked in registration order, on the thread that triggers the
/// event. Clones share the same registry.
///
/// A listener must not subscribe to or notify the registry that is currently
/// invoking it.
pub struct Observers<E> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E: 'static> Observers<E> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> ObserverHandle
    where
        F: FnMut(&E) + Send + 'static,
    {
        let id = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, Box::new(listener)));
            id
        };

        let shared: Arc<dyn Detach> = self.registry.clone();
        ObserverHandle {
            id,
            registry: Arc::downgrade(&shared),
        }
    }

    pub fn notify(&self, event: &E) {
        let mut registry = self.registry.lock();
        for (_, listener) in registry.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.registry.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: 'static> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Observers<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

/// Deregistration handle returned by [`Observers::subscribe`].
///
/// Dropping the handle keeps the listener registered.
pub struct ObserverHandle {
    id: u64,
    registry: Weak<dyn Detach>,
}

impl ObserverHandle {
    /// Removes the listener. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.detach(self.id))
    }
}

impl std::fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverHandle").field("id", &self.id).finish()
    }
}
