//! Reactive values living outside the node tree, typically animated from
//! the scripting side. Views redraw when a value they registered changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use crate::props::PropertyValue;

pub type ListenerId = u64;

type Listener = Arc<dyn Fn(&PropertyValue) + Send + Sync>;

pub(crate) struct SharedValueInner {
    value: RwLock<Arc<PropertyValue>>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

/// A value that notifies its listeners on every `set`.
#[derive(Clone)]
pub struct SharedValue {
    inner: Arc<SharedValueInner>,
}

impl SharedValue {
    pub fn new(value: impl Into<PropertyValue>) -> Self {
        Self {
            inner: Arc::new(SharedValueInner {
                value: RwLock::new(Arc::new(value.into())),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn get(&self) -> Arc<PropertyValue> {
        self.inner
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stores `value` and notifies every listener, in registration order.
    pub fn set(&self, value: impl Into<PropertyValue>) {
        let value = Arc::new(value.into());
        *self.inner.value.write().unwrap_or_else(PoisonError::into_inner) = value.clone();

        // Listeners may add or remove listeners, so call them unlocked
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in listeners {
            listener(&value);
        }
    }

    pub fn add_listener(&self, listener: impl Fn(&PropertyValue) + Send + Sync + 'static) -> ListenerId {
        self.inner.add_listener(Arc::new(listener))
    }

    /// Returns false when `id` was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.remove_listener(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn downgrade(&self) -> WeakValue {
        WeakValue {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Identity of the underlying value, stable for its whole lifetime.
    pub fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl std::fmt::Debug for SharedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedValue")
            .field("value", &self.get())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl SharedValueInner {
    fn add_listener(&self, listener: Listener) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }
}

/// Non-owning handle on a [`SharedValue`].
#[derive(Clone)]
pub struct WeakValue {
    inner: Weak<SharedValueInner>,
}

impl WeakValue {
    pub fn upgrade(&self) -> Option<SharedValue> {
        self.inner.upgrade().map(|inner| SharedValue { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl std::fmt::Debug for WeakValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WeakValue(alive: {})", self.is_alive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn set_notifies_all_listeners() {
        let value = SharedValue::new(0.0);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            value.add_listener(move |v| {
                assert_eq!(v.as_number(), Some(1.0));
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        value.set(1.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(value.get().as_number(), Some(1.0));
    }

    #[test]
    fn removed_listener_is_not_called() {
        let value = SharedValue::new(0.0);
        let calls = Arc::new(AtomicUsize::new(0));
        let id = {
            let calls = calls.clone();
            value.add_listener(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert!(value.remove_listener(id));
        assert!(!value.remove_listener(id));
        value.set(2.0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let value = SharedValue::new(0.0);
        let weak = value.downgrade();
        let id = Arc::new(AtomicU64::new(0));
        let id_in = id.clone();

        let registered = value.add_listener(move |_| {
            if let Some(v) = weak.upgrade() {
                v.remove_listener(id_in.load(Ordering::SeqCst));
            }
        });
        id.store(registered, Ordering::SeqCst);

        value.set(1.0);
        assert_eq!(value.listener_count(), 0);
    }

    #[test]
    fn weak_value_does_not_keep_alive() {
        let value = SharedValue::new(0.0);
        let weak = value.downgrade();
        assert!(weak.is_alive());
        drop(value);
        assert!(weak.upgrade().is_none());
    }
}
