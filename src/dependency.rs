//! Subscriptions from views and nodes to [`SharedValue`]s.
//!
//! Everything here holds values weakly: a value dropped by its owner just
//! turns its subscriptions into no-ops.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::dom::NodeId;
use crate::props::PropertyValue;
use crate::registry::{ViewId, ViewRegistry};
use crate::values::{ListenerId, SharedValue, WeakValue};

pub type ValueListener = Arc<dyn Fn(&PropertyValue) + Send + Sync>;

/// One listener registration on a value. Released exactly once, either by
/// [`unsubscribe`](Self::unsubscribe) or on drop.
pub struct Subscription {
    value: WeakValue,
    id: ListenerId,
    released: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    pub fn is_active(&self) -> bool {
        !self.released && self.value.is_alive()
    }

    fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        if let Some(value) = self.value.upgrade() {
            value.remove_listener(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("released", &self.released)
            .finish()
    }
}

/// Releases a group of subscriptions. Clones share the same group, so
/// whichever clone runs first releases it and the others do nothing.
#[derive(Clone, Default)]
pub struct Unsubscribe {
    subscriptions: Arc<Mutex<Option<Vec<Subscription>>>>,
}

impl Unsubscribe {
    pub fn new(subscriptions: Vec<Subscription>) -> Self {
        Self {
            subscriptions: Arc::new(Mutex::new(Some(subscriptions))),
        }
    }

    pub fn unsubscribe(&self) {
        let taken = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(taken);
    }

    pub fn is_released(&self) -> bool {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unsubscribe(released: {})", self.is_released())
    }
}

/// A node's interest in a value.
#[derive(Clone)]
pub struct NodeSubscription {
    pub value: SharedValue,
    pub listener: ValueListener,
}

type ForwardList = Arc<Mutex<Vec<(NodeId, ValueListener)>>>;

struct ValueSubscription {
    value: WeakValue,
    listeners: ForwardList,
    _subscription: Subscription,
}

/// Tracks the values used by the nodes of one view.
///
/// Each unique value gets a single underlying listener that forwards to
/// every interested node.
#[derive(Default)]
pub struct DependencyManager {
    nodes: HashMap<NodeId, Vec<usize>>,
    values: HashMap<usize, ValueSubscription>,
    redraw: Option<Unsubscribe>,
}

impl DependencyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls `on_change` on every mutation of `value`.
    pub fn subscribe(
        value: &SharedValue,
        on_change: impl Fn(&PropertyValue) + Send + Sync + 'static,
    ) -> Subscription {
        let id = value.add_listener(on_change);
        Subscription {
            value: value.downgrade(),
            id,
            released: false,
        }
    }

    pub fn subscribe_node(&mut self, node: NodeId, infos: Vec<NodeSubscription>) {
        if infos.is_empty() {
            return;
        }

        let keys = self.nodes.entry(node).or_default();
        for info in infos {
            let key = info.value.key();
            let entry = self.values.entry(key).or_insert_with(|| {
                let listeners: ForwardList = Arc::default();
                let forward = listeners.clone();
                let subscription = Self::subscribe(&info.value, move |v| {
                    let current: Vec<ValueListener> = forward
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .iter()
                        .map(|(_, l)| l.clone())
                        .collect();
                    for listener in current {
                        listener(v);
                    }
                });
                ValueSubscription {
                    value: info.value.downgrade(),
                    listeners,
                    _subscription: subscription,
                }
            });

            entry
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((node, info.listener));
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    /// Drops every listener of `node`, and the value subscriptions nobody
    /// else uses anymore.
    pub fn unsubscribe_node(&mut self, node: NodeId) {
        let Some(keys) = self.nodes.remove(&node) else {
            return;
        };

        for key in keys {
            let unused = match self.values.get(&key) {
                Some(sub) => {
                    let mut listeners = sub.listeners.lock().unwrap_or_else(PoisonError::into_inner);
                    listeners.retain(|(owner, _)| *owner != node);
                    listeners.is_empty()
                }
                None => false,
            };
            if unused {
                self.values.remove(&key);
            }
        }
    }

    /// Live values currently subscribed, in no particular order.
    pub fn values(&self) -> Vec<SharedValue> {
        self.values.values().filter_map(|s| s.value.upgrade()).collect()
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Re-registers redraw requests on `view_id` for every unique value.
    pub fn update(&mut self, registry: &ViewRegistry, view_id: ViewId) {
        if let Some(previous) = self.redraw.take() {
            previous.unsubscribe();
        }
        let values = self.values();
        self.redraw = Some(registry.register_values_in_view(view_id, &values));
    }

    /// Releases redraw registrations and every node subscription.
    pub fn remove(&mut self) {
        if let Some(redraw) = self.redraw.take() {
            redraw.unsubscribe();
        }
        self.nodes.clear();
        self.values.clear();
    }
}

impl Drop for DependencyManager {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, ValueListener) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        let listener: ValueListener = Arc::new(move |_| {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (count, listener)
    }

    #[test]
    fn unsubscribe_releases_exactly_once() {
        let value = SharedValue::new(0.0);
        let a = DependencyManager::subscribe(&value, |_| {});
        let b = DependencyManager::subscribe(&value, |_| {});
        assert_eq!(value.listener_count(), 2);

        a.unsubscribe();
        assert_eq!(value.listener_count(), 1);
        assert!(b.is_active());

        drop(b);
        assert_eq!(value.listener_count(), 0);
    }

    #[test]
    fn dead_value_is_a_silent_no_op() {
        let value = SharedValue::new(0.0);
        let sub = DependencyManager::subscribe(&value, |_| {});
        drop(value);
        assert!(!sub.is_active());
        sub.unsubscribe();
    }

    #[test]
    fn unsubscribe_group_is_idempotent() {
        let value = SharedValue::new(0.0);
        let group = Unsubscribe::new(vec![
            DependencyManager::subscribe(&value, |_| {}),
            DependencyManager::subscribe(&value, |_| {}),
        ]);
        let shared = group.clone();

        group.unsubscribe();
        shared.unsubscribe();
        assert!(shared.is_released());
        assert_eq!(value.listener_count(), 0);
    }

    #[test]
    fn one_underlying_listener_per_value() {
        let value = SharedValue::new(0.0);
        let (first_count, first) = counter();
        let (second_count, second) = counter();
        let (a, b) = (NodeId::new(), NodeId::new());

        let mut manager = DependencyManager::new();
        manager.subscribe_node(a, vec![NodeSubscription { value: value.clone(), listener: first }]);
        manager.subscribe_node(b, vec![NodeSubscription { value: value.clone(), listener: second }]);
        assert_eq!(value.listener_count(), 1);
        assert_eq!(manager.value_count(), 1);

        value.set(1.0);
        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);

        manager.unsubscribe_node(a);
        value.set(2.0);
        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 2);

        manager.unsubscribe_node(b);
        assert_eq!(manager.value_count(), 0);
        assert_eq!(value.listener_count(), 0);
    }

    #[test]
    fn remove_releases_everything() {
        let value = SharedValue::new(0.0);
        let (count, listener) = counter();
        let mut manager = DependencyManager::new();
        manager.subscribe_node(NodeId::new(), vec![NodeSubscription { value: value.clone(), listener }]);

        manager.remove();
        value.set(1.0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(value.listener_count(), 0);
    }
}
