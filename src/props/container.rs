use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::PropertyError;
use crate::props::{Dependencies, PropId, PropertyValue};

/// A single named input slot on a node.
#[derive(Clone, Debug)]
pub struct NodeProperty {
    name: PropId,
    value: Option<Arc<PropertyValue>>,
    /// Container generation of the last identity change.
    changed_at: u64,
    /// Cleared on every change, set once the owning node finished a render pass.
    read: bool,
}

impl NodeProperty {
    fn new(name: PropId) -> Self {
        Self {
            name,
            value: None,
            changed_at: 0,
            read: false,
        }
    }

    pub fn name(&self) -> &PropId {
        &self.name
    }

    /// True when the slot holds something other than `null`.
    pub fn has_value(&self) -> bool {
        self.value.as_deref().is_some_and(|v| !v.is_null())
    }

    /// The current value, `None` when unset or `null`.
    pub fn value(&self) -> Option<&PropertyValue> {
        self.value.as_deref().filter(|v| !v.is_null())
    }

    /// The stored value including its identity.
    pub fn shared_value(&self) -> Option<&Arc<PropertyValue>> {
        self.value.as_ref()
    }

    pub fn changed_at(&self) -> u64 {
        self.changed_at
    }

    /// Whether the current value has been through a completed render pass.
    pub fn has_been_read(&self) -> bool {
        self.read
    }

    /// Replaces the value. Storing the very same `Arc` again is not a change.
    fn update(&mut self, value: Arc<PropertyValue>, generation: u64) -> bool {
        if self.value.as_ref().is_some_and(|old| Arc::ptr_eq(old, &value)) {
            return false;
        }
        self.value = Some(value);
        self.changed_at = generation;
        self.read = false;
        true
    }
}

/// Outcome of applying one property batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropsChange {
    /// Generation the batch was applied at.
    pub generation: u64,
    /// Names whose stored value identity changed, in batch order.
    pub changed: Vec<PropId>,
}

impl PropsChange {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.changed.iter().any(|n| n.as_str() == name)
    }

    /// True when any changed name is part of `deps`.
    pub fn touches(&self, deps: &Dependencies) -> bool {
        self.changed.iter().any(|n| deps.contains(n.as_str()))
    }
}

/// The set of properties owned by one node (or one view's pending properties).
///
/// Batches are applied atomically: the whole batch is validated before any
/// slot is written, and a batch bumps the generation counter at most once.
#[derive(Clone, Debug, Default)]
pub struct PropertyContainer {
    slots: HashMap<PropId, NodeProperty>,
    /// Insertion order, used for iteration and diffing.
    order: Vec<PropId>,
    generation: u64,
}

impl PropertyContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation. Increases by one per batch that changed anything.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Applies a batch of `name → value` updates.
    ///
    /// Either every name is written or, when validation fails, nothing changes.
    pub fn set_properties<K, V, I>(&mut self, batch: I) -> Result<PropsChange, PropertyError>
    where
        K: Into<PropId>,
        V: Into<Arc<PropertyValue>>,
        I: IntoIterator<Item = (K, V)>,
    {
        let batch: Vec<(PropId, Arc<PropertyValue>)> = batch
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        if batch.iter().any(|(name, _)| name.as_str().is_empty()) {
            return Err(PropertyError::EmptyName);
        }

        let next = self.generation.wrapping_add(1);
        let mut changed = Vec::new();

        for (name, value) in batch {
            let slot = match self.slots.get_mut(name.as_str()) {
                Some(slot) => slot,
                None => {
                    self.order.push(name.clone());
                    self.slots
                        .entry(name.clone())
                        .or_insert_with(|| NodeProperty::new(name.clone()))
                }
            };

            if slot.update(value, next) && !changed.contains(&name) {
                changed.push(name);
            }
        }

        if !changed.is_empty() {
            self.generation = next;
        }

        Ok(PropsChange {
            generation: self.generation,
            changed,
        })
    }

    /// Single-entry batch.
    pub fn set_property(
        &mut self,
        name: impl Into<PropId>,
        value: impl Into<Arc<PropertyValue>>,
    ) -> Result<PropsChange, PropertyError> {
        self.set_properties([(name.into(), value.into())])
    }

    /// Copies every slot of `other` into this container, in `other`'s order.
    /// Value identity is preserved, so unchanged values stay unchanged.
    pub fn merge_from(&mut self, other: &PropertyContainer) -> PropsChange {
        let batch: Vec<(PropId, Arc<PropertyValue>)> = other
            .iter()
            .filter_map(|p| p.shared_value().map(|v| (p.name().clone(), v.clone())))
            .collect();

        // Names coming from another container are never empty
        self.set_properties(batch).unwrap_or_default()
    }

    pub fn property(&self, name: &str) -> Option<&NodeProperty> {
        self.slots.get(name)
    }

    /// Non-null value of `name`.
    pub fn value(&self, name: &str) -> Option<&PropertyValue> {
        self.property(name).and_then(NodeProperty::value)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.value(name).and_then(PropertyValue::as_number)
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.property(name).is_some_and(NodeProperty::has_value)
    }

    /// Generation at which `name` last changed identity, `None` if never set.
    pub fn changed_at(&self, name: &str) -> Option<u64> {
        self.property(name).map(NodeProperty::changed_at)
    }

    /// True when any of `deps` changed after `generation`.
    pub fn changed_since(&self, generation: u64, deps: &Dependencies) -> bool {
        deps.names()
            .iter()
            .any(|n| self.changed_at(n.as_str()).is_some_and(|at| at > generation))
    }

    /// True while some value has not been through a render pass yet.
    pub fn has_unread_changes(&self) -> bool {
        self.slots.values().any(|p| !p.read)
    }

    /// Marks every current value as consumed.
    pub fn mark_read(&mut self) {
        for slot in self.slots.values_mut() {
            slot.read = true;
        }
    }

    /// Iterates slots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeProperty> {
        self.order.iter().filter_map(|n| self.slots.get(n.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_bumps_generation_once() {
        let mut props = PropertyContainer::new();
        let change = props
            .set_properties([("x", PropertyValue::from(1.0)), ("y", PropertyValue::from(2.0))])
            .unwrap();

        assert_eq!(change.generation, 1);
        assert_eq!(change.changed, vec![PropId::new("x"), PropId::new("y")]);
        assert_eq!(props.generation(), 1);
        assert_eq!(props.number("y"), Some(2.0));
    }

    #[test]
    fn invalid_batch_changes_nothing() {
        let mut props = PropertyContainer::new();
        props.set_property("x", PropertyValue::from(1.0)).unwrap();

        let err = props
            .set_properties([("x", PropertyValue::from(5.0)), ("", PropertyValue::from(1.0))])
            .unwrap_err();

        assert_eq!(err, PropertyError::EmptyName);
        assert_eq!(props.number("x"), Some(1.0));
        assert_eq!(props.generation(), 1);
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn same_arc_is_not_a_change() {
        let mut props = PropertyContainer::new();
        let shared = Arc::new(PropertyValue::from("red"));

        props.set_property("color", shared.clone()).unwrap();
        let change = props.set_property("color", shared).unwrap();

        assert!(change.is_empty());
        assert_eq!(props.generation(), 1);
    }

    #[test]
    fn equal_but_new_value_is_a_change() {
        let mut props = PropertyContainer::new();
        props.set_property("x", PropertyValue::from(1.0)).unwrap();
        let change = props.set_property("x", PropertyValue::from(1.0)).unwrap();

        assert!(change.contains("x"));
        assert_eq!(props.generation(), 2);
    }

    #[test]
    fn null_means_no_value() {
        let mut props = PropertyContainer::new();
        props.set_property("x", PropertyValue::Null).unwrap();

        assert!(props.property("x").is_some());
        assert!(!props.has_value("x"));
        assert!(props.value("x").is_none());
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut props = PropertyContainer::new();
        props.set_property("b", PropertyValue::from(1.0)).unwrap();
        props.set_property("a", PropertyValue::from(2.0)).unwrap();
        props.set_property("b", PropertyValue::from(3.0)).unwrap();

        let names: Vec<&str> = props.iter().map(|p| p.name().as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn merge_preserves_identity_and_order() {
        let mut pending = PropertyContainer::new();
        pending.set_property("mode", PropertyValue::from("continuous")).unwrap();
        pending.set_property("debug", PropertyValue::from(true)).unwrap();

        let mut live = PropertyContainer::new();
        let first = live.merge_from(&pending);
        assert_eq!(first.changed, vec![PropId::new("mode"), PropId::new("debug")]);

        let second = live.merge_from(&pending);
        assert!(second.is_empty());
    }

    #[test]
    fn read_marker_resets_on_change() {
        let mut props = PropertyContainer::new();
        props.set_property("x", PropertyValue::from(1.0)).unwrap();
        assert!(props.has_unread_changes());

        props.mark_read();
        assert!(!props.has_unread_changes());
        assert!(props.property("x").unwrap().has_been_read());

        props.set_property("x", PropertyValue::from(2.0)).unwrap();
        assert!(props.has_unread_changes());
    }
}
