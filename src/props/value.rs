//! Property values as they arrive from the scripting layer.
//!
//! A [`PropertyValue`] is immutable once constructed. Mutation happens by
//! replacing the whole value inside a [`NodeProperty`](super::NodeProperty).

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Opaque native object handed through the scripting layer (a rect, a paint,
/// a draw callback, a shared value...).
///
/// Two handles are equal when they point at the same object.
#[derive(Clone)]
pub struct HostHandle {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl HostHandle {
    pub fn new<T: Any + Send + Sync>(object: T) -> Self {
        Self {
            inner: Arc::new(object),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns the wrapped object if it is of type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for HostHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Debug for HostHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HostHandle<{}>", self.type_name)
    }
}

/// Tagged union of everything a property can hold.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(BTreeMap<String, PropertyValue>),
    Host(HostHandle),
}

impl PropertyValue {
    /// Wraps a native object into a host value.
    pub fn host<T: Any + Send + Sync>(object: T) -> Self {
        Self::Host(HostHandle::new(object))
    }

    /// Builds an object value from `(key, value)` pairs.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<PropertyValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Host(_) => "host object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, PropertyValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_host(&self) -> Option<&HostHandle> {
        match self {
            Self::Host(handle) => Some(handle),
            _ => None,
        }
    }

    /// Returns the host object if this is a host value of type `T`.
    pub fn downcast_host<T: Any>(&self) -> Option<&T> {
        self.as_host().and_then(|h| h.downcast_ref::<T>())
    }

    /// Field lookup on object values. Missing fields and non-objects yield `None`.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// True when the object has a non-null field named `key`.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }

    /// Numeric field lookup on object values.
    pub fn number_field(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PropertyValue::as_number)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<f32> for PropertyValue {
    fn from(n: f32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for PropertyValue {
    fn from(n: i32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(items: Vec<PropertyValue>) -> Self {
        Self::Array(items)
    }
}

impl From<HostHandle> for PropertyValue {
    fn from(handle: HostHandle) -> Self {
        Self::Host(handle)
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            // Numbers outside f64 range do not exist in JSON produced by a JS engine
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_objects_convert_recursively() {
        let value = PropertyValue::from(json!({
            "x": 10,
            "flags": [true, null],
            "nested": { "name": "rect" }
        }));

        assert_eq!(value.number_field("x"), Some(10.0));
        assert_eq!(
            value.get("flags").and_then(PropertyValue::as_array),
            Some(&[PropertyValue::Bool(true), PropertyValue::Null][..])
        );
        assert_eq!(
            value.get("nested").and_then(|n| n.get("name")).and_then(PropertyValue::as_str),
            Some("rect")
        );
    }

    #[test]
    fn has_ignores_null_fields() {
        let value = PropertyValue::from(json!({ "x": null, "y": 1 }));
        assert!(!value.has("x"));
        assert!(value.has("y"));
        assert!(!value.has("z"));
    }

    #[test]
    fn host_handles_compare_by_identity() {
        let a = HostHandle::new(5u32);
        let b = HostHandle::new(5u32);

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<u32>(), Some(&5));
        assert!(a.downcast_ref::<i64>().is_none());
    }
}
