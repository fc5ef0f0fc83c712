//! Defaulting navigation over untyped routing-object specs.
//!
//! A spec is an arbitrary JSON document. Every accessor answers "absent" when
//! a key is missing or holds a value of another type, so that a malformed
//! rule can be skipped without failing the enclosing scan.

use serde_json::Value;

pub type AttributeMap = serde_json::Map<String, Value>;

pub trait Attributes {
    fn attribute(&self, key: &str) -> Option<&Value>;

    fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.attribute(key).and_then(Value::as_array)
    }

    fn get_map(&self, key: &str) -> Option<&AttributeMap> {
        self.attribute(key).and_then(Value::as_object)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(Value::as_str)
    }

    /// Returns the string entries of an array, skipping entries of any other
    /// type.
    fn get_strings(&self, key: &str) -> Vec<String> {
        self.get_array(key)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    }

    /// Iterates over the map entries of an array, skipping entries of any
    /// other type.
    fn get_maps(&self, key: &str) -> impl Iterator<Item = &AttributeMap> {
        self.get_array(key)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }
}

impl Attributes for Value {
    #[inline]
    fn attribute(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

impl Attributes for AttributeMap {
    #[inline]
    fn attribute(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}
