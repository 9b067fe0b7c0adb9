//! # Items and Keys
//!
//! An [`Item`] is a JSON object holding a record's attributes, including
//! its `pk` (partition key) and `sk` (sort key). Typed records convert to
//! and from items at the model layer; the store only sees items.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Compound primary key of a stored item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    /// Partition key.
    pub pk: String,
    /// Sort key.
    pub sk: String,
}

impl RecordKey {
    /// Build a key from its two parts.
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} | {}", self.pk, self.sk)
    }
}

/// A stored document: attribute name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl Item {
    /// Attribute holding the partition key.
    pub const PK: &'static str = "pk";
    /// Attribute holding the sort key.
    pub const SK: &'static str = "sk";

    /// An empty item.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap an attribute map.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Serialize a value into an item. The value must serialize to a JSON
    /// object.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, StoreError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StoreError::InvalidRequest(format!(
                "items must serialize to JSON objects, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Deserialize the item into a typed value. Unknown attributes are
    /// ignored by default serde rules.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }

    /// The item's primary key.
    pub fn key(&self) -> Result<RecordKey, StoreError> {
        match (self.get_str(Self::PK), self.get_str(Self::SK)) {
            (Some(pk), Some(sk)) => Ok(RecordKey::new(pk, sk)),
            _ => Err(StoreError::InvalidRequest(
                "item is missing its pk or sk attribute".to_string(),
            )),
        }
    }

    /// Set both key attributes.
    pub fn set_key(&mut self, key: &RecordKey) {
        self.set(Self::PK, Value::String(key.pk.clone()));
        self.set(Self::SK, Value::String(key.sk.clone()));
    }

    /// Read an attribute.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Read a string attribute.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// True if the attribute is present and not null.
    pub fn has(&self, name: &str) -> bool {
        matches!(self.0.get(name), Some(v) if !v.is_null())
    }

    /// Set an attribute, returning the old value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    /// Remove an attribute, returning the old value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Borrow the attribute map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Take the attribute map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Item> for Value {
    fn from(item: Item) -> Self {
        Value::Object(item.0)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
