//! # Store Expressions
//!
//! Conditions guard writes, key conditions select sort-key ranges, update
//! expressions describe in-place attribute changes. All three are plain
//! data, evaluated by the store backend.

use serde_json::{Map, Value};

use crate::item::Item;

/// A predicate over the current version of an item (`None` if absent).
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Attribute present and not null.
    AttributeExists(String),
    /// Attribute absent or null. True for a missing item.
    AttributeNotExists(String),
    /// Attribute equals the given value.
    AttributeEquals(String, Value),
    /// Every sub-condition holds.
    And(Vec<Condition>),
}

impl Condition {
    /// `attribute_exists(name)`.
    pub fn exists(name: &str) -> Self {
        Self::AttributeExists(name.to_string())
    }

    /// `attribute_not_exists(name)`.
    pub fn not_exists(name: &str) -> Self {
        Self::AttributeNotExists(name.to_string())
    }

    /// `name = value`.
    pub fn equals(name: &str, value: impl Into<Value>) -> Self {
        Self::AttributeEquals(name.to_string(), value.into())
    }

    /// The item exists.
    pub fn item_exists() -> Self {
        Self::exists(Item::PK)
    }

    /// The item does not exist.
    pub fn item_not_exists() -> Self {
        Self::not_exists(Item::PK)
    }

    /// Conjunction of `self` and `other`.
    pub fn and(self, other: Condition) -> Self {
        match self {
            Self::And(mut all) => {
                all.push(other);
                Self::And(all)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Evaluate against the current version of an item.
    pub fn evaluate(&self, item: Option<&Item>) -> bool {
        match self {
            Self::AttributeExists(name) => item.is_some_and(|i| i.has(name)),
            Self::AttributeNotExists(name) => !item.is_some_and(|i| i.has(name)),
            Self::AttributeEquals(name, expected) => {
                item.and_then(|i| i.get(name)).is_some_and(|v| v == expected)
            }
            Self::And(all) => all.iter().all(|c| c.evaluate(item)),
        }
    }
}

/// A condition on the sort key of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCondition {
    /// Exact match.
    Equals(String),
    /// Prefix match.
    BeginsWith(String),
    /// Strictly less than.
    LessThan(String),
    /// Inclusive range.
    Between(String, String),
}

impl KeyCondition {
    /// True if `sort_key` satisfies the condition.
    pub fn matches(&self, sort_key: &str) -> bool {
        match self {
            Self::Equals(v) => sort_key == v,
            Self::BeginsWith(prefix) => sort_key.starts_with(prefix.as_str()),
            Self::LessThan(v) => sort_key < v.as_str(),
            Self::Between(lo, hi) => sort_key >= lo.as_str() && sort_key <= hi.as_str(),
        }
    }
}

/// `SET` and `REMOVE` clauses applied to one item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateExpression {
    /// Attributes to set.
    pub set: Map<String, Value>,
    /// Attributes to remove.
    pub remove: Vec<String>,
}

impl UpdateExpression {
    /// An empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `SET name = value` clause.
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set.insert(name.to_string(), value.into());
        self
    }

    /// Add a `REMOVE name` clause.
    pub fn remove(mut self, name: &str) -> Self {
        self.remove.push(name.to_string());
        self
    }

    /// True if the expression changes nothing.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    /// Apply the clauses to `item` in place.
    pub fn apply(&self, item: &mut Item) {
        for (name, value) in &self.set {
            item.set(name.clone(), value.clone());
        }
        for name in &self.remove {
            item.remove(name);
        }
    }
}
