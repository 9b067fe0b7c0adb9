//! # Canonical Serialization
//!
//! `CanonicalBytes` is the only input accepted by the digest functions.
//! Construction goes through `serde_jcs` (RFC 8785): sorted keys, compact
//! separators, one byte sequence per logical value. Update records hash
//! their content through this path, so two processes writing the same
//! mutation derive the same sort key.
//!
//! Floats are rejected; no licensing attribute is a float and JCS number
//! rendering is the one place two serializers could disagree.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// The inner `Vec<u8>` is private; `CanonicalBytes::new()` is the only
/// constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// `FloatRejected` if the value contains a non-integer number,
    /// `SerializationFailed` if serde cannot render it.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// The canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => Err(CanonicalizationError::FloatRejected(f)),
            _ => Ok(()),
        },
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_sorted_and_compact() {
        let data = serde_json::json!({
            "updatedValues": {"encumberedStatus": "encumbered"},
            "updateType": "encumbrance",
            "removedValues": []
        });
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"removedValues":[],"updateType":"encumbrance","updatedValues":{"encumberedStatus":"encumbered"}}"#
        );
    }

    #[test]
    fn test_nested_float_rejected() {
        let data = serde_json::json!({"previous": {"fee": 12.5}});
        match CanonicalBytes::new(&data) {
            Err(CanonicalizationError::FloatRejected(f)) => assert_eq!(f, 12.5),
            other => panic!("expected FloatRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_integers_and_nulls_accepted() {
        let data = serde_json::json!({"count": -3, "closeDate": null});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"closeDate":null,"count":-3}"#);
        assert!(!cb.is_empty());
    }
}
