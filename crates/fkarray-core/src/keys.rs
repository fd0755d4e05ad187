//! Ordered foreign-key sequences stored on owner records.

use crate::Result;
use crate::model::Model;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered list of target keys held by an owner.
///
/// Duplicates and NULL entries are allowed; the sequence alone defines the
/// length and order of the collection built over it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeySequence(Vec<Value>);

impl KeySequence {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn as_mut_vec(&mut self) -> &mut Vec<Value> {
        &mut self.0
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Distinct non-NULL keys in first-occurrence order.
    pub fn distinct_non_null(&self) -> Vec<Value> {
        let mut seen = HashSet::new();
        self.0
            .iter()
            .filter(|k| !k.is_null())
            .filter(|k| seen.insert(*k))
            .cloned()
            .collect()
    }

    /// Number of NULL entries.
    pub fn null_count(&self) -> usize {
        self.0.iter().filter(|k| k.is_null()).count()
    }

    /// Encode as a JSON array, for stores that keep arrays as JSON text.
    ///
    /// Integer and text keys are written bare, NULL as `null`; other values
    /// keep their tagged serde form.
    pub fn to_json(&self) -> Result<String> {
        let items = self
            .0
            .iter()
            .map(|key| match key {
                Value::Null => Ok(serde_json::Value::Null),
                Value::Int(v) => Ok(serde_json::Value::from(*v)),
                Value::BigInt(v) => Ok(serde_json::Value::from(*v)),
                Value::Text(s) => Ok(serde_json::Value::String(s.clone())),
                other => serde_json::to_value(other),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(serde_json::Value::Array(items).to_string())
    }

    /// Decode from a JSON array of keys.
    ///
    /// Bare JSON numbers and strings are accepted as well as tagged
    /// [`Value`]s.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<serde_json::Value> = serde_json::from_str(json)?;
        raw.into_iter()
            .map(|item| match item {
                serde_json::Value::Null => Ok(Value::Null),
                serde_json::Value::Number(n) => n
                    .as_i64()
                    .map(Value::BigInt)
                    .ok_or_else(|| {
                        crate::Error::invalid_argument("key", format!("{n} is not an integer key"))
                    }),
                serde_json::Value::String(s) => Ok(Value::Text(s)),
                tagged @ serde_json::Value::Object(_) => Ok(serde_json::from_value(tagged)?),
                other => Err(crate::Error::invalid_argument("key", format!("{other} is not a key"))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

impl From<Vec<Value>> for KeySequence {
    fn from(keys: Vec<Value>) -> Self {
        Self(keys)
    }
}

impl From<Vec<i64>> for KeySequence {
    fn from(keys: Vec<i64>) -> Self {
        Self(keys.into_iter().map(Value::BigInt).collect())
    }
}

impl From<Vec<Option<i64>>> for KeySequence {
    fn from(keys: Vec<Option<i64>>) -> Self {
        Self(keys.into_iter().map(Value::from).collect())
    }
}

impl From<KeySequence> for Value {
    fn from(keys: KeySequence) -> Self {
        Value::Array(keys.0)
    }
}

impl FromIterator<Value> for KeySequence {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a KeySequence {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Owners that store one or more key sequences.
///
/// `attribute` is the array column name given at declaration time.
pub trait KeyArrays: Model {
    fn key_array(&self, attribute: &str) -> Option<&KeySequence>;

    fn key_array_mut(&mut self, attribute: &str) -> Option<&mut KeySequence>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_skips_nulls_and_repeats() {
        let keys = KeySequence::from(vec![
            Value::Int(2),
            Value::Null,
            Value::BigInt(1),
            Value::BigInt(2),
            Value::Null,
            Value::Int(3),
        ]);
        assert_eq!(
            keys.distinct_non_null(),
            vec![Value::Int(2), Value::BigInt(1), Value::Int(3)]
        );
        assert_eq!(keys.null_count(), 2);
        assert_eq!(keys.len(), 6);
    }

    #[test]
    fn json_round_trip_keeps_nulls_and_order() {
        let keys = KeySequence::from(vec![Some(2), None, Some(2), Some(1)]);
        let json = keys.to_json().unwrap();
        assert_eq!(json, "[2,null,2,1]");
        assert_eq!(KeySequence::from_json(&json).unwrap(), keys);

        let uuid = KeySequence::from(vec![Value::Uuid([7; 16])]);
        let json = uuid.to_json().unwrap();
        assert_eq!(KeySequence::from_json(&json).unwrap(), uuid);
    }

    #[test]
    fn from_json_accepts_bare_scalars() {
        let keys = KeySequence::from_json(r#"[1, null, "abc"]"#).unwrap();
        assert_eq!(
            keys.as_slice(),
            &[Value::BigInt(1), Value::Null, Value::from("abc")]
        );
        assert!(KeySequence::from_json("[1.5]").unwrap_err().is_invalid_argument());
        assert!(KeySequence::from_json("{").is_err());
    }

    #[test]
    fn serde_is_transparent() {
        let keys = KeySequence::from(vec![1_i64, 2]);
        let json = serde_json::to_string(&keys).unwrap();
        assert_eq!(json, r#"[{"BigInt":1},{"BigInt":2}]"#);
    }
}
