//! Positions of a materialized collection, and inputs to its mutations.

use fkarray_core::{Error, Model, Result, Value};
use fkarray_query::record_key;
use std::sync::Arc;

/// One position of a materialized collection.
///
/// `Empty` and `Missing` are both absent markers. They are kept apart so a
/// NULL entry can still be told from a key whose row is gone.
#[derive(Debug, PartialEq)]
pub enum Slot<T> {
    /// The key resolved to this row. Duplicate keys share one `Arc`.
    Record(Arc<T>),
    /// The sequence holds NULL here.
    Empty,
    /// The key matched no row (or no row the active filter admits).
    Missing(Value),
}

impl<T> Slot<T> {
    pub fn is_record(&self) -> bool {
        matches!(self, Slot::Record(_))
    }

    /// Is this position an absent marker?
    pub fn is_absent(&self) -> bool {
        !self.is_record()
    }

    pub fn record(&self) -> Option<&T> {
        match self {
            Slot::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Arc<T>> {
        match self {
            Slot::Record(r) => Some(r),
            _ => None,
        }
    }

    /// The unresolved key of a `Missing` position.
    pub fn missing_key(&self) -> Option<&Value> {
        match self {
            Slot::Missing(k) => Some(k),
            _ => None,
        }
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        match self {
            Slot::Record(r) => Slot::Record(Arc::clone(r)),
            Slot::Empty => Slot::Empty,
            Slot::Missing(k) => Slot::Missing(k.clone()),
        }
    }
}

/// Something that can be stored in a key sequence: a target record or a
/// raw key (NULL included).
///
/// Text and other key types go through [`Value`].
#[derive(Debug)]
pub enum Item<'i, T> {
    Record(&'i T),
    Key(Value),
}

impl<T: Model> Item<'_, T> {
    /// The key this item stores as.
    ///
    /// Records must already have a key; raw keys must be NULL or a key type.
    pub fn key(&self, key_attribute: &str) -> Result<Value> {
        match self {
            Item::Record(record) => {
                let key = record_key(*record, key_attribute);
                if key.is_null() {
                    return Err(Error::invalid_argument(
                        key_attribute,
                        format!("{} record has no key; save it first", T::TABLE_NAME),
                    ));
                }
                Ok(key)
            }
            Item::Key(key) if key.is_null() || key.is_key() => Ok(key.clone()),
            Item::Key(key) => Err(Error::invalid_argument(
                key_attribute,
                format!("{} cannot be used as a key", key.type_name()),
            )),
        }
    }
}

impl<'i, T> From<&'i T> for Item<'i, T> {
    fn from(record: &'i T) -> Self {
        Item::Record(record)
    }
}

impl<T> From<Value> for Item<'_, T> {
    fn from(key: Value) -> Self {
        Item::Key(key)
    }
}

impl<T> From<i64> for Item<'_, T> {
    fn from(key: i64) -> Self {
        Item::Key(Value::BigInt(key))
    }
}

impl<T> From<i32> for Item<'_, T> {
    fn from(key: i32) -> Self {
        Item::Key(Value::Int(key))
    }
}

impl<T> From<Option<i64>> for Item<'_, T> {
    fn from(key: Option<i64>) -> Self {
        Item::Key(key.map_or(Value::Null, Value::BigInt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fkarray_core::Row;

    struct Video {
        id: Option<i64>,
    }

    impl Model for Video {
        const TABLE_NAME: &'static str = "videos";
        const PRIMARY_KEY: &'static str = "id";

        fn columns() -> &'static [&'static str] {
            &["id"]
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![("id", self.id.into())]
        }

        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                id: row.get_named("id")?,
            })
        }
    }

    #[test]
    fn item_keys() {
        let saved = Video { id: Some(3) };
        let unsaved = Video { id: None };
        assert_eq!(Item::<Video>::from(&saved).key("id").unwrap(), Value::BigInt(3));
        assert!(Item::<Video>::from(&unsaved).key("id").unwrap_err().is_invalid_argument());
        assert_eq!(Item::<Video>::from(None::<i64>).key("id").unwrap(), Value::Null);
        assert!(
            Item::<Video>::Key(Value::Double(1.5))
                .key("id")
                .unwrap_err()
                .is_invalid_argument()
        );
    }

    #[test]
    fn slot_markers() {
        let hit = Slot::Record(Arc::new(Video { id: Some(1) }));
        assert!(hit.is_record());
        assert_eq!(hit.record().and_then(|v| v.id), Some(1));
        let missing: Slot<Video> = Slot::Missing(Value::BigInt(9));
        assert!(missing.is_absent());
        assert_eq!(missing.missing_key(), Some(&Value::BigInt(9)));
        assert!(Slot::<Video>::Empty.missing_key().is_none());
    }
}
