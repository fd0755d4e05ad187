//! Model trait for struct-to-row mapping.
//!
//! Owners and targets of an array association both implement [`Model`].
//! Owners additionally implement [`KeyArrays`](crate::KeyArrays) to hand out
//! their array attributes by name.

use crate::Result;
use crate::row::Row;
use crate::value::Value;

/// Trait for types that map to a stored table.
///
/// # Example
///
/// ```
/// use fkarray_core::{Model, Result, Row, Value};
///
/// struct Video {
///     id: Option<i64>,
///     title: String,
/// }
///
/// impl Model for Video {
///     const TABLE_NAME: &'static str = "videos";
///     const PRIMARY_KEY: &'static str = "id";
///
///     fn columns() -> &'static [&'static str] {
///         &["id", "title"]
///     }
///
///     fn to_row(&self) -> Vec<(&'static str, Value)> {
///         vec![("id", self.id.into()), ("title", self.title.clone().into())]
///     }
///
///     fn from_row(row: &Row) -> Result<Self> {
///         Ok(Self {
///             id: row.get_named("id")?,
///             title: row.get_named("title")?,
///         })
///     }
/// }
///
/// let v = Video { id: Some(4), title: "Food Chain".into() };
/// assert_eq!(v.primary_key_value(), Value::BigInt(4));
/// assert!(!v.is_new());
/// ```
pub trait Model: Sized + Send + Sync {
    /// The name of the table.
    const TABLE_NAME: &'static str;

    /// The primary key column.
    const PRIMARY_KEY: &'static str;

    /// All column names in storage order.
    fn columns() -> &'static [&'static str];

    /// Convert this instance to `(column, value)` pairs.
    fn to_row(&self) -> Vec<(&'static str, Value)>;

    /// Construct an instance from a stored row.
    fn from_row(row: &Row) -> Result<Self>;

    /// Read one attribute by column name.
    fn attribute(&self, column: &str) -> Option<Value> {
        self.to_row()
            .into_iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    /// Value of the primary key column, `Value::Null` when unset.
    fn primary_key_value(&self) -> Value {
        self.attribute(Self::PRIMARY_KEY).unwrap_or(Value::Null)
    }

    /// Is this a record that has not been given a key yet?
    fn is_new(&self) -> bool {
        self.primary_key_value().is_null()
    }

    /// Does the model declare this column?
    fn has_column(column: &str) -> bool {
        Self::columns().contains(&column)
    }
}
