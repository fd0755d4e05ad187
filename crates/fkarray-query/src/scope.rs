//! Set-relationship predicates over an owner's key array column.
//!
//! Given a description of a set of target keys, [`SetQueryScope`] builds a
//! condition on the owner table comparing the owner's array column against
//! that set:
//!
//! | relation      | meaning                         | empty set matches      |
//! |---------------|---------------------------------|------------------------|
//! | `containing`  | owner array is a superset       | every owner            |
//! | `contained_in`| owner array is a subset         | owners with no keys    |
//! | `overlaps`    | owner array shares a key        | no owner               |

use crate::expr::Expr;
use crate::select::Select;
use crate::subquery::SelectQuery;
use fkarray_core::{Error, Model, Result, Value};
use std::fmt;
use std::marker::PhantomData;

/// The three supported set relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetRelation {
    /// Owner array is a superset of the given keys.
    Containing,
    /// Owner array is a subset of the given keys.
    ContainedIn,
    /// Owner array shares at least one key with the given keys.
    Overlaps,
}

impl SetRelation {
    pub const fn as_str(self) -> &'static str {
        match self {
            SetRelation::Containing => "containing",
            SetRelation::ContainedIn => "contained_in",
            SetRelation::Overlaps => "overlaps",
        }
    }
}

impl fmt::Display for SetRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A description of a set of target keys.
pub enum KeySet<'r, T: Model> {
    /// One target record.
    Record(&'r T),
    /// Several target records.
    Records(Vec<&'r T>),
    /// Raw key values.
    Keys(Vec<Value>),
    /// Keys produced by a query over the target table, evaluated by the
    /// store rather than loaded up front.
    Query(Select<T>),
}

impl<'r, T: Model> KeySet<'r, T> {
    /// A set of raw keys.
    pub fn keys<V: Into<Value>>(keys: impl IntoIterator<Item = V>) -> Self {
        KeySet::Keys(keys.into_iter().map(Into::into).collect())
    }

    /// The empty set.
    pub fn empty() -> Self {
        KeySet::Keys(Vec::new())
    }

    fn shape(&self) -> &'static str {
        match self {
            KeySet::Record(_) => "record",
            KeySet::Records(_) => "records",
            KeySet::Keys(_) => "keys",
            KeySet::Query(_) => "query",
        }
    }
}

impl<T: Model> fmt::Debug for KeySet<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySet::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            KeySet::Records(records) => write!(f, "Records({} x {})", records.len(), T::TABLE_NAME),
            KeySet::Record(_) => write!(f, "Record({})", T::TABLE_NAME),
            KeySet::Query(q) => f.debug_tuple("Query").field(q).finish(),
        }
    }
}

impl<'r, T: Model> From<&'r T> for KeySet<'r, T> {
    fn from(record: &'r T) -> Self {
        KeySet::Record(record)
    }
}

impl<'r, T: Model> From<&'r [T]> for KeySet<'r, T> {
    fn from(records: &'r [T]) -> Self {
        KeySet::Records(records.iter().collect())
    }
}

impl<'r, T: Model> From<&'r Vec<T>> for KeySet<'r, T> {
    fn from(records: &'r Vec<T>) -> Self {
        KeySet::Records(records.iter().collect())
    }
}

impl<'r, T: Model> From<Vec<&'r T>> for KeySet<'r, T> {
    fn from(records: Vec<&'r T>) -> Self {
        KeySet::Records(records)
    }
}

impl<T: Model> From<Vec<Value>> for KeySet<'_, T> {
    fn from(keys: Vec<Value>) -> Self {
        KeySet::Keys(keys)
    }
}

impl<T: Model> From<Select<T>> for KeySet<'_, T> {
    fn from(query: Select<T>) -> Self {
        KeySet::Query(query)
    }
}

/// Read a record's key attribute; NULL when the record has none.
pub fn record_key<T: Model>(record: &T, key_attribute: &str) -> Value {
    record.attribute(key_attribute).unwrap_or(Value::Null)
}

fn checked_key(key: Value, source: &str) -> Result<Value> {
    if key.is_null() {
        return Err(Error::invalid_argument("key set", format!("{source} has no key")));
    }
    if !key.is_key() {
        return Err(Error::invalid_argument(
            "key set",
            format!("{source} key of type {} cannot identify a row", key.type_name()),
        ));
    }
    Ok(key)
}

/// A key set reduced to something a predicate can compare against.
enum KeyOperand {
    Literal(Vec<Value>),
    Subquery(SelectQuery),
}

fn resolve<T: Model>(set: KeySet<'_, T>, key_attribute: &str) -> Result<KeyOperand> {
    let source = format!("{} {}", T::TABLE_NAME, set.shape());
    match set {
        KeySet::Record(record) => Ok(KeyOperand::Literal(vec![checked_key(
            record_key(record, key_attribute),
            &source,
        )?])),
        KeySet::Records(records) => records
            .into_iter()
            .map(|r| checked_key(record_key(r, key_attribute), &source))
            .collect::<Result<Vec<_>>>()
            .map(KeyOperand::Literal),
        KeySet::Keys(keys) => keys
            .into_iter()
            .map(|k| checked_key(k, &source))
            .collect::<Result<Vec<_>>>()
            .map(KeyOperand::Literal),
        KeySet::Query(select) => select.into_key_subquery(key_attribute).map(KeyOperand::Subquery),
    }
}

/// Builds set-relationship conditions on owner `O`'s array column
/// against keys of target `T`.
///
/// An empty literal set is resolved while building: containing renders
/// `TRUE`, contained-in tests the array for emptiness, overlaps renders
/// `FALSE`. A sub-query's keys are only known to the store, so its set is
/// compared with the array operators. Owners whose array is NULL differ
/// between the two: `containing(∅)` and `contained_in(∅)` match them, while
/// every operator comparison against a NULL array is NULL and never
/// matches, even when the sub-query yields no keys.
pub struct SetQueryScope<O: Model, T: Model> {
    array_attribute: String,
    key_attribute: String,
    _marker: PhantomData<fn() -> (O, T)>,
}

impl<O: Model, T: Model> SetQueryScope<O, T> {
    /// `array_attribute` is the owner's array column, `key_attribute` the
    /// target column its elements refer to.
    pub fn new(array_attribute: impl Into<String>, key_attribute: impl Into<String>) -> Self {
        Self {
            array_attribute: array_attribute.into(),
            key_attribute: key_attribute.into(),
            _marker: PhantomData,
        }
    }

    pub fn array_attribute(&self) -> &str {
        &self.array_attribute
    }

    pub fn key_attribute(&self) -> &str {
        &self.key_attribute
    }

    /// Build the condition for `relation` against `set`.
    ///
    /// Input is validated here, before anything executes.
    pub fn predicate<'r>(
        &self,
        relation: SetRelation,
        set: impl Into<KeySet<'r, T>>,
    ) -> Result<Expr>
    where
        T: 'r,
    {
        let column = Expr::col(self.array_attribute.clone());
        let operand = resolve(set.into(), &self.key_attribute)?;

        let expr = match operand {
            KeyOperand::Literal(keys) if keys.is_empty() => {
                tracing::debug!(
                    owner = O::TABLE_NAME,
                    relation = relation.as_str(),
                    "empty key set"
                );
                match relation {
                    SetRelation::Containing => Expr::constant(true),
                    SetRelation::ContainedIn => column.array_is_empty(),
                    SetRelation::Overlaps => Expr::constant(false),
                }
            }
            KeyOperand::Literal(keys) => {
                tracing::debug!(
                    owner = O::TABLE_NAME,
                    relation = relation.as_str(),
                    keys = keys.len(),
                    "set predicate"
                );
                apply(relation, column, Expr::array(keys))
            }
            KeyOperand::Subquery(query) => {
                tracing::debug!(
                    owner = O::TABLE_NAME,
                    relation = relation.as_str(),
                    source = %query.table,
                    "set predicate over sub-query"
                );
                apply(relation, column, Expr::array_subquery(query))
            }
        };
        Ok(expr)
    }

    /// Owners whose array holds every key in `set`.
    pub fn containing<'r>(&self, set: impl Into<KeySet<'r, T>>) -> Result<Select<O>>
    where
        T: 'r,
    {
        Ok(Select::new().filter(self.predicate(SetRelation::Containing, set)?))
    }

    /// Owners whose array holds only keys from `set`.
    pub fn contained_in<'r>(&self, set: impl Into<KeySet<'r, T>>) -> Result<Select<O>>
    where
        T: 'r,
    {
        Ok(Select::new().filter(self.predicate(SetRelation::ContainedIn, set)?))
    }

    /// Owners whose array shares at least one key with `set`.
    pub fn overlaps<'r>(&self, set: impl Into<KeySet<'r, T>>) -> Result<Select<O>>
    where
        T: 'r,
    {
        Ok(Select::new().filter(self.predicate(SetRelation::Overlaps, set)?))
    }
}

fn apply(relation: SetRelation, column: Expr, keys: Expr) -> Expr {
    match relation {
        SetRelation::Containing => column.array_contains(keys),
        SetRelation::ContainedIn => column.array_contained_by(keys),
        SetRelation::Overlaps => column.array_overlaps(keys),
    }
}

impl<O: Model, T: Model> Clone for SetQueryScope<O, T> {
    fn clone(&self) -> Self {
        Self::new(self.array_attribute.clone(), self.key_attribute.clone())
    }
}

impl<O: Model, T: Model> fmt::Debug for SetQueryScope<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetQueryScope")
            .field("owner", &O::TABLE_NAME)
            .field("target", &T::TABLE_NAME)
            .field("array_attribute", &self.array_attribute)
            .field("key_attribute", &self.key_attribute)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fkarray_core::{KeySequence, Row};

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

    struct Playlist {
        id: i64,
        video_ids: KeySequence,
    }

    impl Model for Playlist {
        const TABLE_NAME: &'static str = "playlists";
        const PRIMARY_KEY: &'static str = "id";

        fn columns() -> &'static [&'static str] {
            &["id", "video_ids"]
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("id", self.id.into()),
                ("video_ids", self.video_ids.clone().into()),
            ]
        }

        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                id: row.get_named("id")?,
                video_ids: row.get_named("video_ids")?,
            })
        }
    }

    fn scope() -> SetQueryScope<Playlist, Video> {
        SetQueryScope::new("video_ids", "id")
    }

    fn render(expr: &Expr) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = expr.build(&mut params, 0);
        (sql, params)
    }

    #[test]
    fn records_become_bound_keys() {
        let v1 = Video { id: Some(1) };
        let v2 = Video { id: Some(2) };
        let expr = scope()
            .predicate(SetRelation::Containing, vec![&v1, &v2])
            .unwrap();
        let (sql, params) = render(&expr);
        assert_eq!(sql, "\"video_ids\" @> ARRAY[$1, $2]");
        assert_eq!(params, vec![Value::BigInt(1), Value::BigInt(2)]);
    }

    #[test]
    fn single_record_and_raw_keys() {
        let v = Video { id: Some(3) };
        let (sql, _) = render(&scope().predicate(SetRelation::Overlaps, &v).unwrap());
        assert_eq!(sql, "\"video_ids\" && ARRAY[$1]");

        let (sql, params) = render(
            &scope()
                .predicate(SetRelation::ContainedIn, KeySet::<Video>::keys([1_i64, 4]))
                .unwrap(),
        );
        assert_eq!(sql, "\"video_ids\" <@ ARRAY[$1, $2]");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn empty_set_policy() {
        let containing = scope()
            .predicate(SetRelation::Containing, KeySet::<Video>::empty())
            .unwrap();
        assert_eq!(render(&containing).0, "TRUE");

        let contained = scope()
            .predicate(SetRelation::ContainedIn, KeySet::<Video>::empty())
            .unwrap();
        assert_eq!(
            render(&contained).0,
            "COALESCE(cardinality(\"video_ids\"), 0) = 0"
        );

        let overlaps = scope().predicate(SetRelation::Overlaps, KeySet::<Video>::empty()).unwrap();
        assert_eq!(render(&overlaps).0, "FALSE");

        let none: &[Video] = &[];
        let from_records = scope().predicate(SetRelation::Overlaps, none).unwrap();
        assert_eq!(render(&from_records).0, "FALSE");
    }

    #[test]
    fn subquery_stays_server_side() {
        let sub = Select::<Video>::new().filter(Expr::col("id").gt(2_i64));
        let expr = scope().predicate(SetRelation::Containing, sub).unwrap();
        let (sql, params) = render(&expr);
        assert_eq!(
            sql,
            "\"video_ids\" @> ARRAY(SELECT \"id\" FROM \"videos\" WHERE \"id\" > $1)"
        );
        assert_eq!(params, vec![Value::BigInt(2)]);
    }

    #[test]
    fn malformed_inputs_are_rejected_up_front() {
        let unsaved = Video { id: None };
        assert!(
            scope()
                .predicate(SetRelation::Containing, &unsaved)
                .unwrap_err()
                .is_invalid_argument()
        );
        assert!(
            scope()
                .predicate(SetRelation::Overlaps, vec![Value::Null])
                .unwrap_err()
                .is_invalid_argument()
        );
        assert!(
            scope()
                .predicate(SetRelation::Overlaps, vec![Value::Array(vec![])])
                .unwrap_err()
                .is_invalid_argument()
        );
        let wrong_projection = Select::<Video>::new().columns(&["title"]);
        assert!(
            scope()
                .predicate(SetRelation::Overlaps, wrong_projection)
                .unwrap_err()
                .is_invalid_argument()
        );
    }

    #[test]
    fn scope_methods_return_composable_selects() {
        let v1 = Video { id: Some(1) };
        let query = scope()
            .containing(&v1)
            .unwrap()
            .filter(Expr::col("id").ne(9_i64))
            .limit(1);
        let (sql, params) = query.build();
        assert_eq!(
            sql,
            "SELECT * FROM \"playlists\" WHERE \"video_ids\" @> ARRAY[$1] AND \"id\" <> $2 LIMIT 1"
        );
        assert_eq!(params.len(), 2);
    }
}
