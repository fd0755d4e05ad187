//! The association descriptor.
//!
//! An [`ArrayAssociation`] is built once, at declaration time, and never
//! changes afterwards. It names the owner's array column and the target
//! column its elements refer to, and carries the optional secondary
//! ordering and extension. Collections and query scopes are derived from it.

use crate::collection::OrderedForeignKeyCollection;
use crate::slot::Item;
use fkarray_core::{
    AssociationError, AssociationErrorKind, Error, KeyArrays, KeySequence, Model, Result, Value,
    is_plain_identifier,
};
use fkarray_query::{
    EntityStore, KeySet, NullsOrder, OrderBy, OrderDirection, Select, SetQueryScope, record_key,
};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied adjustment of the batched fetch.
///
/// Rows the decorated query no longer returns show up as absent markers.
pub trait CollectionExtension<T: Model>: Send + Sync {
    fn decorate(&self, query: Select<T>) -> Select<T>;
}

impl<T, F> CollectionExtension<T> for F
where
    T: Model,
    F: Fn(Select<T>) -> Select<T> + Send + Sync,
{
    fn decorate(&self, query: Select<T>) -> Select<T> {
        self(query)
    }
}

type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Order applied by [`OrderedForeignKeyCollection::sorted`].
///
/// Key-sequence order is always the primary order of a collection.
pub enum SecondaryOrdering<T> {
    Column(OrderBy),
    Comparator(Comparator<T>),
}

impl<T: Model> SecondaryOrdering<T> {
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        match self {
            SecondaryOrdering::Comparator(cmp) => cmp(a, b),
            SecondaryOrdering::Column(order) => {
                let va = a.attribute(order.column()).unwrap_or(Value::Null);
                let vb = b.attribute(order.column()).unwrap_or(Value::Null);
                let nulls_first = order.effective_nulls() == NullsOrder::First;
                match (va.is_null(), vb.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) if nulls_first => Ordering::Less,
                    (true, false) => Ordering::Greater,
                    (false, true) if nulls_first => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => {
                        let ord = va.compare(&vb).unwrap_or(Ordering::Equal);
                        match order.direction() {
                            OrderDirection::Asc => ord,
                            OrderDirection::Desc => ord.reverse(),
                        }
                    }
                }
            }
        }
    }
}

impl<T> Clone for SecondaryOrdering<T> {
    fn clone(&self) -> Self {
        match self {
            SecondaryOrdering::Column(o) => SecondaryOrdering::Column(o.clone()),
            SecondaryOrdering::Comparator(c) => SecondaryOrdering::Comparator(Arc::clone(c)),
        }
    }
}

impl<T> fmt::Debug for SecondaryOrdering<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecondaryOrdering::Column(o) => f.debug_tuple("Column").field(o).finish(),
            SecondaryOrdering::Comparator(_) => f.write_str("Comparator(..)"),
        }
    }
}

/// Declaration options for an [`ArrayAssociation`].
pub struct ArrayAssociationOptions<T: Model> {
    singular: Option<String>,
    key_attribute: Option<String>,
    array_attribute: Option<String>,
    ordering: Option<SecondaryOrdering<T>>,
    extension: Option<Arc<dyn CollectionExtension<T>>>,
}

impl<T: Model> ArrayAssociationOptions<T> {
    pub fn new() -> Self {
        Self {
            singular: None,
            key_attribute: None,
            array_attribute: None,
            ordering: None,
            extension: None,
        }
    }

    /// Singular form of the association name.
    ///
    /// Defaults to the name with one trailing `s` removed.
    #[must_use]
    pub fn singular(mut self, singular: impl Into<String>) -> Self {
        self.singular = Some(singular.into());
        self
    }

    /// Target column the array elements refer to. Defaults to the target's
    /// primary key.
    #[must_use]
    pub fn key_attribute(mut self, column: impl Into<String>) -> Self {
        self.key_attribute = Some(column.into());
        self
    }

    /// Owner column holding the keys. Defaults to `{singular}_ids`.
    #[must_use]
    pub fn array_attribute(mut self, column: impl Into<String>) -> Self {
        self.array_attribute = Some(column.into());
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.ordering = Some(SecondaryOrdering::Column(order));
        self
    }

    #[must_use]
    pub fn order_with(mut self, cmp: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Self {
        self.ordering = Some(SecondaryOrdering::Comparator(Arc::new(cmp)));
        self
    }

    #[must_use]
    pub fn extension(mut self, extension: impl CollectionExtension<T> + 'static) -> Self {
        self.extension = Some(Arc::new(extension));
        self
    }
}

impl<T: Model> Default for ArrayAssociationOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptor of an ordered foreign-key array association from owner `O`
/// to target `T`.
pub struct ArrayAssociation<O: Model, T: Model> {
    name: String,
    singular: String,
    ordering: Option<SecondaryOrdering<T>>,
    extension: Option<Arc<dyn CollectionExtension<T>>>,
    scope: SetQueryScope<O, T>,
}

impl<O: Model, T: Model> ArrayAssociation<O, T> {
    /// Build and validate a descriptor.
    ///
    /// Every identifier must be plain, the array attribute must be a column
    /// of `O` and the key attribute a column of `T`.
    pub fn new(name: impl Into<String>, options: ArrayAssociationOptions<T>) -> Result<Self> {
        let name = name.into();
        let invalid = |message: String| {
            Error::Association(AssociationError::new(
                AssociationErrorKind::InvalidIdentifier,
                O::TABLE_NAME,
                name.clone(),
                message,
            ))
        };

        let singular = options
            .singular
            .unwrap_or_else(|| name.strip_suffix('s').unwrap_or(&name).to_string());
        let array_attribute = options
            .array_attribute
            .unwrap_or_else(|| format!("{singular}_ids"));
        let key_attribute = options
            .key_attribute
            .unwrap_or_else(|| T::PRIMARY_KEY.to_string());

        for (what, ident) in [
            ("association name", &name),
            ("singular name", &singular),
            ("array attribute", &array_attribute),
            ("key attribute", &key_attribute),
        ] {
            if !is_plain_identifier(ident) {
                return Err(invalid(format!("{what} {ident:?} is not a valid identifier")));
            }
        }
        if !O::has_column(&array_attribute) {
            return Err(invalid(format!(
                "{} has no column {array_attribute:?}",
                O::TABLE_NAME
            )));
        }
        if !T::has_column(&key_attribute) {
            return Err(invalid(format!(
                "{} has no column {key_attribute:?}",
                T::TABLE_NAME
            )));
        }

        tracing::debug!(
            owner = O::TABLE_NAME,
            target_table = T::TABLE_NAME,
            association = %name,
            array_attribute = %array_attribute,
            key_attribute = %key_attribute,
            "declared array association"
        );

        Ok(Self {
            name,
            singular,
            ordering: options.ordering,
            extension: options.extension,
            scope: SetQueryScope::new(array_attribute, key_attribute),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn singular(&self) -> &str {
        &self.singular
    }

    pub fn array_attribute(&self) -> &str {
        self.scope.array_attribute()
    }

    pub fn key_attribute(&self) -> &str {
        self.scope.key_attribute()
    }

    pub fn ordering(&self) -> Option<&SecondaryOrdering<T>> {
        self.ordering.as_ref()
    }

    pub fn extension(&self) -> Option<&dyn CollectionExtension<T>> {
        self.extension.as_deref()
    }

    /// The set-relationship scope over the owner's array column.
    pub fn scope(&self) -> &SetQueryScope<O, T> {
        &self.scope
    }

    /// A target record's key, NULL when it has none.
    pub fn key_of(&self, record: &T) -> Value {
        record_key(record, self.key_attribute())
    }

    pub(crate) fn item_key(&self, item: &Item<'_, T>) -> Result<Value> {
        item.key(self.key_attribute())
    }

    pub(crate) fn missing_attribute(&self) -> Error {
        Error::Association(AssociationError::new(
            AssociationErrorKind::MissingAttribute,
            O::TABLE_NAME,
            self.name.clone(),
            format!("owner does not expose {:?}", self.array_attribute()),
        ))
    }

    /// Replace the owner's key sequence with the keys of `items`.
    ///
    /// An empty input clears the sequence. Nothing is persisted.
    pub fn assign<'i, I>(&self, owner: &mut O, items: I) -> Result<()>
    where
        O: KeyArrays,
        T: 'i,
        I: IntoIterator,
        I::Item: Into<Item<'i, T>>,
    {
        let keys = items
            .into_iter()
            .map(|item| self.item_key(&item.into()))
            .collect::<Result<Vec<_>>>()?;
        let slot = owner
            .key_array_mut(self.array_attribute())
            .ok_or_else(|| self.missing_attribute())?;
        *slot = KeySequence::from(keys);
        tracing::debug!(
            owner = O::TABLE_NAME,
            association = %self.name,
            len = slot.len(),
            "assigned key sequence"
        );
        Ok(())
    }

    /// Open the collection over `owner`'s key sequence.
    pub fn collection<'a, S>(
        &'a self,
        owner: &'a mut O,
        store: &'a S,
    ) -> Result<OrderedForeignKeyCollection<'a, O, T, S>>
    where
        O: KeyArrays,
        S: EntityStore + ?Sized,
    {
        let keys = owner
            .key_array_mut(self.array_attribute())
            .ok_or_else(|| self.missing_attribute())?;
        Ok(OrderedForeignKeyCollection::new(self, keys, store))
    }

    /// Owners whose array holds every key in `set`.
    pub fn with_containing<'r>(&self, set: impl Into<KeySet<'r, T>>) -> Result<Select<O>>
    where
        T: 'r,
    {
        self.scope.containing(set)
    }

    /// Owners whose array holds only keys from `set`.
    pub fn with_contained_in<'r>(&self, set: impl Into<KeySet<'r, T>>) -> Result<Select<O>>
    where
        T: 'r,
    {
        self.scope.contained_in(set)
    }

    /// Owners whose array shares at least one key with `set`.
    pub fn with_any_from<'r>(&self, set: impl Into<KeySet<'r, T>>) -> Result<Select<O>>
    where
        T: 'r,
    {
        self.scope.overlaps(set)
    }
}

impl<O: Model, T: Model> fmt::Debug for ArrayAssociation<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayAssociation")
            .field("owner", &O::TABLE_NAME)
            .field("target", &T::TABLE_NAME)
            .field("name", &self.name)
            .field("singular", &self.singular)
            .field("array_attribute", &self.array_attribute())
            .field("key_attribute", &self.key_attribute())
            .field("ordering", &self.ordering)
            .field("extension", &self.extension.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fkarray_core::Row;

    #[derive(Debug, Clone, PartialEq)]
    struct Video {
        id: Option<i64>,
        title: Option<String>,
    }

    impl Model for Video {
        const TABLE_NAME: &'static str = "videos";
        const PRIMARY_KEY: &'static str = "id";

        fn columns() -> &'static [&'static str] {
            &["id", "title"]
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![("id", self.id.into()), ("title", self.title.clone().into())]
        }

        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                id: row.get_named("id")?,
                title: row.get_named("title")?,
            })
        }
    }

    #[derive(Debug, Default)]
    struct Playlist {
        id: Option<i64>,
        video_ids: KeySequence,
    }

    impl Model for Playlist {
        const TABLE_NAME: &'static str = "playlists";
        const PRIMARY_KEY: &'static str = "id";

        fn columns() -> &'static [&'static str] {
            &["id", "video_ids"]
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![("id", self.id.into()), ("video_ids", self.video_ids.clone().into())]
        }

        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                id: row.get_named("id")?,
                video_ids: row.get_named("video_ids")?,
            })
        }
    }

    impl KeyArrays for Playlist {
        fn key_array(&self, attribute: &str) -> Option<&KeySequence> {
            (attribute == "video_ids").then_some(&self.video_ids)
        }

        fn key_array_mut(&mut self, attribute: &str) -> Option<&mut KeySequence> {
            (attribute == "video_ids").then_some(&mut self.video_ids)
        }
    }

    fn video(id: i64, title: Option<&str>) -> Video {
        Video {
            id: Some(id),
            title: title.map(str::to_string),
        }
    }

    #[test]
    fn defaults_follow_the_name() {
        let assoc =
            ArrayAssociation::<Playlist, Video>::new("videos", ArrayAssociationOptions::new())
                .unwrap();
        assert_eq!(assoc.singular(), "video");
        assert_eq!(assoc.array_attribute(), "video_ids");
        assert_eq!(assoc.key_attribute(), "id");
        assert!(assoc.ordering().is_none());
    }

    #[test]
    fn rejects_unknown_columns_and_bad_identifiers() {
        let err = ArrayAssociation::<Playlist, Video>::new(
            "clips",
            ArrayAssociationOptions::new(),
        )
        .unwrap_err();
        match err {
            Error::Association(e) => {
                assert_eq!(e.kind, AssociationErrorKind::InvalidIdentifier);
                assert!(e.message.contains("clip_ids"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = ArrayAssociation::<Playlist, Video>::new(
            "videos",
            ArrayAssociationOptions::new().key_attribute("slug"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Association(_)));

        let err = ArrayAssociation::<Playlist, Video>::new(
            "videos; drop",
            ArrayAssociationOptions::new().array_attribute("video_ids"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Association(_)));
    }

    #[test]
    fn assign_writes_keys_and_empty_clears() {
        let assoc =
            ArrayAssociation::<Playlist, Video>::new("videos", ArrayAssociationOptions::new())
                .unwrap();
        let mut p = Playlist::default();
        let v = vec![video(2, None), video(1, None), video(2, None)];
        assoc.assign(&mut p, &v).unwrap();
        assert_eq!(p.video_ids, KeySequence::from(vec![2_i64, 1, 2]));

        assoc.assign(&mut p, Vec::<Value>::new()).unwrap();
        assert!(p.video_ids.is_empty());

        assoc
            .assign(&mut p, vec![Value::BigInt(3), Value::Null])
            .unwrap();
        assert_eq!(p.video_ids.null_count(), 1);
    }

    #[test]
    fn column_ordering_puts_nulls_last() {
        let order = SecondaryOrdering::<Video>::Column(OrderBy::asc("title"));
        let a = video(1, Some("a"));
        let b = video(2, Some("b"));
        let none = video(3, None);
        assert_eq!(order.compare(&a, &b), Ordering::Less);
        assert_eq!(order.compare(&none, &a), Ordering::Greater);

        let desc = SecondaryOrdering::<Video>::Column(OrderBy::desc("title"));
        assert_eq!(desc.compare(&a, &b), Ordering::Greater);
        assert_eq!(desc.compare(&none, &a), Ordering::Less);
    }
}
