//! The ordered foreign-key collection.
//!
//! A collection is a view over one owner's [`KeySequence`]. The sequence is
//! the only source of truth: length and order always come from it, and every
//! mutation edits it in place, which writes straight into the owner's
//! attribute. Target rows are a derived view, fetched in one batch for the
//! distinct non-NULL keys and then laid out position by position.
//!
//! The fetched rows are cached until the next mutation or [`reset`]. An
//! active filter is kept verbatim and re-applied to the rebuilt membership
//! condition each time rows are fetched.
//!
//! Nothing here persists the owner. Saving it is up to the caller.
//!
//! [`reset`]: OrderedForeignKeyCollection::reset

use crate::association::ArrayAssociation;
use crate::deferred::{Deferred, DeferredOp};
use crate::slot::{Item, Slot};
use fkarray_core::{Error, KeySequence, Model, Result, Value};
use fkarray_query::{EntityStore, Expr, Select};
use rand::Rng;
use rand::seq::SliceRandom;
use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::ops::Range;
use std::sync::Arc;

/// Live, order-preserving collection of `T` records behind an owner `O`'s
/// key array.
///
/// Not synchronized: hold it only for one logical use of the owner.
pub struct OrderedForeignKeyCollection<'a, O: Model, T: Model, S: EntityStore + ?Sized> {
    assoc: &'a ArrayAssociation<O, T>,
    keys: &'a mut KeySequence,
    store: &'a S,
    filter: Option<Expr>,
    cache: OnceCell<Vec<Slot<T>>>,
}

impl<'a, O: Model, T: Model, S: EntityStore + ?Sized> OrderedForeignKeyCollection<'a, O, T, S> {
    pub(crate) fn new(
        assoc: &'a ArrayAssociation<O, T>,
        keys: &'a mut KeySequence,
        store: &'a S,
    ) -> Self {
        Self {
            assoc,
            keys,
            store,
            filter: None,
            cache: OnceCell::new(),
        }
    }

    pub fn association(&self) -> &ArrayAssociation<O, T> {
        self.assoc
    }

    // ==================== Keys ====================

    /// The owner's key sequence.
    pub fn keys(&self) -> &KeySequence {
        &*self.keys
    }

    /// Length of the key sequence, NULLs and dangling keys included.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The filter composed on top of the membership condition.
    pub fn condition(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    // ==================== Query ====================

    /// The batched fetch: membership in the distinct keys, the active
    /// filter, then the association's extension.
    pub fn query(&self) -> Select<T> {
        self.fetch_query(self.keys.distinct_non_null(), self.filter.as_ref())
    }

    fn fetch_query(&self, keys: Vec<Value>, filter: Option<&Expr>) -> Select<T> {
        let mut select =
            Select::<T>::new().filter(Expr::col(self.assoc.key_attribute()).in_list(keys));
        if let Some(filter) = filter {
            select = select.filter(filter.clone());
        }
        if let Some(extension) = self.assoc.extension() {
            select = extension.decorate(select);
        }
        select
    }

    /// SQL of the batched fetch.
    pub fn to_sql(&self) -> String {
        self.query().build().0
    }

    /// Narrow this collection with another condition.
    ///
    /// Reads then yield only resolved, matching rows, still in key order.
    /// Mutations keep acting on the full key sequence.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter_in_place(expr);
        self
    }

    pub fn filter_in_place(&mut self, expr: Expr) -> &mut Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self.cache.take();
        self
    }

    // ==================== Materialization ====================

    fn fetch(&self) -> Result<Vec<Slot<T>>> {
        let distinct = self.keys.distinct_non_null();
        let mut found: HashMap<Value, Arc<T>> = HashMap::with_capacity(distinct.len());

        if !distinct.is_empty() {
            let records = self.query().all(self.store)?;
            tracing::debug!(
                owner = O::TABLE_NAME,
                target_table = T::TABLE_NAME,
                association = self.assoc.name(),
                distinct_keys = distinct.len(),
                rows = records.len(),
                "batched fetch"
            );
            for record in records {
                let key = self.assoc.key_of(&record);
                if !key.is_null() {
                    found.entry(key).or_insert_with(|| Arc::new(record));
                }
            }
        }

        let slots: Vec<Slot<T>> = self
            .keys
            .iter()
            .map(|key| {
                if key.is_null() {
                    return Slot::Empty;
                }
                match found.get(key) {
                    Some(record) => Slot::Record(Arc::clone(record)),
                    None => Slot::Missing(key.clone()),
                }
            })
            .collect();

        if self.filter.is_none() {
            let dangling: HashSet<&Value> = slots.iter().filter_map(Slot::missing_key).collect();
            if !dangling.is_empty() {
                tracing::warn!(
                    owner = O::TABLE_NAME,
                    association = self.assoc.name(),
                    dangling = dangling.len(),
                    "keys without a matching row"
                );
            }
        }
        Ok(slots)
    }

    /// Fetch once and return one slot per key position.
    ///
    /// Positions the active filter excludes are absent markers here.
    pub fn load(&self) -> Result<&[Slot<T>]> {
        if let Some(slots) = self.cache.get() {
            return Ok(slots);
        }
        let slots = self.fetch()?;
        Ok(self.cache.get_or_init(|| slots))
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.get().is_some()
    }

    /// Drop fetched rows; the next read fetches again.
    pub fn reset(&mut self) -> &mut Self {
        self.cache.take();
        self
    }

    /// Iterate the collection.
    ///
    /// Unfiltered, this yields one slot per key. Filtered, it yields only
    /// the rows that resolved and matched.
    pub fn iter(&self) -> Result<impl Iterator<Item = &Slot<T>>> {
        let filtered = self.is_filtered();
        Ok(self
            .load()?
            .iter()
            .filter(move |slot| !filtered || slot.is_record()))
    }

    pub fn to_vec(&self) -> Result<Vec<Slot<T>>> {
        Ok(self.iter()?.cloned().collect())
    }

    /// Resolved rows only, in key order, duplicates repeated.
    pub fn records(&self) -> Result<Vec<Arc<T>>> {
        Ok(self
            .load()?
            .iter()
            .filter_map(|slot| match slot {
                Slot::Record(r) => Some(Arc::clone(r)),
                _ => None,
            })
            .collect())
    }

    /// Resolved rows under the association's secondary ordering.
    ///
    /// The sort is stable, so ties keep key order. Without a secondary
    /// ordering this is [`records`](Self::records).
    pub fn sorted(&self) -> Result<Vec<Arc<T>>> {
        let mut records = self.records()?;
        if let Some(ordering) = self.assoc.ordering() {
            records.sort_by(|a, b| ordering.compare(a, b));
        }
        Ok(records)
    }

    /// Slot at `index`; absent past the end.
    pub fn get(&self, index: usize) -> Result<Slot<T>> {
        Ok(self.load()?.get(index).cloned().unwrap_or(Slot::Empty))
    }

    /// Slots in `range`, clipped to the sequence; empty when out of range.
    pub fn slice(&self, range: Range<usize>) -> Result<Vec<Slot<T>>> {
        let slots = self.load()?;
        let end = range.end.min(slots.len());
        if range.start >= end {
            return Ok(Vec::new());
        }
        Ok(slots[range.start..end].to_vec())
    }

    pub fn first(&self) -> Result<Slot<T>> {
        self.get(0)
    }

    pub fn last(&self) -> Result<Slot<T>> {
        match self.len() {
            0 => Ok(Slot::Empty),
            n => self.get(n - 1),
        }
    }

    /// Bulk column projection is not provided.
    pub fn pluck(&self, column: &str) -> Result<Vec<Value>> {
        Err(Error::unsupported(
            "pluck",
            format!(
                "cannot project {column:?} across an ordered key array; load the records instead"
            ),
        ))
    }

    // ==================== Equality ====================

    /// Compare the materialized sequence with these slots.
    pub fn eq_slots(&self, other: &[Slot<T>]) -> Result<bool>
    where
        T: PartialEq,
    {
        let mine = self.to_vec()?;
        Ok(mine.as_slice() == other)
    }

    /// Compare the materialized sequence with records, position by position.
    /// Any absent position makes them unequal.
    pub fn eq_records(&self, other: &[T]) -> Result<bool>
    where
        T: PartialEq,
    {
        let mine = self.to_vec()?;
        Ok(mine.len() == other.len()
            && mine
                .iter()
                .zip(other)
                .all(|(slot, record)| slot.record() == Some(record)))
    }

    pub fn eq_collection<S2>(
        &self,
        other: &OrderedForeignKeyCollection<'_, O, T, S2>,
    ) -> Result<bool>
    where
        T: PartialEq,
        S2: EntityStore + ?Sized,
    {
        let theirs = other.to_vec()?;
        self.eq_slots(&theirs)
    }

    // ==================== Mutation ====================

    fn key_for<'i>(&self, item: impl Into<Item<'i, T>>) -> Result<Value>
    where
        T: 'i,
    {
        self.assoc.item_key(&item.into())
    }

    fn keys_for<'i, I>(&self, items: I) -> Result<Vec<Value>>
    where
        T: 'i,
        I: IntoIterator,
        I::Item: Into<Item<'i, T>>,
    {
        items.into_iter().map(|item| self.key_for(item)).collect()
    }

    /// What position `index` holds, ignoring the view filter.
    fn removed_slot(&self, index: usize) -> Result<Slot<T>> {
        let Some(key) = self.keys.as_slice().get(index) else {
            return Ok(Slot::Empty);
        };
        if key.is_null() {
            return Ok(Slot::Empty);
        }
        if self.filter.is_none() {
            return self.get(index);
        }
        if let Some(Slot::Record(record)) = self.cache.get().and_then(|slots| slots.get(index)) {
            return Ok(Slot::Record(Arc::clone(record)));
        }
        let found = self.fetch_query(vec![key.clone()], None).first(self.store)?;
        Ok(match found {
            Some(record) => Slot::Record(Arc::new(record)),
            None => Slot::Missing(key.clone()),
        })
    }

    /// Invalidate fetched rows after the sequence changed.
    fn touched(&mut self, op: &'static str) {
        self.cache.take();
        tracing::debug!(
            owner = O::TABLE_NAME,
            association = self.assoc.name(),
            op,
            len = self.keys.len(),
            "collection mutated"
        );
    }

    fn pad_to(&mut self, len: usize) {
        let keys = self.keys.as_mut_vec();
        if keys.len() < len {
            keys.resize(len, Value::Null);
        }
    }

    /// One keep/drop flag per position, from the positional slots.
    fn mask(&self, mut pred: impl FnMut(&Slot<T>) -> bool) -> Result<Vec<bool>> {
        Ok(self.load()?.iter().map(|slot| pred(slot)).collect())
    }

    fn retain_mask(&mut self, mask: &[bool]) -> bool {
        let before = self.keys.len();
        let mut flags = mask.iter();
        self.keys
            .as_mut_vec()
            .retain(|_| flags.next().copied().unwrap_or(true));
        self.keys.len() != before
    }

    pub fn push<'i>(&mut self, item: impl Into<Item<'i, T>>) -> Result<&mut Self>
    where
        T: 'i,
    {
        let key = self.key_for(item)?;
        self.keys.as_mut_vec().push(key);
        self.touched("push");
        Ok(self)
    }

    /// Append every item.
    pub fn concat<'i, I>(&mut self, items: I) -> Result<&mut Self>
    where
        T: 'i,
        I: IntoIterator,
        I::Item: Into<Item<'i, T>>,
    {
        let keys = self.keys_for(items)?;
        self.keys.as_mut_vec().extend(keys);
        self.touched("concat");
        Ok(self)
    }

    /// Prepend one item.
    pub fn unshift<'i>(&mut self, item: impl Into<Item<'i, T>>) -> Result<&mut Self>
    where
        T: 'i,
    {
        let key = self.key_for(item)?;
        self.keys.as_mut_vec().insert(0, key);
        self.touched("unshift");
        Ok(self)
    }

    /// Insert items before `index`, padding with NULLs past the end.
    pub fn insert<'i, I>(&mut self, index: usize, items: I) -> Result<&mut Self>
    where
        T: 'i,
        I: IntoIterator,
        I::Item: Into<Item<'i, T>>,
    {
        let keys = self.keys_for(items)?;
        self.pad_to(index);
        self.keys.as_mut_vec().splice(index..index, keys);
        self.touched("insert");
        Ok(self)
    }

    /// Write one position, padding with NULLs past the end.
    pub fn set<'i>(&mut self, index: usize, item: impl Into<Item<'i, T>>) -> Result<&mut Self>
    where
        T: 'i,
    {
        let end = index
            .checked_add(1)
            .ok_or_else(|| Error::invalid_argument("index", "position is out of range"))?;
        let key = self.key_for(item)?;
        self.pad_to(end);
        self.keys.as_mut_vec()[index] = key;
        self.touched("set");
        Ok(self)
    }

    /// Replace `len` positions from `start` with `items`.
    ///
    /// A start past the end pads with NULLs first; a length running past
    /// the end is clipped.
    pub fn splice<'i, I>(&mut self, start: usize, len: usize, items: I) -> Result<&mut Self>
    where
        T: 'i,
        I: IntoIterator,
        I::Item: Into<Item<'i, T>>,
    {
        let keys = self.keys_for(items)?;
        self.pad_to(start);
        let end = start.saturating_add(len).min(self.keys.len());
        self.keys.as_mut_vec().splice(start..end, keys);
        self.touched("splice");
        Ok(self)
    }

    /// Replace the whole sequence. An empty input clears it.
    pub fn replace<'i, I>(&mut self, items: I) -> Result<&mut Self>
    where
        T: 'i,
        I: IntoIterator,
        I::Item: Into<Item<'i, T>>,
    {
        let keys = self.keys_for(items)?;
        *self.keys = KeySequence::from(keys);
        self.touched("replace");
        Ok(self)
    }

    pub fn clear(&mut self) -> &mut Self {
        self.keys.as_mut_vec().clear();
        self.touched("clear");
        self
    }

    /// Remove every position holding `item`'s key.
    ///
    /// Returns what the first such position held, or `Slot::Empty` when the
    /// key is not present. The view filter does not apply to the returned
    /// row.
    pub fn delete<'i>(&mut self, item: impl Into<Item<'i, T>>) -> Result<Slot<T>>
    where
        T: 'i,
    {
        let key = self.key_for(item)?;
        let Some(first) = self.keys.iter().position(|k| *k == key) else {
            return Ok(Slot::Empty);
        };
        let removed = self.removed_slot(first)?;
        self.keys.as_mut_vec().retain(|k| *k != key);
        self.touched("delete");
        Ok(removed)
    }

    /// Remove the position at `index`; `Slot::Empty` past the end.
    pub fn delete_at(&mut self, index: usize) -> Result<Slot<T>> {
        if index >= self.keys.len() {
            return Ok(Slot::Empty);
        }
        let removed = self.removed_slot(index)?;
        self.keys.as_mut_vec().remove(index);
        self.touched("delete_at");
        Ok(removed)
    }

    /// Remove the last position.
    pub fn pop(&mut self) -> Result<Slot<T>> {
        match self.len() {
            0 => Ok(Slot::Empty),
            n => self.delete_at(n - 1),
        }
    }

    /// Remove the first position.
    pub fn shift(&mut self) -> Result<Slot<T>> {
        self.delete_at(0)
    }

    /// Remove positions whose slot matches.
    pub fn remove_matching(&mut self, pred: impl FnMut(&Slot<T>) -> bool) -> Result<&mut Self> {
        self.reject(pred)?;
        Ok(self)
    }

    /// Keep only positions whose slot matches.
    pub fn keep_matching(&mut self, pred: impl FnMut(&Slot<T>) -> bool) -> Result<&mut Self> {
        self.select(pred)?;
        Ok(self)
    }

    /// Like [`remove_matching`](Self::remove_matching), but `None` when
    /// nothing was removed.
    pub fn reject(&mut self, mut pred: impl FnMut(&Slot<T>) -> bool) -> Result<Option<&mut Self>> {
        let mask = self.mask(|slot| !pred(slot))?;
        if !self.retain_mask(&mask) {
            return Ok(None);
        }
        self.touched("reject");
        Ok(Some(self))
    }

    /// Like [`keep_matching`](Self::keep_matching), but `None` when nothing
    /// was removed.
    pub fn select(&mut self, pred: impl FnMut(&Slot<T>) -> bool) -> Result<Option<&mut Self>> {
        let mask = self.mask(pred)?;
        if !self.retain_mask(&mask) {
            return Ok(None);
        }
        self.touched("select");
        Ok(Some(self))
    }

    /// Remove NULL positions.
    pub fn compact(&mut self) -> &mut Self {
        self.keys.as_mut_vec().retain(|k| !k.is_null());
        self.touched("compact");
        self
    }

    pub fn reverse(&mut self) -> &mut Self {
        self.keys.as_mut_vec().reverse();
        self.touched("reverse");
        self
    }

    /// Rotate so position `n` comes first; negative `n` rotates right.
    pub fn rotate(&mut self, n: isize) -> &mut Self {
        let keys = self.keys.as_mut_vec();
        if !keys.is_empty() {
            let len = isize::try_from(keys.len()).unwrap_or(isize::MAX);
            let by = usize::try_from(n.rem_euclid(len)).unwrap_or(0);
            keys.rotate_left(by);
        }
        self.touched("rotate");
        self
    }

    pub fn shuffle(&mut self) -> &mut Self {
        self.shuffle_with(&mut rand::thread_rng())
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &mut Self {
        self.keys.as_mut_vec().shuffle(rng);
        self.touched("shuffle");
        self
    }

    /// Drop later duplicates of a key, keeping first occurrences in place.
    pub fn dedup(&mut self) -> &mut Self {
        let mut seen = HashSet::new();
        self.keys.as_mut_vec().retain(|k| seen.insert(k.clone()));
        self.touched("dedup");
        self
    }

    /// Drop later positions whose slot maps to an already seen value.
    pub fn dedup_by<K: Hash + Eq>(
        &mut self,
        mut f: impl FnMut(&Slot<T>) -> K,
    ) -> Result<&mut Self> {
        let mut seen = HashSet::new();
        let mask = self.mask(|slot| seen.insert(f(slot)))?;
        self.retain_mask(&mask);
        self.touched("dedup_by");
        Ok(self)
    }

    /// Write `item` over `range` (the whole sequence when `None`),
    /// extending past the end.
    pub fn fill<'i>(
        &mut self,
        item: impl Into<Item<'i, T>>,
        range: Option<Range<usize>>,
    ) -> Result<&mut Self>
    where
        T: 'i,
    {
        let key = self.key_for(item)?;
        self.fill_with(|_| key.clone(), range)
    }

    /// Write `f(index)` over `range`, extending past the end.
    pub fn fill_with(
        &mut self,
        mut f: impl FnMut(usize) -> Value,
        range: Option<Range<usize>>,
    ) -> Result<&mut Self> {
        let range = range.unwrap_or(0..self.keys.len());
        let keys = range
            .clone()
            .map(|i| self.key_for(f(i)))
            .collect::<Result<Vec<_>>>()?;
        self.pad_to(range.end);
        for (i, key) in range.zip(keys) {
            self.keys.as_mut_vec()[i] = key;
        }
        self.touched("fill");
        Ok(self)
    }

    /// Replace each position with the key `f` returns for its slot.
    pub fn map_in_place(&mut self, mut f: impl FnMut(&Slot<T>) -> Value) -> Result<&mut Self> {
        let mapped = self.load()?.iter().map(|slot| f(slot)).collect::<Vec<_>>();
        let keys = mapped
            .into_iter()
            .map(|v| self.key_for(v))
            .collect::<Result<Vec<_>>>()?;
        *self.keys = KeySequence::from(keys);
        self.touched("map_in_place");
        Ok(self)
    }

    /// Start an operation whose function is supplied later.
    pub fn defer(&mut self, op: DeferredOp) -> Deferred<'_, 'a, O, T, S> {
        Deferred::new(self, op)
    }
}

impl<O: Model, T: Model, S: EntityStore + ?Sized> fmt::Debug
    for OrderedForeignKeyCollection<'_, O, T, S>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedForeignKeyCollection")
            .field("association", &self.assoc.name())
            .field("keys", &self.keys)
            .field("filter", &self.filter)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
