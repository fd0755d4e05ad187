//! Operations started before their function is known.
//!
//! [`OrderedForeignKeyCollection::defer`] hands back a [`Deferred`] bound
//! to one operation. Until a function is supplied it can be enumerated as
//! often as needed; nothing is fetched before the first enumeration.

use crate::collection::OrderedForeignKeyCollection;
use crate::slot::Slot;
use fkarray_core::{Error, Model, Result, Value};
use fkarray_query::EntityStore;
use std::fmt;
use std::hash::Hash;
use std::ops::Range;

/// Collection operations that need a predicate or transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredOp {
    RemoveMatching,
    KeepMatching,
    DedupBy,
    MapInPlace,
    /// Fill over the given range, or the whole sequence.
    FillWith(Option<(usize, usize)>),
}

impl DeferredOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            DeferredOp::RemoveMatching => "remove_matching",
            DeferredOp::KeepMatching => "keep_matching",
            DeferredOp::DedupBy => "dedup_by",
            DeferredOp::MapInPlace => "map_in_place",
            DeferredOp::FillWith(_) => "fill_with",
        }
    }
}

impl fmt::Display for DeferredOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending operation on a collection.
pub struct Deferred<'c, 'a, O: Model, T: Model, S: EntityStore + ?Sized> {
    collection: &'c mut OrderedForeignKeyCollection<'a, O, T, S>,
    op: DeferredOp,
}

impl<'c, 'a, O: Model, T: Model, S: EntityStore + ?Sized> Deferred<'c, 'a, O, T, S> {
    pub(crate) fn new(
        collection: &'c mut OrderedForeignKeyCollection<'a, O, T, S>,
        op: DeferredOp,
    ) -> Self {
        Self { collection, op }
    }

    pub fn op(&self) -> DeferredOp {
        self.op
    }

    /// Number of elements the operation visits.
    pub fn len(&self) -> usize {
        match self.op {
            DeferredOp::FillWith(Some((start, end))) => end.saturating_sub(start),
            _ => self.collection.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots the operation would visit. Each call starts over.
    ///
    /// Fill visits positions rather than rows, so it yields nothing here;
    /// use [`positions`](Self::positions).
    pub fn iter(&self) -> Result<std::slice::Iter<'_, Slot<T>>> {
        match self.op {
            DeferredOp::FillWith(_) => Ok(<&[Slot<T>]>::default().iter()),
            _ => Ok(self.collection.load()?.iter()),
        }
    }

    /// Positions the operation writes.
    pub fn positions(&self) -> Range<usize> {
        match self.op {
            DeferredOp::FillWith(Some((start, end))) => start..end,
            _ => 0..self.collection.len(),
        }
    }

    fn mismatch(&self, takes: &str) -> Error {
        Error::invalid_argument(
            "deferred operation",
            format!("{} does not take {takes}", self.op),
        )
    }

    /// Run a remove/keep operation. Returns whether anything changed.
    pub fn with_predicate(self, pred: impl FnMut(&Slot<T>) -> bool) -> Result<bool> {
        match self.op {
            DeferredOp::RemoveMatching => Ok(self.collection.reject(pred)?.is_some()),
            DeferredOp::KeepMatching => Ok(self.collection.select(pred)?.is_some()),
            _ => Err(self.mismatch("a predicate")),
        }
    }

    /// Run a dedup operation grouped by `f`.
    pub fn with_key<K: Hash + Eq>(self, f: impl FnMut(&Slot<T>) -> K) -> Result<bool> {
        if self.op != DeferredOp::DedupBy {
            return Err(self.mismatch("a grouping key"));
        }
        let before = self.collection.len();
        Ok(self.collection.dedup_by(f)?.len() != before)
    }

    /// Run a map operation.
    pub fn with_transform(self, f: impl FnMut(&Slot<T>) -> Value) -> Result<bool> {
        if self.op != DeferredOp::MapInPlace {
            return Err(self.mismatch("a transform"));
        }
        let before = self.collection.keys().clone();
        Ok(*self.collection.map_in_place(f)?.keys() != before)
    }

    /// Run a fill operation.
    pub fn with_index(self, f: impl FnMut(usize) -> Value) -> Result<bool> {
        let DeferredOp::FillWith(range) = self.op else {
            return Err(self.mismatch("an index function"));
        };
        let before = self.collection.keys().clone();
        let range = range.map(|(start, end)| start..end);
        Ok(*self.collection.fill_with(f, range)?.keys() != before)
    }
}

impl<O: Model, T: Model, S: EntityStore + ?Sized> fmt::Debug for Deferred<'_, '_, O, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("op", &self.op)
            .field("len", &self.len())
            .finish()
    }
}
