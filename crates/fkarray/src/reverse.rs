//! Owners that reference a target.

use fkarray_core::{Model, Result};
use fkarray_query::{EntityStore, Select, SetQueryScope};
use std::fmt;

/// Read-only accessor from a target `T` to the owners `O` whose key array
/// contains it.
///
/// Holds no state beyond the column names: every call builds a fresh query,
/// so owner changes are seen as soon as they are saved.
pub struct ReverseAssociation<T: Model, O: Model> {
    name: String,
    scope: SetQueryScope<O, T>,
}

impl<T: Model, O: Model> ReverseAssociation<T, O> {
    pub(crate) fn new(name: String, scope: SetQueryScope<O, T>) -> Self {
        Self { name, scope }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn array_attribute(&self) -> &str {
        self.scope.array_attribute()
    }

    /// Owners whose array contains `target`'s key.
    pub fn owners(&self, target: &T) -> Result<Select<O>> {
        self.scope.containing(target)
    }

    /// Run [`owners`](Self::owners).
    pub fn load<S: EntityStore + ?Sized>(&self, target: &T, store: &S) -> Result<Vec<O>> {
        self.owners(target)?.all(store)
    }
}

impl<T: Model, O: Model> Clone for ReverseAssociation<T, O> {
    fn clone(&self) -> Self {
        Self::new(self.name.clone(), self.scope.clone())
    }
}

impl<T: Model, O: Model> fmt::Debug for ReverseAssociation<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReverseAssociation")
            .field("target", &T::TABLE_NAME)
            .field("owner", &O::TABLE_NAME)
            .field("name", &self.name)
            .field("array_attribute", &self.scope.array_attribute())
            .finish()
    }
}
