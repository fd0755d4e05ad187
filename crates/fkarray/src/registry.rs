//! Declaration surface.
//!
//! Associations are declared once, by name, per owner table, and resolved
//! by name later. Lookups are checked against the owner and target types
//! the association was declared with.

use crate::association::{ArrayAssociation, ArrayAssociationOptions};
use crate::reverse::ReverseAssociation;
use fkarray_core::{
    AssociationError, AssociationErrorKind, Error, Model, Result, is_plain_identifier,
};
use fkarray_query::SetQueryScope;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Options for [`AssociationRegistry::declare_reverse`].
#[derive(Debug, Clone, Default)]
pub struct ReverseOptions {
    forward: Option<String>,
    array_attribute: Option<String>,
}

impl ReverseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the owner-side association to mirror. Defaults to the
    /// target's table name.
    #[must_use]
    pub fn forward(mut self, name: impl Into<String>) -> Self {
        self.forward = Some(name.into());
        self
    }

    /// Owner column to search, when there is no forward declaration or it
    /// should not be used.
    #[must_use]
    pub fn array_attribute(mut self, column: impl Into<String>) -> Self {
        self.array_attribute = Some(column.into());
        self
    }
}

struct Entry {
    target: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

/// Named associations, keyed by the table they are declared on.
#[derive(Default)]
pub struct AssociationRegistry {
    entries: RwLock<HashMap<(String, String), Entry>>,
}

fn association_error(
    kind: AssociationErrorKind,
    owner: &str,
    name: &str,
    message: impl Into<String>,
) -> Error {
    Error::Association(AssociationError::new(kind, owner, name, message))
}

impl AssociationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static AssociationRegistry {
        static GLOBAL: OnceLock<AssociationRegistry> = OnceLock::new();
        GLOBAL.get_or_init(AssociationRegistry::new)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<(String, String), Entry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<(String, String), Entry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    fn insert<V: Any + Send + Sync>(
        &self,
        table: &'static str,
        target: &'static str,
        name: &str,
        value: Arc<V>,
    ) -> Result<()> {
        let mut entries = self.write();
        let key = (table.to_string(), name.to_string());
        if entries.contains_key(&key) {
            return Err(association_error(
                AssociationErrorKind::Duplicate,
                table,
                name,
                "already declared",
            ));
        }
        entries.insert(key, Entry { target, value });
        Ok(())
    }

    fn lookup<V: Any + Send + Sync>(
        &self,
        table: &'static str,
        target: &'static str,
        name: &str,
    ) -> Result<Arc<V>> {
        let entries = self.read();
        let Some(entry) = entries.get(&(table.to_string(), name.to_string())) else {
            return Err(association_error(
                AssociationErrorKind::NotFound,
                table,
                name,
                "no such association",
            ));
        };
        Arc::clone(&entry.value).downcast::<V>().map_err(|_| {
            association_error(
                AssociationErrorKind::TypeMismatch,
                table,
                name,
                format!("declared with target {}, requested {target}", entry.target),
            )
        })
    }

    /// Declare an array association named `name` on owner `O`.
    pub fn declare_collection<O, T>(
        &self,
        name: &str,
        options: ArrayAssociationOptions<T>,
    ) -> Result<Arc<ArrayAssociation<O, T>>>
    where
        O: Model + 'static,
        T: Model + 'static,
    {
        let assoc = Arc::new(ArrayAssociation::<O, T>::new(name, options)?);
        self.insert(O::TABLE_NAME, T::TABLE_NAME, name, Arc::clone(&assoc))?;
        Ok(assoc)
    }

    /// Resolve a declared array association.
    pub fn collection<O, T>(&self, name: &str) -> Result<Arc<ArrayAssociation<O, T>>>
    where
        O: Model + 'static,
        T: Model + 'static,
    {
        self.lookup(O::TABLE_NAME, T::TABLE_NAME, name)
    }

    /// Declare `name` on target `T`: the owners `O` holding its key.
    pub fn declare_reverse<T, O>(
        &self,
        name: &str,
        options: ReverseOptions,
    ) -> Result<Arc<ReverseAssociation<T, O>>>
    where
        T: Model + 'static,
        O: Model + 'static,
    {
        if !is_plain_identifier(name) {
            return Err(association_error(
                AssociationErrorKind::InvalidIdentifier,
                T::TABLE_NAME,
                name,
                format!("{name:?} is not a valid identifier"),
            ));
        }

        let forward_name = options.forward.as_deref().unwrap_or(T::TABLE_NAME);
        let scope = match options.array_attribute {
            Some(array_attribute) => {
                if !is_plain_identifier(&array_attribute) || !O::has_column(&array_attribute) {
                    return Err(association_error(
                        AssociationErrorKind::InvalidIdentifier,
                        T::TABLE_NAME,
                        name,
                        format!("{} has no column {array_attribute:?}", O::TABLE_NAME),
                    ));
                }
                let key_attribute = self
                    .collection::<O, T>(forward_name)
                    .map_or_else(|_| T::PRIMARY_KEY.to_string(), |f| f.key_attribute().to_string());
                SetQueryScope::new(array_attribute, key_attribute)
            }
            None => self.collection::<O, T>(forward_name)?.scope().clone(),
        };

        let reverse = Arc::new(ReverseAssociation::new(name.to_string(), scope));
        self.insert(T::TABLE_NAME, O::TABLE_NAME, name, Arc::clone(&reverse))?;
        tracing::debug!(
            target_table = T::TABLE_NAME,
            owner = O::TABLE_NAME,
            association = name,
            array_attribute = reverse.array_attribute(),
            "declared reverse association"
        );
        Ok(reverse)
    }

    /// Resolve a declared reverse association.
    pub fn reverse<T, O>(&self, name: &str) -> Result<Arc<ReverseAssociation<T, O>>>
    where
        T: Model + 'static,
        O: Model + 'static,
    {
        self.lookup(T::TABLE_NAME, O::TABLE_NAME, name)
    }

    /// Names declared on `table`, sorted.
    pub fn names(&self, table: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .read()
            .keys()
            .filter(|(t, _)| t == table)
            .map(|(_, n)| n.clone())
            .collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for AssociationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.read();
        let mut keys: Vec<_> = entries.keys().collect();
        keys.sort();
        f.debug_struct("AssociationRegistry")
            .field("entries", &keys)
            .finish()
    }
}
