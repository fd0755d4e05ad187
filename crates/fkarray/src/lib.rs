//! fkarray - ordered foreign-key array associations.
//!
//! An owner record keeps an ordered array of target keys in one column
//! instead of a join table. fkarray exposes that array as:
//!
//! - a live, order-preserving [`OrderedForeignKeyCollection`] of target
//!   records, where duplicates and NULL entries keep their positions
//! - set-relationship query scopes on the owner type (containing,
//!   contained in, any from)
//! - a read-only [`ReverseAssociation`] from a target to its owners
//!
//! # Quick Start
//!
//! ```ignore
//! use fkarray::prelude::*;
//!
//! let registry = AssociationRegistry::new();
//! let videos = registry.declare_collection::<Playlist, Video>(
//!     "videos",
//!     ArrayAssociationOptions::new(),
//! )?;
//!
//! let mut playlist = store.find::<Playlist>(1)?.unwrap();
//! let mut list = fkarray::collection(&videos, &mut playlist, &store)?;
//! list.push(&food_chain)?.dedup();
//! for slot in list.iter()? {
//!     match slot {
//!         Slot::Record(video) => println!("{}", video.title),
//!         _ => println!("(gone)"),
//!     }
//! }
//! store.save(&playlist)?;
//!
//! let with_both = videos.with_containing(&[v1, v2][..])?.all(&store)?;
//! ```

pub mod association;
pub mod collection;
pub mod deferred;
pub mod registry;
pub mod reverse;
pub mod slot;

pub use association::{
    ArrayAssociation, ArrayAssociationOptions, CollectionExtension, SecondaryOrdering,
};
pub use collection::OrderedForeignKeyCollection;
pub use deferred::{Deferred, DeferredOp};
pub use registry::{AssociationRegistry, ReverseOptions};
pub use reverse::ReverseAssociation;
pub use slot::{Item, Slot};

pub use fkarray_core::{
    AssociationError, AssociationErrorKind, Error, KeyArrays, KeySequence, Model, Result, Row,
    Value,
};
pub use fkarray_query::{
    EntityStore, Expr, KeySet, OrderBy, Select, SelectQuery, SetQueryScope, SetRelation, select,
};

/// Open the collection `assoc` describes over `owner`'s key array.
pub fn collection<'a, O, T, S>(
    assoc: &'a ArrayAssociation<O, T>,
    owner: &'a mut O,
    store: &'a S,
) -> Result<OrderedForeignKeyCollection<'a, O, T, S>>
where
    O: Model + KeyArrays,
    T: Model,
    S: EntityStore + ?Sized,
{
    assoc.collection(owner, store)
}

/// The query scopes `assoc` describes on its owner type.
pub fn scope<O: Model, T: Model>(assoc: &ArrayAssociation<O, T>) -> &SetQueryScope<O, T> {
    assoc.scope()
}

pub mod prelude {
    pub use crate::{
        ArrayAssociation, ArrayAssociationOptions, AssociationRegistry, EntityStore, Error, Expr,
        KeyArrays, KeySequence, KeySet, Model, OrderBy, OrderedForeignKeyCollection,
        ReverseOptions, Result, Row, Select, Slot, Value, select,
    };
}
