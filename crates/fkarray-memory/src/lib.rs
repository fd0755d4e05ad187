//! In-process [`EntityStore`](fkarray_query::EntityStore) for fkarray.
//!
//! [`MemoryStore`] keeps rows per table and evaluates the same
//! [`Expr`](fkarray_query::Expr) trees that render to PostgreSQL, using
//! SQL three-valued logic and PostgreSQL array operator semantics. Every
//! query it runs is rendered first, so the SQL can be inspected through
//! [`MemoryStore::query_log`].

mod eval;
pub mod store;

pub use store::{MemoryStore, MemoryStoreConfig};
