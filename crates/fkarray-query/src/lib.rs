//! Query construction for fkarray.
//!
//! `fkarray-query` is the **query construction layer**: an expression DSL
//! that renders PostgreSQL with bound parameters, a typed [`Select`]
//! builder, the [`EntityStore`] capability queries execute through, and
//! [`SetQueryScope`] for superset/subset/overlap conditions on key array
//! columns.

pub mod clause;
pub mod expr;
pub mod scope;
pub mod select;
pub mod store;
pub mod subquery;

pub use clause::{Limit, NullsOrder, Offset, OrderBy, OrderDirection, Where};
pub use expr::{ArrayOp, BinaryOp, Expr};
pub use scope::{KeySet, SetQueryScope, SetRelation, record_key};
pub use select::Select;
pub use store::EntityStore;
pub use subquery::SelectQuery;

/// Create a SELECT query for a model.
///
/// ```ignore
/// let videos = select!(Video)
///     .filter(Expr::col("title").like("%Chain%"))
///     .all(&store)?;
/// ```
#[macro_export]
macro_rules! select {
    ($model:ty) => {
        $crate::Select::<$model>::new()
    };
}
