//! The query capability an entity store must provide.

use crate::subquery::SelectQuery;
use fkarray_core::{Result, Row};

/// Something that can run a [`SelectQuery`] and hand back rows.
///
/// Calls are synchronous and may block; timeouts and cancellation belong to
/// the store client.
pub trait EntityStore {
    /// Run the query and return matching rows in result order.
    fn fetch_rows(&self, query: &SelectQuery) -> Result<Vec<Row>>;

    /// Count rows matching the query's conditions.
    ///
    /// Ignores ordering and paging. The default fetches and counts.
    fn count_rows(&self, query: &SelectQuery) -> Result<u64> {
        let mut unpaged = query.clone();
        unpaged.order_by.clear();
        unpaged.limit = None;
        unpaged.offset = None;
        Ok(self.fetch_rows(&unpaged)?.len() as u64)
    }
}

impl<S: EntityStore + ?Sized> EntityStore for &S {
    fn fetch_rows(&self, query: &SelectQuery) -> Result<Vec<Row>> {
        (**self).fetch_rows(query)
    }

    fn count_rows(&self, query: &SelectQuery) -> Result<u64> {
        (**self).count_rows(query)
    }
}
