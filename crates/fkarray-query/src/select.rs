//! SELECT query builder.

use crate::clause::{Limit, Offset, OrderBy, Where};
use crate::expr::Expr;
use crate::store::EntityStore;
use crate::subquery::SelectQuery;
use fkarray_core::{Error, Model, Result, Value};
use std::fmt;
use std::marker::PhantomData;

/// A SELECT query builder over one model's table.
///
/// Filters compose with AND; the query executes through any
/// [`EntityStore`].
pub struct Select<M: Model> {
    query: SelectQuery,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Model> Select<M> {
    /// Create a new SELECT query for the model's table.
    pub fn new() -> Self {
        Self {
            query: SelectQuery::new(M::TABLE_NAME),
            _marker: PhantomData,
        }
    }

    /// Select specific columns.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.query.columns = cols.iter().map(|&s| s.to_string()).collect();
        self
    }

    /// Add a WHERE condition.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.query.where_clause = Some(match self.query.where_clause {
            Some(existing) => existing.and(expr),
            None => Where::new(expr),
        });
        self
    }

    /// Add an OR WHERE condition.
    pub fn or_filter(mut self, expr: Expr) -> Self {
        self.query.where_clause = Some(match self.query.where_clause {
            Some(existing) => existing.or(expr),
            None => Where::new(expr),
        });
        self
    }

    /// Add ORDER BY clause.
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.query.order_by.push(order);
        self
    }

    /// Set LIMIT.
    pub fn limit(mut self, n: u64) -> Self {
        self.query.limit = Some(Limit(n));
        self
    }

    /// Set OFFSET.
    pub fn offset(mut self, n: u64) -> Self {
        self.query.offset = Some(Offset(n));
        self
    }

    /// The accumulated WHERE condition, if any.
    pub fn condition(&self) -> Option<&Expr> {
        self.query.where_clause.as_ref().map(Where::expr)
    }

    /// ORDER BY items in application order.
    pub fn ordering(&self) -> &[OrderBy] {
        &self.query.order_by
    }

    /// Build the SQL query and parameters.
    pub fn build(&self) -> (String, Vec<Value>) {
        self.query.build()
    }

    /// Non-generic form of this query.
    pub fn to_query(&self) -> SelectQuery {
        self.query.clone()
    }

    pub fn into_query(self) -> SelectQuery {
        self.query
    }

    /// Turn this query into a single-column sub-select of `column`.
    ///
    /// Fails if the query already projects anything other than `column`.
    pub fn into_key_subquery(self, column: &str) -> Result<SelectQuery> {
        let mut query = self.query;
        match query.columns.as_slice() {
            [] => query.columns = vec![column.to_string()],
            [only] if only == column => {}
            other => {
                return Err(Error::invalid_argument(
                    "sub-query",
                    format!(
                        "must select only `{}`, but selects {}",
                        column,
                        other.join(", ")
                    ),
                ));
            }
        }
        Ok(query)
    }

    /// Execute the query and return all matching rows as models.
    pub fn all<S: EntityStore + ?Sized>(&self, store: &S) -> Result<Vec<M>> {
        let rows = store.fetch_rows(&self.query)?;
        tracing::debug!(
            table = M::TABLE_NAME,
            row_count = rows.len(),
            "select returned rows"
        );
        rows.iter().map(M::from_row).collect()
    }

    /// Execute the query and return the first matching row.
    pub fn first<S: EntityStore + ?Sized>(&self, store: &S) -> Result<Option<M>> {
        let mut query = self.query.clone();
        query.limit = Some(Limit(1));
        let rows = store.fetch_rows(&query)?;
        rows.first().map(M::from_row).transpose()
    }

    /// Execute the query and return the count of matching rows.
    pub fn count<S: EntityStore + ?Sized>(&self, store: &S) -> Result<u64> {
        store.count_rows(&self.query)
    }

    /// Check if any rows match the query.
    pub fn exists<S: EntityStore + ?Sized>(&self, store: &S) -> Result<bool> {
        Ok(self.count(store)? > 0)
    }
}

impl<M: Model> Default for Select<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for Select<M> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            _marker: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for Select<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select")
            .field("model", &M::TABLE_NAME)
            .field("query", &self.query)
            .finish()
    }
}

impl<M: Model> From<Select<M>> for SelectQuery {
    fn from(select: Select<M>) -> Self {
        select.query
    }
}
