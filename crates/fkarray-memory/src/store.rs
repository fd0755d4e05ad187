//! In-process entity store.

use crate::eval::Evaluator;
use fkarray_core::{Error, Model, QueryErrorKind, Result, Row, Value};
use fkarray_query::{EntityStore, Expr, SelectQuery, Where};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Configuration for a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Record every executed SQL string for later inspection. Off by
    /// default; the log is unbounded while enabled.
    pub log_queries: bool,
    /// Treat every LIKE as ILIKE.
    pub case_insensitive_like: bool,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            log_queries: false,
            case_insensitive_like: false,
        }
    }
}

impl MemoryStoreConfig {
    pub fn log_queries(mut self, enabled: bool) -> Self {
        self.log_queries = enabled;
        self
    }

    pub fn case_insensitive_like(mut self, enabled: bool) -> Self {
        self.case_insensitive_like = enabled;
        self
    }
}

#[derive(Debug, Default)]
pub(crate) struct Table {
    pub(crate) rows: Vec<Row>,
}

impl Table {
    fn position(&self, pk_column: &str, key: &Value) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get_by_name(pk_column) == Some(key))
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, Table>,
    log: Vec<String>,
}

/// Rows kept in memory, queried by evaluating [`Expr`] trees.
///
/// Writes happen only through [`insert`](Self::insert),
/// [`save`](Self::save) and [`delete`](Self::delete). Reads go through
/// [`EntityStore`], so anything built with `fkarray-query` runs here.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    config: MemoryStoreConfig,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            config,
        }
    }

    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Recover from a poisoned lock; rows are only ever replaced whole.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn key_of<M: Model>(record: &M) -> Result<Value> {
        let key = record.primary_key_value();
        if key.is_null() {
            return Err(Error::invalid_argument(
                M::PRIMARY_KEY,
                format!("{} record has no primary key", M::TABLE_NAME),
            ));
        }
        Ok(key)
    }

    /// Insert a new row. Fails if the primary key is taken.
    pub fn insert<M: Model>(&self, record: &M) -> Result<()> {
        let key = Self::key_of(record)?;
        let mut inner = self.lock();
        let table = inner.tables.entry(M::TABLE_NAME.to_string()).or_default();
        if table.position(M::PRIMARY_KEY, &key).is_some() {
            return Err(Error::query(
                QueryErrorKind::Store,
                format!(
                    "duplicate key value {:?} violates primary key of {}",
                    key,
                    M::TABLE_NAME
                ),
            ));
        }
        table.rows.push(Row::from_pairs(record.to_row()));
        tracing::debug!(table = M::TABLE_NAME, key = ?key, "inserted row");
        Ok(())
    }

    /// Insert or replace the row with this record's primary key.
    ///
    /// This is the only way an owner's in-memory changes reach the store.
    pub fn save<M: Model>(&self, record: &M) -> Result<()> {
        let key = Self::key_of(record)?;
        let mut inner = self.lock();
        let table = inner.tables.entry(M::TABLE_NAME.to_string()).or_default();
        let row = Row::from_pairs(record.to_row());
        match table.position(M::PRIMARY_KEY, &key) {
            Some(i) => table.rows[i] = row,
            None => table.rows.push(row),
        }
        tracing::debug!(table = M::TABLE_NAME, key = ?key, "saved row");
        Ok(())
    }

    /// Look up one row by primary key.
    pub fn find<M: Model>(&self, key: impl Into<Value>) -> Result<Option<M>> {
        let mut query = SelectQuery::new(M::TABLE_NAME);
        query.where_clause = Some(Where::new(Expr::col(M::PRIMARY_KEY).eq(key.into())));
        let rows = self.fetch_rows(&query)?;
        rows.first().map(M::from_row).transpose()
    }

    /// Delete the row with this primary key. Returns whether one existed.
    pub fn delete<M: Model>(&self, key: impl Into<Value>) -> Result<bool> {
        let key = key.into();
        let mut inner = self.lock();
        let Some(table) = inner.tables.get_mut(M::TABLE_NAME) else {
            return Ok(false);
        };
        match table.position(M::PRIMARY_KEY, &key) {
            Some(i) => {
                table.rows.remove(i);
                tracing::debug!(table = M::TABLE_NAME, key = ?key, "deleted row");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Number of stored rows for the model's table.
    pub fn len<M: Model>(&self) -> usize {
        self.lock()
            .tables
            .get(M::TABLE_NAME)
            .map_or(0, |t| t.rows.len())
    }

    pub fn is_empty<M: Model>(&self) -> bool {
        self.len::<M>() == 0
    }

    /// SQL of every query run so far, oldest first.
    pub fn query_log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    pub fn clear_query_log(&self) {
        self.lock().log.clear();
    }

    fn record(&self, inner: &mut Inner, sql: String) {
        tracing::trace!(sql = %sql, "memory store query");
        if self.config.log_queries {
            inner.log.push(sql);
        }
    }
}

impl EntityStore for MemoryStore {
    #[tracing::instrument(level = "debug", skip(self, query), fields(table = %query.table))]
    fn fetch_rows(&self, query: &SelectQuery) -> Result<Vec<Row>> {
        let (sql, _params) = query.build();
        let mut inner = self.lock();
        self.record(&mut inner, sql.clone());
        let evaluator = Evaluator {
            tables: &inner.tables,
            config: &self.config,
        };
        let rows = evaluator.run(query).map_err(|e| e.with_sql(sql))?;
        tracing::debug!(row_count = rows.len(), "fetched rows");
        Ok(rows)
    }

    #[tracing::instrument(level = "debug", skip(self, query), fields(table = %query.table))]
    fn count_rows(&self, query: &SelectQuery) -> Result<u64> {
        let (sql, _params) = query.build_count();
        let mut inner = self.lock();
        self.record(&mut inner, sql.clone());
        let evaluator = Evaluator {
            tables: &inner.tables,
            config: &self.config,
        };
        let rows = evaluator.matching(query).map_err(|e| e.with_sql(sql))?;
        Ok(rows.len() as u64)
    }
}
