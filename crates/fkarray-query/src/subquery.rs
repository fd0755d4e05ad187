//! Non-generic SELECT representation.

use crate::clause::{Limit, Offset, OrderBy, Where};
use fkarray_core::{Value, quote_ident};

/// Non-generic SELECT, as handed to an [`EntityStore`](crate::EntityStore)
/// or nested inside `ARRAY(...)`.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    /// Table name for FROM clause
    pub table: String,
    /// Columns to select (empty = all)
    pub columns: Vec<String>,
    /// WHERE clause conditions
    pub where_clause: Option<Where>,
    /// ORDER BY clauses
    pub order_by: Vec<OrderBy>,
    /// LIMIT clause
    pub limit: Option<Limit>,
    /// OFFSET clause
    pub offset: Option<Offset>,
}

impl SelectQuery {
    /// An unfiltered `SELECT *` over `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            where_clause: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Build the SQL query and parameters.
    pub fn build(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = self.build_into(&mut params, 0);
        (sql, params)
    }

    /// Build into an existing parameter list, for nesting.
    pub fn build_into(&self, params: &mut Vec<Value>, offset: usize) -> String {
        let mut sql = String::from("SELECT ");

        if self.columns.is_empty() {
            sql.push('*');
        } else {
            let cols: Vec<_> = self.columns.iter().map(|c| quote_ident(c)).collect();
            sql.push_str(&cols.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(&quote_ident(&self.table));

        if let Some(where_clause) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause.build_into(params, offset));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let order_strs: Vec<_> = self.order_by.iter().map(OrderBy::to_sql).collect();
            sql.push_str(&order_strs.join(", "));
        }

        if let Some(Limit(n)) = self.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        if let Some(Offset(n)) = self.offset {
            sql.push_str(&format!(" OFFSET {}", n));
        }

        sql
    }

    /// `SELECT COUNT(*)` over the same table and conditions.
    pub fn build_count(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&self.table));
        if let Some(where_clause) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause.build_into(&mut params, 0));
        }
        (sql, params)
    }
}
