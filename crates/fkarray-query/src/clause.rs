//! SQL clause types (WHERE, ORDER BY, LIMIT, OFFSET).

use crate::expr::Expr;
use fkarray_core::{Value, quote_ident};

/// WHERE clause.
#[derive(Debug, Clone)]
pub struct Where {
    expr: Expr,
}

impl Where {
    /// Create a new WHERE clause with the given expression.
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }

    /// Add an AND condition.
    pub fn and(self, expr: Expr) -> Self {
        Self {
            expr: self.expr.and(expr),
        }
    }

    /// Add an OR condition.
    pub fn or(self, expr: Expr) -> Self {
        Self {
            expr: self.expr.or(expr),
        }
    }

    /// The accumulated condition.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Build the condition SQL into a shared parameter list.
    pub fn build_into(&self, params: &mut Vec<Value>, offset: usize) -> String {
        self.expr.build(params, offset)
    }
}

/// ORDER BY clause over a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    column: String,
    direction: OrderDirection,
    nulls: Option<NullsOrder>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

/// NULLS FIRST/LAST ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

impl OrderBy {
    /// Create an ascending order by clause.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Asc,
            nulls: None,
        }
    }

    /// Create a descending order by clause.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Desc,
            nulls: None,
        }
    }

    /// Set NULLS FIRST.
    #[must_use]
    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }

    /// Set NULLS LAST.
    #[must_use]
    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub const fn direction(&self) -> OrderDirection {
        self.direction
    }

    /// Where NULLs sort, with PostgreSQL's default filled in
    /// (last for ascending, first for descending).
    pub const fn effective_nulls(&self) -> NullsOrder {
        match (self.nulls, self.direction) {
            (Some(n), _) => n,
            (None, OrderDirection::Asc) => NullsOrder::Last,
            (None, OrderDirection::Desc) => NullsOrder::First,
        }
    }

    /// Generate SQL for this ORDER BY item.
    pub fn to_sql(&self) -> String {
        let mut sql = quote_ident(&self.column);

        sql.push_str(match self.direction {
            OrderDirection::Asc => " ASC",
            OrderDirection::Desc => " DESC",
        });

        if let Some(nulls) = self.nulls {
            sql.push_str(match nulls {
                NullsOrder::First => " NULLS FIRST",
                NullsOrder::Last => " NULLS LAST",
            });
        }

        sql
    }
}

/// LIMIT clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(pub u64);

/// OFFSET clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_by_sql() {
        assert_eq!(OrderBy::asc("title").to_sql(), "\"title\" ASC");
        assert_eq!(
            OrderBy::desc("title").nulls_last().to_sql(),
            "\"title\" DESC NULLS LAST"
        );
    }

    #[test]
    fn effective_nulls_follow_postgres_defaults() {
        assert_eq!(OrderBy::asc("a").effective_nulls(), NullsOrder::Last);
        assert_eq!(OrderBy::desc("a").effective_nulls(), NullsOrder::First);
        assert_eq!(
            OrderBy::asc("a").nulls_first().effective_nulls(),
            NullsOrder::First
        );
    }

    #[test]
    fn where_composes() {
        let w = Where::new(Expr::col("a").eq(1)).and(Expr::col("b").eq(2));
        let mut params = Vec::new();
        assert_eq!(w.build_into(&mut params, 0), "\"a\" = $1 AND \"b\" = $2");
        assert_eq!(params.len(), 2);
    }
}
