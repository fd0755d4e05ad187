//! SQL expressions for query building.
//!
//! Expressions render to PostgreSQL. Literal values are never interpolated;
//! each one is pushed onto the parameter list and rendered as `$n`.

use crate::subquery::SelectQuery;
use fkarray_core::{Value, quote_ident};

/// A SQL expression that can be used in WHERE clauses.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Column reference with optional table qualifier
    Column {
        /// Optional table name or alias
        table: Option<String>,
        /// Column name
        name: String,
    },

    /// Literal value, bound as a parameter
    Literal(Value),

    /// TRUE / FALSE
    Constant(bool),

    /// Binary operation (e.g., a = b, a AND b)
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    /// NOT a
    Not(Box<Expr>),

    /// IN expression
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// LIKE / NOT LIKE pattern
    Like {
        expr: Box<Expr>,
        pattern: String,
        negated: bool,
        case_insensitive: bool,
    },

    /// `ARRAY[a, b, ...]`
    Array(Vec<Expr>),

    /// `ARRAY(SELECT ...)`, evaluated by the store at query time
    ArraySubquery(Box<SelectQuery>),

    /// Array set comparison (`@>`, `<@`, `&&`)
    ArrayCompare {
        left: Box<Expr>,
        op: ArrayOp,
        right: Box<Expr>,
    },

    /// Array has no elements (NULL counts as empty)
    ArrayIsEmpty(Box<Expr>),

    /// Parenthesized expression
    Paren(Box<Expr>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Equal (=)
    Eq,
    /// Not equal (<>)
    Ne,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Le,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Ge,
    /// Logical AND
    And,
    /// Logical OR
    Or,
}

impl BinaryOp {
    /// Get the SQL representation of this operator.
    pub const fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    /// Get the precedence of this operator (higher = binds tighter).
    pub const fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 3,
        }
    }
}

/// PostgreSQL array set operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayOp {
    /// Left contains every element of right (`@>`)
    Contains,
    /// Every element of left occurs in right (`<@`)
    ContainedBy,
    /// Left and right share an element (`&&`)
    Overlaps,
}

impl ArrayOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            ArrayOp::Contains => "@>",
            ArrayOp::ContainedBy => "<@",
            ArrayOp::Overlaps => "&&",
        }
    }
}

impl Expr {
    // ==================== Constructors ====================

    /// Create a column reference expression.
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Column {
            table: None,
            name: name.into(),
        }
    }

    /// Create a qualified column reference (table.column).
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Expr::Column {
            table: Some(table.into()),
            name: column.into(),
        }
    }

    /// Create a literal value expression.
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Create a NULL literal.
    pub fn null() -> Self {
        Expr::Literal(Value::Null)
    }

    /// TRUE or FALSE.
    pub const fn constant(value: bool) -> Self {
        Expr::Constant(value)
    }

    /// `ARRAY[...]` of bound values.
    pub fn array<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Expr::Array(values.into_iter().map(|v| Expr::Literal(v.into())).collect())
    }

    /// `ARRAY(SELECT ...)` over a single-column sub-select.
    pub fn array_subquery(query: SelectQuery) -> Self {
        Expr::ArraySubquery(Box::new(query))
    }

    // ==================== Comparison Operators ====================

    fn binary(self, op: BinaryOp, other: impl Into<Expr>) -> Self {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(other.into()),
        }
    }

    /// Equal to (=)
    pub fn eq(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Eq, other)
    }

    /// Not equal to (<>)
    pub fn ne(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Ne, other)
    }

    /// Less than (<)
    pub fn lt(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Lt, other)
    }

    /// Less than or equal to (<=)
    pub fn le(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Le, other)
    }

    /// Greater than (>)
    pub fn gt(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Gt, other)
    }

    /// Greater than or equal to (>=)
    pub fn ge(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Ge, other)
    }

    // ==================== Logical Operators ====================

    /// Logical AND
    pub fn and(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::And, other)
    }

    /// Logical OR
    pub fn or(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    /// Logical NOT
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    // ==================== Null Checks ====================

    /// IS NULL
    pub fn is_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    /// IS NOT NULL
    pub fn is_not_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    // ==================== Pattern Matching ====================

    /// LIKE pattern
    pub fn like(self, pattern: impl Into<String>) -> Self {
        Expr::Like {
            expr: Box::new(self),
            pattern: pattern.into(),
            negated: false,
            case_insensitive: false,
        }
    }

    /// NOT LIKE pattern
    pub fn not_like(self, pattern: impl Into<String>) -> Self {
        Expr::Like {
            expr: Box::new(self),
            pattern: pattern.into(),
            negated: true,
            case_insensitive: false,
        }
    }

    /// ILIKE (case-insensitive LIKE)
    pub fn ilike(self, pattern: impl Into<String>) -> Self {
        Expr::Like {
            expr: Box::new(self),
            pattern: pattern.into(),
            negated: false,
            case_insensitive: true,
        }
    }

    // ==================== IN ====================

    /// IN list of values
    pub fn in_list(self, values: Vec<impl Into<Expr>>) -> Self {
        Expr::In {
            expr: Box::new(self),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    /// NOT IN list of values
    pub fn not_in_list(self, values: Vec<impl Into<Expr>>) -> Self {
        Expr::In {
            expr: Box::new(self),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    // ==================== Arrays ====================

    /// `self @> other`
    pub fn array_contains(self, other: impl Into<Expr>) -> Self {
        Expr::ArrayCompare {
            left: Box::new(self),
            op: ArrayOp::Contains,
            right: Box::new(other.into()),
        }
    }

    /// `self <@ other`
    pub fn array_contained_by(self, other: impl Into<Expr>) -> Self {
        Expr::ArrayCompare {
            left: Box::new(self),
            op: ArrayOp::ContainedBy,
            right: Box::new(other.into()),
        }
    }

    /// `self && other`
    pub fn array_overlaps(self, other: impl Into<Expr>) -> Self {
        Expr::ArrayCompare {
            left: Box::new(self),
            op: ArrayOp::Overlaps,
            right: Box::new(other.into()),
        }
    }

    /// The array is NULL or has no elements.
    pub fn array_is_empty(self) -> Self {
        Expr::ArrayIsEmpty(Box::new(self))
    }

    // ==================== Utility ====================

    /// Wrap expression in parentheses.
    pub fn paren(self) -> Self {
        Expr::Paren(Box::new(self))
    }

    /// Column name, if this is a column reference.
    pub fn column_name(&self) -> Option<String> {
        match self {
            Expr::Column { name, .. } => Some(name.clone()),
            _ => None,
        }
    }

    // ==================== SQL Generation ====================

    /// Build SQL, appending bound values to `params`.
    ///
    /// Placeholders are numbered `offset + params.len()`, so several
    /// expressions can share one parameter list.
    pub fn build(&self, params: &mut Vec<Value>, offset: usize) -> String {
        match self {
            Expr::Column { table, name } => {
                if let Some(t) = table {
                    format!("{}.{}", quote_ident(t), quote_ident(name))
                } else {
                    quote_ident(name)
                }
            }

            Expr::Literal(value) => {
                params.push(value.clone());
                format!("${}", offset + params.len())
            }

            Expr::Constant(true) => "TRUE".to_string(),
            Expr::Constant(false) => "FALSE".to_string(),

            Expr::Binary { left, op, right } => {
                let left_sql = build_operand(left, *op, params, offset);
                let right_sql = build_operand(right, *op, params, offset);
                format!("{left_sql} {} {right_sql}", op.as_str())
            }

            Expr::Not(expr) => {
                let expr_sql = expr.build(params, offset);
                if matches!(**expr, Expr::Binary { .. }) {
                    format!("NOT ({expr_sql})")
                } else {
                    format!("NOT {expr_sql}")
                }
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                if values.is_empty() {
                    // `x IN ()` is not valid SQL
                    return if *negated { "1 = 1" } else { "1 = 0" }.to_string();
                }
                let expr_sql = expr.build(params, offset);
                let value_sqls: Vec<_> = values.iter().map(|v| v.build(params, offset)).collect();
                let not_str = if *negated { "NOT " } else { "" };
                format!("{expr_sql} {not_str}IN ({})", value_sqls.join(", "))
            }

            Expr::IsNull { expr, negated } => {
                let expr_sql = expr.build(params, offset);
                let not_str = if *negated { " NOT" } else { "" };
                format!("{expr_sql} IS{not_str} NULL")
            }

            Expr::Like {
                expr,
                pattern,
                negated,
                case_insensitive,
            } => {
                let expr_sql = expr.build(params, offset);
                params.push(Value::Text(pattern.clone()));
                let param = format!("${}", offset + params.len());
                let not_str = if *negated { "NOT " } else { "" };
                let op = if *case_insensitive { "ILIKE" } else { "LIKE" };
                format!("{expr_sql} {not_str}{op} {param}")
            }

            Expr::Array(items) => {
                let item_sqls: Vec<_> = items.iter().map(|v| v.build(params, offset)).collect();
                format!("ARRAY[{}]", item_sqls.join(", "))
            }

            Expr::ArraySubquery(query) => {
                let sql = query.build_into(params, offset);
                format!("ARRAY({sql})")
            }

            Expr::ArrayCompare { left, op, right } => {
                let left_sql = left.build(params, offset);
                let right_sql = right.build(params, offset);
                format!("{left_sql} {} {right_sql}", op.as_str())
            }

            Expr::ArrayIsEmpty(expr) => {
                let expr_sql = expr.build(params, offset);
                format!("COALESCE(cardinality({expr_sql}), 0) = 0")
            }

            Expr::Paren(expr) => {
                let expr_sql = expr.build(params, offset);
                format!("({expr_sql})")
            }
        }
    }
}

/// Render a binary operand, parenthesizing looser-binding children.
fn build_operand(
    operand: &Expr,
    parent: BinaryOp,
    params: &mut Vec<Value>,
    offset: usize,
) -> String {
    let sql = operand.build(params, offset);
    match operand {
        Expr::Binary { op, .. } if op.precedence() < parent.precedence() => format!("({sql})"),
        _ => sql,
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Literal(Value::Text(s.to_string()))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Literal(Value::Text(s))
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        Expr::Literal(Value::Int(n))
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Expr::Literal(Value::BigInt(n))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Literal(Value::Bool(b))
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::Literal(Value::Double(n))
    }
}
