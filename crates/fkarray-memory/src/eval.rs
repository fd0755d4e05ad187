//! Expression evaluation over stored rows.
//!
//! Conditions follow SQL three-valued logic: a comparison with NULL is
//! NULL, and only rows whose condition is TRUE are returned. Array
//! operators follow PostgreSQL, where NULL elements never match anything.

use crate::store::{MemoryStoreConfig, Table};
use fkarray_core::{Error, QueryErrorKind, Result, Row, Value};
use fkarray_query::{ArrayOp, BinaryOp, Expr, NullsOrder, OrderBy, OrderDirection, SelectQuery};
use regex::RegexBuilder;
use std::cmp::Ordering;
use std::collections::HashMap;

pub(crate) struct Evaluator<'a> {
    pub(crate) tables: &'a HashMap<String, Table>,
    pub(crate) config: &'a MemoryStoreConfig,
}

impl Evaluator<'_> {
    /// Rows of `query.table` whose condition is TRUE, before ordering,
    /// paging or projection.
    pub(crate) fn matching(&self, query: &SelectQuery) -> Result<Vec<Row>> {
        let Some(table) = self.tables.get(&query.table) else {
            return Ok(Vec::new());
        };
        let mut rows = Vec::new();
        for row in &table.rows {
            let keep = match &query.where_clause {
                Some(w) => truth(&self.eval(w.expr(), row)?) == Some(true),
                None => true,
            };
            if keep {
                rows.push(row.clone());
            }
        }
        Ok(rows)
    }

    /// Run a full SELECT.
    pub(crate) fn run(&self, query: &SelectQuery) -> Result<Vec<Row>> {
        let mut rows = self.matching(query)?;

        if !query.order_by.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &query.order_by));
        }

        let skip = query
            .offset
            .map_or(0, |o| usize::try_from(o.0).unwrap_or(usize::MAX));
        let take = query
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l.0).unwrap_or(usize::MAX));
        let rows = rows.into_iter().skip(skip).take(take);

        if query.columns.is_empty() {
            Ok(rows.collect())
        } else {
            Ok(rows.map(|r| r.project(&query.columns)).collect())
        }
    }

    pub(crate) fn eval(&self, expr: &Expr, row: &Row) -> Result<Value> {
        match expr {
            Expr::Column { name, .. } => row.get_by_name(name).cloned().ok_or_else(|| {
                Error::query(
                    QueryErrorKind::NotFound,
                    format!("no such column: {}", name),
                )
            }),

            Expr::Literal(value) => Ok(value.clone()),

            Expr::Constant(b) => Ok(Value::Bool(*b)),

            Expr::Binary { left, op, right } => {
                let l = self.eval(left, row)?;
                let r = self.eval(right, row)?;
                binary(*op, &l, &r)
            }

            Expr::Not(inner) => {
                let v = self.eval(inner, row)?;
                Ok(truth(&v).map_or(Value::Null, |b| Value::Bool(!b)))
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                let needle = self.eval(expr, row)?;
                if values.is_empty() {
                    return Ok(Value::Bool(*negated));
                }
                if needle.is_null() {
                    return Ok(Value::Null);
                }
                let mut saw_null = false;
                for candidate in values {
                    let candidate = self.eval(candidate, row)?;
                    if candidate.is_null() {
                        saw_null = true;
                    } else if sql_equal(&needle, &candidate) {
                        return Ok(Value::Bool(!negated));
                    }
                }
                Ok(if saw_null {
                    Value::Null
                } else {
                    Value::Bool(*negated)
                })
            }

            Expr::IsNull { expr, negated } => {
                let v = self.eval(expr, row)?;
                Ok(Value::Bool(v.is_null() != *negated))
            }

            Expr::Like {
                expr,
                pattern,
                negated,
                case_insensitive,
            } => {
                let v = self.eval(expr, row)?;
                let text = match &v {
                    Value::Null => return Ok(Value::Null),
                    Value::Text(s) => s,
                    other => {
                        return Err(Error::query(
                            QueryErrorKind::Type,
                            format!("LIKE needs TEXT, found {}", other.type_name()),
                        ));
                    }
                };
                let insensitive = *case_insensitive || self.config.case_insensitive_like;
                let matched = like_matches(pattern, text, insensitive)?;
                Ok(Value::Bool(matched != *negated))
            }

            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item, row))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),

            Expr::ArraySubquery(query) => {
                let rows = self.run(query)?;
                Ok(Value::Array(
                    rows.iter()
                        .map(|r| r.get(0).cloned().unwrap_or(Value::Null))
                        .collect(),
                ))
            }

            Expr::ArrayCompare { left, op, right } => {
                let l = self.eval(left, row)?;
                let r = self.eval(right, row)?;
                array_compare(*op, &l, &r)
            }

            Expr::ArrayIsEmpty(inner) => match self.eval(inner, row)? {
                Value::Null => Ok(Value::Bool(true)),
                Value::Array(items) => Ok(Value::Bool(items.is_empty())),
                other => Err(Error::query(
                    QueryErrorKind::Type,
                    format!("cardinality needs ARRAY, found {}", other.type_name()),
                )),
            },

            Expr::Paren(inner) => self.eval(inner, row),
        }
    }
}

/// TRUE / FALSE / unknown.
pub(crate) fn truth(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        _ => None,
    }
}

fn sql_equal(a: &Value, b: &Value) -> bool {
    match a.compare(b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value> {
    match op {
        BinaryOp::And => Ok(match (truth(l), truth(r)) {
            (Some(false), _) | (_, Some(false)) => Value::Bool(false),
            (Some(true), Some(true)) => Value::Bool(true),
            _ => Value::Null,
        }),
        BinaryOp::Or => Ok(match (truth(l), truth(r)) {
            (Some(true), _) | (_, Some(true)) => Value::Bool(true),
            (Some(false), Some(false)) => Value::Bool(false),
            _ => Value::Null,
        }),
        _ if l.is_null() || r.is_null() => Ok(Value::Null),
        BinaryOp::Eq => Ok(Value::Bool(sql_equal(l, r))),
        BinaryOp::Ne => Ok(Value::Bool(!sql_equal(l, r))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = l.compare(r).ok_or_else(|| {
                Error::query(
                    QueryErrorKind::Type,
                    format!(
                        "cannot compare {} with {}",
                        l.type_name(),
                        r.type_name()
                    ),
                )
            })?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
    }
}

fn array_compare(op: ArrayOp, l: &Value, r: &Value) -> Result<Value> {
    let (left, right) = match (l, r) {
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Null),
        (Value::Array(a), Value::Array(b)) => (a, b),
        _ => {
            return Err(Error::query(
                QueryErrorKind::Type,
                format!(
                    "operator {} needs ARRAY operands, found {} and {}",
                    op.as_str(),
                    l.type_name(),
                    r.type_name()
                ),
            ));
        }
    };
    let member = |x: &Value, set: &[Value]| !x.is_null() && set.iter().any(|y| sql_equal(x, y));
    let result = match op {
        ArrayOp::Contains => right.iter().all(|x| member(x, left.as_slice())),
        ArrayOp::ContainedBy => left.iter().all(|x| member(x, right.as_slice())),
        ArrayOp::Overlaps => left.iter().any(|x| member(x, right.as_slice())),
    };
    Ok(Value::Bool(result))
}

/// Translate a LIKE pattern to an anchored regex and match it.
///
/// `%` matches any run, `_` one character, and a backslash escapes the
/// next character.
fn like_matches(pattern: &str, text: &str, case_insensitive: bool) -> Result<bool> {
    let mut re = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    re.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');

    let compiled = RegexBuilder::new(&re)
        .case_insensitive(case_insensitive)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| {
            Error::query(
                QueryErrorKind::Unsupported,
                format!("LIKE pattern '{}' could not be compiled: {}", pattern, e),
            )
        })?;
    Ok(compiled.is_match(text))
}

fn compare_rows(a: &Row, b: &Row, order_by: &[OrderBy]) -> Ordering {
    for order in order_by {
        let av = a.get_by_name(order.column()).unwrap_or(&Value::Null);
        let bv = b.get_by_name(order.column()).unwrap_or(&Value::Null);
        let nulls_first = order.effective_nulls() == NullsOrder::First;
        let ordering = match (av.is_null(), bv.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => {
                if nulls_first {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (false, true) => {
                if nulls_first {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (false, false) => {
                let natural = av.compare(bv).unwrap_or(Ordering::Equal);
                match order.direction() {
                    OrderDirection::Asc => natural,
                    OrderDirection::Desc => natural.reverse(),
                }
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
