//! Core types and traits for fkarray.
//!
//! This crate provides the foundations the query layer and the association
//! engine share:
//!
//! - `Value` and `Row` for stored data
//! - `Model` for struct-to-row mapping
//! - `KeySequence` and `KeyArrays` for ordered foreign-key arrays on owners
//! - `Error` and `Result`

pub mod error;
pub mod identifiers;
pub mod keys;
pub mod model;
pub mod row;
pub mod value;

pub use error::{
    AssociationError, AssociationErrorKind, Error, InvalidArgumentError, QueryError,
    QueryErrorKind, Result, TypeError, UnsupportedError,
};
pub use identifiers::{is_plain_identifier, quote_ident, validate_identifier};
pub use keys::{KeyArrays, KeySequence};
pub use model::Model;
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;
