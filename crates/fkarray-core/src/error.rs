//! Error types for fkarray operations.

use std::fmt;

/// The primary error type for all fkarray operations.
#[derive(Debug)]
pub enum Error {
    /// Store query execution errors
    Query(QueryError),
    /// Type conversion errors while decoding rows
    Type(TypeError),
    /// Malformed input rejected before any query runs
    InvalidArgument(InvalidArgumentError),
    /// Operation deliberately not provided
    Unsupported(UnsupportedError),
    /// Association declaration or lookup errors
    Association(AssociationError),
    /// Serialization/deserialization errors
    Serde(String),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Table or column not found
    NotFound,
    /// Expression the store cannot evaluate
    Unsupported,
    /// Operand types cannot be compared or combined
    Type,
    /// Other store error
    Store,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InvalidArgumentError {
    /// Name of the argument or input that was rejected
    pub argument: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct UnsupportedError {
    /// Name of the operation that is not provided
    pub operation: &'static str,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AssociationError {
    pub kind: AssociationErrorKind,
    /// Owner table the association is declared on
    pub owner: String,
    /// Association name
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationErrorKind {
    /// An association with this name already exists on the owner
    Duplicate,
    /// No association with this name is declared on the owner
    NotFound,
    /// The association exists but with different owner/target types
    TypeMismatch,
    /// An identifier failed validation or does not name a declared column
    InvalidIdentifier,
    /// The owner does not expose the declared array attribute
    MissingAttribute,
}

impl Error {
    /// Build an invalid-argument error.
    pub fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidArgument(InvalidArgumentError {
            argument: argument.into(),
            message: message.into(),
        })
    }

    /// Build an unsupported-operation error.
    pub fn unsupported(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Unsupported(UnsupportedError {
            operation,
            message: message.into(),
        })
    }

    /// Build a query error without SQL context.
    pub fn query(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            kind,
            sql: None,
            message: message.into(),
            source: None,
        })
    }

    /// Is this the fail-fast signal for an operation that is not provided?
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }

    /// Was this raised while validating input, before anything executed?
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }

    /// Attach rendered SQL to a query error; other errors pass through.
    #[must_use]
    pub fn with_sql(self, sql: impl Into<String>) -> Self {
        match self {
            Error::Query(mut q) => {
                q.sql = Some(sql.into());
                Error::Query(q)
            }
            other => other,
        }
    }
}

impl AssociationError {
    pub fn new(
        kind: AssociationErrorKind,
        owner: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            owner: owner.into(),
            name: name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Query(e) => write!(f, "Query error: {}", e),
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::InvalidArgument(e) => write!(f, "Invalid argument: {}", e),
            Error::Unsupported(e) => write!(f, "Not implemented: {}", e),
            Error::Association(e) => write!(f, "Association error: {}", e),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sql) = &self.sql {
            write!(f, "{} (while executing `{}`)", self.message, sql)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.argument, self.message)
    }
}

impl fmt::Display for UnsupportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.operation, self.message)
    }
}

impl fmt::Display for AssociationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.owner, self.name, self.message)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<InvalidArgumentError> for Error {
    fn from(err: InvalidArgumentError) -> Self {
        Error::InvalidArgument(err)
    }
}

impl From<UnsupportedError> for Error {
    fn from(err: UnsupportedError) -> Self {
        Error::Unsupported(err)
    }
}

impl From<AssociationError> for Error {
    fn from(err: AssociationError) -> Self {
        Error::Association(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Result type alias for fkarray operations.
pub type Result<T> = std::result::Result<T, Error>;
