//! SQL identifier quoting and validation.

use crate::Result;
use crate::error::Error;
use regex::Regex;
use std::sync::OnceLock;

/// Quote a SQL identifier using ANSI double-quoting.
///
/// Embedded double-quotes are escaped by doubling them.
///
/// ```
/// use fkarray_core::quote_ident;
///
/// assert_eq!(quote_ident("video_ids"), "\"video_ids\"");
/// assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn identifier_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| match Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$") {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(error = %e, "identifier pattern failed to compile");
                None
            }
        })
        .as_ref()
}

/// Is `name` a plain identifier (letters, digits, underscores, not
/// starting with a digit)?
pub fn is_plain_identifier(name: &str) -> bool {
    match identifier_pattern() {
        Some(re) => re.is_match(name),
        None => {
            let mut chars = name.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
    }
}

/// Reject anything that is not a plain identifier.
///
/// `what` names the rejected input in the error, e.g. `"array attribute"`.
pub fn validate_identifier(what: &str, name: &str) -> Result<()> {
    if is_plain_identifier(name) {
        Ok(())
    } else {
        Err(Error::invalid_argument(
            what,
            format!("'{}' is not a valid identifier", name),
        ))
    }
}
