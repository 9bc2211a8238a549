//! Composite identifier parsing.
//!
//! Stories are identified as `"<pk>_<owner id>"`. Endpoints that act on a
//! single story want only the primary key.

use crate::error::{ApiError, Result};

/// Primary key of a composite id: everything before the first underscore.
///
/// Fails when there is no underscore or nothing precedes it.
pub fn primary_key(composite: &str) -> Result<&str> {
    match composite.split_once('_') {
        Some((pk, _)) if !pk.is_empty() => Ok(pk),
        _ => Err(ApiError::MalformedId(composite.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_text_before_first_underscore() {
        assert_eq!(primary_key("2581283651347470453_25025320").unwrap(), "2581283651347470453");
        assert_eq!(primary_key("1_2_3").unwrap(), "1");
        assert_eq!(primary_key("42_").unwrap(), "42");
    }

    #[test]
    fn no_underscore_is_malformed() {
        let err = primary_key("2581283651347470453").unwrap_err();
        assert!(matches!(err, ApiError::MalformedId(ref id) if id == "2581283651347470453"));
    }

    #[test]
    fn empty_primary_key_is_malformed() {
        assert!(matches!(primary_key("_25025320"), Err(ApiError::MalformedId(_))));
        assert!(matches!(primary_key(""), Err(ApiError::MalformedId(_))));
    }
}
