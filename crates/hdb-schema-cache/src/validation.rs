//! Catalog name checks and SQL literal quoting for catalog queries

use crate::Error;

/// Longest catalog name HANA accepts
pub const MAX_NAME_LENGTH: usize = 127;

/// Whether `name` can name a catalog object.
///
/// Quoted identifiers may hold any printable character, so only empty,
/// over-long or control-character names are rejected. Names reach SQL through
/// [`quote_literal`], never spliced in raw.
#[must_use]
pub fn is_valid_catalog_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= MAX_NAME_LENGTH
        && !name.chars().any(char::is_control)
}

pub fn validate_catalog_name(name: &str, context: &str) -> Result<(), Error> {
    if is_valid_catalog_name(name) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid {context}: {name:?}. Must be 1-{MAX_NAME_LENGTH} characters \
             without control characters"
        )))
    }
}

/// Render `value` as a single-quoted SQL string literal.
///
/// Catalog names come back from the database itself and may hold any
/// character a quoted identifier allows, so they are escaped instead of
/// validated.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' {
            quoted.push('\'');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_quoted_names_are_valid() {
        for name in [
            "USERS", "my_table", "$system", "my-app", "Sales Data", "O'Brien", "ÜBER",
        ] {
            assert!(is_valid_catalog_name(name), "{name}");
        }
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid_catalog_name(""));
        assert!(!is_valid_catalog_name("tab\tle"));
        assert!(!is_valid_catalog_name("line\nbreak"));
        assert!(!is_valid_catalog_name(&"a".repeat(MAX_NAME_LENGTH + 1)));
        assert!(is_valid_catalog_name(&"a".repeat(MAX_NAME_LENGTH)));
    }

    #[test]
    fn test_validate_catalog_name_error_names_context() {
        let err = validate_catalog_name("", "caching schema").unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("caching schema"));
        assert!(validate_catalog_name("my-app", "caching schema").is_ok());
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("USERS"), "'USERS'");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal("'; DROP TABLE X; --"), "'''; DROP TABLE X; --'");
        assert_eq!(quote_literal(""), "''");
    }
}
