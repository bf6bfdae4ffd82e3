//! Stored term text is `prefix + DELIMITER + value`, so one dictionary key
//! addresses both the annotation layer and its value. The layout is shared
//! with other consumers of the term store and must not change.

use crate::core::error::{Error, Result};

pub const DELIMITER: char = '\u{1}';

pub fn term_text(prefix: &str, value: &str) -> String {
    let mut text = String::with_capacity(prefix.len() + 1 + value.len());
    text.push_str(prefix);
    text.push(DELIMITER);
    text.push_str(value);
    text
}

/// Dictionary key prefix matching every value of a layer.
pub fn prefix_key(prefix: &str) -> String {
    let mut key = String::with_capacity(prefix.len() + 1);
    key.push_str(prefix);
    key.push(DELIMITER);
    key
}

/// Splits at the first delimiter. Terms without one belong to no layer.
pub fn split_term(term: &str) -> Option<(&str, &str)> {
    term.split_once(DELIMITER)
}

pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.contains(DELIMITER) {
        return Err(Error::invalid_argument(format!(
            "Layer prefix {:?} contains the term delimiter", prefix
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_and_value_round_trip() {
        let term = term_text("pos", "NOUN");
        assert_eq!(term.as_bytes()[3], 0x01);
        assert_eq!(split_term(&term), Some(("pos", "NOUN")));
        assert!(term.starts_with(&prefix_key("pos")));
        assert!(!term.starts_with(&prefix_key("po")));
    }

    #[test]
    fn values_may_contain_the_delimiter() {
        let term = term_text("t", "a\u{1}b");
        assert_eq!(split_term(&term), Some(("t", "a\u{1}b")));
    }

    #[test]
    fn delimiter_in_prefix_is_rejected() {
        assert!(validate_prefix("p\u{1}os").is_err());
        assert!(validate_prefix("lemma").is_ok());
    }
}
