use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::query::ast::SpanQuery;

/// Query validation configuration
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub max_clauses: usize,
    pub max_query_depth: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ValidationConfig {
    fn from(config: &Config) -> Self {
        ValidationConfig {
            max_clauses: config.max_clauses,
            max_query_depth: config.max_query_depth,
        }
    }
}

/// Structural checks run before a query is rewritten.
pub struct QueryValidator {
    config: ValidationConfig,
}

impl QueryValidator {
    pub fn new(config: ValidationConfig) -> Self {
        QueryValidator { config }
    }

    /// Validate query structure and constraints
    pub fn validate(&self, query: &SpanQuery) -> Result<()> {
        self.validate_node(query, 0)
    }

    fn validate_node(&self, query: &SpanQuery, depth: usize) -> Result<()> {
        if depth > self.config.max_query_depth {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("Query depth {} exceeds maximum {}", depth, self.config.max_query_depth),
            ));
        }

        let children = query.children();
        if children.len() > self.config.max_clauses {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("Query node has {} clauses, max is {}", children.len(), self.config.max_clauses),
            ));
        }

        match query {
            SpanQuery::Recurrence(rec) if rec.minimum == 0 || rec.minimum > rec.maximum => {
                return Err(Error::invalid_argument(format!(
                    "Recurrence bounds [{}, {}] need 1 <= minimum <= maximum", rec.minimum, rec.maximum
                )));
            }
            SpanQuery::Within(within) if within.left.minimum > within.left.maximum
                || within.right.minimum > within.right.maximum =>
            {
                return Err(Error::invalid_argument("Within tolerance minimum exceeds maximum"));
            }
            _ => {}
        }

        for child in children {
            if child.field() != query.field() {
                return Err(Error::invalid_argument(format!(
                    "Mixed fields {:?} and {:?} in one query", query.field(), child.field()
                )));
            }
            self.validate_node(child, depth + 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::{OrQuery, RecurrenceQuery};

    fn t(value: &str) -> SpanQuery {
        SpanQuery::word("text", "t", value)
    }

    #[test]
    fn depth_limit() {
        let mut query = t("a");
        for _ in 0..4 {
            query = SpanQuery::recurrence(query, 1, 2).unwrap();
        }
        let strict = QueryValidator::new(ValidationConfig { max_clauses: 10, max_query_depth: 3 });
        assert_eq!(strict.validate(&query).unwrap_err().kind, ErrorKind::InvalidInput);
        assert!(QueryValidator::new(ValidationConfig::default()).validate(&query).is_ok());
    }

    #[test]
    fn clause_limit() {
        let clauses = (0..5).map(|i| t(&i.to_string())).collect();
        let query = SpanQuery::or(clauses).unwrap();
        let strict = QueryValidator::new(ValidationConfig { max_clauses: 4, max_query_depth: 10 });
        assert_eq!(strict.validate(&query).unwrap_err().kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn hand_built_nodes_are_checked() {
        let validator = QueryValidator::new(ValidationConfig::default());
        let bad_bounds = SpanQuery::Recurrence(RecurrenceQuery {
            field: "text".into(),
            query: Box::new(t("a")),
            minimum: 0,
            maximum: 2,
            ignore: None,
            max_ignore_length: 0,
        });
        assert_eq!(validator.validate(&bad_bounds).unwrap_err().kind, ErrorKind::InvalidArgument);

        let mixed = SpanQuery::Or(OrQuery {
            field: "text".into(),
            clauses: vec![t("a"), SpanQuery::word("lemma", "t", "a")],
        });
        assert_eq!(validator.validate(&mixed).unwrap_err().kind, ErrorKind::InvalidArgument);
    }
}
