use std::collections::{HashMap, HashSet};
use crate::core::error::{Error, ErrorKind, Result};
use crate::query::ast::{OrQuery, SpanQuery};
use crate::token::term::term_text;

/// Named value lists supplied with a query. Each name may be used once per
/// scope; a scope lives as long as one query is being built.
#[derive(Debug, Default, Clone)]
pub struct VariableScope {
    values: HashMap<String, Vec<String>>,
    used: HashSet<String>,
}

impl VariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.define(name, values);
        self
    }

    pub fn define(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.values.insert(name.into(), values);
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// Expands `$name` on layer `prefix` into term leaves: no values gives
    /// `MatchNone`, one value its `Term`, several an `Or` of terms.
    pub fn resolve(&mut self, field: &str, prefix: &str, name: &str) -> Result<SpanQuery> {
        let values = self.values.get(name).ok_or_else(|| {
            Error::new(ErrorKind::UndefinedVariable, format!("Variable ${} is not defined", name))
        })?;
        if !self.used.insert(name.to_string()) {
            return Err(Error::new(ErrorKind::VariableReused, format!("Variable ${} used twice", name)));
        }

        let mut clauses: Vec<SpanQuery> = values
            .iter()
            .map(|value| SpanQuery::term(field, term_text(prefix, value)))
            .collect();

        Ok(match clauses.len() {
            0 => SpanQuery::match_none(field),
            1 => clauses.remove(0),
            _ => SpanQuery::Or(OrQuery { field: field.to_string(), clauses }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> VariableScope {
        VariableScope::new()
            .with_variable("nouns", vec!["cat".into(), "dog".into()])
            .with_variable("one", vec!["sat".into()])
            .with_variable("none", vec![])
    }

    #[test]
    fn expands_to_term_leaves() {
        let mut scope = scope();
        let nouns = scope.resolve("text", "lemma", "nouns").unwrap();
        let SpanQuery::Or(or) = nouns else { panic!("expected Or") };
        assert_eq!(or.clauses[1], SpanQuery::word("text", "lemma", "dog"));

        assert_eq!(scope.resolve("text", "t", "one").unwrap(), SpanQuery::word("text", "t", "sat"));
        assert!(scope.resolve("text", "t", "none").unwrap().is_match_none());
    }

    #[test]
    fn undefined_and_reused_names_fail() {
        let mut scope = scope();
        assert_eq!(scope.resolve("text", "t", "verbs").unwrap_err().kind, ErrorKind::UndefinedVariable);
        scope.resolve("text", "t", "one").unwrap();
        assert!(scope.is_used("one"));
        assert_eq!(scope.resolve("text", "lemma", "one").unwrap_err().kind, ErrorKind::VariableReused);
    }
}
