use tracing::{debug, trace, warn};
use crate::core::config::Config;
use crate::query::ast::SpanQuery;
use crate::query::rewrite::{default_rules, RewriteRule};

/// Query rewriter: applies node-local rules bottom-up and repeats full
/// passes until one pass leaves the tree unchanged.
pub struct QueryRewriter {
    pub rules: Vec<Box<dyn RewriteRule>>,
    pub max_passes: usize,
}

impl QueryRewriter {
    pub fn new(config: &Config) -> Self {
        QueryRewriter {
            rules: default_rules(),
            max_passes: config.max_rewrite_passes.max(1),
        }
    }

    pub fn rewrite(&self, query: SpanQuery) -> SpanQuery {
        let mut current = query;
        for pass in 1..=self.max_passes {
            let next = self.rewrite_tree(&current);
            if next == current {
                debug!(passes = pass, nodes = current.node_count(), "rewrite reached fixed point");
                return current;
            }
            current = next;
        }
        warn!(max_passes = self.max_passes, "rewrite stopped before reaching a fixed point");
        current
    }

    fn rewrite_tree(&self, query: &SpanQuery) -> SpanQuery {
        let rebuilt = query.map_children(|child| self.rewrite_tree(child));
        self.rewrite_node(rebuilt)
    }

    /// Applies rules at one node until none fires.
    fn rewrite_node(&self, query: SpanQuery) -> SpanQuery {
        let mut current = query;
        for _ in 0..self.max_passes {
            let fired = self.rules.iter().find_map(|rule| {
                rule.rewrite(&current).map(|rewritten| (rule.name(), rewritten))
            });
            match fired {
                Some((name, rewritten)) => {
                    trace!(rule = name, "rewrite rule applied");
                    current = rewritten;
                }
                None => break,
            }
        }
        current
    }
}
