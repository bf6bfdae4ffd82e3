use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use regex::Regex;
use tracing::warn;
use crate::core::error::Result;

/// FST term dictionary: stored term text -> posting list ordinal.
pub struct TermDictionary {
    fst: Map<Vec<u8>>,

    /// Upper bound on terms returned by one expansion
    max_expanded_terms: usize,
}

impl TermDictionary {
    /// Build FST from terms; ordinals are the terms' sorted ranks.
    pub fn build<'a, I>(terms: I, max_expanded_terms: usize) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sorted_terms: Vec<&str> = terms.into_iter().collect();

        // FST requires sorted input
        sorted_terms.sort_unstable();
        sorted_terms.dedup();

        let mut builder = MapBuilder::memory();
        for (ordinal, term) in sorted_terms.iter().enumerate() {
            builder.insert(term.as_bytes(), ordinal as u64)?;
        }

        Ok(TermDictionary { fst: builder.into_map(), max_expanded_terms })
    }

    pub fn from_bytes(bytes: Vec<u8>, max_expanded_terms: usize) -> Result<Self> {
        Ok(TermDictionary { fst: Map::new(bytes)?, max_expanded_terms })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.fst.as_fst().as_bytes()
    }

    pub fn len(&self) -> usize {
        self.fst.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fst.is_empty()
    }

    pub fn get(&self, term: &str) -> Option<usize> {
        self.fst.get(term.as_bytes()).map(|ordinal| ordinal as usize)
    }

    /// Ordinals of all terms starting with `prefix`
    pub fn expand_prefix(&self, prefix: &str) -> Vec<usize> {
        let prefix_bytes = prefix.as_bytes();
        let mut results = Vec::new();

        // Use FST range query for efficient prefix search
        let mut stream = self.fst.range().ge(prefix_bytes).into_stream();
        while let Some((term_bytes, ordinal)) = stream.next() {
            if !term_bytes.starts_with(prefix_bytes) {
                break;
            }
            if !self.push_capped(&mut results, ordinal, prefix) {
                break;
            }
        }
        results
    }

    /// Wildcard patterns over the full term text: `*` any run, `?` one char.
    pub fn expand_wildcard(&self, pattern: &str) -> Result<Vec<usize>> {
        let literal_prefix: String = pattern.chars().take_while(|c| *c != '*' && *c != '?').collect();

        // Simple case: prefix wildcard "prog*"
        if literal_prefix.len() + 1 == pattern.len() && pattern.ends_with('*') {
            return Ok(self.expand_prefix(&literal_prefix));
        }

        let regex = Regex::new(&wildcard_to_regex(pattern))?;
        Ok(self.expand_matching(&regex, &literal_prefix, pattern))
    }

    /// Regular expression matched against the whole term text.
    pub fn expand_regex(&self, pattern: &str) -> Result<Vec<usize>> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(self.expand_matching(&regex, "", pattern))
    }

    fn expand_matching(&self, regex: &Regex, literal_prefix: &str, pattern: &str) -> Vec<usize> {
        let prefix_bytes = literal_prefix.as_bytes();
        let mut results = Vec::new();
        let mut stream = self.fst.range().ge(prefix_bytes).into_stream();

        while let Some((term_bytes, ordinal)) = stream.next() {
            if !term_bytes.starts_with(prefix_bytes) {
                break;
            }
            let Ok(term) = std::str::from_utf8(term_bytes) else {
                continue;
            };
            if regex.is_match(term) && !self.push_capped(&mut results, ordinal, pattern) {
                break;
            }
        }
        results
    }

    fn push_capped(&self, results: &mut Vec<usize>, ordinal: u64, pattern: &str) -> bool {
        if results.len() >= self.max_expanded_terms {
            warn!(pattern, limit = self.max_expanded_terms, "term expansion truncated");
            return false;
        }
        results.push(ordinal as usize);
        true
    }
}

/// `*` -> `.*`, `?` -> `.`, everything else literal; anchored on both ends.
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');
    let mut literal = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            _ => regex.push_str(&regex::escape(c.encode_utf8(&mut literal))),
        }
    }
    regex.push('$');
    regex
}
