use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, SegmentId};
use crate::index::dictionary::TermDictionary;
use crate::index::posting::{Posting, PostingList};
use crate::index::segment::{DocTokens, FieldIndex, Segment};
use crate::storage::token_store::TokenStoreWriter;
use crate::token::record::TokenRecord;

#[derive(Default)]
struct FieldBuilder {
    writer: TokenStoreWriter,
    terms: BTreeMap<String, PostingList>,
    docs: Vec<DocTokens>,
}

/// Collects closed token lists per document and field into a [`Segment`].
/// Documents must arrive in increasing id order per field.
pub struct SegmentBuilder {
    id: SegmentId,
    config: Config,
    fields: BTreeMap<String, FieldBuilder>,
    doc_count: u32,
}

impl SegmentBuilder {
    pub fn new(id: SegmentId, config: Config) -> Self {
        SegmentBuilder {
            id,
            config,
            fields: BTreeMap::new(),
            doc_count: 0,
        }
    }

    pub fn add_document(&mut self, doc_id: DocId, field: &str, tokens: &[TokenRecord]) -> Result<()> {
        validate_tokens(tokens).map_err(|e| e.with_doc(doc_id))?;

        let builder = self.fields.entry(field.to_string()).or_default();
        if let Some(last) = builder.docs.last() {
            if last.doc_id >= doc_id {
                return Err(Error::invalid_argument(format!(
                    "Document {} added to field {} after document {}", doc_id.0, field, last.doc_id.0
                )));
            }
        }
        self.doc_count = self.doc_count.max(doc_id.0.saturating_add(1));
        if tokens.is_empty() {
            return Ok(());
        }

        let mut order: Vec<&TokenRecord> = tokens.iter().collect();
        order.sort_by_key(|t| (t.min_position(), t.max_position(), t.id));

        let mut doc = DocTokens {
            doc_id,
            min_position: i32::MAX,
            max_position: i32::MIN,
            token_refs: Vec::with_capacity(order.len()),
            spans: Vec::with_capacity(order.len()),
            ids: Vec::with_capacity(order.len()),
        };

        for token in order {
            let object_ref = builder.writer.append(token).map_err(|e| e.with_doc(doc_id))?;
            let (min, max) = (token.min_position(), token.max_position());

            doc.min_position = doc.min_position.min(min);
            doc.max_position = doc.max_position.max(max);
            doc.token_refs.push(object_ref);
            doc.spans.push((min, max));
            doc.ids.push((token.id, object_ref));

            let list = builder.terms.entry(token.value.clone()).or_default();
            list.multi_position |= min != max;
            let postings = &mut list.postings;
            match postings.last_mut() {
                Some(posting) if posting.doc_id == doc_id => posting.token_refs.push(object_ref),
                _ => postings.push(Posting { doc_id, token_refs: vec![object_ref] }),
            }
        }
        doc.ids.sort_unstable();
        builder.docs.push(doc);
        Ok(())
    }

    pub fn build(self) -> Result<Segment> {
        let mut fields = BTreeMap::new();
        for (name, builder) in self.fields {
            // BTreeMap order is byte order, the same order the fst assigns ordinals in
            let dictionary = TermDictionary::build(
                builder.terms.keys().map(String::as_str),
                self.config.max_expanded_terms,
            )?;
            let postings: Vec<PostingList> = builder.terms.into_values().collect();
            let store = builder.writer.finish(self.config.term_cache_size);

            debug!(segment = self.id.0, field = %name, terms = postings.len(), docs = builder.docs.len(), "field built");
            let field = FieldIndex::new(name.clone(), dictionary, postings, builder.docs, store)?;
            fields.insert(name, field);
        }
        Ok(Segment::new(self.id, self.doc_count, fields))
    }
}

/// Ids are unique and every parent is a token of the same document whose
/// interval encloses the child's.
fn validate_tokens(tokens: &[TokenRecord]) -> Result<()> {
    let mut by_id: HashMap<u32, &TokenRecord> = HashMap::with_capacity(tokens.len());
    for token in tokens {
        token.position.validate()?;
        if by_id.insert(token.id, token).is_some() {
            return Err(Error::invalid_argument(format!("Duplicate token id {}", token.id)));
        }
    }

    for token in tokens {
        let Some(parent_id) = token.parent_id else {
            continue;
        };
        let parent = by_id.get(&parent_id).ok_or_else(|| {
            Error::invalid_argument(format!("Token {} references missing parent {}", token.id, parent_id))
        })?;
        if parent_id == token.id
            || parent.min_position() > token.min_position()
            || parent.max_position() < token.max_position()
        {
            return Err(Error::invalid_argument(format!(
                "Parent {} does not enclose token {}", parent_id, token.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::storage::layout::StorageLayout;
    use crate::token::position::PositionSpec;
    use crate::token::term::term_text;

    fn sentence() -> Vec<TokenRecord> {
        vec![
            TokenRecord::new(0, term_text("s", ""), PositionSpec::Range { start: 0, end: 3 }),
            TokenRecord::new(1, term_text("t", "the"), PositionSpec::Single(0)).with_parent(0),
            TokenRecord::new(2, term_text("pos", "DET"), PositionSpec::Single(0)).with_parent(0),
            TokenRecord::new(3, term_text("t", "cat"), PositionSpec::Single(1)).with_parent(0),
            TokenRecord::new(4, term_text("t", "sat"), PositionSpec::Single(2)).with_parent(0),
            TokenRecord::new(5, term_text("t", "down"), PositionSpec::Single(3)).with_parent(0),
            TokenRecord::new(6, term_text("mwe", "sat down"), PositionSpec::Set(vec![2, 3])).with_parent(0),
        ]
    }

    fn segment() -> Segment {
        let mut builder = SegmentBuilder::new(SegmentId(1), Config::default());
        builder.add_document(DocId(0), "text", &sentence()).unwrap();
        builder.add_document(DocId(4), "text", &sentence()[..4]).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn postings_group_refs_per_document() {
        let segment = segment();
        let field = segment.field("text").unwrap();
        assert_eq!(segment.doc_count, 5);
        assert_eq!(field.doc_count(), 2);

        let cat = field.term_postings(&term_text("t", "cat")).unwrap();
        assert_eq!(cat.doc_freq(), 2);
        assert!(field.term_postings(&term_text("t", "dog")).is_none());
        assert_eq!(field.expand_prefix("t\u{1}").len(), 4);

        assert!(!cat.multi_position);
        assert!(field.term_postings(&term_text("s", "")).unwrap().multi_position);
        assert!(field.term_postings(&term_text("mwe", "sat down")).unwrap().multi_position);

        let doc = field.doc(DocId(0)).unwrap();
        assert_eq!((doc.min_position, doc.max_position), (0, 3));
        assert!(doc.spans.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn positional_lookup_filters_by_layer_and_range() {
        let segment = segment();
        let field = segment.field("text").unwrap();
        let mut lookup = field.lookup();

        let words = lookup.tokens_in_range(DocId(0), &["t"], 1, 2).unwrap();
        let values: Vec<&str> = words.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["t\u{1}cat", "t\u{1}sat"]);

        let all = lookup.tokens_in_range(DocId(0), &[], 3, 3).unwrap();
        assert_eq!(all.len(), 3); // sentence, "down", the multi-word unit

        assert!(lookup.tokens_in_range(DocId(2), &["t"], 0, 9).unwrap().is_empty());
    }

    #[test]
    fn parent_edge_resolves_through_id_table() {
        let segment = segment();
        let mut lookup = segment.field("text").unwrap().lookup();
        let cat = lookup.token_by_id(DocId(0), 3).unwrap().unwrap();
        let parent = lookup.parent_of(DocId(0), &cat).unwrap().unwrap();
        assert_eq!(parent.id, 0);
        assert!(lookup.parent_of(DocId(0), &parent).unwrap().is_none());
        assert!(lookup.token_by_id(DocId(0), 99).unwrap().is_none());
    }

    #[test]
    fn invalid_token_lists_are_rejected() {
        let mut builder = SegmentBuilder::new(SegmentId(0), Config::default());

        let mut duplicate = sentence();
        duplicate[2].id = 1;
        let err = builder.add_document(DocId(0), "text", &duplicate).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(err.doc_id, Some(DocId(0)));

        let outside = vec![
            TokenRecord::new(0, "s\u{1}", PositionSpec::Range { start: 0, end: 1 }),
            TokenRecord::new(1, "t\u{1}x", PositionSpec::Single(2)).with_parent(0),
        ];
        assert!(builder.add_document(DocId(0), "text", &outside).is_err());

        let orphan = vec![TokenRecord::new(1, "t\u{1}x", PositionSpec::Single(2)).with_parent(7)];
        assert!(builder.add_document(DocId(0), "text", &orphan).is_err());
    }

    #[test]
    fn documents_must_arrive_in_order() {
        let mut builder = SegmentBuilder::new(SegmentId(0), Config::default());
        builder.add_document(DocId(3), "text", &sentence()).unwrap();
        assert!(builder.add_document(DocId(3), "text", &sentence()).is_err());
        builder.add_document(DocId(1), "other", &sentence()).unwrap();
    }

    #[test]
    fn segment_survives_write_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().to_path_buf()).unwrap();
        segment().write(&layout).unwrap();

        for use_mmap in [true, false] {
            let config = Config { use_mmap, ..Config::default() };
            let reopened = Segment::open(&layout, SegmentId(1), &config).unwrap();
            assert_eq!(reopened.doc_count, 5);
            let field = reopened.field("text").unwrap();
            assert_eq!(field.term_postings(&term_text("t", "cat")).unwrap().doc_freq(), 2);
            let sat = field.lookup().token_by_id(DocId(0), 4).unwrap().unwrap();
            assert_eq!(sat, sentence()[4]);
        }
    }

    #[test]
    fn damaged_store_fails_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().to_path_buf()).unwrap();
        segment().write(&layout).unwrap();

        let path = layout.object_path(SegmentId(1), "text");
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let err = Segment::open(&layout, SegmentId(1), &Config::default()).err().unwrap();
        assert!(err.is_corrupt());
    }
}
