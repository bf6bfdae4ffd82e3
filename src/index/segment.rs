use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, SegmentId};
use crate::index::dictionary::TermDictionary;
use crate::index::posting::PostingList;
use crate::storage::layout::StorageLayout;
use crate::storage::token_store::{TokenCursor, TokenStore};
use crate::token::record::TokenRecord;
use crate::token::term::prefix_key;

/// Per-document token table of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocTokens {
    pub doc_id: DocId,
    pub min_position: i32,
    pub max_position: i32,
    pub token_refs: Vec<u64>,      // Ordered by (min, max) position
    pub spans: Vec<(i32, i32)>,    // (min, max) of each entry in token_refs
    pub ids: Vec<(u32, u64)>,      // Token id -> ref, sorted by id
}

impl DocTokens {
    pub fn ref_for_id(&self, id: u32) -> Option<u64> {
        self.ids
            .binary_search_by_key(&id, |(token_id, _)| *token_id)
            .ok()
            .map(|i| self.ids[i].1)
    }
}

/// One field of a segment: term dictionary, postings, document table and
/// the token stores.
pub struct FieldIndex {
    name: String,
    dictionary: TermDictionary,
    postings: Vec<PostingList>,  // Indexed by dictionary ordinal
    docs: Vec<DocTokens>,        // Sorted by doc_id
    doc_set: RoaringBitmap,
    store: TokenStore,
}

impl FieldIndex {
    pub fn new(
        name: String,
        dictionary: TermDictionary,
        postings: Vec<PostingList>,
        docs: Vec<DocTokens>,
        store: TokenStore,
    ) -> Result<Self> {
        if dictionary.len() != postings.len() {
            return Err(Error::new(ErrorKind::Parse, format!(
                "Field {}: {} terms but {} posting lists", name, dictionary.len(), postings.len()
            )));
        }
        let doc_set = docs.iter().map(|d| d.doc_id.0).collect();
        Ok(FieldIndex { name, dictionary, postings, docs, doc_set, store })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc_count(&self) -> u64 {
        self.doc_set.len()
    }

    pub fn contains_doc(&self, doc_id: DocId) -> bool {
        self.doc_set.contains(doc_id.0)
    }

    pub fn docs(&self) -> &[DocTokens] {
        &self.docs
    }

    pub fn doc(&self, doc_id: DocId) -> Option<&DocTokens> {
        self.docs
            .binary_search_by_key(&doc_id, |d| d.doc_id)
            .ok()
            .map(|i| &self.docs[i])
    }

    /// Index of the first document table entry with id `>= target`.
    pub fn seek_doc(&self, target: DocId) -> usize {
        self.docs.partition_point(|d| d.doc_id < target)
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn dictionary(&self) -> &TermDictionary {
        &self.dictionary
    }

    pub fn posting_list(&self, ordinal: usize) -> Option<&PostingList> {
        self.postings.get(ordinal)
    }

    pub fn term_postings(&self, term: &str) -> Option<&PostingList> {
        self.dictionary.get(term).and_then(|ordinal| self.postings.get(ordinal))
    }

    pub fn expand_prefix(&self, prefix: &str) -> Vec<&PostingList> {
        self.resolve(self.dictionary.expand_prefix(prefix))
    }

    pub fn expand_wildcard(&self, pattern: &str) -> Result<Vec<&PostingList>> {
        Ok(self.resolve(self.dictionary.expand_wildcard(pattern)?))
    }

    pub fn expand_regex(&self, pattern: &str) -> Result<Vec<&PostingList>> {
        Ok(self.resolve(self.dictionary.expand_regex(pattern)?))
    }

    fn resolve(&self, ordinals: Vec<usize>) -> Vec<&PostingList> {
        ordinals.into_iter().filter_map(|o| self.postings.get(o)).collect()
    }

    /// Positional lookups sharing one cursor.
    pub fn lookup(&self) -> TokenLookup<'_> {
        TokenLookup { field: self, cursor: self.store.cursor() }
    }
}

/// Direct access to stored tokens by position or id, bypassing the match
/// iterators.
pub struct TokenLookup<'a> {
    field: &'a FieldIndex,
    cursor: TokenCursor,
}

impl<'a> TokenLookup<'a> {
    /// Tokens of `doc_id` overlapping `[lo, hi]` whose term lies in one of
    /// the given layers, in position order. An empty prefix list accepts
    /// every layer.
    pub fn tokens_in_range(&mut self, doc_id: DocId, prefixes: &[&str], lo: i32, hi: i32) -> Result<Vec<TokenRecord>> {
        let Some(doc) = self.field.doc(doc_id) else {
            return Ok(Vec::new());
        };
        let keys: Vec<String> = prefixes.iter().map(|p| prefix_key(p)).collect();

        let mut tokens = Vec::new();
        for (&object_ref, &(min, max)) in doc.token_refs.iter().zip(&doc.spans) {
            if min > hi {
                break;
            }
            if max < lo {
                continue;
            }
            let entry = self.cursor.read_entry(object_ref).map_err(|e| e.with_doc(doc_id))?;
            let term = self.cursor.read_term(entry.term_ref).map_err(|e| e.with_doc(doc_id))?;
            if keys.is_empty() || keys.iter().any(|k| term.starts_with(k.as_str())) {
                tokens.push(entry.into_record(term.to_string()));
            }
        }
        Ok(tokens)
    }

    pub fn token_by_id(&mut self, doc_id: DocId, id: u32) -> Result<Option<TokenRecord>> {
        let Some(object_ref) = self.field.doc(doc_id).and_then(|d| d.ref_for_id(id)) else {
            return Ok(None);
        };
        self.cursor.read_token(object_ref).map(Some).map_err(|e| e.with_doc(doc_id))
    }

    pub fn parent_of(&mut self, doc_id: DocId, token: &TokenRecord) -> Result<Option<TokenRecord>> {
        match token.parent_id {
            Some(parent_id) => self.token_by_id(doc_id, parent_id),
            None => Ok(None),
        }
    }
}

/// Checksummed field file header, followed by the bincode body.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FieldFileHeader {
    version: u32,
    body_checksum: u32,
    object_checksum: u32,
    term_checksum: u32,
}

impl FieldFileHeader {
    const VERSION: u32 = 1;
    const SIZE: usize = 16; // Four fixed-width u32s
}

#[derive(Serialize, Deserialize)]
struct FieldFileBody {
    dictionary: Vec<u8>,
    postings: Vec<PostingList>,
    docs: Vec<DocTokens>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SegmentMeta {
    version: u32,
    id: SegmentId,
    doc_count: u32,
    fields: Vec<String>,
}

/// Immutable set of documents, one [`FieldIndex`] per field.
pub struct Segment {
    pub id: SegmentId,
    pub doc_count: u32,
    fields: BTreeMap<String, FieldIndex>,
}

impl Segment {
    pub fn new(id: SegmentId, doc_count: u32, fields: BTreeMap<String, FieldIndex>) -> Self {
        Segment { id, doc_count, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldIndex> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    // segments/<id>/
    //   segment.meta         bincode SegmentMeta
    //   <field>.object       framed token records
    //   <field>.term         vbyte-length terms
    //   <field>.postings     [ HEADER ][ bincode body ]
    pub fn write(&self, layout: &StorageLayout) -> Result<()> {
        layout.create_segment_dir(self.id)?;

        for (name, field) in &self.fields {
            let objects = field.store.object_bytes();
            let terms = field.store.term_bytes();
            fs::write(layout.object_path(self.id, name), objects)?;
            fs::write(layout.term_path(self.id, name), terms)?;

            let body = bincode::serialize(&FieldFileBody {
                dictionary: field.dictionary.as_bytes().to_vec(),
                postings: field.postings.clone(),
                docs: field.docs.clone(),
            })?;
            let header = FieldFileHeader {
                version: FieldFileHeader::VERSION,
                body_checksum: crc32fast::hash(&body),
                object_checksum: crc32fast::hash(objects),
                term_checksum: crc32fast::hash(terms),
            };

            let mut data = bincode::serialize(&header)?;
            data.extend_from_slice(&body);
            fs::write(layout.postings_path(self.id, name), data)?;
        }

        let meta = SegmentMeta {
            version: FieldFileHeader::VERSION,
            id: self.id,
            doc_count: self.doc_count,
            fields: self.fields.keys().cloned().collect(),
        };
        fs::write(layout.meta_path(self.id), bincode::serialize(&meta)?)?;

        debug!(segment = self.id.0, fields = self.fields.len(), docs = self.doc_count, "segment written");
        Ok(())
    }

    pub fn open(layout: &StorageLayout, id: SegmentId, config: &Config) -> Result<Self> {
        let meta: SegmentMeta = bincode::deserialize(&fs::read(layout.meta_path(id))?)?;
        if meta.version != FieldFileHeader::VERSION || meta.id != id {
            return Err(Error::new(ErrorKind::Parse, format!("Incompatible segment {}", id.0)));
        }

        let mut fields = BTreeMap::new();
        for name in meta.fields {
            let field = Self::open_field(layout, id, &name, config)?;
            fields.insert(name, field);
        }

        debug!(segment = id.0, fields = fields.len(), docs = meta.doc_count, "segment opened");
        Ok(Segment { id, doc_count: meta.doc_count, fields })
    }

    fn open_field(layout: &StorageLayout, id: SegmentId, name: &str, config: &Config) -> Result<FieldIndex> {
        let data = fs::read(layout.postings_path(id, name))?;
        if data.len() < FieldFileHeader::SIZE {
            return Err(Error::new(ErrorKind::Parse, format!("Truncated postings file for {}", name)));
        }
        let header: FieldFileHeader = bincode::deserialize(&data[..FieldFileHeader::SIZE])?;
        if header.version != FieldFileHeader::VERSION {
            return Err(Error::new(ErrorKind::Parse, "Incompatible postings version".to_string()));
        }

        let body = &data[FieldFileHeader::SIZE..];
        verify_checksum(body, header.body_checksum, &layout.postings_path(id, name))?;
        let body: FieldFileBody = bincode::deserialize(body)?;

        let object_path = layout.object_path(id, name);
        let term_path = layout.term_path(id, name);
        let store = TokenStore::open(&object_path, &term_path, config.use_mmap, config.term_cache_size)?;
        verify_checksum(store.object_bytes(), header.object_checksum, &object_path)?;
        verify_checksum(store.term_bytes(), header.term_checksum, &term_path)?;

        let dictionary = TermDictionary::from_bytes(body.dictionary, config.max_expanded_terms)?;
        FieldIndex::new(name.to_string(), dictionary, body.postings, body.docs, store)
    }
}

fn verify_checksum(data: &[u8], expected: u32, path: &Path) -> Result<()> {
    let actual = crc32fast::hash(data);
    if actual != expected {
        return Err(Error::corrupt(format!(
            "Checksum mismatch in {}: expected {:08x}, got {:08x}", path.display(), expected, actual
        )));
    }
    Ok(())
}
