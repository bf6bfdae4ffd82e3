use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use lru::LruCache;
use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, Result};
use crate::storage::store::{StoreBytes, StoreCursor};
use crate::token::codec::{TokenCodec, TokenEntry};
use crate::token::record::TokenRecord;

/// Append-only writer for the object and term stores of one field.
///
/// Terms are written once (`vbyte len + utf8`) and shared by every record
/// that carries them; records are length-framed and addressed by the byte
/// offset of their frame.
#[derive(Default)]
pub struct TokenStoreWriter {
    objects: Vec<u8>,
    terms: Vec<u8>,
    term_refs: HashMap<String, u64>,
}

impl TokenStoreWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns its object reference.
    pub fn append(&mut self, record: &TokenRecord) -> Result<u64> {
        let term_ref = self.intern_term(&record.value);
        let object_ref = self.objects.len() as u64;
        TokenCodec::encode_framed(&mut self.objects, record, term_ref)?;
        Ok(object_ref)
    }

    fn intern_term(&mut self, term: &str) -> u64 {
        if let Some(&term_ref) = self.term_refs.get(term) {
            return term_ref;
        }
        let term_ref = self.terms.len() as u64;
        VByteEncoder::encode_u32(&mut self.terms, term.len() as u32);
        self.terms.extend_from_slice(term.as_bytes());
        self.term_refs.insert(term.to_string(), term_ref);
        term_ref
    }

    pub fn term_count(&self) -> usize {
        self.term_refs.len()
    }

    /// Raw (object store, term store) bytes.
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.objects, self.terms)
    }

    pub fn finish(self, term_cache_size: usize) -> TokenStore {
        let (objects, terms) = self.into_parts();
        TokenStore::from_parts(StoreBytes::from(objects), StoreBytes::from(terms), term_cache_size)
    }
}

/// Read side of a field's two stores. Cheap to clone; every traversal takes
/// its own [`TokenCursor`].
#[derive(Clone)]
pub struct TokenStore {
    objects: Arc<StoreBytes>,
    terms: Arc<StoreBytes>,
    term_cache_size: usize,
}

impl TokenStore {
    pub fn from_parts(objects: StoreBytes, terms: StoreBytes, term_cache_size: usize) -> Self {
        TokenStore {
            objects: Arc::new(objects),
            terms: Arc::new(terms),
            term_cache_size,
        }
    }

    pub fn open<P: AsRef<Path>>(object_path: P, term_path: P, use_mmap: bool, term_cache_size: usize) -> Result<Self> {
        Ok(Self::from_parts(
            StoreBytes::open(object_path, use_mmap)?,
            StoreBytes::open(term_path, use_mmap)?,
            term_cache_size,
        ))
    }

    pub fn object_bytes(&self) -> &[u8] {
        self.objects.as_slice()
    }

    pub fn term_bytes(&self) -> &[u8] {
        self.terms.as_slice()
    }

    pub fn cursor(&self) -> TokenCursor {
        let capacity = NonZeroUsize::new(self.term_cache_size).unwrap_or(NonZeroUsize::MIN);
        TokenCursor {
            objects: StoreCursor::new(self.objects.clone()),
            terms: StoreCursor::new(self.terms.clone()),
            term_cache: LruCache::new(capacity),
        }
    }
}

/// Seek cursor pair plus a private term cache. Not shared across threads.
pub struct TokenCursor {
    objects: StoreCursor,
    terms: StoreCursor,
    term_cache: LruCache<u64, Arc<str>>,
}

impl TokenCursor {
    /// Decodes the record at `object_ref` without resolving its term.
    pub fn read_entry(&mut self, object_ref: u64) -> Result<TokenEntry> {
        self.objects.seek(object_ref)?;
        let (entry, consumed) = TokenCodec::decode_framed(self.objects.remaining())?;
        self.objects.advance(consumed)?;
        Ok(entry)
    }

    pub fn read_token(&mut self, object_ref: u64) -> Result<TokenRecord> {
        let entry = self.read_entry(object_ref)?;
        let value = self.read_term(entry.term_ref)?;
        Ok(entry.into_record(value.to_string()))
    }

    pub fn read_term(&mut self, term_ref: u64) -> Result<Arc<str>> {
        if let Some(term) = self.term_cache.get(&term_ref) {
            return Ok(term.clone());
        }

        self.terms.seek(term_ref)?;
        let len = self.terms.read_vu32()? as usize;
        let bytes = self.terms.read_bytes(len)?;
        let term: Arc<str> = std::str::from_utf8(bytes)
            .map_err(|e| Error::corrupt(format!("Term at {} is not UTF-8: {}", term_ref, e)))?
            .into();

        self.term_cache.put(term_ref, term.clone());
        Ok(term)
    }
}
