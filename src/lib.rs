//! Positional index over annotated text.
//!
//! Documents are indexed as lists of tokens: annotations such as words,
//! lemmas, part-of-speech tags or sentence markers, each covering one or more
//! positions. Tokens are stored in a compact per-record binary form and found
//! again through span queries that combine annotations by position.
//!
//! ```text
//! SpanQuery ──validate──▶ rewrite ──▶ SpanFactory ──▶ Box<dyn Spans> ──▶ DocMatches
//!                                          │
//!                      Segment ── FieldIndex (fst terms, postings, token store)
//! ```

pub mod core;
pub mod compression;
pub mod token;
pub mod mmap;
pub mod storage;
pub mod index;
pub mod query;
pub mod search;

pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{DocId, SegmentId, Span};
pub use crate::index::{Segment, SegmentBuilder};
pub use crate::query::{SequenceItem, SpanQuery};
pub use crate::search::{DocMatches, SegmentMatches, SpanSearcher};
pub use crate::token::{PositionSpec, Tolerance, TokenRecord};
