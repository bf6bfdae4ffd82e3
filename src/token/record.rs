use bytes::Bytes;
use serde::{Deserialize, Serialize};
use crate::token::position::PositionSpec;

/// One annotated unit of a document, as handed over by the ingestion side.
/// Records are closed before they reach the index and never change after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: u32,
    pub parent_id: Option<u32>,          // Lookup key into the same document, not an owner
    pub position: PositionSpec,
    pub offset: Option<(u32, u32)>,      // Normalized input, [start, end)
    pub real_offset: Option<(u32, u32)>, // Raw input, [start, end)
    pub payload: Option<Bytes>,
    pub value: String,                   // prefix + DELIMITER + value
}

impl TokenRecord {
    pub fn new(id: u32, value: impl Into<String>, position: PositionSpec) -> Self {
        TokenRecord {
            id,
            parent_id: None,
            position,
            offset: None,
            real_offset: None,
            payload: None,
            value: value.into(),
        }
    }

    pub fn with_parent(mut self, parent_id: u32) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_offset(mut self, start: u32, end: u32) -> Self {
        self.offset = Some((start, end));
        self
    }

    pub fn with_real_offset(mut self, start: u32, end: u32) -> Self {
        self.real_offset = Some((start, end));
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn min_position(&self) -> i32 {
        self.position.min_position()
    }

    pub fn max_position(&self) -> i32 {
        self.position.max_position()
    }
}
