use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    pub fn new(id: u32) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// The smallest id after this one, `None` at the end of the id space.
    pub fn next(&self) -> Option<DocId> {
        self.0.checked_add(1).map(DocId)
    }
}

impl From<u32> for DocId {
    fn from(id: u32) -> Self {
        DocId(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u32);

/// A realized hit `[start, end)` inside one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: i32,
    pub end: i32,
}

impl Span {
    pub fn new(start: i32, end: i32) -> Self {
        Span { start, end }
    }

    pub fn width(&self) -> i32 {
        self.end - self.start
    }

    /// End-exclusive overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}
