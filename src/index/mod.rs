pub mod posting;
pub mod dictionary;
pub mod segment;
pub mod builder;

pub use builder::SegmentBuilder;
pub use posting::{Posting, PostingList};
pub use segment::{DocTokens, FieldIndex, Segment, TokenLookup};
