pub mod spans;
pub mod factory;
pub mod results;
pub mod executor;

pub use executor::SpanSearcher;
pub use factory::SpanFactory;
pub use results::{DocMatches, MatchCollector, SegmentMatches};
pub use spans::{DocCursor, Spans};
