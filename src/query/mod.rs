pub mod ast;
pub mod width;
pub mod variables;
pub mod rewrite;
pub mod rewriter;
pub mod validator;

pub use ast::{SequenceItem, SpanQuery};
pub use rewriter::QueryRewriter;
pub use validator::{QueryValidator, ValidationConfig};
pub use variables::VariableScope;
pub use width::Width;
