pub mod position;
pub mod record;
pub mod term;
pub mod codec;

pub use position::{PositionSpec, Tolerance};
pub use record::TokenRecord;
pub use codec::{TokenCodec, TokenEntry};
