pub mod layout;
pub mod store;
pub mod token_store;

pub use layout::StorageLayout;
pub use store::{StoreBytes, StoreCursor};
pub use token_store::{TokenCursor, TokenStore, TokenStoreWriter};
