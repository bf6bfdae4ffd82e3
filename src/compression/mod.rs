pub mod vbyte;
pub mod delta;

pub use delta::DeltaEncoder;
pub use vbyte::VByteEncoder;
