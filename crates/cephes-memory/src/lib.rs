//! Linear memory for the cephes bridge.
//!
//! A [`MemoryRegion`] is the only sanctioned way to read or write the memory
//! the native library works on: typed accessors, bulk byte copies, and the
//! bump-allocated C stack used to pass pointer and array arguments.

pub mod error;
pub mod layout;
pub mod region;
mod stack;
pub mod value;

pub use error::MemoryError;
pub use layout::{MemoryLayout, PAGE_SIZE};
pub use region::MemoryRegion;
pub use value::{to_int32, Scalar, ValueType};
