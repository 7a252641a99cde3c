//! Parser for the cephes prototype listing.
//!
//! The listing is produced from the library headers at build time and
//! consumed by the binding generator: each prototype becomes a
//! [`PrototypeRecord`] describing return type, unprefixed name, and the
//! ordered argument list with pointer/array flags.

pub mod error;
pub mod parser;
pub mod record;

pub use error::ParseError;
pub use parser::{parse_str, ProtoParser};
pub use record::{ArgSpec, CType, PrototypeRecord};
