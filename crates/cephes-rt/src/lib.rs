//! Runtime side of the cephes bridge.
//!
//! Binds parsed prototypes to the exports of an instantiated native library,
//! converts host arguments to the native calling convention, and turns the
//! library's `mtherr` callback into typed errors.

pub mod adapter;
pub mod config;
pub mod error;
pub mod native;
pub mod runtime;
pub mod trap;

pub use adapter::{Binding, HostArg};
pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use native::{DeadHook, Env, ImportLayout, Instantiate, NativeLibrary, Value};
pub use runtime::Runtime;
