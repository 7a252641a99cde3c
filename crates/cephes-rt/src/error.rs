use std::path::PathBuf;

use cephes_memory::MemoryError;
use miette::Diagnostic;
use thiserror::Error;

/// Errors surfaced by the cephes runtime.
#[derive(Error, Diagnostic, Debug)]
pub enum RuntimeError {
    /// The native routine was called outside its mathematical domain.
    #[error("{message}")]
    #[diagnostic(
        code(cephes_rt::domain),
        help("the input lies outside the domain of `{function}`")
    )]
    Domain { function: String, message: String },

    /// Any other error the native library reported (singularity, overflow,
    /// underflow, loss of precision, ...).
    #[error("{message}")]
    #[diagnostic(code(cephes_rt::computation))]
    Computation { function: String, code: i32, message: String },

    /// A permanently disabled import was invoked.
    #[error("`{hook}` should never be called")]
    #[diagnostic(code(cephes_rt::fatal_misuse))]
    FatalMisuse { hook: &'static str },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Memory(#[from] MemoryError),

    #[error("entry point `{0}` not found in the native library")]
    #[diagnostic(code(cephes_rt::entry_point_not_found))]
    EntryPointNotFound(String),

    #[error("no binding registered for `{0}`")]
    #[diagnostic(code(cephes_rt::unknown_function))]
    UnknownFunction(String),

    #[error("`{function}` takes {expected} argument(s) but {found} were supplied")]
    #[diagnostic(code(cephes_rt::arity_mismatch))]
    ArityMismatch { function: String, expected: usize, found: usize },

    #[error("`{function}` is declared to return {expected} but the native call returned {found}")]
    #[diagnostic(code(cephes_rt::return_type_mismatch))]
    ReturnTypeMismatch { function: String, expected: &'static str, found: &'static str },

    #[error("failed to read native artifact {path}")]
    #[diagnostic(
        code(cephes_rt::artifact_read),
        help("the compiled library is read from a fixed local path at startup")
    )]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to instantiate native artifact: {0}")]
    #[diagnostic(code(cephes_rt::instantiation))]
    Instantiation(String),

    #[error("invalid runtime configuration: {0}")]
    #[diagnostic(code(cephes_rt::config))]
    Config(String),
}

impl RuntimeError {
    /// Domain errors are expected for bad inputs; callers may retry with
    /// different arguments or substitute a NaN.
    pub fn is_domain(&self) -> bool {
        matches!(self, RuntimeError::Domain { .. })
    }

    /// Programming errors that must not be handled as runtime conditions.
    pub fn is_fatal(&self) -> bool {
        match self {
            RuntimeError::FatalMisuse { .. } => true,
            RuntimeError::Memory(err) => err.is_fatal(),
            _ => false,
        }
    }
}

impl From<toml::de::Error> for RuntimeError {
    fn from(err: toml::de::Error) -> Self {
        RuntimeError::Config(err.to_string())
    }
}
