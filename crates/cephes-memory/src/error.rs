use thiserror::Error;
use miette::Diagnostic;

/// Errors raised by the linear memory and its stack.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("access of {width} byte(s) at address {address} is outside the {size}-byte region")]
    #[diagnostic(code(cephes_memory::out_of_bounds))]
    OutOfBounds { address: u32, width: u32, size: u32 },

    #[error("stack allocation of {requested} byte(s) at top {top} would exceed the stack limit {max}")]
    #[diagnostic(
        code(cephes_memory::stack_overflow),
        help("restore earlier watermarks or allocate smaller batches; the stack never grows")
    )]
    StackOverflow { requested: u32, top: u32, max: u32 },

    #[error("watermark {watermark} lies outside the stack segment [{base}, {max}]")]
    #[diagnostic(code(cephes_memory::invalid_watermark))]
    InvalidWatermark { watermark: u32, base: u32, max: u32 },

    #[error("invalid value type `{0}`")]
    #[diagnostic(
        code(cephes_memory::invalid_type),
        help("use one of i1, i8, i16, i32, i64, float, double, or a pointer type ending in `*`")
    )]
    InvalidType(String),

    #[error("invalid memory layout: {0}")]
    #[diagnostic(code(cephes_memory::invalid_layout))]
    InvalidLayout(String),

    #[error("`{0}` should never be called: the memory region has a fixed size")]
    #[diagnostic(code(cephes_memory::fatal_misuse))]
    FatalMisuse(&'static str),
}

impl MemoryError {
    /// Misuse of a permanently disabled operation, as opposed to a runtime condition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MemoryError::FatalMisuse(_))
    }
}
