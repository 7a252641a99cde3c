use thiserror::Error;
use miette::{Diagnostic, SourceSpan};

/// Errors raised while reading a prototype listing.
///
/// Every variant is fatal to the parse: the parser stops at the first
/// malformed line instead of skipping it.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("line {line}: malformed source comment `{text}`")]
    #[diagnostic(
        code(cephes_protos::malformed_comment),
        help("source comments look like `/* cephes/<name>.c */`")
    )]
    MalformedComment {
        line: usize,
        #[source_code]
        text: String,
        #[label("not a cephes source file comment")]
        span: SourceSpan,
    },

    #[error("line {line}: malformed prototype `{text}`")]
    #[diagnostic(
        code(cephes_protos::malformed_prototype),
        help("prototypes look like `double cephes_<name>(<args>);`")
    )]
    MalformedPrototype {
        line: usize,
        #[source_code]
        text: String,
        #[label("expected a cephes prototype")]
        span: SourceSpan,
    },

    #[error("line {line}: malformed argument `{argument}` in `{text}`")]
    #[diagnostic(
        code(cephes_protos::malformed_argument),
        help("arguments look like `double x`, `int *n` or `double coef[]`")
    )]
    MalformedArgument {
        line: usize,
        argument: String,
        #[source_code]
        text: String,
        #[label("this argument")]
        span: SourceSpan,
    },

    #[error("failed to read prototype listing: {0}")]
    #[diagnostic(code(cephes_protos::io))]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// The 1-based line the error was found on, if it came from a line.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::MalformedComment { line, .. }
            | ParseError::MalformedPrototype { line, .. }
            | ParseError::MalformedArgument { line, .. } => Some(*line),
            ParseError::Io(_) => None,
        }
    }
}
