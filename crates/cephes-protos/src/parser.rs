use std::io::{self, BufRead};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseError;
use crate::record::{ArgSpec, CType, PrototypeRecord};

static SOURCE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/\* cephes/([a-z0-9]+)\.c \*/$").unwrap());
static PROTOTYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(double|int) cephes_([a-z0-9]+)\(([A-Za-z0-9_ ,*\[\]]+)\);$").unwrap()
});
static ARGUMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(double|int) (\*)?(?:cephes_)?([A-Za-z0-9]+)(\[\])?$").unwrap()
});
static ARG_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r", ?").unwrap());

/// Streaming parser over a prototype listing.
///
/// The listing is a sequence of lines: source comments (`/* cephes/gamma.c */`)
/// which set the current filename, and prototypes
/// (`double cephes_gamma(double x);`) which each produce one
/// [`PrototypeRecord`] tagged with that filename.
///
/// The parser is a single forward pass over its input. The first malformed
/// line yields an error, after which the iterator is exhausted.
pub struct ProtoParser<I> {
    lines: I,
    line_no: usize,
    current_filename: String,
    finished: bool,
}

impl<S, I> ProtoParser<std::iter::Map<I, fn(S) -> io::Result<S>>>
where
    S: AsRef<str>,
    I: Iterator<Item = S>,
{
    /// Creates a parser over lines that have already been split.
    pub fn new<L>(lines: L) -> Self
    where
        L: IntoIterator<Item = S, IntoIter = I>,
    {
        let lift: fn(S) -> io::Result<S> = Ok;
        Self::with_lines(lines.into_iter().map(lift))
    }
}

impl<R: BufRead> ProtoParser<io::Lines<R>> {
    /// Creates a parser that pulls lines from a reader; read failures surface
    /// as [`ParseError::Io`].
    pub fn from_reader(reader: R) -> Self {
        Self::with_lines(reader.lines())
    }
}

impl<I> ProtoParser<I> {
    fn with_lines(lines: I) -> Self {
        Self {
            lines,
            line_no: 0,
            current_filename: String::new(),
            finished: false,
        }
    }

    /// The filename attached to records produced from here on.
    pub fn current_filename(&self) -> &str {
        &self.current_filename
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    fn parse_filename(&mut self, line: &str) -> Result<(), ParseError> {
        let caps = SOURCE_COMMENT
            .captures(line)
            .ok_or_else(|| ParseError::MalformedComment {
                line: self.line_no,
                text: line.to_string(),
                span: (0, line.len()).into(),
            })?;
        self.current_filename = caps[1].to_string();
        log::debug!("prototype listing switched to source file `{}`", self.current_filename);
        Ok(())
    }

    fn parse_prototype(&self, line: &str) -> Result<PrototypeRecord, ParseError> {
        let malformed = || ParseError::MalformedPrototype {
            line: self.line_no,
            text: line.to_string(),
            span: (0, line.len()).into(),
        };
        let caps = PROTOTYPE.captures(line).ok_or_else(malformed)?;
        let return_type = caps[1].parse::<CType>().map_err(|_| malformed())?;
        let function_name = caps[2].to_string();
        let arg_list = caps.get(3).ok_or_else(malformed)?;

        let mut args = Vec::new();
        for (offset, raw) in split_args(arg_list.as_str()) {
            args.push(self.parse_argument(line, arg_list.start() + offset, raw)?);
        }

        let record = PrototypeRecord {
            filename: self.current_filename.clone(),
            return_type,
            function_name,
            args,
        };
        log::trace!("parsed prototype {}", record);
        Ok(record)
    }

    fn parse_argument(&self, line: &str, offset: usize, raw: &str) -> Result<ArgSpec, ParseError> {
        let malformed = || ParseError::MalformedArgument {
            line: self.line_no,
            argument: raw.to_string(),
            text: line.to_string(),
            span: (offset, raw.len()).into(),
        };
        let caps = ARGUMENT.captures(raw).ok_or_else(malformed)?;
        let base_type = caps[1].parse::<CType>().map_err(|_| malformed())?;

        Ok(ArgSpec {
            base_type,
            is_pointer: caps.get(2).is_some(),
            is_array: caps.get(4).is_some(),
            name: caps[3].to_string(),
        })
    }

    fn fail(&mut self, error: ParseError) -> Option<Result<PrototypeRecord, ParseError>> {
        self.finished = true;
        Some(Err(error))
    }
}

impl<I, S> Iterator for ProtoParser<I>
where
    I: Iterator<Item = io::Result<S>>,
    S: AsRef<str>,
{
    type Item = Result<PrototypeRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while let Some(next) = self.lines.next() {
            let raw = match next {
                Ok(raw) => raw,
                Err(err) => return self.fail(ParseError::Io(err)),
            };
            self.line_no += 1;

            let line = raw.as_ref().trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            if line.starts_with("/*") {
                if let Err(err) = self.parse_filename(line) {
                    return self.fail(err);
                }
                continue;
            }

            return match self.parse_prototype(line) {
                Ok(record) => Some(Ok(record)),
                Err(err) => self.fail(err),
            };
        }

        self.finished = true;
        None
    }
}

/// Splits an argument list on `,` plus an optional space, keeping each
/// piece's byte offset within the list.
fn split_args(list: &str) -> Vec<(usize, &str)> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for sep in ARG_SEPARATOR.find_iter(list) {
        pieces.push((start, &list[start..sep.start()]));
        start = sep.end();
    }
    pieces.push((start, &list[start..]));
    pieces
}

/// Parses a whole listing held in memory.
pub fn parse_str(listing: &str) -> Result<Vec<PrototypeRecord>, ParseError> {
    ProtoParser::new(listing.lines()).collect()
}
