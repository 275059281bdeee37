use std::io;

use thiserror::Error;

/// Failure raised by the line tokenizer while splitting a single line.
///
/// Tokenizer errors know nothing about where the line came from; the read
/// engine wraps them into [`CsvError::Tokenize`] together with the line ordinal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("trailing delimiter at position {position} is not allowed")]
    TrailingDelimiter { position: usize },

    #[error("comment lines are not allowed")]
    CommentNotAllowed,

    #[error("found {count} field(s) with a backslash-escaped quote")]
    InvalidEscapedQuote { count: usize },

    #[error("quoted field is not terminated")]
    UnterminatedQuote,
}

/// A value could not be converted between its text form and its typed form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert '{value}' to {target}: {reason}")]
pub struct ConversionError {
    pub value: String,
    pub target: &'static str,
    pub reason: String,
}

impl ConversionError {
    pub fn new(value: impl Into<String>, target: &'static str, reason: impl ToString) -> Self {
        Self {
            value: value.into(),
            target,
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug)]
/// Codec error
///
/// Every variant raised while processing a line carries the 0-based physical
/// ordinal of that line (the header, when present, counts as a line).
pub enum CsvError {
    #[error("line {line}: {source}")]
    Tokenize {
        line: usize,
        #[source]
        source: TokenizeError,
    },

    #[error("line {line}: comment found but comments are not allowed")]
    CommentNotAllowed { line: usize },

    #[error("line {line}: invalid column count, expected {expected} columns but found {found}")]
    InvalidColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: column index {index} is out of bounds for {found} field(s)")]
    FieldCountMismatch {
        line: usize,
        index: usize,
        found: usize,
    },

    #[error("line {line}, column '{column}': {source}")]
    Conversion {
        line: usize,
        column: String,
        #[source]
        source: ConversionError,
    },

    #[error("line {line}: text is not valid {encoding}")]
    Encoding { line: usize, encoding: &'static str },

    #[error("line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: io::Error,
    },

    #[error("operation cancelled before line {line}")]
    Cancelled { line: usize },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),
}

impl CsvError {
    /// Ordinal of the line the error was raised on, if it is tied to one.
    pub fn line(&self) -> Option<usize> {
        match self {
            CsvError::Tokenize { line, .. }
            | CsvError::CommentNotAllowed { line }
            | CsvError::InvalidColumnCount { line, .. }
            | CsvError::FieldCountMismatch { line, .. }
            | CsvError::Conversion { line, .. }
            | CsvError::Encoding { line, .. }
            | CsvError::Io { line, .. }
            | CsvError::Cancelled { line } => Some(*line),
            CsvError::InvalidOptions(_)
            | CsvError::InvalidSchema(_)
            | CsvError::UnsupportedEncoding(_) => None,
        }
    }

    /// Wraps a tokenizer failure, folding the comment case into the dedicated variant.
    pub(crate) fn from_tokenize(line: usize, source: TokenizeError) -> Self {
        match source {
            TokenizeError::CommentNotAllowed => CsvError::CommentNotAllowed { line },
            source => CsvError::Tokenize { line, source },
        }
    }
}
