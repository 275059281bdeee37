//! Single-pass line tokenizer.
//!
//! A line is scanned once, left to right, with one accumulator buffer. Quote
//! characters toggle quoted mode and are never copied into the field; inside a
//! quoted section a doubled quote yields one literal quote; with backslash
//! escaping enabled, `\` copies the next character literally. Both escape
//! styles may be enabled together.

use std::ops::Deref;

use crate::{core::options::CsvOptions, error::TokenizeError};

/// Raw fields of one line, in order.
///
/// May hold one more field than the schema has columns when the line ended
/// with an allowed trailing delimiter; see [`FieldArray::has_trailing_cell`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldArray {
    fields: Vec<String>,
    trailing_cell: bool,
}

impl FieldArray {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            trailing_cell: false,
        }
    }

    /// Whether the last field is the implicit empty cell after a trailing delimiter.
    pub fn has_trailing_cell(&self) -> bool {
        self.trailing_cell
    }

    /// Number of fields, not counting the implicit trailing cell.
    pub fn data_len(&self) -> usize {
        self.fields.len() - usize::from(self.trailing_cell)
    }

    pub fn into_inner(self) -> Vec<String> {
        self.fields
    }
}

impl Deref for FieldArray {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.fields
    }
}

struct FieldBuffer {
    text: String,
    quoted: bool,
    // an escaped apostrophe at an edge is data
    literal_start: bool,
    literal_end: bool,
}

impl FieldBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            quoted: false,
            literal_start: false,
            literal_end: false,
        }
    }

    fn push(&mut self, c: char) {
        self.text.push(c);
        self.literal_end = false;
    }

    fn push_escaped(&mut self, c: char) {
        if self.text.is_empty() {
            self.literal_start = true;
        }
        self.text.push(c);
        self.literal_end = true;
    }

    fn take(&mut self, options: &CsvOptions) -> String {
        let quoted = std::mem::replace(&mut self.quoted, false);
        let keep_start = std::mem::replace(&mut self.literal_start, false);
        let keep_end = std::mem::replace(&mut self.literal_end, false);
        let mut value = std::mem::take(&mut self.text);
        if !quoted {
            value = strip_apostrophes(value, keep_start, keep_end);
        }
        if options.trim_data {
            value = trim_whitespace(value);
        }
        value
    }
}

fn strip_apostrophes(value: String, keep_start: bool, keep_end: bool) -> String {
    let mut stripped = value.as_str();
    if !keep_start {
        stripped = stripped.trim_start_matches('\'');
    }
    if !keep_end {
        stripped = stripped.trim_end_matches('\'');
    }
    if stripped.len() == value.len() {
        value
    } else {
        stripped.to_string()
    }
}

fn trim_whitespace(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.len() == value.len() {
        value
    } else {
        trimmed.to_string()
    }
}

/// Splits one line into its raw fields.
///
/// # Errors
///
/// - [`TokenizeError::CommentNotAllowed`] if the line starts with the comment
///   marker while comments are disallowed
/// - [`TokenizeError::TrailingDelimiter`] if the line ends with an unquoted
///   delimiter while `end_of_line_delimiter` is off
/// - [`TokenizeError::UnterminatedQuote`] if a quoted section is still open at
///   the end of the line
/// - [`TokenizeError::InvalidEscapedQuote`] if backslash escaping is disallowed
///   and a field contains the sequence `\"`
///
/// # Examples
///
/// ```
/// use tinyline_csv::core::{options::CsvOptions, tokenizer::tokenize};
///
/// let options = CsvOptions::default();
/// let fields = tokenize(r#"1;"he said ""hi""";x"#, &options).unwrap();
/// assert_eq!(&*fields, &["1", "he said \"hi\"", "x"]);
/// ```
pub fn tokenize(line: &str, options: &CsvOptions) -> Result<FieldArray, TokenizeError> {
    if !options.allow_comment && line.starts_with(options.comment) {
        return Err(TokenizeError::CommentNotAllowed);
    }

    let chars: Vec<char> = line.chars().collect();
    let last = chars.len().saturating_sub(1);
    let mut fields = Vec::new();
    let mut buffer = FieldBuffer::new(line.len());
    let mut in_quotes = false;
    let mut trailing_cell = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == options.quote && options.allow_quoted_values {
            if in_quotes && chars.get(i + 1) == Some(&options.quote) {
                buffer.push(options.quote);
                i += 2;
                continue;
            }
            in_quotes = !in_quotes;
            buffer.quoted = true;
        } else if c == '\\' && options.allow_backslash_escape {
            match chars.get(i + 1) {
                Some(&next) => {
                    buffer.push_escaped(next);
                    i += 2;
                    continue;
                }
                None => buffer.push(c),
            }
        } else if c == options.delimiter && !in_quotes {
            if i == last {
                if !options.end_of_line_delimiter {
                    return Err(TokenizeError::TrailingDelimiter { position: i });
                }
                trailing_cell = true;
            } else {
                fields.push(buffer.take(options));
            }
        } else {
            buffer.push(c);
        }
        i += 1;
    }

    if in_quotes {
        return Err(TokenizeError::UnterminatedQuote);
    }

    fields.push(buffer.take(options));
    if trailing_cell {
        fields.push(String::new());
    }

    if !options.allow_backslash_escape {
        let count = fields.iter().filter(|field| field.contains("\\\"")).count();
        if count > 0 {
            return Err(TokenizeError::InvalidEscapedQuote { count });
        }
    }

    Ok(FieldArray {
        fields,
        trailing_cell,
    })
}
