use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::error::CsvError;

/// Dialect and policy options of a codec.
///
/// Options are a plain value object: fill them in (directly, through
/// [`CsvCodecBuilder`](crate::item::csv::codec::CsvCodecBuilder), or by
/// deserializing a configuration file) before the first read or write. They
/// never change while a read or a write is running.
///
/// # Examples
///
/// ```
/// use tinyline_csv::core::options::CsvOptions;
///
/// let options = CsvOptions::from_json(r#"{ "delimiter": ",", "has_header": true }"#).unwrap();
/// assert_eq!(options.delimiter, ',');
/// assert!(options.has_header);
/// assert_eq!(options.quote, '"');
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field separator (default: `;`)
    pub delimiter: char,
    /// Quote character wrapping fields that contain special characters (default: `"`)
    pub quote: char,
    /// Comment marker, recognised as the first character of a line (default: `#`)
    pub comment: char,
    /// Whether comment lines are skipped (`true`) or rejected (`false`)
    pub allow_comment: bool,
    /// Whether whitespace is trimmed from every field
    pub trim_data: bool,
    /// Whether the first non-skipped line is a header
    pub has_header: bool,
    /// Number of physical lines discarded before anything else, header included
    pub rows_to_skip: usize,
    /// Whether blank lines are skipped
    pub skip_empty_rows: bool,
    /// Whether every line must yield exactly one field per schema column
    pub validate_column_count: bool,
    /// Whether lines may end with a delimiter that introduces an empty last cell
    pub end_of_line_delimiter: bool,
    /// Whether `\` escapes the next character
    pub allow_backslash_escape: bool,
    /// Whether quote characters delimit quoted fields on read and wrap values on write
    pub allow_quoted_values: bool,
    /// `encoding_rs` label of the text encoding (default: `utf-8`)
    pub encoding: String,
    /// Line terminator used when writing
    pub new_line: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ';',
            quote: '"',
            comment: '#',
            allow_comment: true,
            trim_data: false,
            has_header: false,
            rows_to_skip: 0,
            skip_empty_rows: true,
            validate_column_count: false,
            end_of_line_delimiter: false,
            allow_backslash_escape: false,
            allow_quoted_values: true,
            encoding: "utf-8".to_string(),
            new_line: "\n".to_string(),
        }
    }
}

impl CsvOptions {
    /// Loads options from a JSON document; absent keys keep their default.
    pub fn from_json(json: &str) -> Result<Self, CsvError> {
        serde_json::from_str(json).map_err(|error| CsvError::InvalidOptions(error.to_string()))
    }

    /// Checks the invariants the tokenizer and the writer rely on.
    pub fn validate(&self) -> Result<(), CsvError> {
        if self.delimiter == self.quote {
            return Err(CsvError::InvalidOptions(format!(
                "delimiter and quote must differ (both are '{}')",
                self.delimiter
            )));
        }
        if self.delimiter == self.comment {
            return Err(CsvError::InvalidOptions(format!(
                "delimiter and comment marker must differ (both are '{}')",
                self.delimiter
            )));
        }
        if self.quote == self.comment {
            return Err(CsvError::InvalidOptions(format!(
                "quote and comment marker must differ (both are '{}')",
                self.quote
            )));
        }
        for (name, value) in [("delimiter", self.delimiter), ("quote", self.quote)] {
            if value == '\n' || value == '\r' {
                return Err(CsvError::InvalidOptions(format!(
                    "{name} cannot be a line break"
                )));
            }
        }
        if self.new_line.is_empty() {
            return Err(CsvError::InvalidOptions(
                "new_line cannot be empty".to_string(),
            ));
        }
        self.text_encoding().map(|_| ())
    }

    /// Resolves the configured encoding label.
    ///
    /// Only ASCII-compatible encodings are accepted: lines are split on the
    /// `\n` byte before decoding.
    pub fn text_encoding(&self) -> Result<&'static Encoding, CsvError> {
        encoding_for_label(&self.encoding)
    }
}

/// Resolves an `encoding_rs` label to an ASCII-compatible encoding.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding, CsvError> {
    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| CsvError::UnsupportedEncoding(label.to_string()))?;
    if !encoding.is_ascii_compatible() {
        return Err(CsvError::UnsupportedEncoding(encoding.name().to_string()));
    }
    Ok(encoding)
}
