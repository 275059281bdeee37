//! Record decode and encode over a [`ColumnSchema`].

use std::borrow::Cow;

use crate::{
    core::{options::CsvOptions, schema::ColumnSchema},
    error::{ConversionError, CsvError},
};

/// Builds a record from the raw fields of line `line`.
///
/// Columns are visited by ascending index and each one reads
/// `fields[column.index()]`. A missing field is an error, never a default.
pub fn decode<T: Default>(
    fields: &[String],
    schema: &ColumnSchema<T>,
    line: usize,
) -> Result<T, CsvError> {
    let mut record = T::default();
    for column in schema.by_index() {
        let text = fields
            .get(column.index())
            .ok_or(CsvError::FieldCountMismatch {
                line,
                index: column.index(),
                found: fields.len(),
            })?;
        column
            .decode_into(&mut record, text)
            .map_err(|source| CsvError::Conversion {
                line,
                column: column.name().to_string(),
                source,
            })?;
    }
    Ok(record)
}

/// Converts every column of `record` to text, in declaration order.
pub fn encode<T>(record: &T, schema: &ColumnSchema<T>, line: usize) -> Result<Vec<String>, CsvError> {
    schema
        .iter()
        .map(|column| {
            column
                .encode_from(record)
                .map_err(|source| CsvError::Conversion {
                    line,
                    column: column.name().to_string(),
                    source,
                })
        })
        .collect()
}

/// Encodes `record` as one line, without the line terminator.
///
/// A value the read path could not give back is a conversion error naming
/// its column: a line break, or `\"` while backslash escaping is off.
pub fn encode_line<T>(
    record: &T,
    schema: &ColumnSchema<T>,
    options: &CsvOptions,
    line: usize,
) -> Result<String, CsvError> {
    let values = encode(record, schema, line)?;
    for (column, value) in schema.iter().zip(&values) {
        writable(value, options).map_err(|reason| CsvError::Conversion {
            line,
            column: column.name().to_string(),
            source: ConversionError::new(value.as_str(), column.type_name(), reason),
        })?;
    }
    Ok(join(&values, options))
}

fn writable(value: &str, options: &CsvOptions) -> Result<(), &'static str> {
    // lines are split on '\n' before tokenizing
    if value.contains(['\r', '\n']) {
        return Err("a line break cannot be written inside a value");
    }
    if !options.allow_backslash_escape && value.contains("\\\"") {
        return Err("\\\" only reads back with backslash escaping enabled");
    }
    Ok(())
}

/// Joins the column names with the delimiter.
pub fn header_line<T>(schema: &ColumnSchema<T>, options: &CsvOptions) -> String {
    let names: Vec<&str> = schema.names().collect();
    join(&names, options)
}

/// Joins already converted values into one line, escaping what the read
/// path would otherwise misinterpret.
///
/// # Examples
///
/// ```
/// use tinyline_csv::core::{mapper::join, options::CsvOptions};
///
/// let options = CsvOptions::default();
/// assert_eq!(join(&["a", "b;c", "say \"hi\""], &options), r#"a;"b;c";"say ""hi""""#);
/// ```
pub fn join<S: AsRef<str>>(values: &[S], options: &CsvOptions) -> String {
    let delimiter = options.delimiter.to_string();
    let last = values.len().saturating_sub(1);
    let line = values
        .iter()
        .enumerate()
        .map(|(position, value)| {
            let placement = Placement {
                first: position == 0,
                last: position == last,
            };
            escape_value(value.as_ref(), placement, options)
        })
        .collect::<Vec<_>>()
        .join(delimiter.as_str());

    // a blank line would be dropped as an empty row on read
    match values.first() {
        Some(first) if options.allow_quoted_values && line.trim().is_empty() => {
            let mut quoted = wrap(first.as_ref(), options.quote);
            for value in &values[1..] {
                quoted.push(options.delimiter);
                quoted.push_str(value.as_ref());
            }
            quoted
        }
        _ => line,
    }
}

/// Position of a value within its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub first: bool,
    pub last: bool,
}

fn wrap(value: &str, quote: char) -> String {
    let doubled: String = [quote, quote].iter().collect();
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    out.push_str(&value.replace(quote, &doubled));
    out.push(quote);
    out
}

fn needs_quotes(value: &str, placement: Placement, options: &CsvOptions) -> bool {
    value.contains(options.delimiter)
        || value.contains(options.quote)
        || value.starts_with('\'')
        || value.ends_with('\'')
        || (placement.first && value.starts_with(options.comment))
        || (placement.last && value.is_empty())
}

/// Escapes one value for output.
///
/// With quoting enabled, a value is wrapped in quotes (inner quotes doubled)
/// only when the read path would not give it back unchanged otherwise: it
/// contains the delimiter or the quote; it starts or ends with an
/// apostrophe; it is the first value and starts with the comment marker; it
/// is an empty last value, which would leave a trailing delimiter. With
/// backslash escaping enabled, backslashes are doubled, and the delimiter is
/// escaped when quoting is off.
pub fn escape_value<'a>(value: &'a str, placement: Placement, options: &CsvOptions) -> Cow<'a, str> {
    let mut value = Cow::Borrowed(value);
    if options.allow_backslash_escape && value.contains('\\') {
        value = Cow::Owned(value.replace('\\', "\\\\"));
    }

    if options.allow_quoted_values {
        if needs_quotes(&value, placement, options) {
            return Cow::Owned(wrap(&value, options.quote));
        }
    } else if options.allow_backslash_escape {
        if value.contains(options.delimiter) {
            value = Cow::Owned(value.replace(options.delimiter, &format!("\\{}", options.delimiter)));
        }
        if placement.first && value.starts_with(options.comment) {
            value = Cow::Owned(format!("\\{value}"));
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::core::{schema::ColumnDef, tokenizer::tokenize};

    #[derive(Debug, Default, PartialEq, Clone)]
    struct Order {
        id: u32,
        customer: String,
        total: f64,
    }

    fn schema() -> ColumnSchema<Order> {
        ColumnSchema::new()
            .column(ColumnDef::new("id", |o: &Order| &o.id, |o, v| o.id = v))
            .column(ColumnDef::new("customer", |o: &Order| &o.customer, |o, v| o.customer = v))
            .column(ColumnDef::new("total", |o: &Order| &o.total, |o, v| o.total = v))
    }

    fn fields(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn decode_should_assign_every_column() -> Result<(), Box<dyn Error>> {
        let order = decode(&fields(&["7", "ACME; Inc", "19.99"]), &schema(), 3)?;
        assert_eq!(
            order,
            Order {
                id: 7,
                customer: "ACME; Inc".to_string(),
                total: 19.99
            }
        );
        Ok(())
    }

    #[test]
    fn decode_should_ignore_extra_fields() -> Result<(), Box<dyn Error>> {
        let order = decode(&fields(&["7", "x", "1", "extra"]), &schema(), 0)?;
        assert_eq!(order.id, 7);
        Ok(())
    }

    #[test]
    fn decode_should_fail_on_missing_field() {
        let result = decode(&fields(&["7", "x"]), &schema(), 5);
        assert!(matches!(
            result,
            Err(CsvError::FieldCountMismatch {
                line: 5,
                index: 2,
                found: 2
            })
        ));
    }

    #[test]
    fn decode_should_name_failing_column() {
        let err = decode(&fields(&["seven", "x", "1"]), &schema(), 2).unwrap_err();
        match err {
            CsvError::Conversion { line, column, source } => {
                assert_eq!(line, 2);
                assert_eq!(column, "id");
                assert_eq!(source.value, "seven");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    const MIDDLE: Placement = Placement {
        first: false,
        last: false,
    };
    const FIRST: Placement = Placement {
        first: true,
        last: false,
    };
    const LAST: Placement = Placement {
        first: false,
        last: true,
    };

    #[test]
    fn values_should_only_be_quoted_when_needed() {
        let options = CsvOptions::default();
        assert_eq!(escape_value("plain text", MIDDLE, &options), "plain text");
        assert_eq!(escape_value("a;b", MIDDLE, &options), "\"a;b\"");
        assert_eq!(escape_value("5\" disk", MIDDLE, &options), "\"5\"\" disk\"");
        assert_eq!(escape_value("'x'", MIDDLE, &options), "\"'x'\"");
        assert_eq!(escape_value("#1", FIRST, &options), "\"#1\"");
        assert_eq!(escape_value("#1", MIDDLE, &options), "#1");
        assert_eq!(escape_value("", MIDDLE, &options), "");
        assert_eq!(escape_value("", LAST, &options), "\"\"");
    }

    #[test]
    fn backslashes_should_be_doubled_when_escaping() {
        let options = CsvOptions {
            allow_backslash_escape: true,
            ..CsvOptions::default()
        };
        assert_eq!(escape_value(r"C:\temp", MIDDLE, &options), r"C:\\temp");

        let options = CsvOptions {
            allow_quoted_values: false,
            ..options
        };
        assert_eq!(escape_value("a;b", MIDDLE, &options), r"a\;b");
        assert_eq!(escape_value("#x", FIRST, &options), r"\#x");
    }

    #[test]
    fn blank_lines_should_be_protected() {
        let options = CsvOptions::default();
        assert_eq!(join(&[""], &options), "\"\"");
        assert_eq!(join(&[" "], &options), "\" \"");
        assert_eq!(join(&["a", ""], &options), "a;\"\"");
        assert_eq!(join(&["", "a"], &options), ";a");

        let tabs = CsvOptions {
            delimiter: '\t',
            ..CsvOptions::default()
        };
        assert_eq!(join(&[" ", " "], &tabs), "\" \"\t ");
    }

    #[test]
    fn header_should_join_names() {
        let options = CsvOptions {
            delimiter: ',',
            ..CsvOptions::default()
        };
        assert_eq!(header_line(&schema(), &options), "id,customer,total");
    }

    #[test]
    fn encoded_line_should_tokenize_back() -> Result<(), Box<dyn Error>> {
        let options = CsvOptions::default();
        let schema = schema();
        let order = Order {
            id: 1,
            customer: "O'Brien; \"Bob\"".to_string(),
            total: 0.5,
        };

        let line = encode_line(&order, &schema, &options, 0)?;
        let fields = tokenize(&line, &options)?;
        assert_eq!(decode(&fields, &schema, 0)?, order);
        Ok(())
    }

    #[derive(Debug, Default, PartialEq)]
    struct Note {
        id: u32,
        text: String,
    }

    fn notes() -> ColumnSchema<Note> {
        ColumnSchema::new()
            .column(ColumnDef::new("id", |n: &Note| &n.id, |n, v| n.id = v))
            .column(ColumnDef::new("text", |n: &Note| &n.text, |n, v| n.text = v))
    }

    #[test]
    fn line_breaks_should_be_rejected_on_encode() {
        let note = Note {
            id: 1,
            text: "two\nlines".to_string(),
        };

        let err = encode_line(&note, &notes(), &CsvOptions::default(), 4).unwrap_err();
        match err {
            CsvError::Conversion { line, column, source } => {
                assert_eq!(line, 4);
                assert_eq!(column, "text");
                assert_eq!(source.value, "two\nlines");
            }
            other => panic!("unexpected error {other:?}"),
        }

        let note = Note {
            id: 1,
            text: "carriage\rreturn".to_string(),
        };
        assert!(encode_line(&note, &notes(), &CsvOptions::default(), 0).is_err());
    }

    #[test]
    fn escaped_quote_should_need_backslash_escaping() -> Result<(), Box<dyn Error>> {
        let note = Note {
            id: 2,
            text: "path\\\"x".to_string(),
        };

        let err = encode_line(&note, &notes(), &CsvOptions::default(), 1).unwrap_err();
        assert!(matches!(err, CsvError::Conversion { line: 1, ref column, .. } if column == "text"));

        let options = CsvOptions {
            allow_backslash_escape: true,
            ..CsvOptions::default()
        };
        let line = encode_line(&note, &notes(), &options, 1)?;
        let fields = tokenize(&line, &options)?;
        assert_eq!(decode(&fields, &notes(), 1)?, note);
        Ok(())
    }
}
