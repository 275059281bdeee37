//! The codec facade: one configured dialect and schema, many reads and writes.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Cursor, Read, Write},
    path::Path,
    sync::Arc,
};

use encoding_rs::Encoding;
use log::debug;
#[cfg(feature = "async")]
use tokio::io::{AsyncRead, AsyncWrite};
#[cfg(feature = "async")]
use tokio_util::sync::CancellationToken;

#[cfg(feature = "async")]
use crate::item::csv::{csv_async_reader::CsvAsyncItemReader, csv_writer::CsvAsyncItemWriter};
use crate::{
    convert::Converter,
    core::{
        engine::{CsvContext, WriteEngine},
        filter::SkipRowPredicate,
        handlers::{ReadHandlers, WriteHandlers},
        item::ItemWriter,
        options::{CsvOptions, encoding_for_label},
        schema::{ColumnDef, ColumnSchema},
        tokenizer::{FieldArray, tokenize},
    },
    error::{CsvError, TokenizeError},
    item::csv::{csv_reader::CsvItemReader, csv_writer::CsvItemWriter, source::LineSource},
};

fn open_error(source: std::io::Error) -> CsvError {
    CsvError::Io { line: 0, source }
}

/// Encodes `text` for reading it back in `encoding`.
fn encode_text(text: &str, encoding: &'static Encoding) -> Result<Vec<u8>, CsvError> {
    let (bytes, _, had_errors) = encoding.encode(text);
    if !had_errors {
        return Ok(bytes.into_owned());
    }
    let line = text
        .split('\n')
        .position(|line| encoding.encode(line).2)
        .unwrap_or(0);
    Err(CsvError::Encoding {
        line,
        encoding: encoding.name(),
    })
}

/// A configured delimited-text codec for records of type `T`.
///
/// The codec is cheap to clone and immutable: every reader and writer it
/// creates shares the same options, schema and handlers, and owns its own
/// source or sink.
///
/// # Examples
///
/// ```
/// use tinyline_csv::{core::schema::ColumnDef, item::csv::codec::CsvCodecBuilder};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Car {
///     year: u16,
///     make: String,
///     model: String,
/// }
///
/// let codec = CsvCodecBuilder::new()
///     .delimiter(',')
///     .has_header(true)
///     .column(ColumnDef::new("year", |c: &Car| &c.year, |c, v| c.year = v))
///     .column(ColumnDef::new("make", |c: &Car| &c.make, |c, v| c.make = v))
///     .column(ColumnDef::new("model", |c: &Car| &c.model, |c, v| c.model = v))
///     .build()
///     .unwrap();
///
/// let cars = codec
///     .load_from_text("year,make,model\n1948,Porsche,356\n2021,Mazda,\"CX-30, SUV\"\n", None)
///     .unwrap();
/// assert_eq!(cars[1].model, "CX-30, SUV");
///
/// let text = codec.get_all_text(&cars).unwrap();
/// assert_eq!(text, "year,make,model\n1948,Porsche,356\n2021,Mazda,\"CX-30, SUV\"");
/// ```
pub struct CsvCodec<T> {
    context: Arc<CsvContext<T>>,
    encoding: &'static Encoding,
}

impl<T> Clone for CsvCodec<T> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            encoding: self.encoding,
        }
    }
}

impl<T: 'static> CsvCodec<T> {
    pub fn builder() -> CsvCodecBuilder<T> {
        CsvCodecBuilder::new()
    }
}

impl<T> CsvCodec<T> {
    pub fn options(&self) -> &CsvOptions {
        &self.context.options
    }

    pub fn schema(&self) -> &ColumnSchema<T> {
        &self.context.schema
    }

    /// The resolved text encoding of the configured label.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Tokenizes a single line with this codec's dialect.
    pub fn fields_of(&self, line: &str) -> Result<FieldArray, TokenizeError> {
        tokenize(line, &self.context.options)
    }

    /// Raw physical lines of `reader`, without any filtering or decoding.
    pub fn read_lines<R: Read>(&self, reader: R) -> LineSource<BufReader<R>> {
        LineSource::new(BufReader::new(reader), self.encoding)
    }

    pub fn writer_to_writer<W: Write>(&self, writer: W) -> CsvItemWriter<T, W> {
        CsvItemWriter::new(Arc::clone(&self.context), writer, self.encoding)
    }

    /// Creates (or truncates) the file at `path` and writes to it.
    pub fn writer_to_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<CsvItemWriter<T, BufWriter<File>>, CsvError> {
        let file = File::create(path).map_err(open_error)?;
        Ok(self.writer_to_writer(BufWriter::new(file)))
    }

    /// Writes every record to the file at `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P, records: &[T]) -> Result<(), CsvError> {
        let writer = self.writer_to_path(path)?;
        writer.write(records)?;
        writer.close()
    }

    /// Writes every record to `writer`, flushes it and hands it back.
    pub fn save_to_writer<W: Write>(&self, writer: W, records: &[T]) -> Result<W, CsvError> {
        let writer = self.writer_to_writer(writer);
        writer.write(records)?;
        writer.into_inner()
    }

    /// Encodes the records as lines, header first when configured.
    pub fn get_all_lines(&self, records: &[T]) -> Result<Vec<String>, CsvError> {
        let mut engine = WriteEngine::new(Arc::clone(&self.context));
        let mut lines = Vec::with_capacity(records.len() + 1);
        lines.extend(engine.begin());
        for record in records {
            lines.push(engine.encode(record)?);
        }
        engine.finish();
        Ok(lines)
    }

    /// [`get_all_lines`](Self::get_all_lines) joined with the configured new line.
    pub fn get_all_text(&self, records: &[T]) -> Result<String, CsvError> {
        Ok(self.get_all_lines(records)?.join(&self.context.options.new_line))
    }
}

impl<T: Default> CsvCodec<T> {
    pub fn reader_from_reader<R: Read>(&self, reader: R) -> CsvItemReader<T, BufReader<R>> {
        CsvItemReader::new(Arc::clone(&self.context), BufReader::new(reader), self.encoding)
    }

    pub fn reader_from_bytes<'a>(&self, bytes: &'a [u8]) -> CsvItemReader<T, &'a [u8]> {
        CsvItemReader::new(Arc::clone(&self.context), bytes, self.encoding)
    }

    pub fn reader_from_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<CsvItemReader<T, BufReader<File>>, CsvError> {
        let file = File::open(path).map_err(open_error)?;
        Ok(self.reader_from_reader(file))
    }

    /// Reads records from `text` as if it had been stored in `encoding`
    /// (the codec's own encoding when `None`).
    ///
    /// Fails with [`CsvError::Encoding`] when `text` holds characters the
    /// encoding cannot represent.
    pub fn reader_from_text(
        &self,
        text: &str,
        encoding: Option<&str>,
    ) -> Result<CsvItemReader<T, Cursor<Vec<u8>>>, CsvError> {
        let encoding = match encoding {
            Some(label) => encoding_for_label(label)?,
            None => self.encoding,
        };
        let bytes = encode_text(text, encoding)?;
        Ok(CsvItemReader::new(Arc::clone(&self.context), Cursor::new(bytes), encoding))
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<T>, CsvError> {
        self.reader_from_path(path)?.collect()
    }

    pub fn load_from_reader<R: Read>(&self, reader: R) -> Result<Vec<T>, CsvError> {
        self.reader_from_reader(reader).collect()
    }

    pub fn load_from_bytes(&self, bytes: &[u8]) -> Result<Vec<T>, CsvError> {
        self.reader_from_bytes(bytes).collect()
    }

    pub fn load_from_text(&self, text: &str, encoding: Option<&str>) -> Result<Vec<T>, CsvError> {
        self.reader_from_text(text, encoding)?.collect()
    }
}

#[cfg(feature = "async")]
impl<T> CsvCodec<T> {
    pub fn async_writer_to_writer<W: AsyncWrite + Unpin>(
        &self,
        writer: W,
        cancel: CancellationToken,
    ) -> CsvAsyncItemWriter<T, W> {
        CsvAsyncItemWriter::new(Arc::clone(&self.context), writer, self.encoding, cancel)
    }

    pub async fn async_writer_to_path<P: AsRef<Path>>(
        &self,
        path: P,
        cancel: CancellationToken,
    ) -> Result<CsvAsyncItemWriter<T, tokio::io::BufWriter<tokio::fs::File>>, CsvError> {
        let file = tokio::fs::File::create(path).await.map_err(open_error)?;
        Ok(self.async_writer_to_writer(tokio::io::BufWriter::new(file), cancel))
    }

    pub async fn save_async<P: AsRef<Path>>(
        &self,
        path: P,
        records: &[T],
        cancel: CancellationToken,
    ) -> Result<(), CsvError> {
        let mut writer = self.async_writer_to_path(path, cancel).await?;
        writer.write(records).await?;
        writer.close().await
    }

    pub async fn save_to_writer_async<W: AsyncWrite + Unpin>(
        &self,
        writer: W,
        records: &[T],
        cancel: CancellationToken,
    ) -> Result<W, CsvError> {
        let mut writer = self.async_writer_to_writer(writer, cancel);
        writer.write(records).await?;
        writer.into_inner().await
    }

    /// Cancellable [`get_all_lines`](Self::get_all_lines), yielding to the
    /// runtime between lines.
    pub async fn get_all_lines_async(
        &self,
        records: &[T],
        cancel: CancellationToken,
    ) -> Result<Vec<String>, CsvError> {
        let mut engine = WriteEngine::new(Arc::clone(&self.context));
        let mut lines = Vec::with_capacity(records.len() + 1);
        if cancel.is_cancelled() {
            return Err(CsvError::Cancelled { line: 0 });
        }
        lines.extend(engine.begin());
        for record in records {
            tokio::task::yield_now().await;
            if cancel.is_cancelled() {
                return Err(CsvError::Cancelled {
                    line: engine.next_index(),
                });
            }
            lines.push(engine.encode(record)?);
        }
        engine.finish();
        Ok(lines)
    }

    pub async fn get_all_text_async(
        &self,
        records: &[T],
        cancel: CancellationToken,
    ) -> Result<String, CsvError> {
        let lines = self.get_all_lines_async(records, cancel).await?;
        Ok(lines.join(&self.context.options.new_line))
    }
}

#[cfg(feature = "async")]
impl<T: Default> CsvCodec<T> {
    pub fn async_reader_from_reader<R: AsyncRead + Unpin>(
        &self,
        reader: R,
        cancel: CancellationToken,
    ) -> CsvAsyncItemReader<T, tokio::io::BufReader<R>> {
        CsvAsyncItemReader::new(
            Arc::clone(&self.context),
            tokio::io::BufReader::new(reader),
            self.encoding,
            cancel,
        )
    }

    pub async fn async_reader_from_path<P: AsRef<Path>>(
        &self,
        path: P,
        cancel: CancellationToken,
    ) -> Result<CsvAsyncItemReader<T, tokio::io::BufReader<tokio::fs::File>>, CsvError> {
        let file = tokio::fs::File::open(path).await.map_err(open_error)?;
        Ok(self.async_reader_from_reader(file, cancel))
    }

    pub fn async_reader_from_text(
        &self,
        text: &str,
        encoding: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<CsvAsyncItemReader<T, Cursor<Vec<u8>>>, CsvError> {
        let encoding = match encoding {
            Some(label) => encoding_for_label(label)?,
            None => self.encoding,
        };
        let bytes = encode_text(text, encoding)?;
        Ok(CsvAsyncItemReader::new(
            Arc::clone(&self.context),
            Cursor::new(bytes),
            encoding,
            cancel,
        ))
    }

    pub async fn load_from_file_async<P: AsRef<Path>>(
        &self,
        path: P,
        cancel: CancellationToken,
    ) -> Result<Vec<T>, CsvError> {
        let reader = self.async_reader_from_path(path, cancel).await?;
        Self::collect(reader).await
    }

    pub async fn load_from_reader_async<R: AsyncRead + Unpin>(
        &self,
        reader: R,
        cancel: CancellationToken,
    ) -> Result<Vec<T>, CsvError> {
        Self::collect(self.async_reader_from_reader(reader, cancel)).await
    }

    pub async fn load_from_text_async(
        &self,
        text: &str,
        encoding: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<Vec<T>, CsvError> {
        Self::collect(self.async_reader_from_text(text, encoding, cancel)?).await
    }

    async fn collect<R: tokio::io::AsyncBufRead + Unpin>(
        mut reader: CsvAsyncItemReader<T, R>,
    ) -> Result<Vec<T>, CsvError> {
        let mut records = Vec::new();
        while let Some(record) = reader.read().await? {
            records.push(record);
        }
        Ok(records)
    }
}

/// Builder of [`CsvCodec`].
///
/// Dialect options default to [`CsvOptions::default`]; they can be set one by
/// one or replaced wholesale with [`options`](Self::options), for instance
/// after loading them with [`CsvOptions::from_json`].
pub struct CsvCodecBuilder<T> {
    options: CsvOptions,
    schema: ColumnSchema<T>,
    skip_row: Option<SkipRowPredicate>,
    read_handlers: ReadHandlers<T>,
    write_handlers: WriteHandlers<T>,
}

impl<T: 'static> Default for CsvCodecBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> CsvCodecBuilder<T> {
    pub fn new() -> Self {
        Self {
            options: CsvOptions::default(),
            schema: ColumnSchema::new(),
            skip_row: None,
            read_handlers: ReadHandlers::default(),
            write_handlers: WriteHandlers::default(),
        }
    }

    /// Replaces every dialect option at once.
    pub fn options(mut self, options: CsvOptions) -> Self {
        self.options = options;
        self
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.options.delimiter = delimiter;
        self
    }

    pub fn quote(mut self, quote: char) -> Self {
        self.options.quote = quote;
        self
    }

    pub fn comment(mut self, comment: char) -> Self {
        self.options.comment = comment;
        self
    }

    pub fn allow_comment(mut self, yes: bool) -> Self {
        self.options.allow_comment = yes;
        self
    }

    pub fn trim_data(mut self, yes: bool) -> Self {
        self.options.trim_data = yes;
        self
    }

    pub fn has_header(mut self, yes: bool) -> Self {
        self.options.has_header = yes;
        self
    }

    /// Physical lines discarded before anything else, the header included.
    pub fn rows_to_skip(mut self, rows: usize) -> Self {
        self.options.rows_to_skip = rows;
        self
    }

    pub fn skip_empty_rows(mut self, yes: bool) -> Self {
        self.options.skip_empty_rows = yes;
        self
    }

    pub fn validate_column_count(mut self, yes: bool) -> Self {
        self.options.validate_column_count = yes;
        self
    }

    pub fn end_of_line_delimiter(mut self, yes: bool) -> Self {
        self.options.end_of_line_delimiter = yes;
        self
    }

    pub fn allow_backslash_escape(mut self, yes: bool) -> Self {
        self.options.allow_backslash_escape = yes;
        self
    }

    pub fn allow_quoted_values(mut self, yes: bool) -> Self {
        self.options.allow_quoted_values = yes;
        self
    }

    /// `encoding_rs` label, e.g. `utf-8`, `windows-1252`, `latin1`.
    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.options.encoding = label.into();
        self
    }

    pub fn new_line(mut self, new_line: impl Into<String>) -> Self {
        self.options.new_line = new_line.into();
        self
    }

    pub fn column<V: 'static, C: Converter<V>>(mut self, column: ColumnDef<T, V, C>) -> Self {
        self.schema.push(column);
        self
    }

    /// Replaces the columns added so far.
    pub fn schema(mut self, schema: ColumnSchema<T>) -> Self {
        self.schema = schema;
        self
    }

    /// Skips every line for which `predicate(line, ordinal)` is `true`.
    ///
    /// Runs after the leading-row, blank-line and comment checks.
    pub fn skip_row(mut self, predicate: impl Fn(&str, usize) -> bool + Send + Sync + 'static) -> Self {
        self.skip_row = Some(Arc::new(predicate));
        self
    }

    pub fn read_handlers(mut self, handlers: ReadHandlers<T>) -> Self {
        self.read_handlers = handlers;
        self
    }

    pub fn write_handlers(mut self, handlers: WriteHandlers<T>) -> Self {
        self.write_handlers = handlers;
        self
    }

    /// Validates the options and the schema and builds the codec.
    ///
    /// # Errors
    ///
    /// - [`CsvError::InvalidOptions`] for clashing dialect characters or an
    ///   empty new line
    /// - [`CsvError::UnsupportedEncoding`] for an unknown or non
    ///   ASCII-compatible encoding label
    /// - [`CsvError::InvalidSchema`] for an empty schema or duplicate indices
    pub fn build(self) -> Result<CsvCodec<T>, CsvError> {
        self.options.validate()?;
        self.schema.validate()?;
        let encoding = self.options.text_encoding()?;
        debug!(
            "Codec built: {} column(s), delimiter '{}', encoding {}",
            self.schema.len(),
            self.options.delimiter,
            encoding.name()
        );

        let context = CsvContext {
            options: self.options,
            schema: self.schema,
            skip_row: self.skip_row,
            read_handlers: self.read_handlers,
            write_handlers: self.write_handlers,
        };
        Ok(CsvCodec {
            context: Arc::new(context),
            encoding,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        error::Error,
        sync::{Arc, Mutex},
    };

    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Person {
        name: String,
        age: u8,
        email: Option<String>,
    }

    fn builder() -> CsvCodecBuilder<Person> {
        CsvCodecBuilder::new()
            .column(ColumnDef::new("name", |p: &Person| &p.name, |p, v| p.name = v))
            .column(ColumnDef::new("age", |p: &Person| &p.age, |p, v| p.age = v))
            .column(ColumnDef::new("email", |p: &Person| &p.email, |p, v| p.email = v))
    }

    fn people() -> Vec<Person> {
        vec![
            Person {
                name: "Ann; Lee".to_string(),
                age: 34,
                email: Some("ann@example.com".to_string()),
            },
            Person {
                name: "Bob \"the builder\"".to_string(),
                age: 41,
                email: None,
            },
        ]
    }

    #[test]
    fn build_should_reject_invalid_configuration() {
        assert!(matches!(
            builder().delimiter('"').build(),
            Err(CsvError::InvalidOptions(_))
        ));
        assert!(matches!(
            builder().encoding("utf-16be").build(),
            Err(CsvError::UnsupportedEncoding(_))
        ));
        assert!(matches!(
            CsvCodecBuilder::<Person>::new().build(),
            Err(CsvError::InvalidSchema(_))
        ));
    }

    #[test]
    fn text_should_round_trip() -> Result<(), Box<dyn Error>> {
        let codec = builder().has_header(true).build()?;
        let text = codec.get_all_text(&people())?;
        assert_eq!(
            text,
            "name;age;email\n\"Ann; Lee\";34;ann@example.com\n\"Bob \"\"the builder\"\"\";41;\"\""
        );
        assert_eq!(codec.load_from_text(&text, None)?, people());
        Ok(())
    }

    #[test]
    fn writer_output_should_read_back() -> Result<(), Box<dyn Error>> {
        let codec = builder().new_line("\r\n").build()?;
        let bytes = codec.save_to_writer(Vec::new(), &people())?;
        assert!(bytes.ends_with(b"\r\n"));
        assert_eq!(codec.load_from_bytes(&bytes)?, people());
        Ok(())
    }

    #[test]
    fn text_outside_encoding_should_fail() -> Result<(), Box<dyn Error>> {
        let codec = builder().build()?;
        let result = codec.load_from_text("Ann;34;\nЖанна;29;", Some("windows-1252"));
        assert!(matches!(result, Err(CsvError::Encoding { line: 1, .. })));

        let people = codec.load_from_text("Zoë;29;zoe@example.com\n", Some("latin1"))?;
        assert_eq!(people[0].name, "Zoë");
        Ok(())
    }

    #[test]
    fn skip_row_predicate_should_filter_records() -> Result<(), Box<dyn Error>> {
        let codec = builder()
            .skip_row(|line, _| line.starts_with("test"))
            .build()?;
        let people = codec.load_from_bytes(b"Ann;34;\"\"\ntest-user;0;\"\"\nBob;41;bob@example.com\n")?;
        assert_eq!(people.len(), 2);
        assert_eq!(people[1].name, "Bob");
        Ok(())
    }

    #[test]
    fn handlers_should_observe_reads() -> Result<(), Box<dyn Error>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (start, reading, read, done) = (events.clone(), events.clone(), events.clone(), events.clone());
        let codec = builder()
            .has_header(true)
            .read_handlers(
                ReadHandlers::new()
                    .on_start(move || start.lock().unwrap().push("start".to_string()))
                    .on_row_reading(move |i, _| reading.lock().unwrap().push(format!("reading {i}")))
                    .on_row_read(move |i, p: &Person, _| read.lock().unwrap().push(format!("read {i} {}", p.age)))
                    .on_completed(move |n| done.lock().unwrap().push(format!("completed {n}"))),
            )
            .build()?;

        codec.load_from_bytes(b"name;age;email\nAnn;34;ann@example.com\n")?;
        assert_eq!(
            *events.lock().unwrap(),
            vec!["start", "reading 0", "reading 1", "read 1 34", "completed 1"]
        );
        Ok(())
    }

    #[test]
    fn fields_of_and_read_lines_should_expose_raw_data() -> Result<(), Box<dyn Error>> {
        let codec = builder().build()?;
        let fields = codec.fields_of("\"a;b\";c")?;
        assert_eq!(&*fields, &["a;b", "c"]);

        let lines = codec
            .read_lines("x\n#y\n".as_bytes())
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(lines, vec!["x", "#y"]);
        Ok(())
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn async_text_should_match_sync_text() -> Result<(), Box<dyn Error>> {
        let codec = builder().has_header(true).build()?;
        let text = codec
            .get_all_text_async(&people(), CancellationToken::new())
            .await?;
        assert_eq!(text, codec.get_all_text(&people())?);

        let loaded = codec
            .load_from_text_async(&text, None, CancellationToken::new())
            .await?;
        assert_eq!(loaded, people());
        Ok(())
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn cancelled_token_should_stop_async_text() {
        let codec = builder().build().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let result = codec.get_all_lines_async(&people(), token).await;
        assert!(matches!(result, Err(CsvError::Cancelled { line: 0 })));
    }
}
