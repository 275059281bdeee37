//! Line sources and sinks over byte streams in a chosen text encoding.
//!
//! Lines end at `\n`; a preceding `\r` is dropped. A UTF-8 byte order mark
//! at the very start of a UTF-8 source is ignored. Source encodings must be
//! ASCII-compatible so that splitting on the `\n` byte is safe.

use std::io::{BufRead, Write};

use encoding_rs::{Encoding, UTF_8};
#[cfg(feature = "async")]
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::CsvError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Turns raw line bytes into text.
#[derive(Debug, Clone)]
struct LineDecoder {
    encoding: &'static Encoding,
    first: bool,
}

impl LineDecoder {
    fn new(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            first: true,
        }
    }

    fn decode(&mut self, bytes: &[u8], line: usize) -> Result<String, CsvError> {
        let mut bytes = bytes;
        if let Some(rest) = bytes.strip_suffix(b"\n") {
            bytes = rest;
        }
        if let Some(rest) = bytes.strip_suffix(b"\r") {
            bytes = rest;
        }
        if std::mem::replace(&mut self.first, false) && self.encoding == UTF_8 {
            if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
                bytes = rest;
            }
        }

        self.encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or(CsvError::Encoding {
                line,
                encoding: self.encoding.name(),
            })
    }
}

fn encode_line(
    encoding: &'static Encoding,
    line: &str,
    new_line: &str,
    index: usize,
) -> Result<Vec<u8>, CsvError> {
    let mut text = String::with_capacity(line.len() + new_line.len());
    text.push_str(line);
    text.push_str(new_line);

    let (bytes, _, had_errors) = encoding.encode(&text);
    if had_errors {
        return Err(CsvError::Encoding {
            line: index,
            encoding: encoding.name(),
        });
    }
    Ok(bytes.into_owned())
}

/// Blocking source of physical lines.
///
/// Yields every line, blank and comment lines included; filtering is the
/// reader's job.
///
/// # Examples
///
/// ```
/// use tinyline_csv::item::csv::source::LineSource;
///
/// let lines: Vec<String> = LineSource::new("a;b\r\nc;d\n".as_bytes(), encoding_rs::UTF_8)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(lines, ["a;b", "c;d"]);
/// ```
pub struct LineSource<R> {
    reader: R,
    decoder: LineDecoder,
    buffer: Vec<u8>,
    lines: usize,
    finished: bool,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R, encoding: &'static Encoding) -> Self {
        Self {
            reader,
            decoder: LineDecoder::new(encoding),
            buffer: Vec::new(),
            lines: 0,
            finished: false,
        }
    }

    /// Reads the next physical line, `Ok(None)` at end of input.
    pub fn next_line(&mut self) -> Result<Option<String>, CsvError> {
        if self.finished {
            return Ok(None);
        }
        self.buffer.clear();
        let line = self.lines;
        let read = self.reader.read_until(b'\n', &mut self.buffer);

        match read {
            Ok(0) => {
                self.finished = true;
                Ok(None)
            }
            Ok(_) => {
                self.lines += 1;
                self.decoder.decode(&self.buffer, line).map(Some)
            }
            Err(source) => {
                self.finished = true;
                Err(CsvError::Io { line, source })
            }
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> Iterator for LineSource<R> {
    type Item = Result<String, CsvError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

/// Blocking sink of lines.
pub struct LineSink<W> {
    writer: W,
    encoding: &'static Encoding,
    new_line: String,
}

impl<W: Write> LineSink<W> {
    pub fn new(writer: W, encoding: &'static Encoding, new_line: impl Into<String>) -> Self {
        Self {
            writer,
            encoding,
            new_line: new_line.into(),
        }
    }

    /// Writes `line` followed by the line terminator; `index` is only used
    /// to report failures.
    pub fn write_line(&mut self, line: &str, index: usize) -> Result<(), CsvError> {
        let bytes = encode_line(self.encoding, line, &self.new_line, index)?;
        self.writer
            .write_all(&bytes)
            .map_err(|source| CsvError::Io { line: index, source })
    }

    pub fn flush(&mut self, index: usize) -> Result<(), CsvError> {
        self.writer
            .flush()
            .map_err(|source| CsvError::Io { line: index, source })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Asynchronous source of physical lines; suspends only while reading.
#[cfg(feature = "async")]
pub struct AsyncLineSource<R> {
    reader: R,
    decoder: LineDecoder,
    buffer: Vec<u8>,
    lines: usize,
    finished: bool,
}

#[cfg(feature = "async")]
impl<R: AsyncBufRead + Unpin> AsyncLineSource<R> {
    pub fn new(reader: R, encoding: &'static Encoding) -> Self {
        Self {
            reader,
            decoder: LineDecoder::new(encoding),
            buffer: Vec::new(),
            lines: 0,
            finished: false,
        }
    }

    pub async fn next_line(&mut self) -> Result<Option<String>, CsvError> {
        if self.finished {
            return Ok(None);
        }
        self.buffer.clear();
        let line = self.lines;
        let read = self.reader.read_until(b'\n', &mut self.buffer).await;

        match read {
            Ok(0) => {
                self.finished = true;
                Ok(None)
            }
            Ok(_) => {
                self.lines += 1;
                self.decoder.decode(&self.buffer, line).map(Some)
            }
            Err(source) => {
                self.finished = true;
                Err(CsvError::Io { line, source })
            }
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Asynchronous sink of lines.
#[cfg(feature = "async")]
pub struct AsyncLineSink<W> {
    writer: W,
    encoding: &'static Encoding,
    new_line: String,
}

#[cfg(feature = "async")]
impl<W: AsyncWrite + Unpin> AsyncLineSink<W> {
    pub fn new(writer: W, encoding: &'static Encoding, new_line: impl Into<String>) -> Self {
        Self {
            writer,
            encoding,
            new_line: new_line.into(),
        }
    }

    pub async fn write_line(&mut self, line: &str, index: usize) -> Result<(), CsvError> {
        let bytes = encode_line(self.encoding, line, &self.new_line, index)?;
        self.writer
            .write_all(&bytes)
            .await
            .map_err(|source| CsvError::Io { line: index, source })
    }

    pub async fn flush(&mut self, index: usize) -> Result<(), CsvError> {
        self.writer
            .flush()
            .await
            .map_err(|source| CsvError::Io { line: index, source })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
