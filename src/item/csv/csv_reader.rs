use std::{cell::RefCell, io::BufRead, sync::Arc};

use encoding_rs::Encoding;

use crate::{
    core::{
        engine::{CsvContext, ReadEngine},
        item::{ItemReader, ItemReaderResult},
    },
    item::csv::source::LineSource,
};

/// A blocking reader that decodes one typed record per data line.
///
/// The reader is single pass: once it returned `Ok(None)` or an error, every
/// later call returns `Ok(None)`. It is created by a
/// [`CsvCodec`](crate::item::csv::codec::CsvCodec).
///
/// # Implementation Details
///
/// - Uses `RefCell`s so that [`ItemReader::read`] can take `&self`
/// - Pulls physical lines from a [`LineSource`] and feeds them into the shared
///   read engine, which applies leading-row skipping, the header, the row
///   filter, tokenizing and decoding
/// - Also implements [`Iterator`], yielding `Result<T, CsvError>`
///
/// # Examples
///
/// ```
/// use tinyline_csv::core::item::ItemReader;
/// use tinyline_csv::core::schema::ColumnDef;
/// use tinyline_csv::item::csv::codec::CsvCodecBuilder;
///
/// #[derive(Debug, Default)]
/// struct Record {
///     name: String,
///     value: i32,
/// }
///
/// let data = "\
/// name;value
/// foo;123
/// bar;456
/// ";
///
/// let codec = CsvCodecBuilder::new()
///     .has_header(true)
///     .column(ColumnDef::new("name", |r: &Record| &r.name, |r, v| r.name = v))
///     .column(ColumnDef::new("value", |r: &Record| &r.value, |r, v| r.value = v))
///     .build()
///     .unwrap();
///
/// let reader = codec.reader_from_bytes(data.as_bytes());
///
/// let record = reader.read().unwrap().unwrap();
/// assert_eq!(record.name, "foo");
/// assert_eq!(record.value, 123);
///
/// let record = reader.read().unwrap().unwrap();
/// assert_eq!(record.name, "bar");
///
/// assert!(reader.read().unwrap().is_none());
/// ```
pub struct CsvItemReader<T, R> {
    engine: RefCell<ReadEngine<T>>,
    source: RefCell<LineSource<R>>,
}

impl<T: Default, R: BufRead> CsvItemReader<T, R> {
    pub(crate) fn new(context: Arc<CsvContext<T>>, reader: R, encoding: &'static Encoding) -> Self {
        Self {
            engine: RefCell::new(ReadEngine::new(context)),
            source: RefCell::new(LineSource::new(reader, encoding)),
        }
    }

    /// Number of records read so far.
    pub fn records(&self) -> usize {
        self.engine.borrow().records()
    }
}

impl<T: Default, R: BufRead> ItemReader<T> for CsvItemReader<T, R> {
    /// Reads the next record.
    ///
    /// # Returns
    /// - `Ok(Some(record))` for the next data line
    /// - `Ok(None)` once the source is exhausted, or after an error
    /// - `Err(CsvError)` naming the failing line
    fn read(&self) -> ItemReaderResult<T> {
        let mut engine = self.engine.borrow_mut();
        if engine.is_done() {
            return Ok(None);
        }
        engine.start();

        let mut source = self.source.borrow_mut();
        loop {
            match source.next_line() {
                Ok(Some(line)) => {
                    if let Some(record) = engine.on_line(&line)? {
                        return Ok(Some(record));
                    }
                }
                Ok(None) => {
                    engine.on_end();
                    return Ok(None);
                }
                Err(err) => return Err(engine.fail(err)),
            }
        }
    }
}

impl<T: Default, R: BufRead> Iterator for CsvItemReader<T, R> {
    type Item = Result<T, crate::error::CsvError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}
