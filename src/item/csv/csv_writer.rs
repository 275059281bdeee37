use std::{cell::RefCell, io::Write, sync::Arc};

use encoding_rs::Encoding;
use log::error;
#[cfg(feature = "async")]
use tokio::io::AsyncWrite;
#[cfg(feature = "async")]
use tokio_util::sync::CancellationToken;

#[cfg(feature = "async")]
use crate::item::csv::source::AsyncLineSink;
use crate::{
    core::{
        engine::{CsvContext, WriteEngine},
        item::{ItemWriter, ItemWriterResult},
    },
    error::CsvError,
    item::csv::source::LineSink,
};

/// A blocking writer that emits one line per record.
///
/// The header, when configured, is written by [`ItemWriter::open`] or by the
/// first [`ItemWriter::write`], whichever comes first.
///
/// ```
/// # use std::error::Error;
/// # use tinyline_csv::{core::{item::ItemWriter, schema::ColumnDef}, item::csv::codec::CsvCodecBuilder};
/// struct Row {
///     city: String,
///     population: u64,
/// }
///
/// # fn main() { example().unwrap(); }
/// fn example() -> Result<(), Box<dyn Error>> {
///     let codec = CsvCodecBuilder::new()
///         .has_header(true)
///         .column(ColumnDef::new("city", |r: &Row| &r.city, |r, v| r.city = v))
///         .column(ColumnDef::new("population", |r: &Row| &r.population, |r, v| r.population = v))
///         .build()?;
///
///     let wtr = codec.writer_to_writer(vec![]);
///     wtr.write(&[
///         Row { city: "Boston".to_string(), population: 4628910 },
///         Row { city: "Concord".to_string(), population: 42695 },
///     ])?;
///
///     let data = String::from_utf8(wtr.into_inner()?)?;
///     assert_eq!(data, "\
/// city;population
/// Boston;4628910
/// Concord;42695
/// ");
///     Ok(())
/// }
/// ```
pub struct CsvItemWriter<T, W: Write> {
    engine: RefCell<WriteEngine<T>>,
    sink: RefCell<LineSink<W>>,
}

impl<T, W: Write> CsvItemWriter<T, W> {
    pub(crate) fn new(context: Arc<CsvContext<T>>, writer: W, encoding: &'static Encoding) -> Self {
        let new_line = context.options.new_line.clone();
        Self {
            engine: RefCell::new(WriteEngine::new(context)),
            sink: RefCell::new(LineSink::new(writer, encoding, new_line)),
        }
    }

    /// Number of records written so far.
    pub fn records(&self) -> usize {
        self.engine.borrow().records()
    }

    fn begin(&self) -> ItemWriterResult {
        let header = self.engine.borrow_mut().begin();
        match header {
            Some(header) => self.sink.borrow_mut().write_line(&header, 0).inspect_err(log_failure),
            None => Ok(()),
        }
    }

    /// Flushes, fires the completion notification and returns the destination.
    pub fn into_inner(self) -> Result<W, CsvError> {
        self.close()?;
        Ok(self.sink.into_inner().into_inner())
    }
}

fn log_failure(err: &CsvError) {
    error!("Write stopped: {}", err);
}

impl<T, W: Write> ItemWriter<T> for CsvItemWriter<T, W> {
    fn write(&self, items: &[T]) -> ItemWriterResult {
        self.begin()?;
        let mut engine = self.engine.borrow_mut();
        let mut sink = self.sink.borrow_mut();
        for item in items {
            let index = engine.next_index();
            let line = engine.encode(item)?;
            sink.write_line(&line, index).inspect_err(log_failure)?;
        }
        Ok(())
    }

    /// Flush the contents of the internal buffer to the underlying writer.
    fn flush(&self) -> ItemWriterResult {
        let index = self.engine.borrow().next_index();
        self.sink.borrow_mut().flush(index).inspect_err(log_failure)
    }

    fn open(&self) -> ItemWriterResult {
        self.begin()
    }

    /// Writes the header if nothing was written yet, flushes, and fires the
    /// completion notification.
    fn close(&self) -> ItemWriterResult {
        self.begin()?;
        self.flush()?;
        self.engine.borrow_mut().finish();
        Ok(())
    }
}

/// Asynchronous writer, checking its cancellation token before every line.
#[cfg(feature = "async")]
pub struct CsvAsyncItemWriter<T, W> {
    engine: WriteEngine<T>,
    sink: AsyncLineSink<W>,
    cancel: CancellationToken,
}

#[cfg(feature = "async")]
impl<T, W: AsyncWrite + Unpin> CsvAsyncItemWriter<T, W> {
    pub(crate) fn new(
        context: Arc<CsvContext<T>>,
        writer: W,
        encoding: &'static Encoding,
        cancel: CancellationToken,
    ) -> Self {
        let new_line = context.options.new_line.clone();
        Self {
            engine: WriteEngine::new(context),
            sink: AsyncLineSink::new(writer, encoding, new_line),
            cancel,
        }
    }

    pub fn records(&self) -> usize {
        self.engine.records()
    }

    fn check_cancelled(&self) -> Result<(), CsvError> {
        if self.cancel.is_cancelled() {
            let err = CsvError::Cancelled {
                line: self.engine.next_index(),
            };
            log_failure(&err);
            return Err(err);
        }
        Ok(())
    }

    async fn begin(&mut self) -> ItemWriterResult {
        if self.engine.is_started() {
            return Ok(());
        }
        self.check_cancelled()?;
        if let Some(header) = self.engine.begin() {
            self.sink.write_line(&header, 0).await.inspect_err(log_failure)?;
        }
        Ok(())
    }

    /// Writes the header, if configured and not written yet.
    pub async fn open(&mut self) -> ItemWriterResult {
        self.begin().await
    }

    pub async fn write(&mut self, items: &[T]) -> ItemWriterResult {
        self.begin().await?;
        for item in items {
            self.check_cancelled()?;
            let index = self.engine.next_index();
            let line = self.engine.encode(item)?;
            self.sink.write_line(&line, index).await.inspect_err(log_failure)?;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> ItemWriterResult {
        let index = self.engine.next_index();
        self.sink.flush(index).await.inspect_err(log_failure)
    }

    /// Flushes and fires the completion notification.
    pub async fn close(&mut self) -> ItemWriterResult {
        self.begin().await?;
        self.flush().await?;
        self.engine.finish();
        Ok(())
    }

    pub async fn into_inner(mut self) -> Result<W, CsvError> {
        self.close().await?;
        Ok(self.sink.into_inner())
    }
}
