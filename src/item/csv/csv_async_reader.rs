use std::sync::Arc;

use encoding_rs::Encoding;
use futures::{Stream, stream};
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        engine::{CsvContext, ReadEngine},
        item::ItemReaderResult,
    },
    error::CsvError,
    item::csv::source::AsyncLineSource,
};

/// Asynchronous, cancellable twin of
/// [`CsvItemReader`](crate::item::csv::csv_reader::CsvItemReader).
///
/// Row semantics are those of the blocking reader: both feed the same read
/// engine. The only suspension point is the read of the next physical line,
/// and the cancellation token is checked right before each such read, so a
/// cancelled read never yields a partially decoded record.
///
/// # Examples
///
/// ```
/// use futures::TryStreamExt;
/// use tinyline_csv::core::schema::ColumnDef;
/// use tinyline_csv::item::csv::codec::CsvCodecBuilder;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Debug, Default)]
/// struct Row {
///     id: u32,
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let codec = CsvCodecBuilder::new()
///     .column(ColumnDef::new("id", |r: &Row| &r.id, |r, v| r.id = v))
///     .build()
///     .unwrap();
///
/// let reader = codec.async_reader_from_reader("1\n2\n3\n".as_bytes(), CancellationToken::new());
/// let rows: Vec<Row> = reader.into_stream().try_collect().await.unwrap();
/// assert_eq!(rows.len(), 3);
/// # }
/// ```
pub struct CsvAsyncItemReader<T, R> {
    engine: ReadEngine<T>,
    source: AsyncLineSource<R>,
    cancel: CancellationToken,
}

impl<T: Default, R: AsyncBufRead + Unpin> CsvAsyncItemReader<T, R> {
    pub(crate) fn new(
        context: Arc<CsvContext<T>>,
        reader: R,
        encoding: &'static Encoding,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine: ReadEngine::new(context),
            source: AsyncLineSource::new(reader, encoding),
            cancel,
        }
    }

    /// Number of records read so far.
    pub fn records(&self) -> usize {
        self.engine.records()
    }

    /// Reads the next record.
    ///
    /// # Returns
    /// - `Ok(Some(record))` for the next data line
    /// - `Ok(None)` once the source is exhausted, or after an error
    /// - `Err(CsvError::Cancelled)` if the token was cancelled before the
    ///   next line could be read
    pub async fn read(&mut self) -> ItemReaderResult<T> {
        if self.engine.is_done() {
            return Ok(None);
        }
        self.engine.start();

        loop {
            if self.cancel.is_cancelled() {
                let line = self.engine.next_ordinal();
                return Err(self.engine.fail(CsvError::Cancelled { line }));
            }

            match self.source.next_line().await {
                Ok(Some(line)) => {
                    if let Some(record) = self.engine.on_line(&line)? {
                        return Ok(Some(record));
                    }
                }
                Ok(None) => {
                    self.engine.on_end();
                    return Ok(None);
                }
                Err(err) => return Err(self.engine.fail(err)),
            }
        }
    }

    /// Turns the reader into a stream of records that ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, CsvError>> {
        stream::try_unfold(self, |mut reader| async move {
            let record = reader.read().await?;
            Ok::<_, CsvError>(record.map(|record| (record, reader)))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use futures::{StreamExt, TryStreamExt};
    use tokio_util::sync::CancellationToken;

    use crate::{
        core::schema::ColumnDef,
        error::CsvError,
        item::csv::codec::{CsvCodec, CsvCodecBuilder},
    };

    #[derive(Debug, Default, PartialEq)]
    struct Reading {
        sensor: String,
        celsius: f64,
    }

    fn codec() -> Result<CsvCodec<Reading>, CsvError> {
        CsvCodecBuilder::new()
            .has_header(true)
            .column(ColumnDef::new("sensor", |r: &Reading| &r.sensor, |r, v| r.sensor = v))
            .column(ColumnDef::new("celsius", |r: &Reading| &r.celsius, |r, v| r.celsius = v))
            .build()
    }

    const DATA: &str = "sensor;celsius\nA;21.5\n# recalibrated\nB;19\nC;22.25\n";

    #[tokio::test]
    async fn stream_should_yield_every_record() -> Result<(), Box<dyn Error>> {
        let reader = codec()?.async_reader_from_reader(DATA.as_bytes(), CancellationToken::new());
        let readings: Vec<Reading> = reader.into_stream().try_collect().await?;

        assert_eq!(readings.len(), 3);
        assert_eq!(readings[1].sensor, "B");
        assert_eq!(readings[2].celsius, 22.25);
        Ok(())
    }

    #[tokio::test]
    async fn cancellation_should_stop_between_records() -> Result<(), Box<dyn Error>> {
        let token = CancellationToken::new();
        let mut reader = codec()?.async_reader_from_reader(DATA.as_bytes(), token.clone());

        assert!(reader.read().await?.is_some());
        token.cancel();

        let err = reader.read().await.unwrap_err();
        assert!(matches!(err, CsvError::Cancelled { line: 2 }));
        assert!(reader.read().await?.is_none());
        assert_eq!(reader.records(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn stream_should_end_after_error() -> Result<(), Box<dyn Error>> {
        let data = "sensor;celsius\nA;hot\nB;19\n";
        let reader = codec()?.async_reader_from_reader(data.as_bytes(), CancellationToken::new());
        let results: Vec<Result<Reading, CsvError>> = reader.into_stream().collect().await;

        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0], Err(CsvError::Conversion { line: 1, column, .. }) if column == "celsius"));
        Ok(())
    }
}
