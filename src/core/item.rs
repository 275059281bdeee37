use crate::error::CsvError;

/// Result of a single read: `Ok(None)` once the source is exhausted.
pub type ItemReaderResult<T> = Result<Option<T>, CsvError>;

/// Result of a write or flush.
pub type ItemWriterResult = Result<(), CsvError>;

/// Pull-based source of typed records, one at a time.
pub trait ItemReader<T> {
    fn read(&self) -> ItemReaderResult<T>;
}

/// Sink of typed records.
///
/// `open` is called once before the first write (it emits the header line
/// when one is configured) and `close` once after the last one.
pub trait ItemWriter<T> {
    fn write(&self, items: &[T]) -> ItemWriterResult;
    fn flush(&self) -> ItemWriterResult;
    fn open(&self) -> ItemWriterResult {
        Ok(())
    }
    fn close(&self) -> ItemWriterResult {
        self.flush()
    }
}
