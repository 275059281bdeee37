//! Optional observers of reads and writes.
//!
//! Every callback is optional and unset callbacks cost one branch. Callbacks
//! only observe: they never change what is decoded or written.

type LineCallback = Box<dyn Fn(usize, &str) + Send + Sync>;
type CountCallback = Box<dyn Fn(usize) + Send + Sync>;
type StartCallback = Box<dyn Fn() + Send + Sync>;
type RecordCallback<T> = Box<dyn Fn(usize, &T) + Send + Sync>;
type RecordLineCallback<T> = Box<dyn Fn(usize, &T, &str) + Send + Sync>;

/// Callbacks fired by readers.
///
/// Indices are the 0-based physical ordinal of the line.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
/// use tinyline_csv::core::handlers::ReadHandlers;
///
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = seen.clone();
/// let handlers = ReadHandlers::<String>::new()
///     .on_row_header(move |_, _| { counter.fetch_add(1, Ordering::SeqCst); });
/// handlers.row_header(0, "name;age");
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
pub struct ReadHandlers<T> {
    start: Option<StartCallback>,
    row_reading: Option<LineCallback>,
    row_header: Option<LineCallback>,
    row_read: Option<RecordLineCallback<T>>,
    completed: Option<CountCallback>,
}

impl<T> Default for ReadHandlers<T> {
    fn default() -> Self {
        Self {
            start: None,
            row_reading: None,
            row_header: None,
            row_read: None,
            completed: None,
        }
    }
}

impl<T> ReadHandlers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once, before the first line is pulled.
    pub fn on_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    /// Called for the header and every data line that passed the row filter.
    pub fn on_row_reading(mut self, f: impl Fn(usize, &str) + Send + Sync + 'static) -> Self {
        self.row_reading = Some(Box::new(f));
        self
    }

    pub fn on_row_header(mut self, f: impl Fn(usize, &str) + Send + Sync + 'static) -> Self {
        self.row_header = Some(Box::new(f));
        self
    }

    /// Called with each decoded record, before it is handed to the caller.
    pub fn on_row_read(mut self, f: impl Fn(usize, &T, &str) + Send + Sync + 'static) -> Self {
        self.row_read = Some(Box::new(f));
        self
    }

    /// Called once the source is exhausted, with the number of records read.
    pub fn on_completed(mut self, f: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.completed = Some(Box::new(f));
        self
    }

    pub fn start(&self) {
        if let Some(f) = &self.start {
            f();
        }
    }

    pub fn row_reading(&self, index: usize, line: &str) {
        if let Some(f) = &self.row_reading {
            f(index, line);
        }
    }

    pub fn row_header(&self, index: usize, line: &str) {
        if let Some(f) = &self.row_header {
            f(index, line);
        }
    }

    pub fn row_read(&self, index: usize, record: &T, line: &str) {
        if let Some(f) = &self.row_read {
            f(index, record, line);
        }
    }

    pub fn completed(&self, count: usize) {
        if let Some(f) = &self.completed {
            f(count);
        }
    }
}

/// Callbacks fired by writers.
///
/// Indices count emitted lines from 0; the header, when written, is line 0.
pub struct WriteHandlers<T> {
    start: Option<StartCallback>,
    row_header: Option<LineCallback>,
    row_writing: Option<RecordCallback<T>>,
    row_written: Option<RecordLineCallback<T>>,
    completed: Option<CountCallback>,
}

impl<T> Default for WriteHandlers<T> {
    fn default() -> Self {
        Self {
            start: None,
            row_header: None,
            row_writing: None,
            row_written: None,
            completed: None,
        }
    }
}

impl<T> WriteHandlers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    pub fn on_row_header(mut self, f: impl Fn(usize, &str) + Send + Sync + 'static) -> Self {
        self.row_header = Some(Box::new(f));
        self
    }

    pub fn on_row_writing(mut self, f: impl Fn(usize, &T) + Send + Sync + 'static) -> Self {
        self.row_writing = Some(Box::new(f));
        self
    }

    pub fn on_row_written(mut self, f: impl Fn(usize, &T, &str) + Send + Sync + 'static) -> Self {
        self.row_written = Some(Box::new(f));
        self
    }

    /// Called after the final flush, with the number of records written.
    pub fn on_completed(mut self, f: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.completed = Some(Box::new(f));
        self
    }

    pub fn start(&self) {
        if let Some(f) = &self.start {
            f();
        }
    }

    pub fn row_header(&self, index: usize, header: &str) {
        if let Some(f) = &self.row_header {
            f(index, header);
        }
    }

    pub fn row_writing(&self, index: usize, record: &T) {
        if let Some(f) = &self.row_writing {
            f(index, record);
        }
    }

    pub fn row_written(&self, index: usize, record: &T, line: &str) {
        if let Some(f) = &self.row_written {
            f(index, record, line);
        }
    }

    pub fn completed(&self, count: usize) {
        if let Some(f) = &self.completed {
            f(count);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn unset_handlers_should_be_noops() {
        let read = ReadHandlers::<u32>::new();
        read.start();
        read.row_reading(0, "x");
        read.row_read(0, &1, "x");
        read.completed(1);

        let write = WriteHandlers::<u32>::new();
        write.row_writing(0, &1);
        write.completed(1);
    }

    #[test]
    fn write_handlers_should_receive_arguments() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let handlers = WriteHandlers::<u32>::new()
            .on_row_written(move |index, record, line| {
                sink.lock().unwrap().push(format!("{index}:{record}:{line}"));
            });

        handlers.row_written(1, &42, "42;x");
        handlers.row_writing(1, &42);
        assert_eq!(*log.lock().unwrap(), vec!["1:42:42;x".to_string()]);
    }
}
