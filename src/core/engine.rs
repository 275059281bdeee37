//! IO-free read and write sequencing shared by the sync and async paths.
//!
//! Readers pull physical lines from their source and push them into a
//! [`ReadEngine`]; writers ask a [`WriteEngine`] for the next line to emit.
//! Neither engine touches IO, so both execution shapes apply exactly the same
//! row semantics.

use std::sync::Arc;

use log::{debug, error, trace};

use crate::{
    core::{
        filter::{SkipRowPredicate, should_skip},
        handlers::{ReadHandlers, WriteHandlers},
        mapper,
        options::CsvOptions,
        schema::ColumnSchema,
        tokenizer::tokenize,
    },
    error::CsvError,
};

/// Everything a codec was configured with. Immutable once built.
pub struct CsvContext<T> {
    pub options: CsvOptions,
    pub schema: ColumnSchema<T>,
    pub skip_row: Option<SkipRowPredicate>,
    pub read_handlers: ReadHandlers<T>,
    pub write_handlers: WriteHandlers<T>,
}

impl<T> CsvContext<T> {
    pub fn new(options: CsvOptions, schema: ColumnSchema<T>) -> Self {
        Self {
            options,
            schema,
            skip_row: None,
            read_handlers: ReadHandlers::default(),
            write_handlers: WriteHandlers::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    SkippingLeadingRows,
    ConsumingHeader,
    ConsumingRows,
    Done,
}

/// Read state machine fed one physical line at a time.
pub struct ReadEngine<T> {
    context: Arc<CsvContext<T>>,
    state: ReadState,
    ordinal: usize,
    records: usize,
    started: bool,
}

impl<T: Default> ReadEngine<T> {
    pub fn new(context: Arc<CsvContext<T>>) -> Self {
        let state = Self::initial_state(&context.options);
        Self {
            context,
            state,
            ordinal: 0,
            records: 0,
            started: false,
        }
    }

    fn initial_state(options: &CsvOptions) -> ReadState {
        if options.rows_to_skip > 0 {
            ReadState::SkippingLeadingRows
        } else {
            Self::after_leading_rows(options)
        }
    }

    fn after_leading_rows(options: &CsvOptions) -> ReadState {
        if options.has_header {
            ReadState::ConsumingHeader
        } else {
            ReadState::ConsumingRows
        }
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ReadState::Done
    }

    /// Ordinal the next pushed line will get.
    pub fn next_ordinal(&self) -> usize {
        self.ordinal
    }

    /// Number of records decoded so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Fires the start notification on the first call only.
    pub fn start(&mut self) {
        if !self.started {
            self.started = true;
            debug!("Start of read");
            self.context.read_handlers.start();
        }
    }

    /// Processes one physical line.
    ///
    /// Returns `Ok(None)` when the line produced no record (skipped, header,
    /// or the sequence already ended). An error ends the sequence.
    pub fn on_line(&mut self, line: &str) -> Result<Option<T>, CsvError> {
        if self.is_done() {
            return Ok(None);
        }
        let ordinal = self.ordinal;
        self.ordinal += 1;

        match self.process(line, ordinal) {
            Ok(record) => Ok(record),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Marks the source as exhausted and fires the completion notification.
    pub fn on_end(&mut self) {
        if self.is_done() {
            return;
        }
        self.state = ReadState::Done;
        debug!(
            "End of read: {} line(s), {} record(s)",
            self.ordinal, self.records
        );
        self.context.read_handlers.completed(self.records);
    }

    /// Ends the sequence because of `err` and hands the error back.
    pub fn fail(&mut self, err: CsvError) -> CsvError {
        if !self.is_done() {
            error!("Read stopped: {}", err);
            self.state = ReadState::Done;
        }
        err
    }

    fn process(&mut self, line: &str, ordinal: usize) -> Result<Option<T>, CsvError> {
        let context = Arc::clone(&self.context);
        let options = &context.options;

        if self.state == ReadState::SkippingLeadingRows && ordinal >= options.rows_to_skip {
            self.state = Self::after_leading_rows(options);
        }

        if let Some(reason) = should_skip(line, ordinal, options, context.skip_row.as_ref())? {
            trace!("Skipping line {} ({:?})", ordinal, reason);
            return Ok(None);
        }

        let handlers = &context.read_handlers;
        match self.state {
            ReadState::ConsumingHeader => {
                trace!("Header at line {}: {}", ordinal, line);
                handlers.row_reading(ordinal, line);
                handlers.row_header(ordinal, line);
                self.state = ReadState::ConsumingRows;
                Ok(None)
            }
            ReadState::ConsumingRows => {
                handlers.row_reading(ordinal, line);
                let fields =
                    tokenize(line, options).map_err(|err| CsvError::from_tokenize(ordinal, err))?;

                let expected = context.schema.len();
                if options.validate_column_count && fields.data_len() != expected {
                    return Err(CsvError::InvalidColumnCount {
                        line: ordinal,
                        expected,
                        found: fields.data_len(),
                    });
                }

                let record = mapper::decode(&fields, &context.schema, ordinal)?;
                self.records += 1;
                handlers.row_read(ordinal, &record, line);
                Ok(Some(record))
            }
            ReadState::SkippingLeadingRows | ReadState::Done => Ok(None),
        }
    }
}

/// Write sequencer: header first, then one line per record.
pub struct WriteEngine<T> {
    context: Arc<CsvContext<T>>,
    index: usize,
    records: usize,
    started: bool,
    finished: bool,
}

impl<T> WriteEngine<T> {
    pub fn new(context: Arc<CsvContext<T>>) -> Self {
        Self {
            context,
            index: 0,
            records: 0,
            started: false,
            finished: false,
        }
    }

    pub fn options(&self) -> &CsvOptions {
        &self.context.options
    }

    /// Index of the next emitted line; the header is line 0.
    pub fn next_index(&self) -> usize {
        self.index
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Starts the write and returns the header line, if one is configured.
    ///
    /// Only the first call does anything.
    pub fn begin(&mut self) -> Option<String> {
        if self.started {
            return None;
        }
        self.started = true;
        debug!("Start of write");
        self.context.write_handlers.start();

        if !self.context.options.has_header {
            return None;
        }
        let header = mapper::header_line(&self.context.schema, &self.context.options);
        self.context.write_handlers.row_header(self.index, &header);
        self.index += 1;
        Some(header)
    }

    /// Encodes the next record as a line.
    pub fn encode(&mut self, record: &T) -> Result<String, CsvError> {
        let index = self.index;
        let handlers = &self.context.write_handlers;

        handlers.row_writing(index, record);
        let line = mapper::encode_line(record, &self.context.schema, &self.context.options, index)
            .inspect_err(|err| error!("Write stopped: {}", err))?;
        handlers.row_written(index, record, &line);

        self.index += 1;
        self.records += 1;
        Ok(line)
    }

    /// Fires the completion notification once.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        debug!(
            "End of write: {} line(s), {} record(s)",
            self.index, self.records
        );
        self.context.write_handlers.completed(self.records);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        error::Error,
        sync::{Arc, Mutex},
    };

    use super::*;
    use crate::core::schema::ColumnDef;

    #[derive(Debug, Default, PartialEq, Clone)]
    struct City {
        name: String,
        population: u64,
    }

    fn context(options: CsvOptions) -> CsvContext<City> {
        let schema = ColumnSchema::new()
            .column(ColumnDef::new("name", |c: &City| &c.name, |c, v| c.name = v))
            .column(ColumnDef::new("population", |c: &City| &c.population, |c, v| c.population = v));
        CsvContext::new(options, schema)
    }

    fn feed(engine: &mut ReadEngine<City>, lines: &[&str]) -> Result<Vec<City>, CsvError> {
        let mut records = Vec::new();
        for line in lines {
            if let Some(record) = engine.on_line(line)? {
                records.push(record);
            }
        }
        engine.on_end();
        Ok(records)
    }

    #[test]
    fn leading_rows_and_header_should_be_consumed_once() -> Result<(), Box<dyn Error>> {
        let headers = Arc::new(Mutex::new(Vec::new()));
        let sink = headers.clone();
        let mut context = context(CsvOptions {
            rows_to_skip: 2,
            has_header: true,
            ..CsvOptions::default()
        });
        context.read_handlers = ReadHandlers::new().on_row_header(move |index, line| {
            sink.lock().unwrap().push((index, line.to_string()));
        });

        let mut engine = ReadEngine::new(Arc::new(context));
        assert_eq!(engine.state(), ReadState::SkippingLeadingRows);
        let records = feed(
            &mut engine,
            &["exported by tool", "2024-01-01", "name;population", "Boston;4628910", "Concord;42695"],
        )?;

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "Concord");
        assert_eq!(*headers.lock().unwrap(), vec![(2, "name;population".to_string())]);
        assert!(engine.is_done());
        Ok(())
    }

    #[test]
    fn header_should_skip_filtered_lines_first() -> Result<(), Box<dyn Error>> {
        let mut engine = ReadEngine::new(Arc::new(context(CsvOptions {
            has_header: true,
            ..CsvOptions::default()
        })));
        let records = feed(&mut engine, &["", "# generated", "name;population", "Paris;2100000"])?;
        assert_eq!(
            records,
            vec![City {
                name: "Paris".to_string(),
                population: 2100000
            }]
        );
        Ok(())
    }

    #[test]
    fn column_count_should_be_validated_when_enabled() {
        let mut engine = ReadEngine::new(Arc::new(context(CsvOptions {
            validate_column_count: true,
            ..CsvOptions::default()
        })));
        let result = engine.on_line("Boston;4628910;extra");
        assert!(matches!(
            result,
            Err(CsvError::InvalidColumnCount {
                line: 0,
                expected: 2,
                found: 3
            })
        ));
        assert!(engine.is_done());
    }

    #[test]
    fn trailing_cell_should_not_count_as_column() -> Result<(), Box<dyn Error>> {
        let mut engine = ReadEngine::new(Arc::new(context(CsvOptions {
            validate_column_count: true,
            end_of_line_delimiter: true,
            ..CsvOptions::default()
        })));
        let records = feed(&mut engine, &["Boston;4628910;"])?;
        assert_eq!(records[0].population, 4628910);
        Ok(())
    }

    #[test]
    fn missing_field_should_fail_without_validation() {
        let mut engine = ReadEngine::new(Arc::new(context(CsvOptions::default())));
        let result = engine.on_line("Boston");
        assert!(matches!(
            result,
            Err(CsvError::FieldCountMismatch { line: 0, index: 1, found: 1 })
        ));
    }

    #[test]
    fn failure_should_end_the_sequence() -> Result<(), Box<dyn Error>> {
        let completed = Arc::new(Mutex::new(None));
        let sink = completed.clone();
        let mut context = context(CsvOptions::default());
        context.read_handlers =
            ReadHandlers::new().on_completed(move |count| *sink.lock().unwrap() = Some(count));
        let mut engine = ReadEngine::new(Arc::new(context));

        assert!(engine.on_line("Boston;4628910")?.is_some());
        let err = engine.on_line("Concord;many").unwrap_err();
        assert_eq!(err.line(), Some(1));
        assert!(engine.on_line("Paris;2100000")?.is_none());
        engine.on_end();
        assert_eq!(*completed.lock().unwrap(), None);
        Ok(())
    }

    #[test]
    fn comment_should_be_fatal_when_disallowed() -> Result<(), Box<dyn Error>> {
        let mut engine = ReadEngine::new(Arc::new(context(CsvOptions {
            allow_comment: false,
            ..CsvOptions::default()
        })));
        assert!(engine.on_line("Boston;1")?.is_some());
        assert!(matches!(
            engine.on_line("#note"),
            Err(CsvError::CommentNotAllowed { line: 1 })
        ));
        Ok(())
    }

    #[test]
    fn predicate_should_skip_without_counting_records() -> Result<(), Box<dyn Error>> {
        let mut context = context(CsvOptions::default());
        context.skip_row = Some(Arc::new(|line: &str, _: usize| line.starts_with("Concord")));
        let mut engine = ReadEngine::new(Arc::new(context));

        let records = feed(&mut engine, &["Boston;1", "Concord;2", "Paris;3"])?;
        assert_eq!(records.len(), 2);
        assert_eq!(engine.records(), 2);
        assert_eq!(engine.next_ordinal(), 3);
        Ok(())
    }

    #[test]
    fn write_engine_should_emit_header_then_records() -> Result<(), Box<dyn Error>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (header_sink, row_sink, done_sink) = (events.clone(), events.clone(), events.clone());
        let mut context = context(CsvOptions {
            has_header: true,
            ..CsvOptions::default()
        });
        context.write_handlers = WriteHandlers::new()
            .on_row_header(move |index, header| header_sink.lock().unwrap().push(format!("h{index}:{header}")))
            .on_row_written(move |index, _, line| row_sink.lock().unwrap().push(format!("r{index}:{line}")))
            .on_completed(move |count| done_sink.lock().unwrap().push(format!("done:{count}")));

        let mut engine = WriteEngine::new(Arc::new(context));
        let header = engine.begin();
        assert_eq!(header.as_deref(), Some("name;population"));
        assert_eq!(engine.begin(), None);

        let city = City {
            name: "Saint-Denis; Réunion".to_string(),
            population: 150000,
        };
        assert_eq!(engine.encode(&city)?, "\"Saint-Denis; Réunion\";150000");
        engine.finish();
        engine.finish();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "h0:name;population".to_string(),
                "r1:\"Saint-Denis; Réunion\";150000".to_string(),
                "done:1".to_string(),
            ]
        );
        Ok(())
    }
}
