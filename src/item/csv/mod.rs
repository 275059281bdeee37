//! Typed delimited-text readers and writers.
//!
//! # Module Architecture
//!
//! 1. **CsvCodec**: the entry point. It is built once by a `CsvCodecBuilder`
//!    from dialect options, a column schema, an optional row filter and
//!    optional event handlers, and then creates any number of readers and
//!    writers. It also offers one-shot helpers (`load_from_*`, `save*`,
//!    `get_all_lines`, `get_all_text`).
//!
//! 2. **CsvItemReader**: a blocking reader turning each data line into a
//!    record. It implements both `ItemReader` and `Iterator`.
//!
//! 3. **CsvItemWriter**: a blocking writer turning each record into a line,
//!    header first when configured.
//!
//! 4. **CsvAsyncItemReader** / **CsvAsyncItemWriter**: the same semantics on
//!    top of tokio I/O, with a `CancellationToken` checked between lines.
//!    Available with the `async` feature (enabled by default).
//!
//! 5. **LineSource** / **LineSink**: physical lines over bytes in the
//!    configured text encoding.
//!
//! # Ownership and Borrowing Considerations
//!
//! Readers and writers own their source or sink. To get a buffer back after
//! writing, call `into_inner`, which also flushes and fires the completion
//! handler.
//!
//! # Examples
//!
//! ## Reading
//!
//! ```
//! use tinyline_csv::core::item::ItemReader;
//! use tinyline_csv::core::schema::ColumnDef;
//! use tinyline_csv::item::csv::codec::CsvCodecBuilder;
//!
//! #[derive(Debug, Default)]
//! struct City {
//!     city: String,
//!     country: String,
//!     pop: u32,
//! }
//!
//! let csv_data = "\
//! city,country,pop
//! ## sources: 2020 census
//! Boston,United States,4628910
//! Concord,United States,42695
//! ";
//!
//! let codec = CsvCodecBuilder::new()
//!     .delimiter(',')
//!     .has_header(true)
//!     .column(ColumnDef::new("city", |c: &City| &c.city, |c, v| c.city = v))
//!     .column(ColumnDef::new("country", |c: &City| &c.country, |c, v| c.country = v))
//!     .column(ColumnDef::new("pop", |c: &City| &c.pop, |c, v| c.pop = v))
//!     .build()
//!     .unwrap();
//!
//! let reader = codec.reader_from_bytes(csv_data.as_bytes());
//! let mut cities: Vec<City> = Vec::new();
//! while let Some(city) = reader.read().unwrap() {
//!     cities.push(city);
//! }
//!
//! assert_eq!(cities.len(), 2);
//! assert_eq!(cities[0].city, "Boston");
//! assert_eq!(cities[1].pop, 42695);
//! ```
//!
//! ## Writing
//!
//! ```
//! use tinyline_csv::core::item::ItemWriter;
//! use tinyline_csv::core::schema::ColumnDef;
//! use tinyline_csv::item::csv::codec::CsvCodecBuilder;
//!
//! struct Person {
//!     name: String,
//!     age: u8,
//!     occupation: Option<String>,
//! }
//!
//! let codec = CsvCodecBuilder::new()
//!     .delimiter(',')
//!     .has_header(true)
//!     .column(ColumnDef::new("name", |p: &Person| &p.name, |p, v| p.name = v))
//!     .column(ColumnDef::new("age", |p: &Person| &p.age, |p, v| p.age = v))
//!     .column(ColumnDef::new("occupation", |p: &Person| &p.occupation, |p, v| p.occupation = v))
//!     .build()
//!     .unwrap();
//!
//! let people = vec![
//!     Person { name: "Alice".to_string(), age: 28, occupation: Some("Engineer".to_string()) },
//!     Person { name: "Bob, Jr.".to_string(), age: 35, occupation: Some("Designer".to_string()) },
//! ];
//!
//! let writer = codec.writer_to_writer(Vec::new());
//! writer.write(&people).unwrap();
//! let csv_output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
//!
//! assert_eq!(csv_output, "name,age,occupation\nAlice,28,Engineer\n\"Bob, Jr.\",35,Designer\n");
//! ```

/// Physical line sources and sinks.
pub mod source;

/// The codec facade and its builder.
pub mod codec;

/// A module providing facilities for reading records.
pub mod csv_reader;

/// A module providing facilities for writing records.
pub mod csv_writer;

#[cfg(feature = "async")]
/// Asynchronous, cancellable reading.
pub mod csv_async_reader;
