#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # tinyline-csv

 A typed, line-oriented codec for CSV and other delimited-text dialects.

 Records are plain Rust structs. A **column schema** maps each struct field
 to a column position and a **converter**; a **codec** combines the schema
 with dialect options (delimiter, quote, comment marker, header, trimming,
 escaping, text encoding) and hands out readers and writers.

 ## Core Concepts

- **CsvOptions:** the dialect and the read policies. Plain data, loadable from JSON.
- **ColumnSchema:** ordered column definitions. Each one holds a name, a position, a getter, a setter, an optional format string and a converter.
- **Converter:** turns the text of a field into a value and back. Defaults exist for strings, integers, floats, decimals, booleans, dates and times, durations, UUIDs, URLs, byte arrays and `Option` of any of those.
- **CsvCodec:** a validated, immutable configuration. It creates readers and writers and offers one-shot `load_*` and `save*` helpers.
- **ItemReader / ItemWriter:** the record-at-a-time reading and chunk-at-a-time writing abstractions implemented by the blocking readers and writers.
- **Handlers:** optional callbacks observing the start, every line, the header and the completion of a read or a write.

 ## Features

| **Feature** | **Description**                                                              |
|-------------|------------------------------------------------------------------------------|
| async       | Enables tokio-based readers and writers with cancellation (enabled by default) |

 ## Getting Started

```rust
# use tinyline_csv::{
#     core::{item::ItemReader, schema::ColumnDef},
#     error::CsvError,
#     item::csv::codec::CsvCodecBuilder,
# };
#[derive(Debug, Default, Clone)]
struct Car {
    year: u16,
    make: String,
    model: String,
    price: Option<f64>,
}

fn main() -> Result<(), CsvError> {
    let csv = "year,make,price,model
   1948,Porsche,,356
   2021,Mazda,24500.5,\"CX-30, SUV\"";

    let codec = CsvCodecBuilder::new()
        .delimiter(',')
        .has_header(true)
        .trim_data(true)
        .column(ColumnDef::new("year", |c: &Car| &c.year, |c, v| c.year = v))
        .column(ColumnDef::new("make", |c: &Car| &c.make, |c, v| c.make = v))
        .column(ColumnDef::new("price", |c: &Car| &c.price, |c, v| c.price = v))
        .column(ColumnDef::new("model", |c: &Car| &c.model, |c, v| c.model = v))
        .build()?;

    let reader = codec.reader_from_bytes(csv.as_bytes());
    let mut cars = Vec::new();
    while let Some(car) = reader.read()? {
        cars.push(car);
    }
    assert_eq!(cars.len(), 2);
    assert_eq!(cars[1].model, "CX-30, SUV");
    assert_eq!(cars[0].price, None);

    let lines = codec.get_all_lines(&cars)?;
    assert_eq!(lines[0], "year,make,price,model");
    assert_eq!(lines[2], "2021,Mazda,24500.5,\"CX-30, SUV\"");

    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Value converters
pub mod convert;

/// Core module: options, schema, tokenizer and the read/write engines
pub mod core;

/// Error types
pub mod error;

#[doc(inline)]
pub use error::*;

/// Item readers / writers over byte streams
pub mod item;
