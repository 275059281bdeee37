#![allow(dead_code)]

mod mocks;

pub use mocks::MockSink;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tinyline_csv::{core::schema::ColumnDef, error::CsvError, item::csv::codec::{CsvCodec, CsvCodecBuilder}};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Car {
    pub year: u16,
    pub make: String,
    pub model: String,
    pub price: Decimal,
    pub registered: Option<NaiveDate>,
    pub electric: bool,
}

pub const CARS: &str = "year,make,model,price,registered,electric
1948,Porsche,356,65000.00,1949-03-01,false
2011,Peugeot,206+,7500.50,,false
2012,Citroën,\"C4 Picasso, 7 seats\",9900.00,2012-06-30,false
2021,Mazda,MX-30,24500.00,2021-01-15,true
";

pub fn car_builder() -> CsvCodecBuilder<Car> {
    CsvCodecBuilder::new()
        .delimiter(',')
        .has_header(true)
        .column(ColumnDef::new("year", |c: &Car| &c.year, |c, v| c.year = v))
        .column(ColumnDef::new("make", |c: &Car| &c.make, |c, v| c.make = v))
        .column(ColumnDef::new("model", |c: &Car| &c.model, |c, v| c.model = v))
        .column(ColumnDef::new("price", |c: &Car| &c.price, |c, v| c.price = v))
        .column(ColumnDef::new("registered", |c: &Car| &c.registered, |c, v| c.registered = v))
        .column(ColumnDef::new("electric", |c: &Car| &c.electric, |c, v| c.electric = v))
}

pub fn car_codec() -> Result<CsvCodec<Car>, CsvError> {
    car_builder().build()
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
