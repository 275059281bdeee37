//! Bidirectional text ⇄ value conversion.
//!
//! A [`Converter<V>`] turns the text of one field into a `V` and back. The
//! default converter of a type is found through [`CsvValue`] when the schema is
//! built, so decoding a record never dispatches on a runtime type tag.
//!
//! Converters are stateless: one instance may serve any number of columns,
//! the per-column format string and [`FormatProvider`] are passed in through
//! [`FormatContext`].

use std::{fmt::Display, marker::PhantomData, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ConversionError;

mod misc;
mod numeric;
mod temporal;

pub use misc::{
    Base64Converter, BoolConverter, CharConverter, CsvEnum, EnumConverter, LenientUrlConverter,
    UrlConverter, UuidConverter,
};
pub use numeric::{DecimalConverter, FloatConverter, IntegerConverter};
pub use temporal::{
    DateConverter, DateTimeConverter, DurationConverter, FixedOffsetConverter, TimeConverter,
    UtcConverter,
};

/// Culture-like number formatting rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatProvider {
    pub decimal_separator: char,
    pub group_separator: Option<char>,
}

impl FormatProvider {
    /// `.` as decimal separator, no grouping.
    pub const fn invariant() -> Self {
        Self {
            decimal_separator: '.',
            group_separator: None,
        }
    }

    pub const fn new(decimal_separator: char, group_separator: Option<char>) -> Self {
        Self {
            decimal_separator,
            group_separator,
        }
    }

    /// Rewrites culture-formatted number text into the invariant form Rust parses.
    pub(crate) fn to_invariant_number(&self, text: &str) -> String {
        text.trim()
            .chars()
            .filter(|c| Some(*c) != self.group_separator)
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect()
    }

    /// Rewrites invariant number text into this provider's form.
    pub(crate) fn from_invariant_number(&self, text: String) -> String {
        if self.decimal_separator == '.' {
            text
        } else {
            text.replace('.', &self.decimal_separator.to_string())
        }
    }
}

impl Default for FormatProvider {
    fn default() -> Self {
        Self::invariant()
    }
}

/// Per-column formatting inputs handed to a converter.
#[derive(Debug, Clone, Copy)]
pub struct FormatContext<'a> {
    pub format: Option<&'a str>,
    pub provider: &'a FormatProvider,
}

impl<'a> FormatContext<'a> {
    pub fn new(format: Option<&'a str>, provider: &'a FormatProvider) -> Self {
        Self { format, provider }
    }
}

/// Bidirectional conversion between field text and a typed value.
pub trait Converter<V>: Send + Sync + 'static {
    fn encode(&self, value: &V, ctx: &FormatContext<'_>) -> Result<String, ConversionError>;
    fn decode(&self, text: &str, ctx: &FormatContext<'_>) -> Result<V, ConversionError>;
}

/// Types with a registered default converter.
///
/// Implement it for your own types to make them usable with
/// [`ColumnDef::new`](crate::core::schema::ColumnDef::new); any
/// `FromStr + Display` type can instead use
/// [`ColumnDef::parsed`](crate::core::schema::ColumnDef::parsed).
pub trait CsvValue: Sized + 'static {
    type Converter: Converter<Self> + Default;
}

/// Identity converter for `String`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextConverter;

impl Converter<String> for TextConverter {
    fn encode(&self, value: &String, _ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        Ok(value.clone())
    }

    fn decode(&self, text: &str, _ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        Ok(text.to_string())
    }
}

impl CsvValue for String {
    type Converter = TextConverter;
}

/// Fallback converter deferring to the type's `FromStr` and `Display`.
pub struct DefaultConverter<V> {
    _pd: PhantomData<fn() -> V>,
}

impl<V> DefaultConverter<V> {
    pub fn new() -> Self {
        Self { _pd: PhantomData }
    }
}

impl<V> Default for DefaultConverter<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Converter<V> for DefaultConverter<V>
where
    V: FromStr + Display + 'static,
    V::Err: Display,
{
    fn encode(&self, value: &V, _ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        Ok(value.to_string())
    }

    fn decode(&self, text: &str, _ctx: &FormatContext<'_>) -> Result<V, ConversionError> {
        text.parse::<V>()
            .map_err(|error| ConversionError::new(text, std::any::type_name::<V>(), error))
    }
}

/// Lifts a converter to `Option<V>`: empty text ⇄ `None`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OptionalConverter<C>(pub C);

impl<V, C> Converter<Option<V>> for OptionalConverter<C>
where
    V: 'static,
    C: Converter<V>,
{
    fn encode(&self, value: &Option<V>, ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        match value {
            Some(value) => self.0.encode(value, ctx),
            None => Ok(String::new()),
        }
    }

    fn decode(&self, text: &str, ctx: &FormatContext<'_>) -> Result<Option<V>, ConversionError> {
        if text.trim().is_empty() {
            Ok(None)
        } else {
            self.0.decode(text, ctx).map(Some)
        }
    }
}

impl<V: CsvValue> CsvValue for Option<V> {
    type Converter = OptionalConverter<V::Converter>;
}
