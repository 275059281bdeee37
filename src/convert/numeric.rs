use std::{any::type_name, fmt::Display, marker::PhantomData, str::FromStr};

use rust_decimal::Decimal;

use super::{Converter, CsvValue, FormatContext};
use crate::error::ConversionError;

fn parse_format<V>(value: &V, format: &str) -> Result<usize, ConversionError>
where
    V: Display,
{
    format.trim().parse::<usize>().map_err(|_| {
        ConversionError::new(
            value.to_string(),
            type_name::<V>(),
            format!("unsupported numeric format '{format}'"),
        )
    })
}

/// Integers of every width; `i128`/`u128` double as the big-integer types.
///
/// The format string, when present, is a minimum width padded with zeros.
pub struct IntegerConverter<N> {
    _pd: PhantomData<fn() -> N>,
}

impl<N> Default for IntegerConverter<N> {
    fn default() -> Self {
        Self { _pd: PhantomData }
    }
}

impl<N> Converter<N> for IntegerConverter<N>
where
    N: FromStr + Display + 'static,
    N::Err: Display,
{
    fn encode(&self, value: &N, ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        match ctx.format {
            Some(format) => {
                let width = parse_format(value, format)?;
                Ok(format!("{value:0width$}"))
            }
            None => Ok(value.to_string()),
        }
    }

    fn decode(&self, text: &str, ctx: &FormatContext<'_>) -> Result<N, ConversionError> {
        let invariant: String = text
            .trim()
            .chars()
            .filter(|c| Some(*c) != ctx.provider.group_separator)
            .collect();
        invariant
            .parse::<N>()
            .map_err(|error| ConversionError::new(text, type_name::<N>(), error))
    }
}

macro_rules! integer_values {
    ($($t:ty),*) => {
        $(
            impl CsvValue for $t {
                type Converter = IntegerConverter<$t>;
            }
        )*
    };
}

integer_values!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// `f32` and `f64`.
///
/// The format string, when present, is the number of decimals to print.
pub struct FloatConverter<F> {
    _pd: PhantomData<fn() -> F>,
}

impl<F> Default for FloatConverter<F> {
    fn default() -> Self {
        Self { _pd: PhantomData }
    }
}

impl<F> Converter<F> for FloatConverter<F>
where
    F: FromStr + Display + 'static,
    F::Err: Display,
{
    fn encode(&self, value: &F, ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        let text = match ctx.format {
            Some(format) => {
                let decimals = parse_format(value, format)?;
                format!("{value:.decimals$}")
            }
            None => value.to_string(),
        };
        Ok(ctx.provider.from_invariant_number(text))
    }

    fn decode(&self, text: &str, ctx: &FormatContext<'_>) -> Result<F, ConversionError> {
        ctx.provider
            .to_invariant_number(text)
            .parse::<F>()
            .map_err(|error| ConversionError::new(text, type_name::<F>(), error))
    }
}

impl CsvValue for f32 {
    type Converter = FloatConverter<f32>;
}

impl CsvValue for f64 {
    type Converter = FloatConverter<f64>;
}

/// Exact decimals, same format rules as [`FloatConverter`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DecimalConverter;

impl Converter<Decimal> for DecimalConverter {
    fn encode(&self, value: &Decimal, ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        let text = match ctx.format {
            Some(format) => {
                let decimals = parse_format(value, format)?;
                format!("{value:.decimals$}")
            }
            None => value.to_string(),
        };
        Ok(ctx.provider.from_invariant_number(text))
    }

    fn decode(&self, text: &str, ctx: &FormatContext<'_>) -> Result<Decimal, ConversionError> {
        let invariant = ctx.provider.to_invariant_number(text);
        Decimal::from_str(&invariant)
            .or_else(|_| Decimal::from_scientific(&invariant))
            .map_err(|error| ConversionError::new(text, "Decimal", error))
    }
}

impl CsvValue for Decimal {
    type Converter = DecimalConverter;
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::convert::{FormatProvider, tests::ctx};

    #[test]
    fn integers_should_parse_all_widths() -> Result<(), Box<dyn Error>> {
        assert_eq!(IntegerConverter::<i8>::default().decode("-128", &ctx(None))?, i8::MIN);
        assert_eq!(IntegerConverter::<u16>::default().decode(" 65535 ", &ctx(None))?, u16::MAX);
        assert_eq!(IntegerConverter::<i64>::default().decode("+42", &ctx(None))?, 42);
        assert_eq!(
            IntegerConverter::<u128>::default()
                .decode("340282366920938463463374607431768211455", &ctx(None))?,
            u128::MAX
        );
        assert!(IntegerConverter::<u8>::default().decode("256", &ctx(None)).is_err());
        assert!(IntegerConverter::<i32>::default().decode("", &ctx(None)).is_err());
        assert!(IntegerConverter::<u32>::default().decode("-1", &ctx(None)).is_err());
        Ok(())
    }

    #[test]
    fn integers_should_honour_group_separator_and_width() -> Result<(), Box<dyn Error>> {
        let provider = FormatProvider::new(',', Some('.'));
        let context = FormatContext::new(None, &provider);
        assert_eq!(IntegerConverter::<i32>::default().decode("4.628.910", &context)?, 4628910);

        let converter = IntegerConverter::<i32>::default();
        assert_eq!(converter.encode(&42, &ctx(Some("5")))?, "00042");
        assert_eq!(converter.encode(&42, &ctx(None))?, "42");
        assert!(converter.encode(&42, &ctx(Some("D5"))).is_err());
        Ok(())
    }

    #[test]
    fn floats_should_use_provider_separators() -> Result<(), Box<dyn Error>> {
        let provider = FormatProvider::new(',', Some('.'));
        let context = FormatContext::new(None, &provider);
        let converter = FloatConverter::<f64>::default();

        assert_eq!(converter.decode("1.234,5", &context)?, 1234.5);
        assert_eq!(converter.encode(&1234.5, &context)?, "1234,5");
        assert_eq!(converter.decode("1.12", &ctx(None))?, 1.12);
        assert_eq!(converter.encode(&0.1, &ctx(None))?, "0.1");
        Ok(())
    }

    #[test]
    fn floats_should_round_to_format_decimals() -> Result<(), Box<dyn Error>> {
        let converter = FloatConverter::<f32>::default();
        assert_eq!(converter.encode(&2.5, &ctx(Some("2")))?, "2.50");
        assert!(converter.decode("two", &ctx(None)).is_err());
        Ok(())
    }

    #[test]
    fn decimals_should_round_trip_exactly() -> Result<(), Box<dyn Error>> {
        let converter = DecimalConverter;
        let value = converter.decode("79.99", &ctx(None))?;
        assert_eq!(value, Decimal::new(7999, 2));
        assert_eq!(converter.encode(&value, &ctx(None))?, "79.99");
        assert_eq!(converter.encode(&Decimal::new(15, 1), &ctx(Some("3")))?, "1.500");
        assert_eq!(converter.decode("1e3", &ctx(None))?, Decimal::new(1000, 0));
        assert!(converter.decode("12abc", &ctx(None)).is_err());
        Ok(())
    }
}
