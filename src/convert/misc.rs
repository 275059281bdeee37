use std::marker::PhantomData;

use base64::{Engine, engine::general_purpose::STANDARD};
use url::Url;
use uuid::Uuid;

use super::{Converter, CsvValue, FormatContext};
use crate::error::ConversionError;

/// `true`/`false` (and `1`/`0`), case-insensitive.
///
/// A format of the form `"yes|no"` replaces the literals on both sides.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoolConverter;

impl BoolConverter {
    fn literals<'a>(ctx: &FormatContext<'a>) -> Option<(&'a str, &'a str)> {
        ctx.format.and_then(|format| format.split_once('|'))
    }
}

impl Converter<bool> for BoolConverter {
    fn encode(&self, value: &bool, ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        let text = match (Self::literals(ctx), value) {
            (Some((yes, _)), true) => yes,
            (Some((_, no)), false) => no,
            (None, true) => "true",
            (None, false) => "false",
        };
        Ok(text.to_string())
    }

    fn decode(&self, text: &str, ctx: &FormatContext<'_>) -> Result<bool, ConversionError> {
        let trimmed = text.trim();
        if let Some((yes, no)) = Self::literals(ctx) {
            if trimmed.eq_ignore_ascii_case(yes) {
                return Ok(true);
            }
            if trimmed.eq_ignore_ascii_case(no) {
                return Ok(false);
            }
        }
        if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
            Ok(true)
        } else if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
            Ok(false)
        } else {
            Err(ConversionError::new(text, "bool", "expected true or false"))
        }
    }
}

impl CsvValue for bool {
    type Converter = BoolConverter;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CharConverter;

impl Converter<char> for CharConverter {
    fn encode(&self, value: &char, _ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        Ok(value.to_string())
    }

    fn decode(&self, text: &str, _ctx: &FormatContext<'_>) -> Result<char, ConversionError> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            (None, _) => Err(ConversionError::new(text, "char", "empty text")),
            (Some(_), Some(_)) => Err(ConversionError::new(
                text,
                "char",
                "expected exactly one character",
            )),
        }
    }
}

impl CsvValue for char {
    type Converter = CharConverter;
}

/// UUIDs; format `N` (simple), `D` (hyphenated, default) or `B` (braced).
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidConverter;

impl Converter<Uuid> for UuidConverter {
    fn encode(&self, value: &Uuid, ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        match ctx.format {
            None | Some("D") | Some("d") => Ok(value.hyphenated().to_string()),
            Some("N") | Some("n") => Ok(value.simple().to_string()),
            Some("B") | Some("b") => Ok(value.braced().to_string()),
            Some(format) => Err(ConversionError::new(
                value.to_string(),
                "Uuid",
                format!("unsupported format '{format}'"),
            )),
        }
    }

    fn decode(&self, text: &str, _ctx: &FormatContext<'_>) -> Result<Uuid, ConversionError> {
        Uuid::parse_str(text.trim()).map_err(|error| ConversionError::new(text, "Uuid", error))
    }
}

impl CsvValue for Uuid {
    type Converter = UuidConverter;
}

/// Byte arrays as standard base64; whitespace is ignored when decoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct Base64Converter;

impl Converter<Vec<u8>> for Base64Converter {
    fn encode(&self, value: &Vec<u8>, _ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        Ok(STANDARD.encode(value))
    }

    fn decode(&self, text: &str, _ctx: &FormatContext<'_>) -> Result<Vec<u8>, ConversionError> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map_err(|error| ConversionError::new(text, "Vec<u8>", error))
    }
}

impl CsvValue for Vec<u8> {
    type Converter = Base64Converter;
}

/// Absolute URLs; invalid text is a conversion error.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlConverter;

impl Converter<Url> for UrlConverter {
    fn encode(&self, value: &Url, _ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        Ok(value.as_str().to_string())
    }

    fn decode(&self, text: &str, _ctx: &FormatContext<'_>) -> Result<Url, ConversionError> {
        Url::parse(text.trim()).map_err(|error| ConversionError::new(text, "Url", error))
    }
}

impl CsvValue for Url {
    type Converter = UrlConverter;
}

/// Parse-or-default URLs: anything that does not parse becomes `None`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LenientUrlConverter;

impl Converter<Option<Url>> for LenientUrlConverter {
    fn encode(&self, value: &Option<Url>, _ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        Ok(value.as_ref().map(|url| url.as_str().to_string()).unwrap_or_default())
    }

    fn decode(&self, text: &str, _ctx: &FormatContext<'_>) -> Result<Option<Url>, ConversionError> {
        Ok(Url::parse(text.trim()).ok())
    }
}

/// Enumerations that can be named in a field.
///
/// ```
/// use tinyline_csv::convert::{CsvEnum, CsvValue, EnumConverter};
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Status {
///     Active,
///     Retired,
/// }
///
/// impl CsvEnum for Status {
///     const VARIANTS: &'static [(&'static str, Self)] =
///         &[("Active", Status::Active), ("Retired", Status::Retired)];
/// }
///
/// impl CsvValue for Status {
///     type Converter = EnumConverter<Self>;
/// }
/// ```
pub trait CsvEnum: Copy + PartialEq + Send + Sync + 'static {
    /// Variant names in declaration order; the position is the ordinal.
    const VARIANTS: &'static [(&'static str, Self)];
}

/// Name-based enum conversion: case-insensitive name or ordinal on decode, name on encode.
pub struct EnumConverter<E> {
    _pd: PhantomData<fn() -> E>,
}

impl<E> Default for EnumConverter<E> {
    fn default() -> Self {
        Self { _pd: PhantomData }
    }
}

impl<E: CsvEnum> Converter<E> for EnumConverter<E> {
    fn encode(&self, value: &E, _ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        E::VARIANTS
            .iter()
            .find(|(_, variant)| variant == value)
            .map(|(name, _)| name.to_string())
            .ok_or_else(|| {
                ConversionError::new(
                    String::new(),
                    std::any::type_name::<E>(),
                    "variant has no registered name",
                )
            })
    }

    fn decode(&self, text: &str, _ctx: &FormatContext<'_>) -> Result<E, ConversionError> {
        let trimmed = text.trim();
        if let Some((_, variant)) = E::VARIANTS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
        {
            return Ok(*variant);
        }
        trimmed
            .parse::<usize>()
            .ok()
            .and_then(|ordinal| E::VARIANTS.get(ordinal))
            .map(|(_, variant)| *variant)
            .ok_or_else(|| {
                ConversionError::new(text, std::any::type_name::<E>(), "unknown variant")
            })
    }
}
