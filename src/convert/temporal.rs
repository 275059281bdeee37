//! chrono-backed date, time and duration converters.
//!
//! Without a column format, values use ISO 8601 / RFC 3339 text. A column
//! format is a chrono `strftime` pattern, used for both directions.

use std::fmt::{Display, Write};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};

use super::{Converter, CsvValue, FormatContext};
use crate::error::ConversionError;

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_TIME_SPACE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

fn render(value: impl Display, text: impl Display, target: &'static str) -> Result<String, ConversionError> {
    let mut out = String::new();
    write!(out, "{value}")
        .map_err(|_| ConversionError::new(text.to_string(), target, "invalid format pattern"))?;
    Ok(out)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DateTimeConverter;

impl Converter<NaiveDateTime> for DateTimeConverter {
    fn encode(&self, value: &NaiveDateTime, ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        let format = ctx.format.unwrap_or(DATE_TIME_FORMAT);
        render(value.format(format), value, "NaiveDateTime")
    }

    fn decode(&self, text: &str, ctx: &FormatContext<'_>) -> Result<NaiveDateTime, ConversionError> {
        let trimmed = text.trim();
        let result = match ctx.format {
            Some(format) => NaiveDateTime::parse_from_str(trimmed, format),
            None => NaiveDateTime::parse_from_str(trimmed, DATE_TIME_FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(trimmed, DATE_TIME_SPACE_FORMAT)),
        };
        result.map_err(|error| ConversionError::new(text, "NaiveDateTime", error))
    }
}

impl CsvValue for NaiveDateTime {
    type Converter = DateTimeConverter;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DateConverter;

impl Converter<NaiveDate> for DateConverter {
    fn encode(&self, value: &NaiveDate, ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        let format = ctx.format.unwrap_or(DATE_FORMAT);
        render(value.format(format), value, "NaiveDate")
    }

    fn decode(&self, text: &str, ctx: &FormatContext<'_>) -> Result<NaiveDate, ConversionError> {
        let format = ctx.format.unwrap_or(DATE_FORMAT);
        NaiveDate::parse_from_str(text.trim(), format)
            .map_err(|error| ConversionError::new(text, "NaiveDate", error))
    }
}

impl CsvValue for NaiveDate {
    type Converter = DateConverter;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TimeConverter;

impl Converter<NaiveTime> for TimeConverter {
    fn encode(&self, value: &NaiveTime, ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        let format = ctx.format.unwrap_or(TIME_FORMAT);
        render(value.format(format), value, "NaiveTime")
    }

    fn decode(&self, text: &str, ctx: &FormatContext<'_>) -> Result<NaiveTime, ConversionError> {
        let format = ctx.format.unwrap_or(TIME_FORMAT);
        NaiveTime::parse_from_str(text.trim(), format)
            .map_err(|error| ConversionError::new(text, "NaiveTime", error))
    }
}

impl CsvValue for NaiveTime {
    type Converter = TimeConverter;
}

/// Offset-aware timestamps, RFC 3339 by default.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedOffsetConverter;

impl Converter<DateTime<FixedOffset>> for FixedOffsetConverter {
    fn encode(&self, value: &DateTime<FixedOffset>, ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        match ctx.format {
            Some(format) => render(value.format(format), value, "DateTime<FixedOffset>"),
            None => Ok(value.to_rfc3339()),
        }
    }

    fn decode(&self, text: &str, ctx: &FormatContext<'_>) -> Result<DateTime<FixedOffset>, ConversionError> {
        let trimmed = text.trim();
        let result = match ctx.format {
            Some(format) => DateTime::parse_from_str(trimmed, format),
            None => DateTime::parse_from_rfc3339(trimmed),
        };
        result.map_err(|error| ConversionError::new(text, "DateTime<FixedOffset>", error))
    }
}

impl CsvValue for DateTime<FixedOffset> {
    type Converter = FixedOffsetConverter;
}

/// UTC timestamps; a format without an offset is read as UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct UtcConverter;

impl Converter<DateTime<Utc>> for UtcConverter {
    fn encode(&self, value: &DateTime<Utc>, ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        match ctx.format {
            Some(format) => render(value.format(format), value, "DateTime<Utc>"),
            None => Ok(value.to_rfc3339()),
        }
    }

    fn decode(&self, text: &str, ctx: &FormatContext<'_>) -> Result<DateTime<Utc>, ConversionError> {
        let trimmed = text.trim();
        let result = match ctx.format {
            Some(format) => DateTime::parse_from_str(trimmed, format)
                .map(|value| value.with_timezone(&Utc))
                .or_else(|_| NaiveDateTime::parse_from_str(trimmed, format).map(|value| value.and_utc())),
            None => DateTime::parse_from_rfc3339(trimmed).map(|value| value.with_timezone(&Utc)),
        };
        result.map_err(|error| ConversionError::new(text, "DateTime<Utc>", error))
    }
}

impl CsvValue for DateTime<Utc> {
    type Converter = UtcConverter;
}

/// Time spans written as `[-][d.]hh:mm:ss[.fffffffff]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DurationConverter;

impl DurationConverter {
    fn parse(text: &str) -> Option<TimeDelta> {
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let (head, _) = body.split_once(':')?;
        let (days, clock) = match head.split_once('.') {
            Some((days, _)) => (days.parse::<i64>().ok()?, &body[days.len() + 1..]),
            None => (0, body),
        };

        let mut parts = clock.split(':');
        let hours = parts.next()?.parse::<i64>().ok()?;
        let minutes = parts.next()?.parse::<i64>().ok()?;
        let seconds_text = parts.next()?;
        if parts.next().is_some() || minutes >= 60 {
            return None;
        }

        let (seconds, nanos) = match seconds_text.split_once('.') {
            Some((whole, fraction)) => {
                if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let scale = 10_i64.pow(9 - fraction.len() as u32);
                (whole.parse::<i64>().ok()?, fraction.parse::<i64>().ok()? * scale)
            }
            None => (seconds_text.parse::<i64>().ok()?, 0),
        };
        if seconds >= 60 || hours < 0 || minutes < 0 || seconds < 0 || days < 0 {
            return None;
        }

        let total = days
            .checked_mul(86_400)?
            .checked_add(hours.checked_mul(3_600)?)?
            .checked_add(minutes * 60)?
            .checked_add(seconds)?;
        let delta = TimeDelta::try_seconds(total)?.checked_add(&TimeDelta::nanoseconds(nanos))?;
        Some(if negative { -delta } else { delta })
    }
}

impl Converter<TimeDelta> for DurationConverter {
    fn encode(&self, value: &TimeDelta, _ctx: &FormatContext<'_>) -> Result<String, ConversionError> {
        let sign = if *value < TimeDelta::zero() { "-" } else { "" };
        let magnitude = value.abs();
        let total = magnitude.num_seconds();
        let nanos = magnitude.subsec_nanos();
        let (days, rest) = (total / 86_400, total % 86_400);
        let (hours, minutes, seconds) = (rest / 3_600, rest % 3_600 / 60, rest % 60);

        let mut out = String::from(sign);
        if days > 0 {
            out.push_str(&format!("{days}."));
        }
        out.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
        if nanos > 0 {
            let fraction = format!("{nanos:09}");
            out.push('.');
            out.push_str(fraction.trim_end_matches('0'));
        }
        Ok(out)
    }

    fn decode(&self, text: &str, _ctx: &FormatContext<'_>) -> Result<TimeDelta, ConversionError> {
        Self::parse(text.trim()).ok_or_else(|| {
            ConversionError::new(text, "TimeDelta", "expected [-][d.]hh:mm:ss[.fffffffff]")
        })
    }
}

impl CsvValue for TimeDelta {
    type Converter = DurationConverter;
}
