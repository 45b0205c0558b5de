//! HL7 point-in-time values (`TS`) in their ITS 1.0 wire syntax.
//!
//! The wire form is `YYYY[MM[DD[HH[MM[SS[.F+]]]]]][+|-ZZZZ]`: the number of
//! digits sent determines the precision of the value, so the precision is kept
//! next to the parsed date/time and reproduced when the value is written back.

use std::fmt;

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, Timelike};

use crate::error::CodecError;

/// Number of significant components carried by a [`Timestamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampPrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    /// Seconds with the given number of fractional digits (1 to 9).
    Fraction(u8),
}

impl TimestampPrecision {
    fn from_digit_count(count: usize) -> Option<Self> {
        match count {
            4 => Some(TimestampPrecision::Year),
            6 => Some(TimestampPrecision::Month),
            8 => Some(TimestampPrecision::Day),
            10 => Some(TimestampPrecision::Hour),
            12 => Some(TimestampPrecision::Minute),
            14 => Some(TimestampPrecision::Second),
            _ => None,
        }
    }
}

/// A point in time with the precision it was expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    value: NaiveDateTime,
    precision: TimestampPrecision,
    offset: Option<FixedOffset>,
}

impl Timestamp {
    /// Creates a timestamp from a date/time and the precision to send it with.
    ///
    /// Components below the precision are kept in memory but never written.
    pub fn new(value: NaiveDateTime, precision: TimestampPrecision) -> Self {
        Self {
            value,
            precision,
            offset: None,
        }
    }

    /// Attaches a UTC offset.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn value(&self) -> NaiveDateTime {
        self.value
    }

    pub fn precision(&self) -> TimestampPrecision {
        self.precision
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    /// Parses the ITS 1.0 wire syntax.
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        let text = text.trim();
        if !text.is_ascii() {
            return Err(CodecError::timestamp(text, "non-ASCII character"));
        }
        if text.len() < 4 {
            return Err(CodecError::timestamp(text, "at least a year is required"));
        }

        // The year never carries a sign, so any sign after it starts the offset.
        let (body, offset) = match text[4..].find(['+', '-']) {
            Some(idx) => {
                let split = idx + 4;
                (&text[..split], Some(parse_offset(text, &text[split..])?))
            }
            None => (text, None),
        };

        let (digits, fraction) = match body.split_once('.') {
            Some((digits, fraction)) => (digits, Some(fraction)),
            None => (body, None),
        };

        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodecError::timestamp(text, "non-digit in date/time"));
        }

        let mut precision = TimestampPrecision::from_digit_count(digits.len())
            .ok_or_else(|| CodecError::timestamp(text, "unexpected number of digits"))?;

        let component = |start: usize, default: u32| -> u32 {
            digits
                .get(start..start + 2)
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };

        let year: i32 = digits[..4]
            .parse()
            .map_err(|_| CodecError::timestamp(text, "invalid year"))?;

        let mut nanos = 0u32;
        if let Some(fraction) = fraction {
            if precision != TimestampPrecision::Second {
                return Err(CodecError::timestamp(
                    text,
                    "fractional seconds require second precision",
                ));
            }
            if fraction.is_empty()
                || fraction.len() > 9
                || !fraction.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(CodecError::timestamp(text, "invalid fractional seconds"));
            }
            let scale = 10u32.pow(9 - fraction.len() as u32);
            nanos = fraction
                .parse::<u32>()
                .map_err(|_| CodecError::timestamp(text, "invalid fractional seconds"))?
                * scale;
            precision = TimestampPrecision::Fraction(fraction.len() as u8);
        }

        let value = NaiveDate::from_ymd_opt(year, component(4, 1), component(6, 1))
            .and_then(|date| {
                date.and_hms_nano_opt(component(8, 0), component(10, 0), component(12, 0), nanos)
            })
            .ok_or_else(|| CodecError::timestamp(text, "date/time out of range"))?;

        Ok(Self {
            value,
            precision,
            offset,
        })
    }
}

fn parse_offset(text: &str, offset: &str) -> Result<FixedOffset, CodecError> {
    let (sign, rest) = offset.split_at(1);
    if rest.len() != 4 || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::timestamp(text, "offset must be +ZZZZ or -ZZZZ"));
    }
    let hours: i32 = rest[..2].parse().unwrap_or(0);
    let minutes: i32 = rest[2..].parse().unwrap_or(0);
    let seconds = hours * 3600 + minutes * 60;
    let seconds = if sign == "-" { -seconds } else { seconds };
    FixedOffset::east_opt(seconds).ok_or_else(|| CodecError::timestamp(text, "offset out of range"))
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = &self.value;
        write!(f, "{:04}", v.year())?;
        let steps = [v.month(), v.day(), v.hour(), v.minute(), v.second()];
        let shown = match self.precision {
            TimestampPrecision::Year => 0,
            TimestampPrecision::Month => 1,
            TimestampPrecision::Day => 2,
            TimestampPrecision::Hour => 3,
            TimestampPrecision::Minute => 4,
            TimestampPrecision::Second | TimestampPrecision::Fraction(_) => 5,
        };
        for component in &steps[..shown] {
            write!(f, "{:02}", component)?;
        }
        if let TimestampPrecision::Fraction(digits) = self.precision {
            let digits = digits.clamp(1, 9) as u32;
            let fraction = v.nanosecond() / 10u32.pow(9 - digits);
            write!(f, ".{:0width$}", fraction, width = digits as usize)?;
        }
        if let Some(offset) = self.offset {
            let seconds = offset.local_minus_utc();
            let sign = if seconds < 0 { '-' } else { '+' };
            let seconds = seconds.abs();
            write!(f, "{}{:02}{:02}", sign, seconds / 3600, (seconds % 3600) / 60)?;
        }
        Ok(())
    }
}
