//! Date and time family with prefix-style range validation.
//!
//! Input is read as a prefix of `YYYY-MM-DD hh:mm:ss.fffffff` (or `hh:mm:ss.fffffff`
//! for `time`). Whatever is left out widens the range: `"2001"` covers the whole
//! year, `"2001-02-03 04"` covers one hour. A year may itself be a prefix, so `"20"`
//! covers 2000 through 2099. Bounds are clamped to what the column type can hold.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;

use super::{Validation, ValidationError, ValueRange};

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([0-9]{1,4})(?:-([0-9]{1,2})(?:-([0-9]{1,2})(?:[ T]([0-9]{1,2})(?::([0-9]{1,2})(?::([0-9]{1,2})(?:\.([0-9]{1,7}))?)?)?)?)?)?$",
    )
    .unwrap()
});

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,2})(?::([0-9]{1,2})(?::([0-9]{1,2})(?:\.([0-9]{1,7}))?)?)?$").unwrap()
});

/// Date the `time` type is anchored to internally.
const TIME_ANCHOR: (i32, u32, u32) = (2000, 1, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeKind {
    Date,
    Time,
    SmallDateTime,
    DateTime,
    DateTime2,
    DateTimeOffset,
}

impl DateTimeKind {
    fn has_date(&self) -> bool {
        !matches!(self, DateTimeKind::Time)
    }

    fn has_time(&self) -> bool {
        !matches!(self, DateTimeKind::Date)
    }

    fn sql_name(&self) -> &'static str {
        match self {
            DateTimeKind::Date => "date",
            DateTimeKind::Time => "time",
            DateTimeKind::SmallDateTime => "smalldatetime",
            DateTimeKind::DateTime => "datetime",
            DateTimeKind::DateTime2 => "datetime2",
            DateTimeKind::DateTimeOffset => "datetimeoffset",
        }
    }

    /// Smallest and largest representable values.
    fn limits(&self) -> (NaiveDateTime, NaiveDateTime) {
        let (min_date, max_date) = match self {
            DateTimeKind::Time => (anchor(), anchor()),
            DateTimeKind::SmallDateTime => (ymd(1900, 1, 1), ymd(2079, 6, 6)),
            DateTimeKind::DateTime => (ymd(1753, 1, 1), ymd(9999, 12, 31)),
            _ => (ymd(1, 1, 1), ymd(9999, 12, 31)),
        };
        let max_time = match self {
            DateTimeKind::SmallDateTime => hms_nano(23, 59, 0, 0),
            DateTimeKind::DateTime => hms_nano(23, 59, 59, 997_000_000),
            _ => hms_nano(23, 59, 59, 999_999_900),
        };
        (
            min_date.and_time(NaiveTime::MIN),
            max_date.and_time(max_time),
        )
    }

    fn format(&self, value: NaiveDateTime) -> String {
        let ticks = value.nanosecond() / 100;
        match self {
            DateTimeKind::Date => value.format("%Y-%m-%d").to_string(),
            DateTimeKind::Time => format!("{}.{:07}", value.format("%H:%M:%S"), ticks),
            DateTimeKind::SmallDateTime => value.format("%Y-%m-%d %H:%M").to_string(),
            DateTimeKind::DateTime => {
                // .998 and .999 round up to the next second in a datetime
                let millis = (value.nanosecond() / 1_000_000).min(997);
                format!("{}.{:03}", value.format("%Y-%m-%d %H:%M:%S"), millis)
            }
            DateTimeKind::DateTime2 | DateTimeKind::DateTimeOffset => {
                format!("{}.{:07}", value.format("%Y-%m-%d %H:%M:%S"), ticks)
            }
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

fn hms_nano(hour: u32, minute: u32, second: u32, nano: u32) -> NaiveTime {
    NaiveTime::from_hms_nano_opt(hour, minute, second, nano).unwrap_or(NaiveTime::MIN)
}

fn anchor() -> NaiveDate {
    ymd(TIME_ANCHOR.0, TIME_ANCHOR.1, TIME_ANCHOR.2)
}

/// The components present in the input.
#[derive(Debug, Default)]
struct Prefix {
    years: Option<(i32, i32)>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
    fraction: Option<String>,
}

impl Prefix {
    fn has_time(&self) -> bool {
        self.hour.is_some()
    }

    fn fraction_nanos(&self, fill: char) -> u32 {
        match &self.fraction {
            Some(digits) => {
                let mut padded = digits.clone();
                while padded.len() < 9 {
                    padded.push(fill);
                }
                padded.parse().unwrap_or(0)
            }
            None if fill == '9' => 999_999_999,
            None => 0,
        }
    }

    fn lower_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_nano_opt(
            self.hour.unwrap_or(0),
            self.minute.unwrap_or(0),
            self.second.unwrap_or(0),
            self.fraction_nanos('0'),
        )
    }

    fn upper_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_nano_opt(
            self.hour.unwrap_or(23),
            self.minute.unwrap_or(59),
            self.second.unwrap_or(59),
            self.fraction_nanos('9'),
        )
    }
}

fn capture_number(caps: &regex::Captures, index: usize) -> Option<u32> {
    caps.get(index).and_then(|m| m.as_str().parse().ok())
}

fn parse_date_prefix(text: &str) -> Result<Prefix, ValidationError> {
    let caps = DATE_PATTERN
        .captures(text)
        .ok_or_else(|| ValidationError::new(format!("'{}' is not a valid date", text)))?;

    let year_digits = &caps[1];
    let year: i32 = year_digits
        .parse()
        .map_err(|_| ValidationError::new(format!("'{}' is not a valid year", year_digits)))?;
    let missing = 4 - year_digits.len() as u32;
    let scale = 10_i32.pow(missing);
    let years = (year * scale, (year + 1) * scale - 1);

    let prefix = Prefix {
        years: Some(years),
        month: capture_number(&caps, 2),
        day: capture_number(&caps, 3),
        hour: capture_number(&caps, 4),
        minute: capture_number(&caps, 5),
        second: capture_number(&caps, 6),
        fraction: caps.get(7).map(|m| m.as_str().to_string()),
    };

    if missing > 0 && prefix.month.is_some() {
        return Err(ValidationError::new(format!(
            "'{}' needs a four digit year before the month",
            text
        )));
    }
    if let Some(month) = prefix.month {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::new(format!(
                "'{}' has an invalid month",
                text
            )));
        }
    }
    Ok(prefix)
}

fn parse_time_prefix(text: &str) -> Result<Prefix, ValidationError> {
    let caps = TIME_PATTERN
        .captures(text)
        .ok_or_else(|| ValidationError::new(format!("'{}' is not a valid time", text)))?;
    Ok(Prefix {
        years: None,
        month: None,
        day: None,
        hour: capture_number(&caps, 1),
        minute: capture_number(&caps, 2),
        second: capture_number(&caps, 3),
        fraction: caps.get(4).map(|m| m.as_str().to_string()),
    })
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

fn bounds(
    kind: DateTimeKind,
    prefix: &Prefix,
    text: &str,
) -> Result<(NaiveDateTime, NaiveDateTime), ValidationError> {
    let invalid = || ValidationError::new(format!("'{}' is not a valid {}", text, kind.sql_name()));

    let (lower_date, upper_date) = match prefix.years {
        Some((first_year, last_year)) => {
            let lower = NaiveDate::from_ymd_opt(
                first_year,
                prefix.month.unwrap_or(1),
                prefix.day.unwrap_or(1),
            )
            .ok_or_else(invalid)?;
            let upper_month = prefix.month.unwrap_or(12);
            let upper = NaiveDate::from_ymd_opt(
                last_year,
                upper_month,
                prefix
                    .day
                    .unwrap_or_else(|| last_day_of_month(last_year, upper_month)),
            )
            .ok_or_else(invalid)?;
            (lower, upper)
        }
        None => (anchor(), anchor()),
    };

    let lower_time = prefix.lower_time().ok_or_else(invalid)?;
    let upper_time = prefix.upper_time().ok_or_else(invalid)?;
    Ok((lower_date.and_time(lower_time), upper_date.and_time(upper_time)))
}

pub(super) fn validate(kind: DateTimeKind, text: &str) -> Validation {
    let trimmed = text.trim();
    let (min, max) = kind.limits();

    if trimmed.is_empty() {
        return Ok(ValueRange::between(kind.format(min), kind.format(max)));
    }

    let prefix = if kind.has_date() {
        parse_date_prefix(trimmed)?
    } else {
        parse_time_prefix(trimmed)?
    };
    if prefix.has_time() && !kind.has_time() {
        return Err(ValidationError::new(format!(
            "'{}' has a time part but the column is a date",
            trimmed
        )));
    }

    let (lower, upper) = bounds(kind, &prefix, trimmed)?;
    let lower = lower.max(min);
    let upper = upper.min(max);
    if lower > upper {
        return Err(ValidationError::new(format!(
            "'{}' is out of range for {}",
            trimmed,
            kind.sql_name()
        )));
    }

    let lower = kind.format(lower);
    let upper = kind.format(upper);
    if lower == upper {
        Ok(ValueRange::exact(lower))
    } else {
        Ok(ValueRange::between(lower, upper))
    }
}
