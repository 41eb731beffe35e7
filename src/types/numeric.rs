//! Integer, exact decimal, and approximate numeric families.

use std::sync::LazyLock;

use regex::Regex;

use super::{Validation, ValidationError, ValueRange};

static DECIMAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)$").unwrap());

/// Integer storage widths, including `bit` as a 0/1 integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerKind {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
}

impl IntegerKind {
    pub fn bounds(&self) -> (i64, i64) {
        match self {
            IntegerKind::Bit => (0, 1),
            IntegerKind::TinyInt => (0, 255),
            IntegerKind::SmallInt => (i16::MIN as i64, i16::MAX as i64),
            IntegerKind::Int => (i32::MIN as i64, i32::MAX as i64),
            IntegerKind::BigInt => (i64::MIN, i64::MAX),
        }
    }

    pub fn sql_name(&self) -> &'static str {
        match self {
            IntegerKind::Bit => "bit",
            IntegerKind::TinyInt => "tinyint",
            IntegerKind::SmallInt => "smallint",
            IntegerKind::Int => "int",
            IntegerKind::BigInt => "bigint",
        }
    }
}

pub(super) fn validate_integer(kind: IntegerKind, text: &str) -> Validation {
    let (min, max) = kind.bounds();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(ValueRange::between(min.to_string(), max.to_string()));
    }
    let value: i64 = trimmed.parse().map_err(|_| {
        ValidationError::new(format!("'{}' is not a valid {}", trimmed, kind.sql_name()))
    })?;
    if value < min || value > max {
        return Err(ValidationError::new(format!(
            "{} is out of range for {} ({}..{})",
            value,
            kind.sql_name(),
            min,
            max
        )));
    }
    Ok(ValueRange::exact(value.to_string()))
}

pub(super) fn validate_decimal(text: &str) -> Validation {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(ValueRange::unbounded());
    }
    if !DECIMAL_PATTERN.is_match(trimmed) {
        return Err(ValidationError::new(format!(
            "'{}' is not a valid decimal number",
            trimmed
        )));
    }
    Ok(ValueRange::exact(trimmed))
}

pub(super) fn validate_float(text: &str) -> Validation {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(ValueRange::unbounded());
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(ValueRange::exact(trimmed)),
        _ => Err(ValidationError::new(format!(
            "'{}' is not a valid floating point number",
            trimmed
        ))),
    }
}
