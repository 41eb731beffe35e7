//! `uniqueidentifier` values, accepting short hex prefixes.

use uuid::Uuid;

use super::{Validation, ValidationError, ValueRange};

const GUID_DIGITS: usize = 32;

/// Accepts a guid or a prefix of its hex digits, with or without dashes and braces.
/// A prefix is padded with `0` for the lower bound and `f` for the upper bound.
pub(super) fn validate(text: &str) -> Validation {
    let digits: String = text
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .chars()
        .filter(|c| *c != '-')
        .collect();

    if digits.is_empty() {
        return Ok(ValueRange::unbounded());
    }
    if digits.len() > GUID_DIGITS {
        return Err(ValidationError::new(format!(
            "'{}' has more than {} hex digits",
            text.trim(),
            GUID_DIGITS
        )));
    }

    let lower = format!("{:0<width$}", digits, width = GUID_DIGITS);
    let upper = format!("{:f<width$}", digits, width = GUID_DIGITS);
    if hex::decode(&lower).is_err() {
        return Err(ValidationError::new(format!(
            "'{}' is not a valid uniqueidentifier",
            text.trim()
        )));
    }

    let lower = hyphenate(&lower)?;
    if digits.len() == GUID_DIGITS {
        return Ok(ValueRange::exact(lower));
    }
    Ok(ValueRange::between(lower, hyphenate(&upper)?))
}

fn hyphenate(digits: &str) -> Result<String, ValidationError> {
    Uuid::parse_str(digits)
        .map(|uuid| uuid.hyphenated().to_string())
        .map_err(|e| ValidationError::new(e.to_string()))
}
