//! Binary and CLR-backed types cannot be searched.

use super::{Validation, ValidationError};

pub(super) fn validate(_text: &str) -> Validation {
    Err(ValidationError::new("binary values can't be searched"))
}
