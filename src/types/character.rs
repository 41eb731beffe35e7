//! Character family (`char`, `varchar`, `nchar`, `nvarchar`, `sysname`).

use super::{ScanOption, Validation, ValueRange};

/// Any text is a valid string; empty input leaves both sides open.
pub(super) fn validate(text: &str) -> Validation {
    if text.is_empty() {
        Ok(ValueRange::unbounded())
    } else {
        Ok(ValueRange::exact(text))
    }
}

pub(super) fn scan_option(value: &str) -> Option<ScanOption> {
    if value.is_empty() {
        None
    } else {
        Some(ScanOption::Substring(value.to_string()))
    }
}
