//! Helpers for cleaning up free-text request fields.

use crate::Error;

/// Trim `value` and check that something is left.
///
/// # Errors
///
/// Returns [Error::Validation] naming `field` if `value` is empty or only whitespace.
pub fn required_text(value: &str, field: &str) -> Result<String, Error> {
    let value = value.trim();

    if value.is_empty() {
        Err(Error::Validation(format!("{field} cannot be empty")))
    } else {
        Ok(value.to_owned())
    }
}

/// Trim `value`, treating an empty string the same as a missing one.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
