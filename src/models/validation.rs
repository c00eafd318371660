//! Field validation shared by the validating constructors and patches

use crate::error::{AppError, AppResult};

/// Unwrap a field that must be present in a request body.
pub fn require<T>(field: &str, value: Option<T>) -> AppResult<T> {
    value.ok_or_else(|| AppError::invalid(format!("{} cannot be null", field)))
}

/// Trim a required text field, rejecting whitespace-only values and values
/// longer than `max_len` characters.
pub fn non_blank(field: &str, value: &str, max_len: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid(format!("{} cannot be blank", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::invalid(format!(
            "{} has a maximum of {} characters",
            field, max_len
        )));
    }
    Ok(trimmed.to_string())
}

/// Optional text: blank collapses to `None`, otherwise length-checked.
pub fn optional_text(field: &str, value: Option<&str>, max_len: usize) -> AppResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => non_blank(field, text, max_len).map(Some),
    }
}
