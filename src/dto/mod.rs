pub mod auth;
pub mod cart;
pub mod dishes;
pub mod orders;
pub mod profiles;
pub mod restaurants;

use crate::error::{AppError, AppResult};

/// Trims a required text field and rejects it when blank.
pub(crate) fn required(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Blank optional text is stored as NULL.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
