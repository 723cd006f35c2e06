//! Field-level validation for JSON request bodies.
//!
//! Handlers read payloads as `serde_json::Value` and validate fields
//! fail-fast: the first violation produces a 400 naming the field.

use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;

/// Required non-empty string field
pub fn require_str(body: &Value, field: &str) -> Result<String, ApiError> {
    match body.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(ApiError::validation_error(
            field,
            format!("{} must not be empty", field),
        )),
        Some(_) => Err(ApiError::validation_error(
            field,
            format!("{} must be a string", field),
        )),
        None => Err(ApiError::validation_error(
            field,
            format!("{} is required", field),
        )),
    }
}

/// Optional string field; absent or null yields None
pub fn optional_str(body: &Value, field: &str) -> Result<Option<String>, ApiError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(ApiError::validation_error(
            field,
            format!("{} must be a string", field),
        )),
    }
}

/// Required UUID field (entity references)
pub fn require_uuid(body: &Value, field: &str) -> Result<Uuid, ApiError> {
    let raw = require_str(body, field)?;
    Uuid::parse_str(&raw).map_err(|_| {
        ApiError::validation_error(field, format!("{} must be a valid UUID", field))
    })
}

/// Required integer field
pub fn require_i64(body: &Value, field: &str) -> Result<i64, ApiError> {
    match body.get(field) {
        Some(v) => v.as_i64().ok_or_else(|| {
            ApiError::validation_error(field, format!("{} must be an integer", field))
        }),
        None => Err(ApiError::validation_error(
            field,
            format!("{} is required", field),
        )),
    }
}

/// Required numeric field
pub fn require_f64(body: &Value, field: &str) -> Result<f64, ApiError> {
    match body.get(field) {
        Some(v) => v.as_f64().ok_or_else(|| {
            ApiError::validation_error(field, format!("{} must be a number", field))
        }),
        None => Err(ApiError::validation_error(
            field,
            format!("{} is required", field),
        )),
    }
}

/// Required array field
pub fn require_array<'a>(body: &'a Value, field: &str) -> Result<&'a Vec<Value>, ApiError> {
    match body.get(field) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ApiError::validation_error(
            field,
            format!("{} must be an array", field),
        )),
        None => Err(ApiError::validation_error(
            field,
            format!("{} is required", field),
        )),
    }
}

/// Minimal email shape check: one "@" with a dotted domain. The original
/// rules were looser, so anything stricter would reject real data.
pub fn check_email(field: &str, value: &str) -> Result<(), ApiError> {
    let parts: Vec<&str> = value.split('@').collect();
    let ok = parts.len() == 2
        && !parts[0].is_empty()
        && parts[1].contains('.')
        && !parts[1].starts_with('.')
        && !parts[1].ends_with('.');
    if ok {
        Ok(())
    } else {
        Err(ApiError::validation_error(
            field,
            format!("{} format is invalid", field),
        ))
    }
}

/// "YYYY-MM" month reference (goal periods)
pub fn check_month(field: &str, value: &str) -> Result<(), ApiError> {
    let valid = NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").is_ok()
        && value.len() == 7;
    if valid {
        Ok(())
    } else {
        Err(ApiError::validation_error(
            field,
            format!("{} must use YYYY-MM format", field),
        ))
    }
}

/// Inclusive numeric range check (NPS scores, quantities)
pub fn check_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), ApiError> {
    if value < min || value > max {
        return Err(ApiError::validation_error(
            field,
            format!("{} must be between {} and {}", field, min, max),
        ));
    }
    Ok(())
}
