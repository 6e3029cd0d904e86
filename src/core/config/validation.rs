//! Validation helper functions for configuration types.
//!
//! All helpers report [`AuditError::Config`] so a bad option surfaces as a
//! configuration error at session start, never deep inside scoring.

use crate::core::errors::{AuditError, Result};

/// Validate that an i64 value is greater than zero.
pub fn validate_positive_i64(value: i64, field: &str) -> Result<()> {
    if value <= 0 {
        return Err(AuditError::config_field(
            format!("{} must be greater than 0, got {}", field, value),
            field,
        ));
    }
    Ok(())
}

/// Validate that a day count is positive and representable as a time span.
pub fn validate_day_span(days: i64, field: &str) -> Result<()> {
    validate_positive_i64(days, field)?;
    if chrono::Duration::try_days(days).is_none() {
        return Err(AuditError::config_field(
            format!("{} is too large to express as a time span, got {}", field, days),
            field,
        ));
    }
    Ok(())
}

/// Validate that an f64 value is finite and greater than zero.
pub fn validate_positive_f64(value: f64, field: &str) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AuditError::config_field(
            format!("{} must be a finite value greater than 0.0, got {}", field, value),
            field,
        ));
    }
    Ok(())
}

/// Validate that an f64 value is in the unit range [0.0, 1.0].
pub fn validate_unit_range(value: f64, field: &str) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(AuditError::config_field(
            format!("{} must be between 0.0 and 1.0, got {}", field, value),
            field,
        ));
    }
    Ok(())
}

/// Validate that a sequence of values is strictly descending.
pub fn validate_strictly_descending(values: &[(&str, f64)], field: &str) -> Result<()> {
    for pair in values.windows(2) {
        let (upper_name, upper) = pair[0];
        let (lower_name, lower) = pair[1];
        if upper <= lower {
            return Err(AuditError::config_field(
                format!(
                    "{}: '{}' ({}) must be greater than '{}' ({})",
                    field, upper_name, upper, lower_name, lower
                ),
                field,
            ));
        }
    }
    Ok(())
}

/// Validate that a sequence of values is non-increasing.
pub fn validate_non_increasing(values: &[(&str, f64)], field: &str) -> Result<()> {
    for pair in values.windows(2) {
        let (upper_name, upper) = pair[0];
        let (lower_name, lower) = pair[1];
        if upper < lower {
            return Err(AuditError::config_field(
                format!(
                    "{}: '{}' ({}) must not be lower than '{}' ({})",
                    field, upper_name, upper, lower_name, lower
                ),
                field,
            ));
        }
    }
    Ok(())
}
