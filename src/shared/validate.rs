use chrono::NaiveDate;

use crate::shared::error::ServiceError;

pub fn ensure_date_order(start: NaiveDate, end: NaiveDate) -> Result<(), ServiceError> {
    if end < start {
        return Err(ServiceError::Validation(format!(
            "end_date {end} precedes start_date {start}"
        )));
    }
    Ok(())
}

pub fn ensure_non_negative(field: &str, value: f64) -> Result<(), ServiceError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ServiceError::Validation(format!(
            "{field} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

pub fn ensure_name(name: &str) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::Validation("name must not be empty".into()));
    }
    Ok(())
}
