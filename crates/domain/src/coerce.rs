//! Coercion of loosely-typed numeric input.
//!
//! Unit forms submit numbers as strings. A value is accepted when it is a
//! JSON number or a string that parses as one after trimming; anything
//! else is rejected with the unit index and field name.

use serde_json::Value;

use crate::ValidationError;

/// Reads a finite decimal number.
pub fn to_decimal(index: usize, field: &'static str, value: &Value) -> Result<f64, ValidationError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| ValidationError::NotANumber {
            index,
            field,
            value: value.to_string(),
        })
}

/// Reads a whole number that fits in an `i32`.
pub fn to_integer(index: usize, field: &'static str, value: &Value) -> Result<i32, ValidationError> {
    let decimal = to_decimal(index, field, value)?;

    if decimal.fract() != 0.0 || decimal < i32::MIN as f64 || decimal > i32::MAX as f64 {
        return Err(ValidationError::NotAnInteger {
            index,
            field,
            value: value.to_string(),
        });
    }
    Ok(decimal as i32)
}
