//! User id normalization.
//!
//! The primary authentication stage stores whatever its token decoder
//! produced: an integer, a numeric string, or a float from a JSON number.

use crate::domain::error::ValidationError;
use serde_json::Value;

/// Largest float that still maps to an exact integer
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Normalize a user id to a positive `i64`.
pub fn normalize_user_id(value: &Value) -> Result<i64, ValidationError> {
    let id = match value {
        Value::Number(number) => {
            if let Some(id) = number.as_i64() {
                id
            } else if let Some(float) = number.as_f64() {
                float_to_id(float)?
            } else {
                return Err(invalid(value));
            }
        }
        Value::String(raw) => raw.trim().parse::<i64>().map_err(|_| invalid(value))?,
        _ => return Err(invalid(value)),
    };

    if id <= 0 {
        return Err(invalid(value));
    }
    Ok(id)
}

fn float_to_id(float: f64) -> Result<i64, ValidationError> {
    if float.is_finite() && float.fract() == 0.0 && float.abs() <= MAX_EXACT_FLOAT {
        Ok(float as i64)
    } else {
        Err(ValidationError::CredentialFormatInvalid(format!(
            "user id {} is not an integer",
            float
        )))
    }
}

fn invalid(value: &Value) -> ValidationError {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    ValidationError::CredentialFormatInvalid(format!("unusable user id ({})", kind))
}
