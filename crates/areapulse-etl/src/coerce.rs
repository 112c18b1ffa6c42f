//! Tolerant scalar converters for untyped snapshot fields.
//!
//! The upstream feed carries numbers as JSON numbers, numeric strings, empty
//! strings, or omits them entirely. These converters are total: any value
//! that cannot be coerced becomes `None` (or the empty string), never an
//! error, so a single dirty field can never fail a file.

use serde_json::Value;

/// Coerces an arbitrary scalar to an integer.
///
/// Missing, null, and empty-string values are missing markers. Everything
/// else goes through a float conversion and truncates toward zero; any
/// failure (non-numeric text, non-finite value, i32 overflow) is also a
/// missing marker.
#[must_use]
pub fn coerce_int(value: Option<&Value>) -> Option<i32> {
    let float = match value {
        None | Some(Value::Null) => return None,
        Some(Value::String(s)) if s.is_empty() => return None,
        other => coerce_float(other)?,
    };
    if !float.is_finite() {
        return None;
    }
    let truncated = float.trunc();
    if truncated < f64::from(i32::MIN) || truncated > f64::from(i32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(truncated as i32)
}

/// Coerces an arbitrary scalar to a float.
///
/// Numbers pass through; strings are parsed. Anything else is a missing
/// marker.
#[must_use]
pub fn coerce_float(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

/// Coerces an arbitrary scalar to a string.
///
/// Missing and null values become the empty string; non-string scalars take
/// their display form, mirroring how the upstream producer stringifies.
#[must_use]
pub fn coerce_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
