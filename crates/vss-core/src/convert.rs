//! Raw value string conversion.
//!
//! Telemetry values arrive as text; this module interprets them as floats,
//! integers, booleans, or byte arrays, with clamping and linear scaling
//! helpers for mappings that declare them. All functions are pure and
//! reject trailing garbage and out-of-range input.

use thiserror::Error;

/// Errors produced when a raw value string cannot be converted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The string is not a valid float literal.
    #[error("not a valid float: {0:?}")]
    NotAFloat(String),

    /// The string is not a valid integer literal, or is out of range
    /// for the target integer width.
    #[error("not a valid {width}-bit integer: {raw:?}")]
    NotAnInt { raw: String, width: u8 },

    /// The string is not a recognized boolean token.
    #[error("not a valid boolean: {0:?}")]
    NotABool(String),

    /// A hex string had an odd number of digits.
    #[error("hex string has odd length ({0} chars)")]
    OddHexLength(usize),

    /// A hex string contained a non-hexadecimal character.
    #[error("invalid hex digit {0:?}")]
    InvalidHexDigit(char),
}

/// Check whether a string converts to a finite f32.
pub fn is_float_string(s: &str) -> bool {
    to_float(s).is_ok()
}

/// Check whether a string parses as a (signed) integer literal.
pub fn is_int_string(s: &str) -> bool {
    s.trim().parse::<i64>().is_ok()
}

/// Check whether a string is a recognized boolean token.
///
/// Accepts "true"/"false", "1"/"0", "yes"/"no", "on"/"off", case-insensitive.
pub fn is_bool_string(s: &str) -> bool {
    to_bool(s).is_ok()
}

/// Convert a string to f32.
///
/// `str::parse` requires the whole string to be consumed, so trailing
/// garbage like "42.5abc" is rejected rather than truncated. Values
/// outside the f32 range parse to infinity, so non-finite results are
/// rejected as out of range; the literal "inf"/"nan" tokens fall under
/// the same rule.
pub fn to_float(s: &str) -> Result<f32, ConversionError> {
    let trimmed = s.trim();
    let v = trimmed
        .parse::<f32>()
        .map_err(|_| ConversionError::NotAFloat(trimmed.to_string()))?;
    if !v.is_finite() {
        return Err(ConversionError::NotAFloat(trimmed.to_string()));
    }
    Ok(v)
}

/// Convert a string to i32, rejecting out-of-range values.
pub fn to_int32(s: &str) -> Result<i32, ConversionError> {
    let trimmed = s.trim();
    trimmed.parse::<i32>().map_err(|_| ConversionError::NotAnInt {
        raw: trimmed.to_string(),
        width: 32,
    })
}

/// Convert a string to i64, rejecting out-of-range values.
pub fn to_int64(s: &str) -> Result<i64, ConversionError> {
    let trimmed = s.trim();
    trimmed.parse::<i64>().map_err(|_| ConversionError::NotAnInt {
        raw: trimmed.to_string(),
        width: 64,
    })
}

/// Convert a boolean token to bool.
///
/// Accepts "true"/"false", "1"/"0", "yes"/"no", "on"/"off", case-insensitive.
pub fn to_bool(s: &str) -> Result<bool, ConversionError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConversionError::NotABool(s.trim().to_string())),
    }
}

/// Convert a hex string to bytes, two characters per byte, big-endian.
///
/// The string must have even length and contain only hex digits.
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, ConversionError> {
    let trimmed = s.trim();
    if trimmed.len() % 2 != 0 {
        return Err(ConversionError::OddHexLength(trimmed.len()));
    }

    let mut bytes = Vec::with_capacity(trimmed.len() / 2);
    let chars: Vec<char> = trimmed.chars().collect();
    for pair in chars.chunks(2) {
        let hi = hex_digit(pair[0])?;
        let lo = hex_digit(pair[1])?;
        bytes.push((hi << 4) | lo);
    }
    Ok(bytes)
}

/// Render bytes as an uppercase hex string; inverse of [`hex_to_bytes`].
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02X}", b));
    }
    out
}

fn hex_digit(c: char) -> Result<u8, ConversionError> {
    c.to_digit(16)
        .map(|d| d as u8)
        .ok_or(ConversionError::InvalidHexDigit(c))
}

/// Clamp a float to `[min, max]`.
///
/// Precondition: `min <= max`. Callers own that contract; it is not
/// validated here.
pub fn clamp_float(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Clamp an i32 to `[min, max]`.
///
/// Precondition: `min <= max`. Callers own that contract; it is not
/// validated here.
pub fn clamp_int32(value: i32, min: i32, max: i32) -> i32 {
    value.max(min).min(max)
}

/// Apply linear scaling: `value * multiplier + offset`. No bounds.
pub fn linear_scale(value: f32, multiplier: f32, offset: f32) -> f32 {
    value * multiplier + offset
}
