//! Signal message parsing.
//!
//! Messages are `path=value` text. The first `=` is the separator; the
//! value side is never re-parsed for embedded `=` characters.

use thiserror::Error;

/// Errors produced when a framed message has a malformed path/value shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// No `=` separator, or it sits at the first or last character.
    #[error("missing or misplaced '=' separator in message: {0:?}")]
    MissingSeparator(String),

    /// The path side is empty after trimming.
    #[error("empty signal path in message: {0:?}")]
    EmptyPath(String),

    /// The value side is empty after trimming.
    #[error("empty signal value in message: {0:?}")]
    EmptyValue(String),
}

/// A parsed `path=value` message, both sides trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSignal {
    path: String,
    raw_value: String,
}

impl ParsedSignal {
    /// The dotted signal path (e.g. "Vehicle.Speed").
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw value text, before type conversion.
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }
}

/// Split a message on the first `=` into a validated path/value pair.
///
/// Fails when no `=` is present, when it is the first or last character,
/// or when either side is empty after trimming whitespace.
pub fn parse_signal(message: &str) -> Result<ParsedSignal, ParseError> {
    let equals_pos = message
        .find('=')
        .ok_or_else(|| ParseError::MissingSeparator(message.to_string()))?;

    if equals_pos == 0 || equals_pos == message.len() - 1 {
        return Err(ParseError::MissingSeparator(message.to_string()));
    }

    let path = message[..equals_pos].trim();
    let raw_value = message[equals_pos + 1..].trim();

    if path.is_empty() {
        return Err(ParseError::EmptyPath(message.to_string()));
    }
    if raw_value.is_empty() {
        return Err(ParseError::EmptyValue(message.to_string()));
    }

    Ok(ParsedSignal {
        path: path.to_string(),
        raw_value: raw_value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed() {
        let parsed = parse_signal("Vehicle.Speed=42.5").unwrap();
        assert_eq!(parsed.path(), "Vehicle.Speed");
        assert_eq!(parsed.raw_value(), "42.5");
    }

    #[test]
    fn test_parse_trims_both_sides() {
        let parsed = parse_signal("  Vehicle.Speed = 42.5").unwrap();
        assert_eq!(parsed.path(), "Vehicle.Speed");
        assert_eq!(parsed.raw_value(), "42.5");
    }

    #[test]
    fn test_value_keeps_embedded_equals() {
        // Only the first '=' separates; the value is taken verbatim
        let parsed = parse_signal("Vehicle.VIN=a=b=c").unwrap();
        assert_eq!(parsed.path(), "Vehicle.VIN");
        assert_eq!(parsed.raw_value(), "a=b=c");
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        assert_eq!(
            parse_signal("noequals").unwrap_err(),
            ParseError::MissingSeparator("noequals".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_boundary_separator() {
        assert!(matches!(
            parse_signal("=5").unwrap_err(),
            ParseError::MissingSeparator(_)
        ));
        assert!(matches!(
            parse_signal("X=").unwrap_err(),
            ParseError::MissingSeparator(_)
        ));
    }

    #[test]
    fn test_parse_rejects_blank_sides() {
        // '=' is mid-string but the path is whitespace only
        assert!(matches!(
            parse_signal("  =5").unwrap_err(),
            ParseError::EmptyPath(_)
        ));
        assert!(matches!(
            parse_signal("X=  ").unwrap_err(),
            ParseError::EmptyValue(_)
        ));
    }
}
