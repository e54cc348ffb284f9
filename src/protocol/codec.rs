//! RigCTL line codec: pure functions, no I/O, no retained state.

use crate::core::Hz;

/// Builds the get-frequency request line
pub fn encode_get_frequency() -> String {
    "f".to_string()
}

/// Builds a set-frequency request line
pub fn encode_set_frequency(freq: Hz) -> String {
    format!("F {}", freq)
}

/// Extracts a frequency from free-form reply text.
///
/// Splits on whitespace (with `:` treated as a separator too), strips each
/// token down to digits, `.` and `-`, and returns the first token that parses
/// as an integer, directly or as a decimal rounded to the nearest integer.
/// Endpoint firmwares format replies inconsistently (plain digits, delimited
/// fields, trailing noise), hence the tolerance; the flip side is that it can
/// mis-parse replies whose leading tokens merely contain digits.
pub fn parse_frequency(text: &str) -> Option<Hz> {
    for token in text.trim().replace(':', " ").split_whitespace() {
        let tok: String = token
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        if tok.is_empty() {
            continue;
        }
        if let Ok(val) = tok.parse::<i64>() {
            if val >= 0 {
                return Some(val as Hz);
            }
            // Negative numbers (RPRT codes and the like) cannot be a frequency
            continue;
        }
        if let Ok(fval) = tok.parse::<f64>() {
            let rounded = fval.round();
            if rounded >= 0.0 {
                return Some(rounded as Hz);
            }
        }
    }
    None
}

/// True if the reply acknowledges a set command: either the `RPRT 0` success
/// marker, or a purely numeric echo of the frequency (some endpoints reply
/// with the value instead of an RPRT code).
pub fn is_set_acknowledged(text: &str) -> bool {
    if text.contains("RPRT 0") {
        return true;
    }
    let stripped = text.trim();
    !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit())
}
