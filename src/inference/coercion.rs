//! Cell coercion from raw strings to typed parameters

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::TypedValue;

static RE_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[+-]?\d+([eE][+-]?\d+)?\s*$").expect("Invalid regex"));

/// Coerce one raw cell
///
/// Rules, first match wins:
/// 1. position 0 keeps the raw text as an integer-tagged key
/// 2. an empty cell stays an empty string
/// 3. a decimal fraction stays a string
/// 4. `0` is NULL
/// 5. `True` / `False` are booleans
/// 6. a whole number is an integer
/// 7. anything else is a string
///
/// ```rust
/// use sheet_ingest::inference::coerce_value;
/// use sheet_ingest::models::TypedValue;
///
/// assert_eq!(coerce_value(2, "0"), TypedValue::Null);
/// assert_eq!(coerce_value(2, "0.0"), TypedValue::Text("0.0".into()));
/// ```
pub fn coerce_value(position: usize, raw: &str) -> TypedValue {
    if position == 0 {
        return TypedValue::Key(raw.to_string());
    }
    if raw.is_empty() {
        return TypedValue::Text(String::new());
    }
    if is_fraction(raw) {
        return TypedValue::Text(raw.to_string());
    }

    match raw {
        "0" => TypedValue::Null,
        "True" => TypedValue::Boolean(true),
        "False" => TypedValue::Boolean(false),
        _ => match raw.parse::<i64>() {
            Ok(n) => TypedValue::Integer(n),
            Err(_) => TypedValue::Text(raw.to_string()),
        },
    }
}

/// Whether `raw` contains a `.` and is numeric once the dots are removed
pub fn is_fraction(raw: &str) -> bool {
    if !raw.contains('.') {
        return false;
    }
    let digits: String = raw.chars().filter(|c| *c != '.').collect();
    RE_NUMERIC.is_match(&digits)
}
