//! Typed cell values ready to be bound as statement parameters

use serde::{Deserialize, Serialize};

/// Storage kind tag of a coerced cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Boolean,
    Null,
    String,
}

/// One coerced cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedValue {
    /// SQL NULL
    Null,
    /// Boolean literal
    Boolean(bool),
    /// Whole number
    Integer(i64),
    /// Integer-tagged value bound verbatim (primary and origin keys)
    Key(String),
    /// String bound verbatim
    Text(String),
}

impl TypedValue {
    /// Storage kind tag
    pub fn kind(&self) -> ValueKind {
        match self {
            TypedValue::Null => ValueKind::Null,
            TypedValue::Boolean(_) => ValueKind::Boolean,
            TypedValue::Integer(_) | TypedValue::Key(_) => ValueKind::Integer,
            TypedValue::Text(_) => ValueKind::String,
        }
    }

    /// Literal form of the value (`null`, `true`, `false`, digits or text)
    pub fn literal(&self) -> std::borrow::Cow<'_, str> {
        match self {
            TypedValue::Null => "null".into(),
            TypedValue::Boolean(true) => "true".into(),
            TypedValue::Boolean(false) => "false".into(),
            TypedValue::Integer(n) => n.to_string().into(),
            TypedValue::Key(s) | TypedValue::Text(s) => s.as_str().into(),
        }
    }

    /// Byte length of the literal form
    pub fn literal_len(&self) -> usize {
        self.literal().len()
    }

    /// Integer view of the value, parsing `Key` and `Text` literals
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(n) => Some(*n),
            TypedValue::Boolean(b) => Some(i64::from(*b)),
            TypedValue::Key(s) | TypedValue::Text(s) => s.trim().parse().ok(),
            TypedValue::Null => None,
        }
    }
}

impl std::fmt::Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.literal())
    }
}
