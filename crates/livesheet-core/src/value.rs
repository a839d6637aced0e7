//! Cell values exchanged with the remote service

use serde_json::Value as JsonValue;
use std::fmt;

/// A cell value as read from or written to a remote worksheet.
///
/// The remote service reports empty cells as `""`; both `""` and `null`
/// decode to [`CellValue::Empty`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Decode a JSON cell value from a `values` matrix.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => CellValue::Empty,
            JsonValue::Bool(b) => CellValue::Bool(*b),
            JsonValue::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or_default(),
            JsonValue::String(s) if s.is_empty() => CellValue::Empty,
            JsonValue::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    /// Encode for a `values` matrix in a write body.
    ///
    /// `Empty` is sent as `""`, which clears the cell; `null` would leave it untouched.
    pub fn to_json(&self) -> JsonValue {
        match self {
            CellValue::Empty => JsonValue::String(String::new()),
            CellValue::Bool(b) => JsonValue::Bool(*b),
            CellValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(n.to_string())),
            CellValue::Text(s) => JsonValue::String(s.clone()),
        }
    }

    /// Encode one slot of a partial write. `None` is sent as `null`, which
    /// leaves the cell and any formula in it untouched.
    pub fn slot_to_json(slot: Option<&CellValue>) -> JsonValue {
        slot.map_or(JsonValue::Null, CellValue::to_json)
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check whether the cell's displayed text equals `text` exactly.
    pub fn matches_text(&self, text: &str) -> bool {
        match self {
            CellValue::Text(s) => s == text,
            CellValue::Empty => false,
            other => other.to_string() == text,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(true) => write!(f, "TRUE"),
            CellValue::Bool(false) => write!(f, "FALSE"),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl serde::Serialize for CellValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for CellValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Ok(CellValue::from_json(&value))
    }
}
