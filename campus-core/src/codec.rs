//! Column value codecs.
//!
//! Records arrive as loosely-typed JSON objects. Each column binds through a
//! [`ColumnCodec`]: the codec turns a JSON value into a storage-neutral
//! [`BoundValue`] on write, and turns the stored value back into JSON on read.

use serde_json::Value;

use crate::errors::CampusError;

/// How a column's values are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnCodec {
    /// Scalars bind as themselves; objects and arrays are serialized.
    Auto,
    /// Always serialized as canonical JSON text; parsed back on read.
    Json,
    /// Stored as 0/1, returned as a JSON boolean.
    Boolean,
    /// Credential material: hashed before write, never returned by reads.
    Secret,
}

/// A value ready to be bound as a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
}

impl ColumnCodec {
    pub fn encode(&self, value: &Value) -> Result<BoundValue, CampusError> {
        if value.is_null() {
            return Ok(BoundValue::Null);
        }
        match self {
            ColumnCodec::Json => serialize(value),
            ColumnCodec::Boolean => Ok(match value {
                Value::Bool(b) => BoundValue::Bool(*b),
                Value::Number(n) => BoundValue::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
                Value::String(s) => BoundValue::Bool(matches!(
                    s.trim().to_ascii_lowercase().as_str(),
                    "true" | "1" | "yes" | "sim"
                )),
                other => serialize(other)?,
            }),
            ColumnCodec::Auto | ColumnCodec::Secret => encode_scalar(value),
        }
    }

    /// Decode a stored value. JSON text that fails to parse is kept as-is.
    pub fn decode(&self, stored: Value) -> Value {
        match (self, stored) {
            (ColumnCodec::Json, Value::String(text)) => {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            (ColumnCodec::Boolean, Value::Number(n)) => {
                Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false))
            }
            (_, other) => other,
        }
    }
}

fn encode_scalar(value: &Value) -> Result<BoundValue, CampusError> {
    Ok(match value {
        Value::Null => BoundValue::Null,
        Value::Bool(b) => BoundValue::Bool(*b),
        Value::String(s) => BoundValue::Text(s.clone()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                BoundValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                BoundValue::Real(f)
            } else {
                BoundValue::Text(n.to_string())
            }
        }
        Value::Array(_) | Value::Object(_) => serialize(value)?,
    })
}

fn serialize(value: &Value) -> Result<BoundValue, CampusError> {
    serde_json::to_string(value)
        .map(BoundValue::Text)
        .map_err(|e| CampusError::serialization(format!("cannot encode value: {e}")))
}
