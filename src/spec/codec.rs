//! The [`SpecificationCodec`] contract and the field helpers its
//! implementations share.
//!
//! Records are JSON objects. Every declared key is mandatory on read; a
//! missing or `null` key is an error naming that key. Keys the reader does
//! not know are ignored.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::DeserializationError;

/// Bidirectional mapping between a specification and its textual record.
///
/// Implementations must satisfy `from_value(&x.to_value()) == Ok(x)`.
pub trait SpecificationCodec: Sized {
    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Result<Self, DeserializationError>;

    /// Serializes to pretty-printed JSON text.
    fn to_json(&self) -> String {
        // A `Value` always serializes; the fallback is unreachable.
        serde_json::to_string_pretty(&self.to_value()).unwrap_or_default()
    }

    fn from_json(text: &str) -> Result<Self, DeserializationError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| DeserializationError::new("<document>", e.to_string()))?;
        Self::from_value(&value)
    }
}

pub(crate) fn as_object<'a>(
    value: &'a Value,
    field: &str,
) -> Result<&'a Map<String, Value>, DeserializationError> {
    value
        .as_object()
        .ok_or_else(|| DeserializationError::new(field, "expected an object"))
}

pub(crate) fn required<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
) -> Result<&'a Value, DeserializationError> {
    match obj.get(field) {
        Some(Value::Null) | None => Err(DeserializationError::missing(field)),
        Some(value) => Ok(value),
    }
}

pub(crate) fn required_str(
    obj: &Map<String, Value>,
    field: &str,
) -> Result<String, DeserializationError> {
    required(obj, field)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DeserializationError::new(field, "expected a string"))
}

/// Reads a strictly positive integer that fits in `u32`.
pub(crate) fn required_positive(
    obj: &Map<String, Value>,
    field: &str,
) -> Result<u32, DeserializationError> {
    let raw = required(obj, field)?
        .as_i64()
        .ok_or_else(|| DeserializationError::new(field, "expected an integer"))?;
    if raw <= 0 {
        return Err(DeserializationError::new(
            field,
            format!("must be positive, got {raw}"),
        ));
    }
    u32::try_from(raw)
        .map_err(|_| DeserializationError::new(field, format!("{raw} is out of range")))
}

/// Delegates a structured field to its serde representation.
pub(crate) fn required_as<T: DeserializeOwned>(
    obj: &Map<String, Value>,
    field: &str,
) -> Result<T, DeserializationError> {
    let value = required(obj, field)?;
    T::deserialize(value).map_err(|e| DeserializationError::new(field, e.to_string()))
}

/// Prefixes the field of a nested error with the path of its container.
pub(crate) fn nested(prefix: &str, err: DeserializationError) -> DeserializationError {
    DeserializationError::new(format!("{prefix}.{}", err.field), err.reason)
}
