use alloc::string::ToString;

use serde_json::Number;

use super::{Driver, Format, Payload};
use crate::{BoxError, Dict, InputError, Scalar, TypeInfo, Value};

/// Driver for nested documents: objects, arrays and scalars, read as JSON.
///
/// Types with a raw JSON or a text hook are custom-decoded. Strings reach
/// those hooks verbatim; any other value is re-encoded as JSON first.
#[derive(Debug, Clone, Copy, Default)]
pub struct DictDriver;

impl Driver for DictDriver {
    fn source(&self) -> &'static str {
        "json"
    }

    fn allows_nesting(&self) -> bool {
        true
    }

    fn should_custom_decode(&self, info: &TypeInfo) -> bool {
        info.capabilities.json || info.capabilities.text
    }

    fn payload<'v>(&self, value: &'v Value) -> Result<Payload<'v>, BoxError> {
        match value.as_str() {
            Some(text) => Ok(Payload::Text(text)),
            None => {
                let encoded = serde_json::to_vec(&serde_json::Value::from(value))?;
                Ok(Payload::Encoded(encoded))
            }
        }
    }
}

impl Format for DictDriver {
    type Raw = serde_json::Value;

    fn wrap(&self, raw: serde_json::Value) -> Value {
        Value::from(raw)
    }

    fn parse(&self, bytes: &[u8]) -> Result<serde_json::Value, InputError> {
        serde_json::from_slice(bytes).map_err(|err| InputError::json(&err, bytes))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Scalar(Scalar::Null),
            serde_json::Value::Bool(value) => Value::from(value),
            serde_json::Value::Number(number) => Value::Scalar(number_to_scalar(&number)),
            serde_json::Value::String(text) => Value::string(text),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Dict(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect::<Dict>(),
            ),
        }
    }
}

fn number_to_scalar(number: &Number) -> Scalar {
    if let Some(value) = number.as_u64() {
        Scalar::U64(value)
    } else if let Some(value) = number.as_i64() {
        Scalar::I64(value)
    } else {
        number.as_f64().map_or(Scalar::Null, Scalar::F64)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Dict(dict) => serde_json::Value::Object(
                dict.iter()
                    .map(|(key, value)| (key.to_string(), serde_json::Value::from(value)))
                    .collect(),
            ),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Scalar(scalar) => match scalar {
                Scalar::String(text) => serde_json::Value::String(text.clone()),
                Scalar::U64(value) => serde_json::Value::from(*value),
                Scalar::I64(value) => serde_json::Value::from(*value),
                Scalar::F64(value) => {
                    Number::from_f64(*value).map_or(serde_json::Value::Null, serde_json::Value::Number)
                }
                Scalar::U128(value) => u64::try_from(*value)
                    .map_or_else(|_| value.to_string().into(), serde_json::Value::from),
                Scalar::I128(value) => i64::try_from(*value)
                    .map_or_else(|_| value.to_string().into(), serde_json::Value::from),
                Scalar::Bool(value) => serde_json::Value::Bool(*value),
                Scalar::Null => serde_json::Value::Null,
            },
        }
    }
}
