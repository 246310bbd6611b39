//! Helpers for reading and rendering OTLP `AnyValue` attributes.

use base64::Engine;
use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};

use crate::error::Result;

static EMPTY_VALUE: AnyValue = AnyValue { value: None };

/// Look up the first attribute with `key`.
///
/// A key that is present without a value yields an empty `AnyValue`, so
/// presence and content can be checked independently.
pub fn find<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a AnyValue> {
    attributes
        .iter()
        .find(|kv| kv.key == key)
        .map(|kv| kv.value.as_ref().unwrap_or(&EMPTY_VALUE))
}

/// String content of `value`, or `""` when it is not a string.
pub fn as_str(value: &AnyValue) -> &str {
    match value.value.as_ref() {
        Some(any_value::Value::StringValue(s)) => s,
        _ => "",
    }
}

/// Display name of the value's type, used in error messages.
pub fn type_name(value: &AnyValue) -> &'static str {
    match value.value.as_ref() {
        None => "Empty",
        Some(any_value::Value::StringValue(_)) => "Str",
        Some(any_value::Value::BoolValue(_)) => "Bool",
        Some(any_value::Value::IntValue(_)) => "Int",
        Some(any_value::Value::DoubleValue(_)) => "Double",
        Some(any_value::Value::ArrayValue(_)) => "Slice",
        Some(any_value::Value::KvlistValue(_)) => "Map",
        Some(any_value::Value::BytesValue(_)) => "Bytes",
    }
}

/// Convert an AnyValue into its raw JSON representation.
///
/// Bytes are base64 encoded; non-finite doubles become strings since JSON
/// cannot carry them.
pub fn to_json(value: &AnyValue) -> JsonValue {
    match value.value.as_ref() {
        None => JsonValue::Null,
        Some(any_value::Value::StringValue(s)) => JsonValue::String(s.clone()),
        Some(any_value::Value::BoolValue(b)) => JsonValue::Bool(*b),
        Some(any_value::Value::IntValue(i)) => JsonValue::Number((*i).into()),
        Some(any_value::Value::DoubleValue(d)) => double_to_json(*d),
        Some(any_value::Value::BytesValue(b)) => {
            JsonValue::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
        Some(any_value::Value::ArrayValue(arr)) => {
            JsonValue::Array(arr.values.iter().map(to_json).collect())
        }
        Some(any_value::Value::KvlistValue(kv)) => attributes_to_json(&kv.values),
    }
}

/// Convert a list of attributes into a JSON object keyed by attribute name.
pub fn attributes_to_json(attributes: &[KeyValue]) -> JsonValue {
    let mut map = JsonMap::new();
    for kv in attributes {
        let value = kv.value.as_ref().map(to_json).unwrap_or(JsonValue::Null);
        map.insert(kv.key.clone(), value);
    }
    JsonValue::Object(map)
}

pub(crate) fn double_to_json(d: f64) -> JsonValue {
    match JsonNumber::from_f64(d) {
        Some(n) => JsonValue::Number(n),
        None if d.is_nan() => JsonValue::String("NaN".to_string()),
        None if d > 0.0 => JsonValue::String("Infinity".to_string()),
        None => JsonValue::String("-Infinity".to_string()),
    }
}

/// Write an AnyValue as JSON, keeping map entries in their original order.
pub fn write_any_value(buf: &mut Vec<u8>, value: &AnyValue) -> Result<()> {
    match value.value.as_ref() {
        Some(any_value::Value::ArrayValue(arr)) => {
            buf.push(b'[');
            for (i, val) in arr.values.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_any_value(buf, val)?;
            }
            buf.push(b']');
        }
        Some(any_value::Value::KvlistValue(kv)) => write_key_values(buf, &kv.values)?,
        _ => serde_json::to_writer(&mut *buf, &to_json(value))?,
    }
    Ok(())
}

/// Write attributes as a JSON object, keeping their original order.
pub fn write_key_values(buf: &mut Vec<u8>, attributes: &[KeyValue]) -> Result<()> {
    buf.push(b'{');
    for (i, kv) in attributes.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        serde_json::to_writer(&mut *buf, &kv.key)?;
        buf.push(b':');
        match &kv.value {
            Some(v) => write_any_value(buf, v)?,
            None => buf.extend_from_slice(b"null"),
        }
    }
    buf.push(b'}');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::{ArrayValue, KeyValueList};

    fn kv(key: &str, value: any_value::Value) -> KeyValue {
        KeyValue {
            key: key.to_string(),
            value: Some(AnyValue { value: Some(value) }),
        }
    }

    #[test]
    fn find_returns_first_match() {
        let attrs = vec![
            kv("a", any_value::Value::StringValue("one".into())),
            kv("a", any_value::Value::StringValue("two".into())),
        ];
        assert_eq!(as_str(find(&attrs, "a").unwrap()), "one");
        assert!(find(&attrs, "b").is_none());
    }

    #[test]
    fn as_str_is_empty_for_non_strings() {
        let v = AnyValue {
            value: Some(any_value::Value::IntValue(3)),
        };
        assert_eq!(as_str(&v), "");
        assert_eq!(type_name(&v), "Int");
    }

    #[test]
    fn write_keeps_map_order() {
        let body = AnyValue {
            value: Some(any_value::Value::KvlistValue(KeyValueList {
                values: vec![
                    kv("z", any_value::Value::IntValue(1)),
                    kv(
                        "a",
                        any_value::Value::ArrayValue(ArrayValue {
                            values: vec![AnyValue {
                                value: Some(any_value::Value::BoolValue(true)),
                            }],
                        }),
                    ),
                ],
            })),
        };
        let mut buf = Vec::new();
        write_any_value(&mut buf, &body).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), r#"{"z":1,"a":[true]}"#);
    }

    #[test]
    fn non_finite_doubles_become_strings() {
        assert_eq!(double_to_json(f64::NAN), JsonValue::String("NaN".into()));
        assert_eq!(
            double_to_json(f64::NEG_INFINITY),
            JsonValue::String("-Infinity".into())
        );
    }
}
