// Document serialization
//
// Collision rules applied before writing:
// 1. fields are stably sorted by key
// 2. a key that is also the dotted prefix of another key moves to `<key>.value`
// 3. of several fields with the same key the last one added wins
// 4. nil values and empty arrays/objects are not written

use chrono::{DateTime, Utc};
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::{Document, Field, Value};
use crate::attributes::double_to_json;
use crate::error::Result;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

impl Document {
    /// Serialize the document as a JSON object appended to `buf`.
    ///
    /// With `dedot` set, dotted keys are expanded into nested objects;
    /// otherwise every key is written as-is at the top level.
    pub fn serialize(&mut self, buf: &mut Vec<u8>, dedot: bool) -> Result<()> {
        self.dedup();
        serde_json::to_writer(&mut *buf, &self.to_json(dedot))?;
        Ok(())
    }

    /// Resolve key collisions in place, recursing into nested documents.
    pub fn dedup(&mut self) {
        self.fields.sort_by(|a, b| a.key.cmp(&b.key));

        let mut renamed = false;
        for i in 0..self.fields.len() {
            if has_child_key(&self.fields, i) {
                self.fields[i].key.push_str(".value");
                renamed = true;
            }
        }
        if renamed {
            self.fields.sort_by(|a, b| a.key.cmp(&b.key));
        }

        // Keep the last of each run of equal keys.
        self.fields.reverse();
        self.fields.dedup_by(|later, earlier| later.key == earlier.key);
        self.fields.reverse();

        for field in &mut self.fields {
            field.value.dedup();
        }
    }

    fn to_json(&self, dedot: bool) -> JsonValue {
        let mut root = JsonMap::new();
        for field in &self.fields {
            if field.value.is_empty() {
                continue;
            }
            let value = field.value.to_json(dedot);
            if dedot {
                insert_path(&mut root, &field.key, value);
            } else {
                root.insert(field.key.clone(), value);
            }
        }
        JsonValue::Object(root)
    }
}

impl Value {
    fn dedup(&mut self) {
        match self {
            Value::Object(doc) => doc.dedup(),
            Value::Array(values) => values.iter_mut().for_each(Value::dedup),
            _ => {}
        }
    }

    pub(crate) fn to_json(&self, dedot: bool) -> JsonValue {
        match self {
            Value::Nil => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::Number((*i).into()),
            Value::Double(d) => double_to_json(*d),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Timestamp(nanos) => JsonValue::String(format_timestamp(*nanos)),
            Value::Array(values) => JsonValue::Array(
                values
                    .iter()
                    .filter(|v| !matches!(v, Value::Nil))
                    .map(|v| v.to_json(dedot))
                    .collect(),
            ),
            Value::Object(doc) => doc.to_json(dedot),
        }
    }
}

/// True when some later key in the sorted slice extends `fields[i].key` with a dot.
fn has_child_key(fields: &[Field], i: usize) -> bool {
    let key = &fields[i].key;
    fields[i + 1..]
        .iter()
        .take_while(|f| f.key.starts_with(key.as_str()))
        .any(|f| f.key.as_bytes().get(key.len()) == Some(&b'.'))
}

fn insert_path(root: &mut JsonMap<String, JsonValue>, key: &str, value: JsonValue) {
    let mut parts = key.split('.').peekable();
    let mut current = root;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return;
        }
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| JsonValue::Object(JsonMap::new()));
        if !entry.is_object() {
            let scalar = entry.take();
            let mut object = JsonMap::new();
            object.insert("value".to_string(), scalar);
            *entry = JsonValue::Object(object);
        }
        current = match entry {
            JsonValue::Object(map) => map,
            _ => return,
        };
    }
}

/// Format nanoseconds since the epoch as an RFC 3339 UTC timestamp with
/// nanosecond precision.
pub(crate) fn format_timestamp(unix_nanos: u64) -> String {
    let secs = (unix_nanos / 1_000_000_000) as i64;
    let nanos = (unix_nanos % 1_000_000_000) as u32;
    match DateTime::<Utc>::from_timestamp(secs, nanos) {
        Some(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        None => unix_nanos.to_string(),
    }
}
