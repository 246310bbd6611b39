//! Field accumulator for search documents
//!
//! Encoders add typed fields at dotted paths; the document keeps every
//! insertion in order and only resolves collisions when it is serialized
//! (see [`Document::serialize`]).

mod serialize;

pub(crate) use serialize::format_timestamp;

use std::collections::BTreeMap;

use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};
use opentelemetry_proto::tonic::trace::v1::span;

/// A typed document value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    /// Nanoseconds since the Unix epoch
    Timestamp(u64),
    Array(Vec<Value>),
    Object(Document),
}

impl Value {
    /// Convert an attribute value. Maps become nested documents, bytes are
    /// rendered as lowercase hex.
    pub fn from_attribute(value: &AnyValue) -> Self {
        match value.value.as_ref() {
            None => Value::Nil,
            Some(any_value::Value::StringValue(s)) => Value::String(s.clone()),
            Some(any_value::Value::BoolValue(b)) => Value::Bool(*b),
            Some(any_value::Value::IntValue(i)) => Value::Int(*i),
            Some(any_value::Value::DoubleValue(d)) => Value::Double(*d),
            Some(any_value::Value::BytesValue(b)) => Value::String(hex::encode(b)),
            Some(any_value::Value::ArrayValue(arr)) => {
                Value::Array(arr.values.iter().map(Value::from_attribute).collect())
            }
            Some(any_value::Value::KvlistValue(kv)) => {
                Value::Object(Document::from_attributes(&kv.values))
            }
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Array(values) => values.is_empty(),
            Value::Object(doc) => doc.fields.is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Field {
    key: String,
    value: Value,
}

/// Ordered collection of document fields plus per-field dynamic template
/// hints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<Field>,
    dynamic_templates: BTreeMap<String, String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document holding `attributes` at the top level
    pub fn from_attributes(attributes: &[KeyValue]) -> Self {
        let mut doc = Document::new();
        doc.add_attributes("", attributes);
        doc
    }

    /// Number of accumulated fields, duplicates included
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Add a field. Multiple additions under one key are all kept.
    pub fn add(&mut self, key: impl Into<String>, value: Value) {
        self.fields.push(Field {
            key: key.into(),
            value,
        });
    }

    /// Add a string field; empty strings are skipped.
    pub fn add_string(&mut self, key: impl Into<String>, value: &str) {
        if !value.is_empty() {
            self.add(key, Value::String(value.to_string()));
        }
    }

    pub fn add_int(&mut self, key: impl Into<String>, value: i64) {
        self.add(key, Value::Int(value));
    }

    pub fn add_bool(&mut self, key: impl Into<String>, value: bool) {
        self.add(key, Value::Bool(value));
    }

    /// Add a timestamp given in nanoseconds since the Unix epoch.
    pub fn add_timestamp(&mut self, key: impl Into<String>, unix_nanos: u64) {
        self.add(key, Value::Timestamp(unix_nanos));
    }

    /// Add a trace id as hex; empty or all-zero ids are skipped.
    pub fn add_trace_id(&mut self, key: impl Into<String>, id: &[u8]) {
        self.add_id(key, id);
    }

    /// Add a span id as hex; empty or all-zero ids are skipped.
    pub fn add_span_id(&mut self, key: impl Into<String>, id: &[u8]) {
        self.add_id(key, id);
    }

    fn add_id(&mut self, key: impl Into<String>, id: &[u8]) {
        if !is_empty_id(id) {
            self.add(key, Value::String(hex::encode(id)));
        }
    }

    /// Add an attribute value. Maps are flattened into `key.<entry>` fields
    /// and empty values are skipped.
    pub fn add_attribute(&mut self, key: impl Into<String>, value: &AnyValue) {
        let key = key.into();
        match value.value.as_ref() {
            None => {}
            Some(any_value::Value::KvlistValue(kv)) => self.add_attributes(&key, &kv.values),
            Some(_) => self.add(key, Value::from_attribute(value)),
        }
    }

    /// Add every attribute under `prefix` (or at the top level when empty).
    pub fn add_attributes(&mut self, prefix: &str, attributes: &[KeyValue]) {
        for kv in attributes {
            if let Some(value) = kv.value.as_ref() {
                self.add_attribute(flatten_key(prefix, &kv.key), value);
            }
        }
    }

    /// Inline span events as `<prefix>.<name>.time` plus the event attributes
    /// under `<prefix>.<name>`.
    pub fn add_events(&mut self, prefix: &str, events: &[span::Event]) {
        for event in events {
            self.add_timestamp(
                flatten_key(prefix, &format!("{}.time", event.name)),
                event.time_unix_nano,
            );
            self.add_attributes(&flatten_key(prefix, &event.name), &event.attributes);
        }
    }

    /// Add span links as an array of `{trace.id, span.id}` objects.
    pub fn add_links(&mut self, key: impl Into<String>, links: &[span::Link]) {
        let values = links
            .iter()
            .map(|link| {
                let mut doc = Document::new();
                doc.add_trace_id("trace.id", &link.trace_id);
                doc.add_span_id("span.id", &link.span_id);
                Value::Object(doc)
            })
            .collect();
        self.add(key, Value::Array(values));
    }

    /// Record a dynamic template hint for the field at `path`.
    pub fn add_dynamic_template(&mut self, path: impl Into<String>, template: impl Into<String>) {
        self.dynamic_templates.insert(path.into(), template.into());
    }

    /// Dynamic template hints accumulated so far, keyed by field path
    pub fn dynamic_templates(&self) -> &BTreeMap<String, String> {
        &self.dynamic_templates
    }
}

/// Join `prefix` and `key` with a dot, or return `key` when there is no prefix.
pub fn flatten_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn is_empty_id(id: &[u8]) -> bool {
    id.iter().all(|b| *b == 0)
}
