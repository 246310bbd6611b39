//! Native OpenTelemetry document layout
//!
//! Unlike the other modes, signal fields keep their OTLP names and
//! attributes are written as objects with their original keys:
//!
//! ```text
//! { "@timestamp": ..., "attributes": { "http.method": "GET" },
//!   "resource": { "attributes": {...}, "schema_url": ... },
//!   "scope": { "name": ..., "attributes": {...} }, ... }
//! ```

mod profile;

use std::collections::HashSet;

use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};
use opentelemetry_proto::tonic::logs::v1::LogRecord;
use opentelemetry_proto::tonic::trace::v1::{span, Span};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::debug;

use crate::attributes::{attributes_to_json, to_json};
use crate::datapoints::DataPoint;
use crate::document::format_timestamp;
use crate::ecs::log_timestamp;
use crate::encoder::{DynamicTemplates, PushDocument};
use crate::error::{EncodeError, Result};
use crate::index::Index;
use crate::profile::Profile;
use crate::semconv;
use crate::spans::{id_to_hex_or_empty, span_kind_name, status_code_name};
use crate::EncodingContext;

pub use profile::ProfilingIndices;

type Object = JsonMap<String, JsonValue>;

/// Serializer for the native OTel layout.
#[derive(Debug, Clone, Default)]
pub struct OtelSerializer {
    profiling: ProfilingIndices,
}

impl OtelSerializer {
    pub fn new() -> Result<Self> {
        Ok(Self::with_profiling_indices(ProfilingIndices::default()))
    }

    /// Serializer routing profile documents to `profiling`
    pub fn with_profiling_indices(profiling: ProfilingIndices) -> Self {
        debug!(
            stackframes = %profiling.stackframes,
            stacktraces = %profiling.stacktraces,
            events = %profiling.events,
            "created otel serializer"
        );
        Self { profiling }
    }

    pub fn serialize_log(
        &self,
        ec: &EncodingContext<'_>,
        record: &LogRecord,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        let mut doc = Object::new();
        put_timestamp(&mut doc, "@timestamp", log_timestamp(record));
        if record.observed_time_unix_nano != 0 {
            put_timestamp(&mut doc, "observed_timestamp", record.observed_time_unix_nano);
        }
        put_data_stream(&mut doc, idx);
        put_id(&mut doc, "trace_id", &record.trace_id);
        put_id(&mut doc, "span_id", &record.span_id);
        put_str(&mut doc, "severity_text", &record.severity_text);
        if record.severity_number != 0 {
            doc.insert(
                "severity_number".into(),
                JsonValue::from(record.severity_number),
            );
        }
        if let Some(name) = event_name(record) {
            doc.insert("event_name".into(), JsonValue::String(name.to_string()));
        }
        put_attributes(&mut doc, &record.attributes, record.dropped_attributes_count);
        if record.flags != 0 {
            doc.insert("flags".into(), JsonValue::from(record.flags));
        }
        put_resource(&mut doc, ec);
        put_scope(&mut doc, ec);
        if let Some(body) = record.body.as_ref().and_then(body_json) {
            doc.insert("body".into(), body);
        }
        write(buf, doc)
    }

    pub fn serialize_span(
        &self,
        ec: &EncodingContext<'_>,
        span: &Span,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        let mut doc = Object::new();
        put_timestamp(&mut doc, "@timestamp", span.start_time_unix_nano);
        put_data_stream(&mut doc, idx);
        put_id(&mut doc, "trace_id", &span.trace_id);
        put_id(&mut doc, "span_id", &span.span_id);
        put_id(&mut doc, "parent_span_id", &span.parent_span_id);
        put_str(&mut doc, "trace_state", &span.trace_state);
        put_str(&mut doc, "name", &span.name);
        put_str(&mut doc, "kind", span_kind_name(span.kind));
        doc.insert(
            "duration".into(),
            JsonValue::from(
                span.end_time_unix_nano
                    .saturating_sub(span.start_time_unix_nano),
            ),
        );
        put_attributes(&mut doc, &span.attributes, span.dropped_attributes_count);
        if span.dropped_events_count != 0 {
            doc.insert(
                "dropped_events_count".into(),
                JsonValue::from(span.dropped_events_count),
            );
        }
        if !span.links.is_empty() {
            doc.insert(
                "links".into(),
                JsonValue::Array(span.links.iter().map(link_json).collect()),
            );
        }
        if span.dropped_links_count != 0 {
            doc.insert(
                "dropped_links_count".into(),
                JsonValue::from(span.dropped_links_count),
            );
        }

        let mut status = Object::new();
        status.insert(
            "code".into(),
            JsonValue::String(status_code_name(span.status.as_ref()).into()),
        );
        if let Some(message) = span.status.as_ref().map(|s| s.message.as_str()) {
            put_str(&mut status, "message", message);
        }
        doc.insert("status".into(), JsonValue::Object(status));

        put_resource(&mut doc, ec);
        put_scope(&mut doc, ec);
        write(buf, doc)
    }

    /// Span events are documents of their own, linked to the span by id.
    pub fn serialize_span_event(
        &self,
        ec: &EncodingContext<'_>,
        span: &Span,
        event: &span::Event,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        let mut doc = Object::new();
        put_timestamp(&mut doc, "@timestamp", event.time_unix_nano);
        put_data_stream(&mut doc, idx);
        put_id(&mut doc, "trace_id", &span.trace_id);
        put_id(&mut doc, "span_id", &span.span_id);
        put_str(&mut doc, "event_name", &event.name);

        let mut attributes = attributes_object(&event.attributes);
        attributes.insert(
            semconv::EVENT_NAME.into(),
            JsonValue::String(event.name.clone()),
        );
        doc.insert("attributes".into(), JsonValue::Object(attributes));
        if event.dropped_attributes_count != 0 {
            doc.insert(
                "dropped_attributes_count".into(),
                JsonValue::from(event.dropped_attributes_count),
            );
        }

        put_resource(&mut doc, ec);
        put_scope(&mut doc, ec);
        write(buf, doc)
    }

    /// One document for a group of points sharing resource, scope, timestamp
    /// and attributes. Metric values go under `metrics.<name>`.
    pub fn serialize_metrics(
        &self,
        ec: &EncodingContext<'_>,
        data_points: &[DataPoint<'_>],
        validation_errors: &mut Vec<EncodeError>,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<DynamicTemplates> {
        let Some(dp0) = data_points.first() else {
            return Ok(DynamicTemplates::new());
        };

        let mut doc = Object::new();
        put_timestamp(&mut doc, "@timestamp", dp0.timestamp());
        if dp0.start_timestamp() != 0 {
            put_timestamp(&mut doc, "start_timestamp", dp0.start_timestamp());
        }
        put_data_stream(&mut doc, idx);
        put_attributes(&mut doc, dp0.attributes(), 0);
        put_resource(&mut doc, ec);
        put_scope(&mut doc, ec);

        let mut templates = DynamicTemplates::new();
        let mut metrics = Object::new();
        let mut seen = HashSet::new();
        for dp in data_points {
            let name = dp.metric().name.as_str();
            if !seen.insert(name) {
                validation_errors.push(EncodeError::DuplicateMetric {
                    metric: name.to_string(),
                });
                continue;
            }
            match dp.value() {
                Ok(value) => {
                    metrics.insert(name.to_string(), value.to_json(false));
                    let template = dp.dynamic_template();
                    if !template.is_empty() {
                        templates.insert(format!("metrics.{}", name), template.to_string());
                    }
                }
                Err(err) => {
                    debug!(metric = %name, error = %err, "skipping data point");
                    validation_errors.push(err);
                }
            }
        }
        doc.insert("metrics".into(), JsonValue::Object(metrics));

        write(buf, doc)?;
        Ok(templates)
    }

    /// Push the stack frame, stack trace and event documents of `profile`.
    pub fn serialize_profile(
        &self,
        ec: &EncodingContext<'_>,
        profile: &Profile,
        push: &mut PushDocument<'_>,
    ) -> Result<()> {
        profile::serialize(&self.profiling, ec, profile, push)
    }
}

/// Event name of a log record: the `event_name` field, else the
/// `event.name` attribute.
fn event_name(record: &LogRecord) -> Option<&str> {
    if !record.event_name.is_empty() {
        return Some(&record.event_name);
    }
    record
        .attributes
        .iter()
        .find(|kv| kv.key == semconv::EVENT_NAME)
        .and_then(|kv| match kv.value.as_ref()?.value.as_ref()? {
            any_value::Value::StringValue(s) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        })
}

/// Strings go to `body.text`; structured values go to `body.structured`.
fn body_json(body: &AnyValue) -> Option<JsonValue> {
    let mut object = Object::new();
    match body.value.as_ref()? {
        any_value::Value::StringValue(s) => {
            object.insert("text".into(), JsonValue::String(s.clone()));
        }
        any_value::Value::KvlistValue(_) | any_value::Value::ArrayValue(_) => {
            object.insert("structured".into(), to_json(body));
        }
        _ => {
            object.insert("text".into(), JsonValue::String(to_json(body).to_string()));
        }
    }
    Some(JsonValue::Object(object))
}

fn link_json(link: &span::Link) -> JsonValue {
    let mut object = Object::new();
    put_str(&mut object, "trace_id", &id_to_hex_or_empty(&link.trace_id));
    put_str(&mut object, "span_id", &id_to_hex_or_empty(&link.span_id));
    put_str(&mut object, "trace_state", &link.trace_state);
    put_attributes(&mut object, &link.attributes, link.dropped_attributes_count);
    JsonValue::Object(object)
}

pub(crate) fn put_timestamp(doc: &mut Object, key: &str, unix_nanos: u64) {
    doc.insert(key.into(), JsonValue::String(format_timestamp(unix_nanos)));
}

pub(crate) fn put_str(doc: &mut Object, key: &str, value: &str) {
    if !value.is_empty() {
        doc.insert(key.into(), JsonValue::String(value.to_string()));
    }
}

fn put_id(doc: &mut Object, key: &str, id: &[u8]) {
    put_str(doc, key, &id_to_hex_or_empty(id));
}

pub(crate) fn put_data_stream(doc: &mut Object, idx: &Index) {
    if !idx.is_data_stream() {
        return;
    }
    let mut data_stream = Object::new();
    data_stream.insert("type".into(), JsonValue::String(idx.type_.clone()));
    data_stream.insert("dataset".into(), JsonValue::String(idx.dataset.clone()));
    data_stream.insert("namespace".into(), JsonValue::String(idx.namespace.clone()));
    doc.insert("data_stream".into(), JsonValue::Object(data_stream));
}

fn attributes_object(attributes: &[KeyValue]) -> Object {
    match attributes_to_json(attributes) {
        JsonValue::Object(object) => object,
        _ => Object::new(),
    }
}

/// `attributes` object (omitted when empty) and its dropped count.
pub(crate) fn put_attributes(doc: &mut Object, attributes: &[KeyValue], dropped: u32) {
    if !attributes.is_empty() {
        doc.insert(
            "attributes".into(),
            JsonValue::Object(attributes_object(attributes)),
        );
    }
    if dropped != 0 {
        doc.insert("dropped_attributes_count".into(), JsonValue::from(dropped));
    }
}

pub(crate) fn put_resource(doc: &mut Object, ec: &EncodingContext<'_>) {
    let mut resource = Object::new();
    put_attributes(
        &mut resource,
        &ec.resource.attributes,
        ec.resource.dropped_attributes_count,
    );
    put_str(&mut resource, "schema_url", ec.resource_schema_url);
    doc.insert("resource".into(), JsonValue::Object(resource));
}

pub(crate) fn put_scope(doc: &mut Object, ec: &EncodingContext<'_>) {
    let mut scope = Object::new();
    put_str(&mut scope, "name", &ec.scope.name);
    put_str(&mut scope, "version", &ec.scope.version);
    put_attributes(
        &mut scope,
        &ec.scope.attributes,
        ec.scope.dropped_attributes_count,
    );
    put_str(&mut scope, "schema_url", ec.scope_schema_url);
    doc.insert("scope".into(), JsonValue::Object(scope));
}

pub(crate) fn write(buf: &mut Vec<u8>, doc: Object) -> Result<()> {
    serde_json::to_writer(&mut *buf, &JsonValue::Object(doc))?;
    Ok(())
}
