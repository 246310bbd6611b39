//! `none` and `raw` mapping modes
//!
//! Both share one field layout and differ only in the prefix record
//! attributes and inlined span events are written under.

use opentelemetry_proto::tonic::common::v1::{InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::logs::v1::LogRecord;
use opentelemetry_proto::tonic::trace::v1::{span, Span};
use serde_json::{json, Value as JsonValue};

use super::{
    add_data_stream_attributes, delegate, DocumentEncoder, LogEncoder, MetricsUnsupported,
    NopSpanEvents, ProfilesUnsupported, SpanEncoder,
};
use crate::attributes::attributes_to_json;
use crate::document::{flatten_key, Document, Value};
use crate::ecs::log_timestamp;
use crate::error::Result;
use crate::index::Index;
use crate::mode::MappingMode;
use crate::spans::{id_to_hex_or_empty, span_kind_proto_name};
use crate::EncodingContext;

/// Span layout shared by every mode without a span layout of its own.
#[derive(Debug, Clone)]
pub struct NonOtelSpanEncoder {
    attributes_prefix: &'static str,
    events_prefix: &'static str,
    dedot: bool,
}

impl NonOtelSpanEncoder {
    pub fn new(attributes_prefix: &'static str, events_prefix: &'static str, dedot: bool) -> Self {
        Self {
            attributes_prefix,
            events_prefix,
            dedot,
        }
    }
}

impl SpanEncoder for NonOtelSpanEncoder {
    fn encode_span(
        &self,
        ec: &EncodingContext<'_>,
        span: &Span,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        let (status_code, status_message) = span
            .status
            .as_ref()
            .map(|s| (s.code, s.message.as_str()))
            .unwrap_or((0, ""));

        let mut document = Document::new();
        document.add_timestamp("@timestamp", span.start_time_unix_nano);
        document.add_timestamp("EndTimestamp", span.end_time_unix_nano);
        document.add_trace_id("TraceId", &span.trace_id);
        document.add_span_id("SpanId", &span.span_id);
        document.add_span_id("ParentSpanId", &span.parent_span_id);
        document.add_string("Name", &span.name);
        document.add_string("Kind", span_kind_proto_name(span.kind));
        document.add_int("TraceStatus", i64::from(status_code));
        document.add_string("TraceStatusDescription", status_message);
        document.add_string("Link", &span_links_to_string(&span.links));
        document.add_attributes("Resource", &ec.resource.attributes);
        document.add_int(
            "Duration",
            duration_as_micros(span.start_time_unix_nano, span.end_time_unix_nano),
        );
        add_scope(&mut document, ec.scope);
        encode_attributes(&mut document, self.attributes_prefix, &span.attributes, idx);
        document.add_events(self.events_prefix, &span.events);
        document.serialize(buf, self.dedot)
    }
}

/// Encoder for the `none` and `raw` modes
#[derive(Debug, Clone)]
pub struct LegacyModeEncoder {
    mode: MappingMode,
    attributes_prefix: &'static str,
    dedot: bool,
    spans: NonOtelSpanEncoder,
    span_events: NopSpanEvents,
    metrics: MetricsUnsupported,
    profiles: ProfilesUnsupported,
}

impl LegacyModeEncoder {
    pub fn new(
        mode: MappingMode,
        attributes_prefix: &'static str,
        events_prefix: &'static str,
        dedot: bool,
    ) -> Self {
        Self {
            mode,
            attributes_prefix,
            dedot,
            spans: NonOtelSpanEncoder::new(attributes_prefix, events_prefix, dedot),
            span_events: NopSpanEvents,
            metrics: MetricsUnsupported::new(mode),
            profiles: ProfilesUnsupported::new(mode),
        }
    }
}

impl LogEncoder for LegacyModeEncoder {
    fn encode_log(
        &self,
        ec: &EncodingContext<'_>,
        record: &LogRecord,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        let mut document = Document::new();
        // @timestamp keeps documents indexable by the default logs template
        document.add_timestamp("@timestamp", log_timestamp(record));
        document.add_trace_id("TraceId", &record.trace_id);
        document.add_span_id("SpanId", &record.span_id);
        document.add_int("TraceFlags", i64::from(record.flags));
        document.add_string("SeverityText", &record.severity_text);
        document.add_int("SeverityNumber", i64::from(record.severity_number));
        if let Some(body) = record.body.as_ref() {
            document.add_attribute("Body", body);
        }
        document.add_attributes("Resource", &ec.resource.attributes);
        add_scope(&mut document, ec.scope);
        encode_attributes(&mut document, self.attributes_prefix, &record.attributes, idx);
        document.serialize(buf, self.dedot)
    }
}

delegate!(LegacyModeEncoder, spans => spans);
delegate!(LegacyModeEncoder, span_events => span_events);
delegate!(LegacyModeEncoder, metrics => metrics);
delegate!(LegacyModeEncoder, profiles => profiles);

impl DocumentEncoder for LegacyModeEncoder {
    fn mode(&self) -> MappingMode {
        self.mode
    }
}

/// Record attributes under `prefix` followed by the data stream fields.
fn encode_attributes(document: &mut Document, prefix: &str, attributes: &[KeyValue], idx: &Index) {
    document.add_attributes(prefix, attributes);
    add_data_stream_attributes(document, prefix, idx);
}

/// Scope attributes plus the scope name and version under `Scope`.
fn add_scope(document: &mut Document, scope: &InstrumentationScope) {
    document.add_attributes("Scope", &scope.attributes);
    document.add(
        flatten_key("Scope", "name"),
        Value::String(scope.name.clone()),
    );
    document.add(
        flatten_key("Scope", "version"),
        Value::String(scope.version.clone()),
    );
}

/// JSON array of `{attribute, spanID, traceID}` objects. Empty ids are kept
/// as empty strings.
fn span_links_to_string(links: &[span::Link]) -> String {
    let links: Vec<JsonValue> = links
        .iter()
        .map(|link| {
            json!({
                "attribute": attributes_to_json(&link.attributes),
                "spanID": id_to_hex_or_empty(&link.span_id),
                "traceID": id_to_hex_or_empty(&link.trace_id),
            })
        })
        .collect();
    JsonValue::Array(links).to_string()
}

/// Span duration in whole microseconds, truncated. Timestamps are
/// reinterpreted as signed and the difference wraps.
fn duration_as_micros(start_unix_nano: u64, end_unix_nano: u64) -> i64 {
    (end_unix_nano as i64).wrapping_sub(start_unix_nano as i64) / 1000
}
