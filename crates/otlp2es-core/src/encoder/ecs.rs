//! `ecs` mapping mode
//!
//! Attributes are renamed to Elastic Common Schema fields level by level,
//! then the composite ECS fields are derived from the resource.

use opentelemetry_proto::tonic::common::v1::{any_value, KeyValue};
use opentelemetry_proto::tonic::logs::v1::{LogRecord, SeverityNumber};
use opentelemetry_proto::tonic::trace::v1::{status::StatusCode, Span};
use tracing::debug;

use super::{
    add_data_stream_attributes, delegate, DocumentEncoder, DynamicTemplates, LogEncoder,
    MetricsEncoder, NopSpanEvents, ProfilesUnsupported, SpanEncoder,
};
use crate::conversion::{
    ConversionMap, LOG_RECORD_ATTRS, RESOURCE_ATTRS, RESOURCE_ATTRS_TO_PRESERVE, SCOPE_ATTRS,
    SPAN_ATTRS,
};
use crate::datapoints::DataPoint;
use crate::document::Document;
use crate::ecs::{
    encode_agent_name, encode_agent_version, encode_attributes, encode_host_os_type,
    encode_log_timestamp,
};
use crate::error::{EncodeError, Result};
use crate::index::Index;
use crate::mode::MappingMode;
use crate::EncodingContext;

/// Aggregates data points sharing resource, scope and timestamp into one
/// ECS document.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcsDataPointsEncoder;

impl MetricsEncoder for EcsDataPointsEncoder {
    fn encode_metrics(
        &self,
        ec: &EncodingContext<'_>,
        data_points: &[DataPoint<'_>],
        validation_errors: &mut Vec<EncodeError>,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<DynamicTemplates> {
        // Points are grouped upstream; the first one speaks for the group.
        let Some(dp0) = data_points.first() else {
            return Ok(DynamicTemplates::new());
        };

        let mut document = Document::new();
        encode_attributes(
            &mut document,
            &ec.resource.attributes,
            &RESOURCE_ATTRS,
            &RESOURCE_ATTRS_TO_PRESERVE,
        );
        document.add_timestamp("@timestamp", dp0.timestamp());
        document.add_attributes("", dp0.attributes());
        add_data_stream_attributes(&mut document, "", idx);

        for dp in data_points {
            let name = &dp.metric().name;
            match dp.value() {
                Ok(value) => {
                    let template = dp.dynamic_template();
                    if !template.is_empty() {
                        document.add_dynamic_template(name.as_str(), template);
                    }
                    document.add(name.as_str(), value);
                }
                Err(err) => {
                    debug!(metric = %name, error = %err, "skipping data point");
                    validation_errors.push(err);
                }
            }
        }

        document.serialize(buf, true)?;
        Ok(document.dynamic_templates().clone())
    }
}

/// Encoder for the `ecs` mode
#[derive(Debug, Clone)]
pub struct EcsModeEncoder {
    mode: MappingMode,
    metrics: EcsDataPointsEncoder,
    span_events: NopSpanEvents,
    profiles: ProfilesUnsupported,
}

impl EcsModeEncoder {
    pub fn new(mode: MappingMode) -> Self {
        Self {
            mode,
            metrics: EcsDataPointsEncoder,
            span_events: NopSpanEvents,
            profiles: ProfilesUnsupported::new(mode),
        }
    }

    fn encode_levels(
        document: &mut Document,
        ec: &EncodingContext<'_>,
        record_attrs: &[KeyValue],
        record_conversion: &ConversionMap,
    ) {
        encode_attributes(
            document,
            &ec.resource.attributes,
            &RESOURCE_ATTRS,
            &RESOURCE_ATTRS_TO_PRESERVE,
        );
        encode_attributes(
            document,
            &ec.scope.attributes,
            &SCOPE_ATTRS,
            &RESOURCE_ATTRS_TO_PRESERVE,
        );
        encode_attributes(
            document,
            record_attrs,
            record_conversion,
            &RESOURCE_ATTRS_TO_PRESERVE,
        );
    }
}

impl LogEncoder for EcsModeEncoder {
    fn encode_log(
        &self,
        ec: &EncodingContext<'_>,
        record: &LogRecord,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        let mut document = Document::new();
        Self::encode_levels(&mut document, ec, &record.attributes, &LOG_RECORD_ATTRS);
        add_data_stream_attributes(&mut document, "", idx);

        encode_agent_name(&mut document, ec.resource);
        encode_agent_version(&mut document, ec.resource);
        encode_host_os_type(&mut document, ec.resource);
        // After attributes so an attribute named @timestamp cannot win
        encode_log_timestamp(&mut document, record);
        document.add_trace_id("trace.id", &record.trace_id);
        document.add_span_id("span.id", &record.span_id);
        if record.severity_number != SeverityNumber::Unspecified as i32 {
            document.add_int("event.severity", i64::from(record.severity_number));
        }
        document.add_string("log.level", &record.severity_text);

        if let Some(body) = record.body.as_ref() {
            if matches!(body.value, Some(any_value::Value::StringValue(_))) {
                document.add_attribute("message", body);
            }
        }

        document.serialize(buf, true)
    }
}

impl SpanEncoder for EcsModeEncoder {
    fn encode_span(
        &self,
        ec: &EncodingContext<'_>,
        span: &Span,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        let mut document = Document::new();
        Self::encode_levels(&mut document, ec, &span.attributes, &SPAN_ATTRS);
        encode_host_os_type(&mut document, ec.resource);
        add_data_stream_attributes(&mut document, "", idx);

        document.add_timestamp("@timestamp", span.start_time_unix_nano);
        document.add_trace_id("trace.id", &span.trace_id);
        document.add_span_id("span.id", &span.span_id);
        document.add_string("span.name", &span.name);
        document.add_span_id("parent.id", &span.parent_span_id);
        match span.status.as_ref().map(|s| StatusCode::try_from(s.code)) {
            Some(Ok(StatusCode::Ok)) => document.add_string("event.outcome", "success"),
            Some(Ok(StatusCode::Error)) => document.add_string("event.outcome", "failure"),
            _ => {}
        }
        document.add_links("span.links", &span.links);

        document.serialize(buf, true)
    }
}

delegate!(EcsModeEncoder, metrics => metrics);
delegate!(EcsModeEncoder, span_events => span_events);
delegate!(EcsModeEncoder, profiles => profiles);

impl DocumentEncoder for EcsModeEncoder {
    fn mode(&self) -> MappingMode {
        self.mode
    }
}
