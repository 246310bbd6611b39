// Export request conversion
//
// One protobuf export request in, one bulk body out. Documents that fail to
// encode are logged and skipped so a single bad record never sinks the rest
// of the request.

use std::io::Write;

use anyhow::{Context, Result};
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::InstrumentationScope;
use opentelemetry_proto::tonic::resource::v1::Resource;
use otlp2es_config::ExporterConfig;
use otlp2es_core::{
    group_data_points, new_encoder_with_options, DocumentEncoder, DynamicTemplates, EncodeError,
    EncodingContext, Index, Signal,
};
use prost::Message;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{debug, warn};

/// OTLP export request types accepted as input
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SignalType {
    Logs,
    Traces,
    Metrics,
}

/// Counters for one converted request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertStats {
    /// Documents written to the bulk body
    pub documents: usize,
    /// Records or groups that failed to encode
    pub dropped: usize,
    /// Data points left out of otherwise written metrics documents
    pub validation_errors: usize,
}

/// Encodes decoded export requests with one mapping mode
pub struct Converter {
    encoder: Box<dyn DocumentEncoder>,
    config: ExporterConfig,
}

impl Converter {
    pub fn new(config: ExporterConfig) -> Result<Self> {
        let encoder = new_encoder_with_options(config.mapping.mode, config.encoder_options())
            .context("Failed to create document encoder")?;
        Ok(Self { encoder, config })
    }

    /// Decode `payload` as a `signal` export request and write its bulk body to `out`.
    pub fn convert<W: Write>(
        &self,
        signal: SignalType,
        payload: &[u8],
        out: &mut W,
    ) -> Result<ConvertStats> {
        let mut bulk = BulkWriter::new(out);
        match signal {
            SignalType::Logs => {
                let request = ExportLogsServiceRequest::decode(payload)
                    .context("Failed to decode OTLP logs request")?;
                self.convert_logs(&request, &mut bulk)?;
            }
            SignalType::Traces => {
                let request = ExportTraceServiceRequest::decode(payload)
                    .context("Failed to decode OTLP traces request")?;
                self.convert_traces(&request, &mut bulk)?;
            }
            SignalType::Metrics => {
                let request = ExportMetricsServiceRequest::decode(payload)
                    .context("Failed to decode OTLP metrics request")?;
                self.convert_metrics(&request, &mut bulk)?;
            }
        }
        Ok(bulk.stats)
    }

    fn convert_logs<W: Write>(
        &self,
        request: &ExportLogsServiceRequest,
        bulk: &mut BulkWriter<'_, W>,
    ) -> Result<()> {
        let index = self.config.index_for(Signal::Logs);
        let (empty_resource, empty_scope) = (Resource::default(), InstrumentationScope::default());
        let mut buf = Vec::new();

        for resource_logs in &request.resource_logs {
            let resource = resource_logs.resource.as_ref().unwrap_or(&empty_resource);
            for scope_logs in &resource_logs.scope_logs {
                let scope = scope_logs.scope.as_ref().unwrap_or(&empty_scope);
                let ec = EncodingContext::new(
                    resource,
                    &resource_logs.schema_url,
                    scope,
                    &scope_logs.schema_url,
                );
                for record in &scope_logs.log_records {
                    buf.clear();
                    match self.encoder.encode_log(&ec, record, &index, &mut buf) {
                        Ok(()) => bulk.write(&index, None, &buf)?,
                        Err(e) => bulk.skip(Signal::Logs, &e),
                    }
                }
            }
        }
        Ok(())
    }

    fn convert_traces<W: Write>(
        &self,
        request: &ExportTraceServiceRequest,
        bulk: &mut BulkWriter<'_, W>,
    ) -> Result<()> {
        let span_index = self.config.index_for(Signal::Spans);
        let event_index = self.config.index_for(Signal::SpanEvents);
        let (empty_resource, empty_scope) = (Resource::default(), InstrumentationScope::default());
        let mut buf = Vec::new();

        for resource_spans in &request.resource_spans {
            let resource = resource_spans.resource.as_ref().unwrap_or(&empty_resource);
            for scope_spans in &resource_spans.scope_spans {
                let scope = scope_spans.scope.as_ref().unwrap_or(&empty_scope);
                let ec = EncodingContext::new(
                    resource,
                    &resource_spans.schema_url,
                    scope,
                    &scope_spans.schema_url,
                );
                for span in &scope_spans.spans {
                    buf.clear();
                    match self.encoder.encode_span(&ec, span, &span_index, &mut buf) {
                        Ok(()) => bulk.write(&span_index, None, &buf)?,
                        Err(e) => {
                            bulk.skip(Signal::Spans, &e);
                            continue;
                        }
                    }

                    for event in &span.events {
                        buf.clear();
                        match self
                            .encoder
                            .encode_span_event(&ec, span, event, &event_index, &mut buf)
                        {
                            // Modes that inline events leave the buffer empty
                            Ok(()) if buf.is_empty() => {}
                            Ok(()) => bulk.write(&event_index, None, &buf)?,
                            Err(e) => bulk.skip(Signal::SpanEvents, &e),
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn convert_metrics<W: Write>(
        &self,
        request: &ExportMetricsServiceRequest,
        bulk: &mut BulkWriter<'_, W>,
    ) -> Result<()> {
        let index = self.config.index_for(Signal::Metrics);
        let (empty_resource, empty_scope) = (Resource::default(), InstrumentationScope::default());
        let mut buf = Vec::new();

        for resource_metrics in &request.resource_metrics {
            let resource = resource_metrics.resource.as_ref().unwrap_or(&empty_resource);
            for scope_metrics in &resource_metrics.scope_metrics {
                let scope = scope_metrics.scope.as_ref().unwrap_or(&empty_scope);
                let ec = EncodingContext::new(
                    resource,
                    &resource_metrics.schema_url,
                    scope,
                    &scope_metrics.schema_url,
                );

                let mut validation_errors = Vec::new();
                let groups = group_data_points(scope_metrics, &mut validation_errors);
                debug!(groups = groups.len(), "grouped metric data points");

                for group in &groups {
                    buf.clear();
                    match self.encoder.encode_metrics(
                        &ec,
                        group,
                        &mut validation_errors,
                        &index,
                        &mut buf,
                    ) {
                        Ok(_) if buf.is_empty() => {}
                        Ok(templates) => bulk.write(&index, Some(&templates), &buf)?,
                        Err(e) => bulk.skip(Signal::Metrics, &e),
                    }
                }

                for e in &validation_errors {
                    warn!(error = %e, "metric data point left out of document");
                }
                bulk.stats.validation_errors += validation_errors.len();
            }
        }
        Ok(())
    }
}

/// Writes action line + document pairs and counts what was written
struct BulkWriter<'w, W: Write> {
    out: &'w mut W,
    stats: ConvertStats,
}

impl<'w, W: Write> BulkWriter<'w, W> {
    fn new(out: &'w mut W) -> Self {
        Self {
            out,
            stats: ConvertStats::default(),
        }
    }

    fn write(
        &mut self,
        index: &Index,
        templates: Option<&DynamicTemplates>,
        document: &[u8],
    ) -> Result<()> {
        let action = action_line(index, templates);
        serde_json::to_writer(&mut *self.out, &action).context("Failed to write action line")?;
        self.out.write_all(b"\n")?;
        self.out.write_all(document)?;
        self.out.write_all(b"\n")?;
        self.stats.documents += 1;
        Ok(())
    }

    fn skip(&mut self, signal: Signal, error: &EncodeError) {
        warn!(signal = %signal, error = %error, "dropping document that failed to encode");
        self.stats.dropped += 1;
    }
}

/// Data streams only accept `create`; plain indices get `index`.
fn action_line(index: &Index, templates: Option<&DynamicTemplates>) -> JsonValue {
    let mut meta = JsonMap::new();
    meta.insert("_index".into(), JsonValue::String(index.index.clone()));
    if let Some(templates) = templates.filter(|t| !t.is_empty()) {
        let templates = templates
            .iter()
            .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
            .collect();
        meta.insert("dynamic_templates".into(), JsonValue::Object(templates));
    }

    let op = if index.is_data_stream() {
        "create"
    } else {
        "index"
    };
    let mut action = JsonMap::new();
    action.insert(op.into(), JsonValue::Object(meta));
    JsonValue::Object(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};
    use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
    use opentelemetry_proto::tonic::metrics::v1::{
        metric, number_data_point, Gauge, Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics,
    };
    use opentelemetry_proto::tonic::trace::v1::{span, ResourceSpans, ScopeSpans, Span};
    use otlp2es_core::MappingMode;

    fn string_value(value: &str) -> Option<AnyValue> {
        Some(AnyValue {
            value: Some(any_value::Value::StringValue(value.to_string())),
        })
    }

    fn service_resource() -> Option<Resource> {
        Some(Resource {
            attributes: vec![KeyValue {
                key: "service.name".to_string(),
                value: string_value("checkout"),
            }],
            ..Default::default()
        })
    }

    fn converter(mode: MappingMode) -> Converter {
        let mut config = ExporterConfig::default();
        config.mapping.mode = mode;
        Converter::new(config).unwrap()
    }

    fn run(
        converter: &Converter,
        signal: SignalType,
        payload: &[u8],
    ) -> (Vec<JsonValue>, ConvertStats) {
        let mut out = Vec::new();
        let stats = converter.convert(signal, payload, &mut out).unwrap();
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (lines, stats)
    }

    fn logs_request(body: Option<AnyValue>) -> Vec<u8> {
        ExportLogsServiceRequest {
            resource_logs: vec![ResourceLogs {
                resource: service_resource(),
                scope_logs: vec![ScopeLogs {
                    log_records: vec![LogRecord {
                        time_unix_nano: 1_705_327_800_000_000_000,
                        severity_text: "INFO".to_string(),
                        body,
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
        .encode_to_vec()
    }

    fn traces_request() -> Vec<u8> {
        ExportTraceServiceRequest {
            resource_spans: vec![ResourceSpans {
                resource: service_resource(),
                scope_spans: vec![ScopeSpans {
                    spans: vec![Span {
                        trace_id: vec![1; 16],
                        span_id: vec![2; 8],
                        name: "GET /cart".to_string(),
                        start_time_unix_nano: 1_000,
                        end_time_unix_nano: 2_000,
                        events: vec![span::Event {
                            time_unix_nano: 1_500,
                            name: "retry".to_string(),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
        .encode_to_vec()
    }

    #[test]
    fn logs_become_action_and_document_lines() {
        let (lines, stats) = run(
            &converter(MappingMode::Ecs),
            SignalType::Logs,
            &logs_request(string_value("hello")),
        );

        assert_eq!(stats.documents, 1);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["create"]["_index"], "logs-generic-default");
        assert_eq!(lines[1]["message"], "hello");
        assert_eq!(lines[1]["service"]["name"], "checkout");
    }

    #[test]
    fn failed_records_are_dropped_not_fatal() {
        let (lines, stats) = run(
            &converter(MappingMode::BodyMap),
            SignalType::Logs,
            &logs_request(string_value("not a map")),
        );
        assert!(lines.is_empty());
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.documents, 0);
    }

    #[test]
    fn span_events_are_separate_documents_only_in_otel_mode() {
        let (lines, stats) = run(
            &converter(MappingMode::Otel),
            SignalType::Traces,
            &traces_request(),
        );
        assert_eq!(stats.documents, 2);
        assert_eq!(lines[0]["create"]["_index"], "traces-generic.otel-default");
        assert_eq!(lines[1]["name"], "GET /cart");
        assert_eq!(lines[3]["event_name"], "retry");

        let (lines, stats) = run(
            &converter(MappingMode::None),
            SignalType::Traces,
            &traces_request(),
        );
        assert_eq!(stats.documents, 1);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["Name"], "GET /cart");
    }

    #[test]
    fn metrics_carry_dynamic_templates_in_action_line() {
        let point = |value: Option<number_data_point::Value>| NumberDataPoint {
            time_unix_nano: 1_705_327_800_000_000_000,
            value,
            ..Default::default()
        };
        let gauge = |name: &str, value| Metric {
            name: name.to_string(),
            data: Some(metric::Data::Gauge(Gauge {
                data_points: vec![point(value)],
            })),
            ..Default::default()
        };
        let payload = ExportMetricsServiceRequest {
            resource_metrics: vec![ResourceMetrics {
                resource: service_resource(),
                scope_metrics: vec![ScopeMetrics {
                    metrics: vec![
                        gauge("cpu", Some(number_data_point::Value::AsDouble(0.5))),
                        gauge("broken", None),
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
        .encode_to_vec();

        let mut config = ExporterConfig::default();
        config.mapping.mode = MappingMode::Ecs;
        config.indices.metrics = Some("metrics-fixed".to_string());
        let (lines, stats) = run(&Converter::new(config).unwrap(), SignalType::Metrics, &payload);

        assert_eq!(stats.documents, 1);
        assert_eq!(stats.validation_errors, 1);
        assert_eq!(lines[0]["index"]["_index"], "metrics-fixed");
        assert_eq!(lines[0]["index"]["dynamic_templates"]["cpu"], "gauge_double");
        assert_eq!(lines[1]["cpu"], 0.5);
        assert!(lines[1].get("broken").is_none());
    }

    #[test]
    fn undecodable_payload_is_an_error() {
        let mut out = Vec::new();
        let err = converter(MappingMode::None)
            .convert(SignalType::Logs, &[0xff, 0xff, 0xff], &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to decode OTLP logs request"));
        assert!(out.is_empty());
    }
}
