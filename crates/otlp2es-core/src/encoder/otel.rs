//! `otel` mapping mode: forwards every signal to the native serializer.

use opentelemetry_proto::tonic::logs::v1::LogRecord;
use opentelemetry_proto::tonic::trace::v1::{span, Span};

use super::{
    DocumentEncoder, DynamicTemplates, LogEncoder, MetricsEncoder, ProfileEncoder, PushDocument,
    SpanEncoder, SpanEventEncoder,
};
use crate::datapoints::DataPoint;
use crate::error::{EncodeError, Result};
use crate::index::Index;
use crate::mode::MappingMode;
use crate::otel::OtelSerializer;
use crate::profile::Profile;
use crate::EncodingContext;

/// Encoder for the `otel` mode
#[derive(Debug, Clone)]
pub struct OtelModeEncoder {
    serializer: OtelSerializer,
}

impl OtelModeEncoder {
    pub fn new(serializer: OtelSerializer) -> Self {
        Self { serializer }
    }
}

impl LogEncoder for OtelModeEncoder {
    fn encode_log(
        &self,
        ec: &EncodingContext<'_>,
        record: &LogRecord,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        self.serializer.serialize_log(ec, record, idx, buf)
    }
}

impl SpanEncoder for OtelModeEncoder {
    fn encode_span(
        &self,
        ec: &EncodingContext<'_>,
        span: &Span,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        self.serializer.serialize_span(ec, span, idx, buf)
    }
}

impl SpanEventEncoder for OtelModeEncoder {
    fn encode_span_event(
        &self,
        ec: &EncodingContext<'_>,
        span: &Span,
        event: &span::Event,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        self.serializer.serialize_span_event(ec, span, event, idx, buf)
    }
}

impl MetricsEncoder for OtelModeEncoder {
    fn encode_metrics(
        &self,
        ec: &EncodingContext<'_>,
        data_points: &[DataPoint<'_>],
        validation_errors: &mut Vec<EncodeError>,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<DynamicTemplates> {
        self.serializer
            .serialize_metrics(ec, data_points, validation_errors, idx, buf)
    }
}

impl ProfileEncoder for OtelModeEncoder {
    fn encode_profile(
        &self,
        ec: &EncodingContext<'_>,
        profile: &Profile,
        push: &mut PushDocument<'_>,
    ) -> Result<()> {
        self.serializer.serialize_profile(ec, profile, push)
    }
}

impl DocumentEncoder for OtelModeEncoder {
    fn mode(&self) -> MappingMode {
        MappingMode::Otel
    }
}
