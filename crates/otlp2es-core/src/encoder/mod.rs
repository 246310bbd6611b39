//! Mapping mode encoders
//!
//! Every mode implements the same five per-signal operations. Support and
//! non-support are composed from small fragments ([`MetricsUnsupported`],
//! [`ProfilesUnsupported`], [`NopSpanEvents`], the shared legacy span layout)
//! rather than re-implemented per mode.
//!
//! Unsupported signals always fail with an error naming the mode. Span events
//! are the exception: every mode except OTel inlines them into the parent
//! span document, so encoding one on its own succeeds without output.

mod bodymap;
mod ecs;
mod legacy;
mod otel;

use std::collections::BTreeMap;

use opentelemetry_proto::tonic::logs::v1::LogRecord;
use opentelemetry_proto::tonic::trace::v1::{span, Span};
use tracing::debug;

use crate::datapoints::DataPoint;
use crate::error::{EncodeError, Result};
use crate::index::Index;
use crate::mode::MappingMode;
use crate::otel::OtelSerializer;
use crate::profile::Profile;
use crate::{EncodingContext, Signal};

pub use bodymap::BodyMapModeEncoder;
pub use ecs::{EcsDataPointsEncoder, EcsModeEncoder};
pub use legacy::{LegacyModeEncoder, NonOtelSpanEncoder};
pub use otel::OtelModeEncoder;

/// Field path to dynamic template name
pub type DynamicTemplates = BTreeMap<String, String>;

/// Sink for documents an encoder routes itself: `(document, document id, index)`
pub type PushDocument<'a> = dyn FnMut(&[u8], &str, &str) -> Result<()> + 'a;

pub trait LogEncoder {
    fn encode_log(
        &self,
        ec: &EncodingContext<'_>,
        record: &LogRecord,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()>;
}

pub trait SpanEncoder {
    fn encode_span(
        &self,
        ec: &EncodingContext<'_>,
        span: &Span,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()>;
}

pub trait SpanEventEncoder {
    fn encode_span_event(
        &self,
        ec: &EncodingContext<'_>,
        span: &Span,
        event: &span::Event,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()>;
}

pub trait MetricsEncoder {
    /// Encode data points sharing resource, scope and timestamp into one
    /// document. Per-point failures go to `validation_errors`; the returned
    /// error is reserved for failures of the document as a whole.
    fn encode_metrics(
        &self,
        ec: &EncodingContext<'_>,
        data_points: &[DataPoint<'_>],
        validation_errors: &mut Vec<EncodeError>,
        idx: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<DynamicTemplates>;
}

pub trait ProfileEncoder {
    fn encode_profile(
        &self,
        ec: &EncodingContext<'_>,
        profile: &Profile,
        push: &mut PushDocument<'_>,
    ) -> Result<()>;
}

/// A complete mapping mode encoder.
///
/// Encoders hold no per-call state and are shared across threads.
pub trait DocumentEncoder:
    LogEncoder + SpanEncoder + SpanEventEncoder + MetricsEncoder + ProfileEncoder + Send + Sync
{
    fn mode(&self) -> MappingMode;
}

/// Options for the legacy (`none`, `raw`) modes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Expand dotted keys into nested objects when serializing
    pub dedot: bool,
}

/// Construct the encoder for `mode` with default options.
pub fn new_encoder(mode: MappingMode) -> Result<Box<dyn DocumentEncoder>> {
    new_encoder_with_options(mode, EncoderOptions::default())
}

/// Construct the encoder for `mode`.
///
/// Called once per exporter; the OTel serializer's setup error is returned
/// unchanged.
pub fn new_encoder_with_options(
    mode: MappingMode,
    options: EncoderOptions,
) -> Result<Box<dyn DocumentEncoder>> {
    let encoder: Box<dyn DocumentEncoder> = match mode {
        MappingMode::None => Box::new(LegacyModeEncoder::new(
            mode,
            "Attributes",
            "Events",
            options.dedot,
        )),
        MappingMode::Raw => Box::new(LegacyModeEncoder::new(mode, "", "", options.dedot)),
        MappingMode::Ecs => Box::new(EcsModeEncoder::new(mode)),
        MappingMode::BodyMap => Box::new(BodyMapModeEncoder::new(mode)),
        MappingMode::Otel => Box::new(OtelModeEncoder::new(OtelSerializer::new()?)),
    };
    debug!(mode = %mode, dedot = options.dedot, "constructed document encoder");
    Ok(encoder)
}

/// Metrics fragment for modes without a metrics layout
#[derive(Debug, Clone, Copy)]
pub struct MetricsUnsupported {
    mode: MappingMode,
}

impl MetricsUnsupported {
    pub fn new(mode: MappingMode) -> Self {
        Self { mode }
    }
}

impl MetricsEncoder for MetricsUnsupported {
    fn encode_metrics(
        &self,
        _: &EncodingContext<'_>,
        _: &[DataPoint<'_>],
        _: &mut Vec<EncodeError>,
        _: &Index,
        _: &mut Vec<u8>,
    ) -> Result<DynamicTemplates> {
        Err(EncodeError::UnsupportedSignal {
            mode: self.mode,
            signal: Signal::Metrics,
        })
    }
}

/// Profiles fragment for modes without a profiles layout
#[derive(Debug, Clone, Copy)]
pub struct ProfilesUnsupported {
    mode: MappingMode,
}

impl ProfilesUnsupported {
    pub fn new(mode: MappingMode) -> Self {
        Self { mode }
    }
}

impl ProfileEncoder for ProfilesUnsupported {
    fn encode_profile(
        &self,
        _: &EncodingContext<'_>,
        _: &Profile,
        _: &mut PushDocument<'_>,
    ) -> Result<()> {
        Err(EncodeError::UnsupportedSignal {
            mode: self.mode,
            signal: Signal::Profiles,
        })
    }
}

/// Span events fragment for modes that store events inside the span document
#[derive(Debug, Clone, Copy, Default)]
pub struct NopSpanEvents;

impl SpanEventEncoder for NopSpanEvents {
    fn encode_span_event(
        &self,
        _: &EncodingContext<'_>,
        _: &Span,
        _: &span::Event,
        _: &Index,
        _: &mut Vec<u8>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Implement a per-signal trait by forwarding to the fragment in `$field`.
macro_rules! delegate {
    ($ty:ty, span_events => $field:ident) => {
        impl $crate::encoder::SpanEventEncoder for $ty {
            fn encode_span_event(
                &self,
                ec: &$crate::EncodingContext<'_>,
                span: &opentelemetry_proto::tonic::trace::v1::Span,
                event: &opentelemetry_proto::tonic::trace::v1::span::Event,
                idx: &$crate::index::Index,
                buf: &mut Vec<u8>,
            ) -> $crate::error::Result<()> {
                $crate::encoder::SpanEventEncoder::encode_span_event(
                    &self.$field,
                    ec,
                    span,
                    event,
                    idx,
                    buf,
                )
            }
        }
    };
    ($ty:ty, metrics => $field:ident) => {
        impl $crate::encoder::MetricsEncoder for $ty {
            fn encode_metrics(
                &self,
                ec: &$crate::EncodingContext<'_>,
                data_points: &[$crate::datapoints::DataPoint<'_>],
                validation_errors: &mut Vec<$crate::error::EncodeError>,
                idx: &$crate::index::Index,
                buf: &mut Vec<u8>,
            ) -> $crate::error::Result<$crate::encoder::DynamicTemplates> {
                $crate::encoder::MetricsEncoder::encode_metrics(
                    &self.$field,
                    ec,
                    data_points,
                    validation_errors,
                    idx,
                    buf,
                )
            }
        }
    };
    ($ty:ty, profiles => $field:ident) => {
        impl $crate::encoder::ProfileEncoder for $ty {
            fn encode_profile(
                &self,
                ec: &$crate::EncodingContext<'_>,
                profile: &$crate::profile::Profile,
                push: &mut $crate::encoder::PushDocument<'_>,
            ) -> $crate::error::Result<()> {
                $crate::encoder::ProfileEncoder::encode_profile(&self.$field, ec, profile, push)
            }
        }
    };
    ($ty:ty, spans => $field:ident) => {
        impl $crate::encoder::SpanEncoder for $ty {
            fn encode_span(
                &self,
                ec: &$crate::EncodingContext<'_>,
                span: &opentelemetry_proto::tonic::trace::v1::Span,
                idx: &$crate::index::Index,
                buf: &mut Vec<u8>,
            ) -> $crate::error::Result<()> {
                $crate::encoder::SpanEncoder::encode_span(&self.$field, ec, span, idx, buf)
            }
        }
    };
}

pub(crate) use delegate;

/// Add `data_stream.{type,dataset,namespace}` under `prefix` when `idx` is a
/// data stream.
pub(crate) fn add_data_stream_attributes(
    document: &mut crate::document::Document,
    prefix: &str,
    idx: &Index,
) {
    use crate::document::flatten_key;

    if idx.is_data_stream() {
        document.add_string(flatten_key(prefix, "data_stream.type"), &idx.type_);
        document.add_string(flatten_key(prefix, "data_stream.dataset"), &idx.dataset);
        document.add_string(flatten_key(prefix, "data_stream.namespace"), &idx.namespace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::InstrumentationScope;
    use opentelemetry_proto::tonic::resource::v1::Resource;

    #[test]
    fn factory_builds_every_mode() {
        for mode in MappingMode::ALL {
            let encoder = new_encoder(mode).unwrap();
            assert_eq!(encoder.mode(), mode);
        }
    }

    #[test]
    fn unsupported_fragments_name_the_mode() {
        let resource = Resource::default();
        let scope = InstrumentationScope::default();
        let ec = EncodingContext::new(&resource, "", &scope, "");

        let err = MetricsUnsupported::new(MappingMode::Raw)
            .encode_metrics(&ec, &[], &mut Vec::new(), &Index::default(), &mut Vec::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "mapping mode \"raw\" (3) does not support metrics"
        );

        let err = ProfilesUnsupported::new(MappingMode::Ecs)
            .encode_profile(&ec, &Profile::default(), &mut |_, _, _| Ok(()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "mapping mode \"ecs\" (1) does not support profiles"
        );
    }
}
