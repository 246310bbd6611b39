//! `bodymap` mapping mode
//!
//! The log body, which must be a map, is the whole document. Spans and span
//! events are rejected.

use opentelemetry_proto::tonic::common::v1::any_value;
use opentelemetry_proto::tonic::logs::v1::LogRecord;
use opentelemetry_proto::tonic::trace::v1::{span, Span};

use super::{
    delegate, DocumentEncoder, LogEncoder, MetricsUnsupported, ProfilesUnsupported, SpanEncoder,
    SpanEventEncoder,
};
use crate::attributes::{type_name, write_key_values};
use crate::error::{EncodeError, Result};
use crate::index::Index;
use crate::mode::MappingMode;
use crate::{EncodingContext, Signal};

/// Encoder for the `bodymap` mode
#[derive(Debug, Clone)]
pub struct BodyMapModeEncoder {
    mode: MappingMode,
    metrics: MetricsUnsupported,
    profiles: ProfilesUnsupported,
}

impl BodyMapModeEncoder {
    pub fn new(mode: MappingMode) -> Self {
        Self {
            mode,
            metrics: MetricsUnsupported::new(mode),
            profiles: ProfilesUnsupported::new(mode),
        }
    }
}

impl LogEncoder for BodyMapModeEncoder {
    fn encode_log(
        &self,
        _: &EncodingContext<'_>,
        record: &LogRecord,
        _: &Index,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        match record.body.as_ref() {
            Some(body) => match body.value.as_ref() {
                Some(any_value::Value::KvlistValue(map)) => write_key_values(buf, &map.values),
                _ => Err(EncodeError::InvalidBodyType {
                    actual: type_name(body),
                }),
            },
            None => Err(EncodeError::InvalidBodyType { actual: "Empty" }),
        }
    }
}

impl SpanEncoder for BodyMapModeEncoder {
    fn encode_span(
        &self,
        _: &EncodingContext<'_>,
        _: &Span,
        _: &Index,
        _: &mut Vec<u8>,
    ) -> Result<()> {
        Err(EncodeError::BodyMapUnsupported(Signal::Spans))
    }
}

impl SpanEventEncoder for BodyMapModeEncoder {
    fn encode_span_event(
        &self,
        _: &EncodingContext<'_>,
        _: &Span,
        _: &span::Event,
        _: &Index,
        _: &mut Vec<u8>,
    ) -> Result<()> {
        Err(EncodeError::BodyMapUnsupported(Signal::SpanEvents))
    }
}

delegate!(BodyMapModeEncoder, metrics => metrics);
delegate!(BodyMapModeEncoder, profiles => profiles);

impl DocumentEncoder for BodyMapModeEncoder {
    fn mode(&self) -> MappingMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::{
        AnyValue, ArrayValue, InstrumentationScope, KeyValue, KeyValueList,
    };
    use opentelemetry_proto::tonic::resource::v1::Resource;

    fn kv(key: &str, value: any_value::Value) -> KeyValue {
        KeyValue {
            key: key.to_string(),
            value: Some(AnyValue { value: Some(value) }),
        }
    }

    fn encode(body: Option<any_value::Value>) -> Result<Vec<u8>> {
        let resource = Resource {
            attributes: vec![kv("service.name", any_value::Value::StringValue("x".into()))],
            ..Default::default()
        };
        let scope = InstrumentationScope::default();
        let ec = EncodingContext::new(&resource, "", &scope, "");
        let record = LogRecord {
            time_unix_nano: 1,
            body: body.map(|value| AnyValue { value: Some(value) }),
            ..Default::default()
        };
        let mut buf = Vec::new();
        BodyMapModeEncoder::new(MappingMode::BodyMap).encode_log(
            &ec,
            &record,
            &Index::data_stream("logs", "generic", "default"),
            &mut buf,
        )?;
        Ok(buf)
    }

    #[test]
    fn map_body_is_the_document() {
        let body = any_value::Value::KvlistValue(KeyValueList {
            values: vec![
                kv("z", any_value::Value::IntValue(1)),
                kv(
                    "a.b",
                    any_value::Value::ArrayValue(ArrayValue {
                        values: vec![AnyValue {
                            value: Some(any_value::Value::BoolValue(true)),
                        }],
                    }),
                ),
            ],
        });
        let buf = encode(Some(body)).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), r#"{"z":1,"a.b":[true]}"#);
    }

    #[test]
    fn non_map_body_is_rejected() {
        let err = encode(Some(any_value::Value::StringValue("hello".into()))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid log record body type for 'bodymap' mapping mode: \"Str\""
        );
        assert!(matches!(
            encode(None),
            Err(EncodeError::InvalidBodyType { actual: "Empty" })
        ));
    }

    #[test]
    fn spans_are_rejected() {
        let resource = Resource::default();
        let scope = InstrumentationScope::default();
        let ec = EncodingContext::new(&resource, "", &scope, "");
        let err = BodyMapModeEncoder::new(MappingMode::BodyMap)
            .encode_span(&ec, &Span::default(), &Index::default(), &mut Vec::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "bodymap mode does not support encoding spans");
    }

    #[test]
    fn span_events_are_rejected() {
        let resource = Resource::default();
        let scope = InstrumentationScope::default();
        let ec = EncodingContext::new(&resource, "", &scope, "");
        let mut buf = Vec::new();
        let err = BodyMapModeEncoder::new(MappingMode::BodyMap)
            .encode_span_event(
                &ec,
                &Span::default(),
                &span::Event::default(),
                &Index::default(),
                &mut buf,
            )
            .unwrap_err();
        assert!(matches!(err, EncodeError::BodyMapUnsupported(Signal::SpanEvents)));
        assert_eq!(err.to_string(), "bodymap mode does not support encoding span events");
        assert!(buf.is_empty());
    }
}
