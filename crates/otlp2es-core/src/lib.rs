// otlp2es-core - OTLP to Elasticsearch document encoding
//
// Pure encoding logic: OTLP signal + encoding context -> serialized document.
// No I/O, no async. Batching, index routing and bulk submission belong to the
// caller.

use std::fmt;

use opentelemetry_proto::tonic::common::v1::InstrumentationScope;
use opentelemetry_proto::tonic::resource::v1::Resource;

pub mod attributes;
pub mod conversion;
pub mod datapoints;
pub mod document;
pub mod ecs;
pub mod encoder;
pub mod error;
pub mod index;
pub mod mode;
pub mod otel;
pub mod profile;
pub mod semconv;
pub mod spans;

// Re-export commonly used types
pub use datapoints::{group_data_points, DataPoint};
pub use document::Document;
pub use encoder::{
    new_encoder, new_encoder_with_options, DocumentEncoder, DynamicTemplates, EncoderOptions,
    PushDocument,
};
pub use error::{EncodeError, Result};
pub use index::Index;
pub use mode::MappingMode;
pub use profile::Profile;

/// Signal kinds an encoder handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Logs,
    Spans,
    SpanEvents,
    Metrics,
    Profiles,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signal::Logs => "logs",
            Signal::Spans => "spans",
            Signal::SpanEvents => "span events",
            Signal::Metrics => "metrics",
            Signal::Profiles => "profiles",
        })
    }
}

/// Resource and scope shared by every signal of one resource/scope pair.
#[derive(Debug, Clone, Copy)]
pub struct EncodingContext<'a> {
    pub resource: &'a Resource,
    pub resource_schema_url: &'a str,
    pub scope: &'a InstrumentationScope,
    pub scope_schema_url: &'a str,
}

impl<'a> EncodingContext<'a> {
    pub fn new(
        resource: &'a Resource,
        resource_schema_url: &'a str,
        scope: &'a InstrumentationScope,
        scope_schema_url: &'a str,
    ) -> Self {
        Self {
            resource,
            resource_schema_url,
            scope,
            scope_schema_url,
        }
    }
}
