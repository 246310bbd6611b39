//! Decoded profile model
//!
//! OTLP profiles are still a development signal, so the encoders take this
//! already-resolved view: samples reference their frames directly instead of
//! going through dictionary tables.

use opentelemetry_proto::tonic::common::v1::KeyValue;

/// A single profile (one collection period of one sample type).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub profile_id: Vec<u8>,
    pub time_unix_nano: u64,
    pub duration_nano: u64,
    /// Sample type, e.g. "samples" or "cpu"
    pub sample_type: String,
    /// Sample unit, e.g. "count" or "nanoseconds"
    pub sample_unit: String,
    pub attributes: Vec<KeyValue>,
    pub samples: Vec<Sample>,
}

/// One stack observed `value` times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    /// Frames ordered leaf first
    pub frames: Vec<Frame>,
    pub value: i64,
    /// Explicit sample timestamps; empty means the profile timestamp applies
    pub timestamps_unix_nano: Vec<u64>,
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Frame {
    pub function_name: String,
    pub file_name: String,
    pub line: i64,
    /// Executable or shared object the frame belongs to
    pub mapping: String,
}
