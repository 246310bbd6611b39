// Profile documents
//
// A profile fans out into three kinds of documents:
// - one per distinct stack frame, keyed by a hash of the frame
// - one per distinct stack trace, keyed by a hash of its frame ids
// - one event per sample timestamp, pointing at its stack trace
// Frame and trace ids are content hashes, so re-sending a frame or trace
// overwrites the same document instead of duplicating it.

use std::collections::HashSet;

use base64::Engine;
use serde_json::Value as JsonValue;

use super::{put_attributes, put_resource, put_scope, put_str, put_timestamp, write, Object};
use crate::encoder::PushDocument;
use crate::error::Result;
use crate::profile::{Frame, Profile, Sample};
use crate::EncodingContext;

/// Indices profile documents are routed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilingIndices {
    pub stackframes: String,
    pub stacktraces: String,
    pub events: String,
}

impl Default for ProfilingIndices {
    fn default() -> Self {
        Self {
            stackframes: "profiling-stackframes".to_string(),
            stacktraces: "profiling-stacktraces".to_string(),
            events: "profiling-events-all".to_string(),
        }
    }
}

pub(super) fn serialize(
    indices: &ProfilingIndices,
    ec: &EncodingContext<'_>,
    profile: &Profile,
    push: &mut PushDocument<'_>,
) -> Result<()> {
    let mut pushed_frames = HashSet::new();
    let mut pushed_traces = HashSet::new();
    let mut buf = Vec::new();

    for sample in &profile.samples {
        let mut frame_ids = Vec::with_capacity(sample.frames.len());
        for frame in &sample.frames {
            let id = frame_id(frame);
            if pushed_frames.insert(id.clone()) {
                buf.clear();
                write(&mut buf, stackframe_doc(frame))?;
                push(&buf, &id, &indices.stackframes)?;
            }
            frame_ids.push(id);
        }

        let trace_id = stacktrace_id(&frame_ids);
        if pushed_traces.insert(trace_id.clone()) {
            buf.clear();
            write(&mut buf, stacktrace_doc(&frame_ids))?;
            push(&buf, &trace_id, &indices.stacktraces)?;
        }

        for timestamp in sample_timestamps(profile, sample) {
            buf.clear();
            write(&mut buf, event_doc(ec, profile, sample, &trace_id, timestamp))?;
            // Events are append-only; the datastore assigns their ids
            push(&buf, "", &indices.events)?;
        }
    }
    Ok(())
}

fn sample_timestamps(profile: &Profile, sample: &Sample) -> Vec<u64> {
    if sample.timestamps_unix_nano.is_empty() {
        vec![profile.time_unix_nano]
    } else {
        sample.timestamps_unix_nano.clone()
    }
}

/// URL-safe base64 of the first 16 bytes of a blake3 hash
fn short_hash(bytes: &[u8]) -> String {
    let hash = blake3::hash(bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&hash.as_bytes()[..16])
}

fn frame_id(frame: &Frame) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in [&frame.function_name, &frame.file_name, &frame.mapping] {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hasher.update(&frame.line.to_le_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&hasher.finalize().as_bytes()[..16])
}

fn stacktrace_id(frame_ids: &[String]) -> String {
    short_hash(frame_ids.concat().as_bytes())
}

fn stackframe_doc(frame: &Frame) -> Object {
    let mut doc = Object::new();
    put_str(&mut doc, "Stackframe.function.name", &frame.function_name);
    put_str(&mut doc, "Stackframe.file.name", &frame.file_name);
    if frame.line != 0 {
        doc.insert("Stackframe.line.number".into(), JsonValue::from(frame.line));
    }
    put_str(&mut doc, "Stackframe.mapping", &frame.mapping);
    doc
}

fn stacktrace_doc(frame_ids: &[String]) -> Object {
    let mut doc = Object::new();
    doc.insert(
        "Stacktrace.frame.ids".into(),
        JsonValue::Array(frame_ids.iter().cloned().map(JsonValue::String).collect()),
    );
    doc
}

fn event_doc(
    ec: &EncodingContext<'_>,
    profile: &Profile,
    sample: &Sample,
    trace_id: &str,
    timestamp: u64,
) -> Object {
    let mut doc = Object::new();
    put_timestamp(&mut doc, "@timestamp", timestamp);
    doc.insert("Stacktrace.id".into(), JsonValue::String(trace_id.to_string()));
    doc.insert("Stacktrace.count".into(), JsonValue::from(sample.value));
    put_str(&mut doc, "profile_id", &hex::encode(&profile.profile_id));
    put_str(&mut doc, "sample.type", &profile.sample_type);
    put_str(&mut doc, "sample.unit", &profile.sample_unit);

    let mut attributes = profile.attributes.clone();
    attributes.extend(sample.attributes.iter().cloned());
    put_attributes(&mut doc, &attributes, 0);
    put_resource(&mut doc, ec);
    put_scope(&mut doc, ec);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::InstrumentationScope;
    use opentelemetry_proto::tonic::resource::v1::Resource;

    fn frame(name: &str, line: i64) -> Frame {
        Frame {
            function_name: name.to_string(),
            file_name: "main.rs".to_string(),
            line,
            mapping: "app".to_string(),
        }
    }

    fn collect(profile: &Profile) -> Vec<(JsonValue, String, String)> {
        let resource = Resource::default();
        let scope = InstrumentationScope::default();
        let ec = EncodingContext::new(&resource, "", &scope, "");
        let mut docs = Vec::new();
        serialize(
            &ProfilingIndices::default(),
            &ec,
            profile,
            &mut |doc: &[u8], id: &str, index: &str| {
                docs.push((
                    serde_json::from_slice(doc).unwrap(),
                    id.to_string(),
                    index.to_string(),
                ));
                Ok(())
            },
        )
        .unwrap();
        docs
    }

    #[test]
    fn frames_and_traces_are_pushed_once() {
        let stack = vec![frame("leaf", 10), frame("main", 3)];
        let profile = Profile {
            time_unix_nano: 1_000_000_000,
            sample_type: "samples".into(),
            sample_unit: "count".into(),
            samples: vec![
                Sample {
                    frames: stack.clone(),
                    value: 4,
                    ..Default::default()
                },
                Sample {
                    frames: stack,
                    value: 1,
                    timestamps_unix_nano: vec![2_000_000_000, 3_000_000_000],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let docs = collect(&profile);

        let count = |index: &str| docs.iter().filter(|(_, _, i)| i == index).count();
        assert_eq!(count("profiling-stackframes"), 2);
        assert_eq!(count("profiling-stacktraces"), 1);
        assert_eq!(count("profiling-events-all"), 3);

        let trace = docs
            .iter()
            .find(|(_, _, i)| i == "profiling-stacktraces")
            .unwrap();
        let events: Vec<_> = docs
            .iter()
            .filter(|(_, _, i)| i == "profiling-events-all")
            .collect();
        for (event, id, _) in &events {
            assert_eq!(event["Stacktrace.id"], JsonValue::String(trace.1.clone()));
            assert!(id.is_empty());
        }
        assert_eq!(events[0].0["@timestamp"], "1970-01-01T00:00:01.000000000Z");
        assert_eq!(events[0].0["Stacktrace.count"], 4);
        assert_eq!(events[2].0["@timestamp"], "1970-01-01T00:00:03.000000000Z");
        assert_eq!(trace.0["Stacktrace.frame.ids"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn frame_ids_are_content_hashes() {
        assert_eq!(frame_id(&frame("a", 1)), frame_id(&frame("a", 1)));
        assert_ne!(frame_id(&frame("a", 1)), frame_id(&frame("a", 2)));
        assert_ne!(frame_id(&frame("ab", 1)), frame_id(&frame("a", 1)));
        assert_eq!(frame_id(&frame("a", 1)).len(), 22);
    }
}
