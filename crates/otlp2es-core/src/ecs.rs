//! ECS field derivations
//!
//! Attribute renaming plus the composite fields ECS expects that have no
//! one-to-one semantic convention source: `agent.name`, `agent.version`,
//! `host.os.type` and the log `@timestamp` fallback.

use opentelemetry_proto::tonic::common::v1::KeyValue;
use opentelemetry_proto::tonic::logs::v1::LogRecord;
use opentelemetry_proto::tonic::resource::v1::Resource;

use crate::attributes;
use crate::conversion::{ConversionMap, PreserveSet, Target};
use crate::document::Document;
use crate::semconv;

const DEFAULT_AGENT_NAME: &str = "otlp";
const UNKNOWN_LANGUAGE: &str = "unknown";

/// Add `attrs` to the document, renaming keys found in `conversion`.
///
/// An empty table adds every attribute at the top level unchanged.
pub fn encode_attributes(
    document: &mut Document,
    attrs: &[KeyValue],
    conversion: &ConversionMap,
    preserve: &PreserveSet,
) {
    if conversion.is_empty() {
        document.add_attributes("", attrs);
        return;
    }

    for kv in attrs {
        let Some(value) = kv.value.as_ref() else {
            continue;
        };
        match conversion.get(&kv.key) {
            Some(Target::Drop) => {}
            Some(Target::Rename(ecs_key)) => {
                document.add_attribute(ecs_key, value);
                if preserve.contains(&kv.key) {
                    document.add_attribute(kv.key.as_str(), value);
                }
            }
            None => document.add_attribute(kv.key.as_str(), value),
        }
    }
}

/// `agent.name` as `<sdk name>[/<language>][/<distro name>]`.
pub fn encode_agent_name(document: &mut Document, resource: &Resource) {
    document.add_string("agent.name", &agent_name(&resource.attributes));
}

fn agent_name(attrs: &[KeyValue]) -> String {
    let sdk_name = attributes::find(attrs, semconv::TELEMETRY_SDK_NAME)
        .map(attributes::as_str)
        .unwrap_or(DEFAULT_AGENT_NAME);
    let mut language = attributes::find(attrs, semconv::TELEMETRY_SDK_LANGUAGE)
        .map(attributes::as_str)
        .unwrap_or_default();
    let distro_name =
        attributes::find(attrs, semconv::TELEMETRY_DISTRO_NAME).map(attributes::as_str);

    if distro_name.is_some() && language.is_empty() {
        language = UNKNOWN_LANGUAGE;
    }

    match distro_name {
        Some(distro) if !distro.is_empty() => format!("{}/{}/{}", sdk_name, language, distro),
        _ if !language.is_empty() => format!("{}/{}", sdk_name, language),
        _ => sdk_name.to_string(),
    }
}

/// `agent.version` from the distro version, else the SDK version, else omitted.
pub fn encode_agent_version(document: &mut Document, resource: &Resource) {
    let attrs = &resource.attributes;
    let version = attributes::find(attrs, semconv::TELEMETRY_DISTRO_VERSION)
        .or_else(|| attributes::find(attrs, semconv::TELEMETRY_SDK_VERSION));
    if let Some(version) = version {
        document.add_string("agent.version", attributes::as_str(version));
    }
}

/// `host.os.type`, restricted to the ECS vocabulary
/// (linux, windows, macos, unix, android, ios).
pub fn encode_host_os_type(document: &mut Document, resource: &Resource) {
    if let Some(os_type) = host_os_type(&resource.attributes) {
        document.add_string("host.os.type", os_type);
    }
}

fn host_os_type(attrs: &[KeyValue]) -> Option<&'static str> {
    let mut ecs_os_type = attributes::find(attrs, semconv::OS_TYPE).and_then(|v| {
        match attributes::as_str(v) {
            "windows" => Some("windows"),
            "linux" => Some("linux"),
            "darwin" => Some("macos"),
            "aix" | "hpux" | "solaris" => Some("unix"),
            _ => None,
        }
    });

    // os.name wins over os.type for mobile platforms
    if let Some(os_name) = attributes::find(attrs, semconv::OS_NAME) {
        match attributes::as_str(os_name) {
            "Android" => ecs_os_type = Some("android"),
            "iOS" => ecs_os_type = Some("ios"),
            _ => {}
        }
    }

    ecs_os_type
}

/// `@timestamp` from the record timestamp, falling back to the observed one.
pub fn encode_log_timestamp(document: &mut Document, record: &LogRecord) {
    document.add_timestamp("@timestamp", log_timestamp(record));
}

/// Record timestamp, or the observed timestamp when the former is unset
pub fn log_timestamp(record: &LogRecord) -> u64 {
    if record.time_unix_nano != 0 {
        record.time_unix_nano
    } else {
        record.observed_time_unix_nano
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{RESOURCE_ATTRS, RESOURCE_ATTRS_TO_PRESERVE};
    use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue};
    use serde_json::Value as JsonValue;

    fn kv(key: &str, value: &str) -> KeyValue {
        KeyValue {
            key: key.to_string(),
            value: Some(AnyValue {
                value: Some(any_value::Value::StringValue(value.to_string())),
            }),
        }
    }

    fn resource(attrs: &[(&str, &str)]) -> Resource {
        Resource {
            attributes: attrs.iter().map(|(k, v)| kv(k, v)).collect(),
            ..Default::default()
        }
    }

    fn render(doc: &mut Document) -> JsonValue {
        let mut buf = Vec::new();
        doc.serialize(&mut buf, false).unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    #[test]
    fn renames_preserves_and_drops_resource_attributes() {
        let attrs = vec![
            kv("host.name", "web-1"),
            kv("k8s.pod.name", "pod-a"),
            kv("telemetry.sdk.name", "opentelemetry"),
            kv("service.name", "checkout"),
        ];
        let mut doc = Document::new();
        encode_attributes(
            &mut doc,
            &attrs,
            &RESOURCE_ATTRS,
            &RESOURCE_ATTRS_TO_PRESERVE,
        );
        let json = render(&mut doc);
        assert_eq!(json["host.hostname"], "web-1");
        assert_eq!(json["host.name"], "web-1");
        assert_eq!(json["kubernetes.pod.name"], "pod-a");
        assert!(json.get("k8s.pod.name").is_none());
        assert!(json.get("telemetry.sdk.name").is_none());
        assert_eq!(json["service.name"], "checkout");
    }

    #[test]
    fn empty_table_passes_attributes_through() {
        let attrs = vec![kv("k8s.pod.name", "pod-a")];
        let mut doc = Document::new();
        encode_attributes(
            &mut doc,
            &attrs,
            &ConversionMap::empty(),
            &RESOURCE_ATTRS_TO_PRESERVE,
        );
        assert_eq!(render(&mut doc)["k8s.pod.name"], "pod-a");
    }

    #[test]
    fn agent_name_defaults_to_otlp() {
        assert_eq!(agent_name(&[]), "otlp");
        assert_eq!(agent_name(&[kv("telemetry.sdk.name", "otlp")]), "otlp");
    }

    #[test]
    fn agent_name_with_language() {
        let attrs = resource(&[
            ("telemetry.sdk.name", "opentelemetry"),
            ("telemetry.sdk.language", "java"),
        ]);
        assert_eq!(agent_name(&attrs.attributes), "opentelemetry/java");
    }

    #[test]
    fn agent_name_with_language_and_distro() {
        let attrs = resource(&[
            ("telemetry.sdk.name", "otlp"),
            ("telemetry.sdk.language", "go"),
            ("telemetry.distro.name", "contrib"),
        ]);
        assert_eq!(agent_name(&attrs.attributes), "otlp/go/contrib");
    }

    #[test]
    fn agent_name_distro_without_language_uses_unknown() {
        let attrs = resource(&[("telemetry.distro.name", "elastic")]);
        assert_eq!(agent_name(&attrs.attributes), "otlp/unknown/elastic");
    }

    #[test]
    fn agent_version_prefers_distro() {
        let mut doc = Document::new();
        encode_agent_version(
            &mut doc,
            &resource(&[
                ("telemetry.sdk.version", "1.0.0"),
                ("telemetry.distro.version", "2.0.0"),
            ]),
        );
        assert_eq!(render(&mut doc)["agent.version"], "2.0.0");

        let mut doc = Document::new();
        encode_agent_version(&mut doc, &resource(&[("telemetry.sdk.version", "1.0.0")]));
        assert_eq!(render(&mut doc)["agent.version"], "1.0.0");

        let mut doc = Document::new();
        encode_agent_version(&mut doc, &resource(&[]));
        assert!(doc.is_empty());
    }

    #[test]
    fn os_type_normalization() {
        let cases = [
            ("linux", Some("linux")),
            ("windows", Some("windows")),
            ("darwin", Some("macos")),
            ("aix", Some("unix")),
            ("hpux", Some("unix")),
            ("solaris", Some("unix")),
            ("freebsd", None),
            ("z_os", None),
        ];
        for (os_type, expected) in cases {
            let attrs = resource(&[("os.type", os_type)]);
            assert_eq!(host_os_type(&attrs.attributes), expected, "{}", os_type);
        }
    }

    #[test]
    fn os_name_overrides_os_type() {
        let attrs = resource(&[("os.type", "linux"), ("os.name", "Android")]);
        assert_eq!(host_os_type(&attrs.attributes), Some("android"));

        let attrs = resource(&[("os.name", "iOS"), ("os.type", "darwin")]);
        assert_eq!(host_os_type(&attrs.attributes), Some("ios"));

        let attrs = resource(&[("os.name", "Ubuntu")]);
        assert_eq!(host_os_type(&attrs.attributes), None);
    }

    #[test]
    fn log_timestamp_falls_back_to_observed() {
        let record = LogRecord {
            time_unix_nano: 0,
            observed_time_unix_nano: 42,
            ..Default::default()
        };
        assert_eq!(log_timestamp(&record), 42);

        let record = LogRecord {
            time_unix_nano: 7,
            observed_time_unix_nano: 42,
            ..Default::default()
        };
        assert_eq!(log_timestamp(&record), 7);
    }
}
