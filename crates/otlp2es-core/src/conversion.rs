//! Attribute conversion tables from OpenTelemetry semantic conventions to
//! Elastic Common Schema (ECS) field names.
//!
//! Each table maps a source key to either a renamed target or [`Target::Drop`].
//! Keys absent from a table pass through under their original name. Tables are
//! built once on first use and never mutated afterwards.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::semconv;

/// What happens to a source attribute key listed in a [`ConversionMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Emit the value under this ECS field name
    Rename(&'static str),
    /// Consume the key without emitting it
    Drop,
}

/// Per-level rename table.
#[derive(Debug, Clone, Default)]
pub struct ConversionMap {
    entries: HashMap<&'static str, Target>,
}

impl ConversionMap {
    pub fn new(entries: &[(&'static str, Target)]) -> Self {
        Self {
            entries: entries.iter().copied().collect(),
        }
    }

    /// An empty table: every attribute passes through unchanged
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Target> {
        self.entries.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source keys that are emitted under their original name in addition to the
/// renamed target.
#[derive(Debug, Clone, Default)]
pub struct PreserveSet {
    keys: HashSet<&'static str>,
}

impl PreserveSet {
    pub fn new(keys: &[&'static str]) -> Self {
        Self {
            keys: keys.iter().copied().collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

/// Resource-level conversions
pub static RESOURCE_ATTRS: Lazy<ConversionMap> = Lazy::new(|| {
    use Target::{Drop, Rename};
    ConversionMap::new(&[
        (semconv::SERVICE_INSTANCE_ID, Rename("service.node.name")),
        (semconv::DEPLOYMENT_ENVIRONMENT, Rename("service.environment")),
        // Folded into agent.name / agent.version instead
        (semconv::TELEMETRY_SDK_NAME, Drop),
        (semconv::TELEMETRY_SDK_LANGUAGE, Drop),
        (semconv::TELEMETRY_SDK_VERSION, Drop),
        (semconv::TELEMETRY_DISTRO_NAME, Drop),
        (semconv::TELEMETRY_DISTRO_VERSION, Drop),
        (semconv::CLOUD_PLATFORM, Rename("cloud.service.name")),
        (semconv::CONTAINER_IMAGE_TAGS, Rename("container.image.tag")),
        (semconv::HOST_NAME, Rename("host.hostname")),
        (semconv::HOST_ARCH, Rename("host.architecture")),
        (semconv::PROCESS_EXECUTABLE_PATH, Rename("process.executable")),
        (semconv::PROCESS_RUNTIME_NAME, Rename("service.runtime.name")),
        (semconv::PROCESS_RUNTIME_VERSION, Rename("service.runtime.version")),
        (semconv::OS_NAME, Rename("host.os.name")),
        (semconv::OS_TYPE, Rename("host.os.platform")),
        (semconv::OS_DESCRIPTION, Rename("host.os.full")),
        (semconv::OS_VERSION, Rename("host.os.version")),
        (semconv::K8S_DEPLOYMENT_NAME, Rename("kubernetes.deployment.name")),
        (semconv::K8S_NAMESPACE_NAME, Rename("kubernetes.namespace")),
        (semconv::K8S_NODE_NAME, Rename("kubernetes.node.name")),
        (semconv::K8S_POD_NAME, Rename("kubernetes.pod.name")),
        (semconv::K8S_POD_UID, Rename("kubernetes.pod.uid")),
        (semconv::K8S_JOB_NAME, Rename("kubernetes.job.name")),
        (semconv::K8S_CRONJOB_NAME, Rename("kubernetes.cronjob.name")),
        (semconv::K8S_STATEFULSET_NAME, Rename("kubernetes.statefulset.name")),
        (semconv::K8S_REPLICASET_NAME, Rename("kubernetes.replicaset.name")),
        (semconv::K8S_DAEMONSET_NAME, Rename("kubernetes.daemonset.name")),
        (semconv::K8S_CONTAINER_NAME, Rename("kubernetes.container.name")),
        (semconv::K8S_CLUSTER_NAME, Rename("orchestrator.cluster.name")),
    ])
});

/// Resource keys kept under their original name as well as the ECS one
pub static RESOURCE_ATTRS_TO_PRESERVE: Lazy<PreserveSet> =
    Lazy::new(|| PreserveSet::new(&[semconv::HOST_NAME]));

/// Scope-level conversions (none yet)
pub static SCOPE_ATTRS: Lazy<ConversionMap> = Lazy::new(ConversionMap::empty);

/// Log record conversions
pub static LOG_RECORD_ATTRS: Lazy<ConversionMap> = Lazy::new(|| {
    use Target::Rename;
    ConversionMap::new(&[
        (semconv::EVENT_NAME, Rename("event.action")),
        (semconv::EXCEPTION_MESSAGE, Rename("error.message")),
        (semconv::EXCEPTION_STACKTRACE, Rename("error.stacktrace")),
        (semconv::EXCEPTION_TYPE, Rename("error.type")),
        (
            semconv::EXCEPTION_ESCAPED,
            Rename("event.error.exception.handled"),
        ),
    ])
});

/// Span conversions (none yet)
pub static SPAN_ATTRS: Lazy<ConversionMap> = Lazy::new(ConversionMap::empty);
