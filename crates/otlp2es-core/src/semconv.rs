//! OpenTelemetry semantic convention attribute keys read or renamed by the
//! encoders.

// Service identification
pub const SERVICE_INSTANCE_ID: &str = "service.instance.id";
/// Deployment environment (e.g., "production", "staging")
pub const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";

// Telemetry SDK and distribution
/// Name of the telemetry SDK (e.g., "opentelemetry")
pub const TELEMETRY_SDK_NAME: &str = "telemetry.sdk.name";
/// Language of the telemetry SDK (e.g., "go", "java")
pub const TELEMETRY_SDK_LANGUAGE: &str = "telemetry.sdk.language";
pub const TELEMETRY_SDK_VERSION: &str = "telemetry.sdk.version";
/// Name of the auto-instrumentation agent or distribution
pub const TELEMETRY_DISTRO_NAME: &str = "telemetry.distro.name";
pub const TELEMETRY_DISTRO_VERSION: &str = "telemetry.distro.version";

// Cloud and container
/// Cloud platform service (e.g., "aws_ec2", "gcp_cloud_run")
pub const CLOUD_PLATFORM: &str = "cloud.platform";
pub const CONTAINER_IMAGE_TAGS: &str = "container.image.tags";

// Host
/// Hostname of the physical or virtual machine
pub const HOST_NAME: &str = "host.name";
/// CPU architecture (e.g., "amd64", "arm64")
pub const HOST_ARCH: &str = "host.arch";

// Process
pub const PROCESS_EXECUTABLE_PATH: &str = "process.executable.path";
pub const PROCESS_RUNTIME_NAME: &str = "process.runtime.name";
pub const PROCESS_RUNTIME_VERSION: &str = "process.runtime.version";

// Operating system
/// Human readable OS name (e.g., "Android", "iOS", "Ubuntu")
pub const OS_NAME: &str = "os.name";
/// OS family (e.g., "linux", "windows", "darwin")
pub const OS_TYPE: &str = "os.type";
pub const OS_DESCRIPTION: &str = "os.description";
pub const OS_VERSION: &str = "os.version";

// Kubernetes
pub const K8S_DEPLOYMENT_NAME: &str = "k8s.deployment.name";
pub const K8S_NAMESPACE_NAME: &str = "k8s.namespace.name";
pub const K8S_NODE_NAME: &str = "k8s.node.name";
pub const K8S_POD_NAME: &str = "k8s.pod.name";
pub const K8S_POD_UID: &str = "k8s.pod.uid";
pub const K8S_JOB_NAME: &str = "k8s.job.name";
pub const K8S_CRONJOB_NAME: &str = "k8s.cronjob.name";
pub const K8S_STATEFULSET_NAME: &str = "k8s.statefulset.name";
pub const K8S_REPLICASET_NAME: &str = "k8s.replicaset.name";
pub const K8S_DAEMONSET_NAME: &str = "k8s.daemonset.name";
pub const K8S_CONTAINER_NAME: &str = "k8s.container.name";
pub const K8S_CLUSTER_NAME: &str = "k8s.cluster.name";

// Log record and exception attributes
pub const EVENT_NAME: &str = "event.name";
pub const EXCEPTION_MESSAGE: &str = "exception.message";
pub const EXCEPTION_STACKTRACE: &str = "exception.stacktrace";
pub const EXCEPTION_TYPE: &str = "exception.type";
pub const EXCEPTION_ESCAPED: &str = "exception.escaped";

// Service identity used by the profiling documents
pub const SERVICE_NAME: &str = "service.name";
