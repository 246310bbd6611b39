// otlp2es-config - Exporter configuration
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from OTLP2ES_CONFIG env var
// 3. Default config file location (./otlp2es.toml)
// 4. Built-in defaults (lowest priority)

use anyhow::Result;
use otlp2es_core::{EncoderOptions, Index, MappingMode, Signal};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};

/// Main exporter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub mapping: MappingConfig,

    #[serde(default)]
    pub data_stream: DataStreamConfig,

    #[serde(default)]
    pub indices: IndicesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Document mapping configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub mode: MappingMode,
    /// Expand dotted keys into nested objects (none/raw modes only)
    #[serde(default)]
    pub dedot: bool,
}

/// Data stream naming, used when no fixed index is configured
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataStreamConfig {
    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_dataset() -> String {
    "generic".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Default for DataStreamConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            namespace: default_namespace(),
        }
    }
}

/// Fixed index names per signal; unset signals go to data streams
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traces: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from a specific file (for the CLI --config flag),
    /// then apply environment overrides.
    pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Load configuration with environment lookups going through `env`.
    pub fn load_with_env<E: EnvSource>(env: &E) -> Result<Self> {
        sources::load_config_with_env(env)
    }

    /// Parse TOML config content. Missing sections take their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides from a custom source.
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    pub fn encoder_options(&self) -> EncoderOptions {
        EncoderOptions {
            dedot: self.mapping.dedot,
        }
    }

    /// Index documents of `signal` are routed to.
    ///
    /// A fixed index wins; otherwise the data stream
    /// `<type>-<dataset>-<namespace>` is used, with `.otel` appended to the
    /// dataset in OTel mode.
    pub fn index_for(&self, signal: Signal) -> Index {
        let (type_, fixed) = match signal {
            Signal::Logs => ("logs", self.indices.logs.as_ref()),
            Signal::Spans | Signal::SpanEvents => ("traces", self.indices.traces.as_ref()),
            Signal::Metrics => ("metrics", self.indices.metrics.as_ref()),
            Signal::Profiles => ("profiles", None),
        };
        if let Some(index) = fixed {
            return Index::new(index.clone());
        }

        let mut dataset = self.data_stream.dataset.clone();
        if self.mapping.mode == MappingMode::Otel {
            dataset.push_str(".otel");
        }
        Index::data_stream(type_, dataset, self.data_stream.namespace.clone())
    }
}
