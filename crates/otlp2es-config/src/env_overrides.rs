use super::{ExporterConfig, LogFormat};
use anyhow::{anyhow, Context, Result};
use otlp2es_core::MappingMode;

pub const ENV_PREFIX: &str = "OTLP2ES_";

/// Abstraction over environment-variable lookups so tests and embedding
/// applications can supply their own source of overrides.
pub trait EnvSource {
    /// Get a variable by its name without the OTLP2ES_ prefix
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut ExporterConfig, env: &E) -> Result<()> {
    // Mapping
    if let Some(mode) = env.get("MAPPING_MODE") {
        config.mapping.mode = mode
            .parse::<MappingMode>()
            .with_context(|| format!("Invalid {}MAPPING_MODE value", ENV_PREFIX))?;
    }
    if let Some(val) = get_env_bool(env, "MAPPING_DEDOT")? {
        config.mapping.dedot = val;
    }

    // Data stream naming
    if let Some(dataset) = env.get("DATA_STREAM_DATASET") {
        config.data_stream.dataset = dataset;
    }
    if let Some(namespace) = env.get("DATA_STREAM_NAMESPACE") {
        config.data_stream.namespace = namespace;
    }

    // Fixed indices
    if let Some(index) = env.get("LOGS_INDEX") {
        config.indices.logs = Some(index);
    }
    if let Some(index) = env.get("TRACES_INDEX") {
        config.indices.traces = Some(index);
    }
    if let Some(index) = env.get("METRICS_INDEX") {
        config.indices.metrics = Some(index);
    }

    // Logging
    if let Some(level) = env.get("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = env.get("LOG_FORMAT") {
        config.logging.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }

    Ok(())
}

fn get_env_bool<E: EnvSource>(env: &E, key: &str) -> Result<Option<bool>> {
    match env.get(key) {
        Some(val) => {
            let parsed = val.parse::<bool>().map_err(|e| {
                anyhow!(
                    "Failed to parse {}{} (expected bool): {}",
                    ENV_PREFIX,
                    key,
                    e
                )
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapEnv(HashMap<&'static str, &'static str>);

    impl EnvSource for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    #[test]
    fn overrides_every_section() {
        let env = MapEnv(HashMap::from([
            ("MAPPING_MODE", "OTel"),
            ("MAPPING_DEDOT", "true"),
            ("DATA_STREAM_DATASET", "checkout"),
            ("DATA_STREAM_NAMESPACE", "prod"),
            ("TRACES_INDEX", "spans"),
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "JSON"),
        ]));
        let mut config = ExporterConfig::default();
        apply_env_overrides(&mut config, &env).unwrap();

        assert_eq!(config.mapping.mode, MappingMode::Otel);
        assert!(config.mapping.dedot);
        assert_eq!(config.data_stream.dataset, "checkout");
        assert_eq!(config.data_stream.namespace, "prod");
        assert_eq!(config.indices.traces.as_deref(), Some("spans"));
        assert!(config.indices.logs.is_none());
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = ExporterConfig::default();
        let env = MapEnv(HashMap::from([("MAPPING_MODE", "elastic")]));
        assert!(apply_env_overrides(&mut config, &env).is_err());

        let env = MapEnv(HashMap::from([("MAPPING_DEDOT", "yes")]));
        let err = apply_env_overrides(&mut config, &env).unwrap_err();
        assert!(err.to_string().contains("OTLP2ES_MAPPING_DEDOT"));
    }

    #[test]
    fn no_mode_alias_selects_none() {
        let mut config = ExporterConfig::default();
        config.mapping.mode = MappingMode::Ecs;
        let env = MapEnv(HashMap::from([("MAPPING_MODE", "no")]));
        apply_env_overrides(&mut config, &env).unwrap();
        assert_eq!(config.mapping.mode, MappingMode::None);
    }
}
