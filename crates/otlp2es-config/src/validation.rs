// Configuration validation
//
// Validates that names are usable by the datastore and warns about
// settings that have no effect

use crate::{DataStreamConfig, ExporterConfig, IndicesConfig, LoggingConfig, MappingConfig};
use anyhow::{bail, Result};
use otlp2es_core::MappingMode;
use tracing::warn;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &ExporterConfig) -> Result<()> {
    validate_mapping_config(&config.mapping);
    validate_data_stream_config(&config.data_stream)?;
    validate_indices_config(&config.indices)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_mapping_config(config: &MappingConfig) {
    if config.dedot && !matches!(config.mode, MappingMode::None | MappingMode::Raw) {
        warn!(
            mode = %config.mode,
            "mapping.dedot only applies to the none and raw modes; ignoring"
        );
    }
}

fn validate_data_stream_config(config: &DataStreamConfig) -> Result<()> {
    for (field, value) in [
        ("data_stream.dataset", &config.dataset),
        ("data_stream.namespace", &config.namespace),
    ] {
        if value.is_empty() {
            bail!("{} cannot be empty", field);
        }
        // The '-' separates type, dataset and namespace in the stream name
        if value.contains('-') {
            bail!("{} cannot contain '-': {:?}", field, value);
        }
    }
    Ok(())
}

fn validate_indices_config(config: &IndicesConfig) -> Result<()> {
    for (field, value) in [
        ("indices.logs", &config.logs),
        ("indices.traces", &config.traces),
        ("indices.metrics", &config.metrics),
    ] {
        if let Some(index) = value {
            if index.trim().is_empty() {
                bail!("{} cannot be empty when set", field);
            }
            if index.chars().any(|c| c.is_ascii_uppercase()) {
                warn!(field, index = %index, "index names are usually lowercase");
            }
        }
    }
    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    if !LOG_LEVELS.contains(&config.level.to_lowercase().as_str()) {
        bail!(
            "logging.level must be one of {:?}, got {:?}",
            LOG_LEVELS,
            config.level
        );
    }
    Ok(())
}
