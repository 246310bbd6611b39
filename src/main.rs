use anyhow::{Context, Result};
use clap::Parser;
use otlp2es::{Converter, SignalType};
use otlp2es_config::ExporterConfig;
use otlp2es_core::{MappingMode, Signal};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Convert OTLP protobuf export requests into search-index bulk bodies
#[derive(Parser)]
#[command(name = "otlp2es")]
#[command(version)]
#[command(about = "Convert OTLP export requests into bulk index bodies", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Mapping mode: none, ecs, otel, raw, bodymap (overrides config file)
    #[arg(short, long, value_name = "MODE")]
    mode: Option<MappingMode>,

    /// Expand dotted keys into nested objects (none and raw modes)
    #[arg(long)]
    dedot: bool,

    /// Export request type contained in INPUT
    #[arg(short, long, value_enum)]
    signal: SignalType,

    /// Write the bulk body here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Protobuf-encoded export request, or - for stdin
    #[arg(value_name = "INPUT")]
    input: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Step 1: Load base configuration
    let mut config = if let Some(config_path) = &cli.config {
        ExporterConfig::load_from_file_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        ExporterConfig::load().context("Failed to load configuration")?
    };

    // Step 2: Apply CLI overrides (highest priority)
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    // Step 3: Initialize tracing once the log settings are final
    otlp2es::init_tracing(&config);
    display_startup_info(&config, cli.signal);

    let payload = read_input(&cli.input)?;
    let converter = Converter::new(config)?;

    let stats = match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            let mut out = BufWriter::new(file);
            let stats = converter.convert(cli.signal, &payload, &mut out)?;
            out.flush()?;
            stats
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let stats = converter.convert(cli.signal, &payload, &mut out)?;
            out.flush()?;
            stats
        }
    };

    info!(
        documents = stats.documents,
        dropped = stats.dropped,
        validation_errors = stats.validation_errors,
        "Conversion complete"
    );
    Ok(())
}

fn apply_cli_overrides(config: &mut ExporterConfig, cli: &Cli) {
    if let Some(mode) = cli.mode {
        config.mapping.mode = mode;
    }
    if cli.dedot {
        config.mapping.dedot = true;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut payload = Vec::new();
        io::stdin()
            .read_to_end(&mut payload)
            .context("Failed to read export request from stdin")?;
        return Ok(payload);
    }
    std::fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))
}

fn display_startup_info(config: &ExporterConfig, signal: SignalType) {
    let signal = match signal {
        SignalType::Logs => Signal::Logs,
        SignalType::Traces => Signal::Spans,
        SignalType::Metrics => Signal::Metrics,
    };
    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = %config.mapping.mode,
        dedot = config.mapping.dedot,
        index = %config.index_for(signal).index,
        "otlp2es starting"
    );
}
