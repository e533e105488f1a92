//! Command-line interface for inspecting telemetry batch files.
//!
//! The `telemetry-files` binary lists, prints and cleans up the JSON
//! documents written by the DB reporter, and validates configuration files.

use crate::core::{Config, LoggingConfig, Result, TelemetryError, TestContext};
use crate::reporter::db::{list_batch_files, DbReport, DbReporter};
use crate::reporter::RecordValue;
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Inspect and clean up persisted test telemetry
#[derive(Parser, Debug)]
#[command(name = "telemetry-files")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (YAML)
    #[arg(short, long, env = "TELEMETRY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding batch files (overrides the config file)
    #[arg(short, long, env = "TELEMETRY_OUTPUT_DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Filename prefix of batch files (overrides the config file)
    #[arg(short, long, env = "TELEMETRY_FILE_PREFIX", global = true)]
    pub prefix: Option<String>,

    /// Enable debug logging
    #[arg(short, long, env = "TELEMETRY_DEBUG", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List batch files, oldest first
    List,
    /// Print the measurements of one batch file
    Show {
        /// Batch file to print
        file: PathBuf,
    },
    /// Delete every batch file with the configured prefix
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
    /// Validate the configuration and exit
    CheckConfig,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with precedence: CLI arguments, environment,
    /// config file, defaults.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env();

        if let Some(dir) = &self.output_dir {
            config.db.output_dir = Some(dir.clone());
        }
        if let Some(prefix) = &self.prefix {
            config.db.file_prefix = prefix.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self, logging: &LoggingConfig) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let log_level = if self.debug {
            "debug".to_string()
        } else {
            std::env::var("TELEMETRY_LOG_LEVEL").unwrap_or_else(|_| logging.level.as_str().to_string())
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

        let fmt_layer = if logging.structured {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .compact()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact()
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Execute one command.
pub fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    cli.init_logging(&config.logging)?;

    let output_dir = match &config.db.output_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    match cli.command {
        Command::List => {
            if !output_dir.is_dir() {
                println!("No batch files: {} does not exist", output_dir.display());
                return Ok(());
            }
            let files = list_batch_files(&output_dir, &config.db.file_prefix)?;
            if files.is_empty() {
                println!("No batch files in {}", output_dir.display());
            }
            for file in files {
                match DbReporter::load_file(&file) {
                    Ok(report) => println!(
                        "{}  {} measurements  {}",
                        file.display(),
                        report.metadata.measurement_count,
                        report.metadata.timestamp
                    ),
                    Err(e) => println!("{}  unreadable: {}", file.display(), e),
                }
            }
        }
        Command::Show { file } => {
            let report = DbReporter::load_file(&file)?;
            print!("{}", format_report(&report));
        }
        Command::Clear { yes } => {
            if !yes {
                return Err(TelemetryError::config(
                    "Refusing to delete batch files without --yes",
                ));
            }
            let mut db = config.db.clone();
            db.output_dir = Some(output_dir);
            let reporter = DbReporter::new(&db, TestContext::default())?;
            let removed = reporter.clear_output_files()?;
            println!("Removed {} batch files", removed);
        }
        Command::CheckConfig => {
            println!("Configuration is valid!");
            println!(
                "  OTLP endpoint: {}",
                config.ts.endpoint.as_deref().unwrap_or("none (log-only)")
            );
            println!("  Export timeout: {:?}", config.ts.export_timeout);
            println!("  Output dir: {}", output_dir.display());
            println!("  File prefix: {}", config.db.file_prefix);
        }
    }

    Ok(())
}

/// Human-readable rendering of a batch file.
pub fn format_report(report: &DbReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} measurements at {} ({} reporter)",
        report.metadata.measurement_count, report.metadata.timestamp, report.metadata.reporter_type
    );
    if !report.metadata.test_context.is_empty() {
        let _ = writeln!(out, "context: {}", join_labels(&report.metadata.test_context));
    }

    for measurement in &report.measurements {
        let value = match &measurement.value {
            RecordValue::Scalar(v) => v.to_string(),
            RecordValue::Buckets(counts) => format!("{:?}", counts),
        };
        let _ = writeln!(
            out,
            "  {} [{}] {} {} {{{}}}",
            measurement.metric_name,
            measurement.metric_type,
            value,
            measurement.unit,
            join_labels(&measurement.labels)
        );
    }
    out
}

fn join_labels(labels: &crate::core::Labels) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels;
    use crate::metrics::MetricType;
    use crate::reporter::db::{DbMeasurement, DbMetadata};
    use crate::reporter::ReporterType;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::parse_from(["telemetry-files", "--prefix", "nightly", "clear", "--yes"]);
        assert_eq!(cli.command, Command::Clear { yes: true });
        assert_eq!(cli.prefix.as_deref(), Some("nightly"));

        let cli = Cli::parse_from(["telemetry-files", "show", "telemetry_20240101_000000.json"]);
        assert!(matches!(cli.command, Command::Show { .. }));
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["telemetry-files", "-o", "/tmp/telemetry", "-p", "nightly", "list"]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.db.output_dir, Some(PathBuf::from("/tmp/telemetry")));
        assert_eq!(config.db.file_prefix, "nightly");
    }

    #[test]
    fn test_format_report() {
        let report = DbReport {
            metadata: DbMetadata {
                reporter_type: ReporterType::Db,
                timestamp: "2024-01-01T00:00:00.000000Z".to_string(),
                test_context: labels! { "test.testcase" => "t1" },
                measurement_count: 1,
            },
            measurements: vec![DbMeasurement {
                metric_name: "port.rx.util".to_string(),
                metric_type: MetricType::Gauge,
                description: "Port RX utilization".to_string(),
                unit: "percent".to_string(),
                value: RecordValue::Scalar(75.5),
                labels: labels! { "device.id" => "dut-01" },
                timestamp: 1_704_067_200_000_000_000,
                timestamp_iso: "2024-01-01T00:00:00.000000Z".to_string(),
            }],
        };

        let text = format_report(&report);
        assert!(text.starts_with("1 measurements at 2024-01-01T00:00:00.000000Z (db reporter)"));
        assert!(text.contains("context: test.testcase=t1"));
        assert!(text.contains("  port.rx.util [gauge] 75.5 percent {device.id=dut-01}"));
    }
}
