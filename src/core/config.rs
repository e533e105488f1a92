//! Configuration management for test telemetry.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Programmatic construction through [`ConfigBuilder`]
//! - Validation and defaults

use crate::core::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the default collector endpoint
pub const ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
/// Default service name on exported resources
pub const DEFAULT_SERVICE_NAME: &str = "test-telemetry";
/// Default service version on exported resources
pub const DEFAULT_SERVICE_VERSION: &str = "1.0.0";
/// Default filename prefix of persisted batches
pub const DEFAULT_FILE_PREFIX: &str = "telemetry";

/// Complete telemetry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Time-series (OTLP) reporter configuration
    pub ts: TsConfig,
    /// File (DB) reporter configuration
    pub db: DbConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Time-series reporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TsConfig {
    /// Collector endpoint; falls back to `OTEL_EXPORTER_OTLP_ENDPOINT`
    pub endpoint: Option<String>,
    /// Static gRPC metadata sent with every export
    pub headers: BTreeMap<String, String>,
    /// Extra attributes merged into the exported resource
    pub resource_attributes: BTreeMap<String, String>,
    /// Service name on the exported resource
    pub service_name: String,
    /// Service version on the exported resource
    pub service_version: String,
    /// Upper bound for a single export call
    #[serde(with = "humantime_serde")]
    pub export_timeout: Duration,
}

/// File reporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Output directory; the working directory when unset
    pub output_dir: Option<PathBuf>,
    /// Filename prefix of every batch file
    pub file_prefix: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Verbose log lines with targets and line numbers
    pub structured: bool,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for TsConfig {
    fn default() -> Self {
        TsConfig {
            endpoint: None,
            headers: BTreeMap::new(),
            resource_attributes: BTreeMap::new(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_version: DEFAULT_SERVICE_VERSION.to_string(),
            export_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            output_dir: None,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TelemetryError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        ConfigBuilder::new().from_yaml(&content)?.build()
    }

    /// Fill unset values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Fill unset values using `lookup` in place of the process environment.
    ///
    /// Only the collector endpoint has an environment fallback; empty
    /// variables are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.ts.endpoint.is_none() {
            self.ts.endpoint = lookup(ENDPOINT_ENV).filter(|value| !value.is_empty());
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.ts.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(TelemetryError::config(format!(
                    "OTLP endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
        }

        for key in self.ts.headers.keys() {
            let valid = !key.is_empty()
                && key
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b"-_.".contains(&b));
            if !valid {
                return Err(TelemetryError::config(format!(
                    "Invalid header name '{}': use lowercase ASCII letters, digits, '-', '_' or '.'",
                    key
                )));
            }
        }

        if self.ts.service_name.is_empty() {
            return Err(TelemetryError::config("service_name must not be empty"));
        }

        if self.ts.export_timeout.is_zero() {
            return Err(TelemetryError::config("export_timeout must be greater than 0"));
        }

        if self.db.file_prefix.is_empty() {
            return Err(TelemetryError::config("file_prefix must not be empty"));
        }

        if self.db.file_prefix.contains(|c| c == '/' || c == '\\') {
            return Err(TelemetryError::config(format!(
                "file_prefix must not contain path separators: '{}'",
                self.db.file_prefix
            )));
        }

        Ok(())
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| TelemetryError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set the collector endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.ts.endpoint = Some(endpoint.into());
        self
    }

    /// Add a static export header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.ts.headers.insert(key.into(), value.into());
        self
    }

    /// Add a resource attribute
    pub fn resource_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .ts
            .resource_attributes
            .insert(key.into(), value.into());
        self
    }

    /// Set the service name
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.ts.service_name = name.into();
        self
    }

    /// Set the export timeout
    pub fn export_timeout(mut self, timeout: Duration) -> Self {
        self.config.ts.export_timeout = timeout;
        self
    }

    /// Set the output directory for batch files
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.db.output_dir = Some(dir.into());
        self
    }

    /// Set the batch filename prefix
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.db.file_prefix = prefix.into();
        self
    }

    /// Set the log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.db.file_prefix, "telemetry");
        assert!(config.ts.endpoint.is_none());
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = ConfigBuilder::new().endpoint("localhost:4317").build();
        assert!(config.is_err());
    }

    #[test]
    fn test_invalid_header_name() {
        let config = ConfigBuilder::new().header("X-Api-Key", "secret").build();
        assert!(config.is_err());

        let config = ConfigBuilder::new().header("x-api-key", "secret").build();
        assert!(config.is_ok());
    }

    #[test]
    fn test_file_prefix_validation() {
        assert!(ConfigBuilder::new().file_prefix("").build().is_err());
        assert!(ConfigBuilder::new().file_prefix("a/b").build().is_err());
        assert!(ConfigBuilder::new().file_prefix("nightly").build().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ConfigBuilder::new().export_timeout(Duration::ZERO).build();
        assert!(config.is_err());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
ts:
  endpoint: "http://collector:4317"
  export_timeout: 2s
  resource_attributes:
    test.framework: cargo
db:
  file_prefix: nightly
logging:
  level: debug
"#;

        let config = ConfigBuilder::new().from_yaml(yaml).unwrap().build().unwrap();

        assert_eq!(config.ts.endpoint.as_deref(), Some("http://collector:4317"));
        assert_eq!(config.ts.export_timeout, Duration::from_secs(2));
        assert_eq!(config.ts.service_name, DEFAULT_SERVICE_NAME);
        assert_eq!(
            config.ts.resource_attributes.get("test.framework").map(String::as_str),
            Some("cargo")
        );
        assert_eq!(config.db.file_prefix, "nightly");
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_env_overlay_fills_missing_endpoint() {
        let mut config = Config::default();
        config.apply_env_with(|name| {
            (name == ENDPOINT_ENV).then(|| "http://otel:4317".to_string())
        });
        assert_eq!(config.ts.endpoint.as_deref(), Some("http://otel:4317"));

        let mut config = ConfigBuilder::new()
            .endpoint("http://explicit:4317")
            .build()
            .unwrap();
        config.apply_env_with(|_| Some("http://otel:4317".to_string()));
        assert_eq!(config.ts.endpoint.as_deref(), Some("http://explicit:4317"));

        let mut config = Config::default();
        config.apply_env_with(|_| Some(String::new()));
        assert!(config.ts.endpoint.is_none());
    }
}
