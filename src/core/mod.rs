//! Core types shared by metrics and reporters.
//!
//! Configuration, errors, label merging and the test context live here.

pub mod config;
pub mod context;
pub mod error;
pub mod labels;
pub mod time;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, DbConfig, LogLevel, LoggingConfig, TsConfig};
pub use context::{TestContext, TestRun, Testbed};
pub use error::{Result, TelemetryError};
pub use labels::{merge_labels, Labels};
