//! Test context labels.
//!
//! The context identifies which test run produced a measurement. It is built
//! once, when a reporter is constructed, from what the test harness knows
//! about the current test and testbed, with environment variables and the
//! literal `"unknown"` as fallbacks.

use crate::core::Labels;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Context label keys.
pub mod keys {
    pub const TESTCASE: &str = "test.testcase";
    pub const FILE: &str = "test.file";
    pub const PARAMS_PREFIX: &str = "test.params.";
    pub const TESTBED: &str = "test.testbed";
    pub const DUT_COUNT: &str = "test.dut.count";
    pub const DUT_PRIMARY: &str = "test.dut.primary";
    pub const OS_VERSION: &str = "test.os.version";
    pub const JOB_ID: &str = "test.job.id";
}

/// Environment variables consulted when the harness does not supply a value.
pub mod env {
    pub const TESTBED_NAME: &str = "TESTBED_NAME";
    pub const BUILD_VERSION: &str = "BUILD_VERSION";
    pub const JOB_ID: &str = "JOB_ID";
}

/// Value used for any context key nobody could fill in.
pub const UNKNOWN: &str = "unknown";

/// What the harness knows about the running test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRun {
    /// Test case name
    pub name: String,
    /// Source file of the test; only the file name is kept
    pub file: Option<PathBuf>,
    /// Parameterization of the test case
    pub params: BTreeMap<String, String>,
}

impl TestRun {
    /// Create a run description for test `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the source file of the test.
    pub fn file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Add one test parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }
}

/// Testbed description, shaped like the harness' testbed info document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testbed {
    /// Testbed configuration name
    #[serde(rename = "conf-name", default)]
    pub conf_name: Option<String>,
    /// Devices under test
    #[serde(default)]
    pub duts: Vec<String>,
}

impl Testbed {
    /// Create a testbed description.
    pub fn new(conf_name: impl Into<String>, duts: Vec<String>) -> Self {
        Self {
            conf_name: Some(conf_name.into()),
            duts,
        }
    }
}

/// Immutable context labels of one reporter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestContext {
    labels: Labels,
}

impl TestContext {
    /// Detect the context from harness data, falling back to the process
    /// environment.
    pub fn detect(run: Option<&TestRun>, testbed: Option<&Testbed>) -> Self {
        Self::detect_with(run, testbed, |name| std::env::var(name).ok())
    }

    /// Detect the context using `lookup` in place of the process environment.
    pub fn detect_with<F>(run: Option<&TestRun>, testbed: Option<&Testbed>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_value = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let mut labels = Labels::new();

        if let Some(run) = run {
            labels.insert(keys::TESTCASE.to_string(), run.name.clone());
            if let Some(file_name) = run.file.as_deref().and_then(|f| f.file_name()) {
                labels.insert(keys::FILE.to_string(), file_name.to_string_lossy().into_owned());
            }
            for (name, value) in &run.params {
                labels.insert(format!("{}{}", keys::PARAMS_PREFIX, name), value.clone());
            }
        }

        if let Some(testbed) = testbed {
            let name = testbed.conf_name.clone().unwrap_or_else(|| UNKNOWN.to_string());
            labels.insert(keys::TESTBED.to_string(), name);

            if !testbed.duts.is_empty() {
                labels.insert(keys::DUT_COUNT.to_string(), testbed.duts.len().to_string());
                if let [primary] = testbed.duts.as_slice() {
                    labels.insert(keys::DUT_PRIMARY.to_string(), primary.clone());
                }
            }
        }

        if labels.get(keys::TESTBED).map_or(true, String::is_empty) {
            let name = env_value(env::TESTBED_NAME).unwrap_or_else(|| UNKNOWN.to_string());
            labels.insert(keys::TESTBED.to_string(), name);
        }

        labels.insert(
            keys::OS_VERSION.to_string(),
            env_value(env::BUILD_VERSION).unwrap_or_else(|| UNKNOWN.to_string()),
        );
        labels.insert(
            keys::JOB_ID.to_string(),
            env_value(env::JOB_ID).unwrap_or_else(|| UNKNOWN.to_string()),
        );

        for key in [keys::TESTCASE, keys::FILE] {
            labels
                .entry(key.to_string())
                .or_insert_with(|| UNKNOWN.to_string());
        }

        Self { labels }
    }

    /// Use `labels` verbatim as the context.
    pub fn from_labels(labels: Labels) -> Self {
        Self { labels }
    }

    /// Context labels.
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Look up one context value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Number of context labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when the context carries no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl From<Labels> for TestContext {
    fn from(labels: Labels) -> Self {
        Self::from_labels(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_context_from_run_and_testbed() {
        let run = TestRun::new("test_port_counters")
            .file("/tests/platform/test_ports.py")
            .param("speed", "100G");
        let testbed = Testbed::new("vlab-01", vec!["dut-01".to_string()]);

        let ctx = TestContext::detect_with(Some(&run), Some(&testbed), no_env);

        assert_eq!(ctx.get(keys::TESTCASE), Some("test_port_counters"));
        assert_eq!(ctx.get(keys::FILE), Some("test_ports.py"));
        assert_eq!(ctx.get("test.params.speed"), Some("100G"));
        assert_eq!(ctx.get(keys::TESTBED), Some("vlab-01"));
        assert_eq!(ctx.get(keys::DUT_COUNT), Some("1"));
        assert_eq!(ctx.get(keys::DUT_PRIMARY), Some("dut-01"));
        assert_eq!(ctx.get(keys::OS_VERSION), Some(UNKNOWN));
        assert_eq!(ctx.get(keys::JOB_ID), Some(UNKNOWN));
    }

    #[test]
    fn test_multiple_duts_have_no_primary() {
        let testbed = Testbed::new("physical-01", vec!["dut-01".into(), "dut-02".into()]);
        let ctx = TestContext::detect_with(None, Some(&testbed), no_env);

        assert_eq!(ctx.get(keys::DUT_COUNT), Some("2"));
        assert_eq!(ctx.get(keys::DUT_PRIMARY), None);
    }

    #[test]
    fn test_environment_fallbacks() {
        let env = |name: &str| match name {
            "TESTBED_NAME" => Some("env-testbed".to_string()),
            "BUILD_VERSION" => Some("build-123".to_string()),
            "JOB_ID" => Some(String::new()),
            _ => None,
        };

        let ctx = TestContext::detect_with(None, None, env);

        assert_eq!(ctx.get(keys::TESTBED), Some("env-testbed"));
        assert_eq!(ctx.get(keys::OS_VERSION), Some("build-123"));
        assert_eq!(ctx.get(keys::JOB_ID), Some(UNKNOWN));
        assert_eq!(ctx.get(keys::TESTCASE), Some(UNKNOWN));
        assert_eq!(ctx.get(keys::FILE), Some(UNKNOWN));
    }

    #[test]
    fn test_testbed_document_parsing() {
        let testbed: Testbed =
            serde_yaml::from_str("conf-name: vlab-testbed-01\nduts: [dut-01]\n").unwrap();
        assert_eq!(testbed.conf_name.as_deref(), Some("vlab-testbed-01"));
        assert_eq!(testbed.duts, vec!["dut-01".to_string()]);
    }
}
