//! In-memory reporter for tests.

use crate::core::{Result, TestContext};
use crate::reporter::{Batch, MetricRecord, Reporter, ReporterCore, ReporterType};
use parking_lot::Mutex;
use tracing::debug;

/// Reporter that keeps every reported batch in memory.
#[derive(Debug)]
pub struct MockReporter {
    core: ReporterCore,
    batches: Mutex<Vec<Batch>>,
}

impl MockReporter {
    pub fn new(test_context: TestContext) -> Self {
        Self {
            core: ReporterCore::new(ReporterType::Mock, test_context),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Measurements buffered since the last report
    pub fn recorded(&self) -> Vec<MetricRecord> {
        self.core.snapshot()
    }

    /// Every batch reported so far, oldest first
    pub fn reported_batches(&self) -> Vec<Batch> {
        self.batches.lock().clone()
    }

    /// Every reported measurement across batches
    pub fn reported_records(&self) -> Vec<MetricRecord> {
        self.batches
            .lock()
            .iter()
            .flat_map(|batch| batch.records.iter().cloned())
            .collect()
    }

    /// Number of non-empty reports
    pub fn report_count(&self) -> usize {
        self.batches.lock().len()
    }
}

impl Reporter for MockReporter {
    fn core(&self) -> &ReporterCore {
        &self.core
    }

    fn flush(&self, batch: &Batch) -> Result<()> {
        debug!("mock reporter: captured batch of {} measurements", batch.len());
        self.batches.lock().push(batch.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels;
    use crate::metrics::GaugeMetric;
    use crate::reporter::RecordValue;

    #[test]
    fn test_batches_are_kept_separately() {
        let reporter = MockReporter::new(TestContext::default());
        let metric = GaugeMetric::new("temperature.reading", "", "celsius", &reporter, labels!());

        metric.record(40.0, None);
        metric.record(41.0, None);
        reporter.report().unwrap();
        metric.record(42.0, None);
        reporter.report().unwrap();

        let batches = reporter.reported_batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 1);
        assert_eq!(batches[1].records[0].value, RecordValue::Scalar(42.0));
        assert_eq!(reporter.reported_records().len(), 3);
        assert!(reporter.recorded().is_empty());
    }
}
