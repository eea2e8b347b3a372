use std::time::Duration;

use metrics::{counter, histogram};

use crate::models::Classification;

/// Metric names emitted by the upload pipeline.
///
/// Nothing is exported unless the embedding process installs a recorder.
#[derive(Debug, Clone, Copy)]
pub struct MetricsCollector {
    pub uploads_total: &'static str,
    pub classifications_total: &'static str,
    pub classification_duration: &'static str,
    pub errors_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            uploads_total: "waste_sorter_uploads_total",
            classifications_total: "waste_sorter_classifications_total",
            classification_duration: "waste_sorter_classification_duration_seconds",
            errors_total: "waste_sorter_errors_total",
        }
    }
}

impl MetricsCollector {
    /// Record how an upload request ended ("classified", "rejected", "failed", "error")
    pub fn record_upload(&self, outcome: &'static str) {
        counter!(self.uploads_total, "outcome" => outcome).increment(1);
    }

    /// Record a successful classification
    pub fn record_classification(&self, result: &Classification, duration: Duration) {
        counter!(
            self.classifications_total,
            "category" => result.category.as_str(),
            "source" => result.source.as_str()
        )
        .increment(1);
        histogram!(self.classification_duration, "source" => result.source.as_str())
            .record(duration.as_secs_f64());
    }

    /// Record error metrics
    pub fn record_error(&self, error_type: &'static str, operation: &'static str) {
        counter!(self.errors_total, "type" => error_type, "operation" => operation).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ClassificationSource};

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::default();
        assert_eq!(collector.uploads_total, "waste_sorter_uploads_total");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let collector = MetricsCollector::default();
        let result = Classification {
            category: Category::Glass,
            confidence: 88.0,
            source: ClassificationSource::Stub,
        };
        collector.record_upload("classified");
        collector.record_classification(&result, Duration::from_millis(12));
        collector.record_error("database", "insert_classification");
    }
}
