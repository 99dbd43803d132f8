//! Metrics collection for correlation

/// Counters for one correlator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelatorMetrics {
    /// Observations offered
    pub received: usize,

    /// Facts emitted in order
    pub emitted: usize,

    /// Facts emitted as late observations
    pub late: usize,

    /// Duplicate deliveries dropped
    pub duplicates: usize,

    /// Observations before the resume checkpoint
    pub skipped_before_checkpoint: usize,

    /// Observations for another scope
    pub foreign_scope: usize,

    /// Facts outside the agency region
    pub outside_region: usize,

    /// Buffered observations dropped by cancellation
    pub dropped_on_cancel: usize,
}

impl CorrelatorMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Total facts emitted, on time or late
    pub fn total_facts(&self) -> usize {
        self.emitted + self.late
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let lines = [
            "Correlator Metrics Summary".to_string(),
            "==========================".to_string(),
            format!("Observations received: {}", self.received),
            format!("Facts emitted: {} ({} late)", self.total_facts(), self.late),
            format!("Outside agency region: {}", self.outside_region),
            format!("Duplicates dropped: {}", self.duplicates),
            format!("Skipped before checkpoint: {}", self.skipped_before_checkpoint),
            format!("Foreign scope: {}", self.foreign_scope),
            format!("Dropped on cancel: {}", self.dropped_on_cancel),
        ];
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_mentions_totals() {
        let metrics = CorrelatorMetrics {
            received: 5,
            emitted: 3,
            late: 1,
            duplicates: 1,
            ..Default::default()
        };
        let summary = metrics.summary();
        assert!(summary.contains("Facts emitted: 4 (1 late)"));
        assert!(summary.contains("Duplicates dropped: 1"));
    }

    #[test]
    fn test_reset() {
        let mut metrics = CorrelatorMetrics {
            received: 2,
            ..Default::default()
        };
        metrics.reset();
        assert_eq!(metrics, CorrelatorMetrics::new());
    }
}
