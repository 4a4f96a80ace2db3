//! Run Reporting
//!
//! Counters accumulated over one enrichment run. Partial success is a
//! first-class outcome: failed batches and resolution gaps are reported,
//! never silently swallowed.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Metrics and counters for one enrichment run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// Total wall-clock time
    pub total_duration: Duration,

    /// Time spent on the neighborhood phase (connections + clusters)
    pub neighborhood_phase_duration: Duration,

    /// Whether the neighborhood phase ultimately failed its store writes
    pub neighborhood_phase_failed: bool,

    /// Property batches attempted
    pub batches_total: usize,

    /// Property batches that failed after exhausting retries
    pub batches_failed: usize,

    /// Properties read across successful batches
    pub properties_processed: usize,

    /// Similarity edges persisted
    pub similarity_edges: usize,

    /// Connection edges persisted
    pub connection_edges: usize,

    /// Topic clusters persisted
    pub topic_clusters: usize,

    /// Relationship documents persisted
    pub documents_written: usize,

    /// Unresolvable neighborhood/article references, recovered locally
    pub resolution_gaps: usize,

    /// Edges dropped for out-of-range scores (invariant violations)
    pub dropped_edges: usize,
}

impl RunReport {
    /// Whether every batch and phase completed
    pub fn is_complete(&self) -> bool {
        self.batches_failed == 0 && !self.neighborhood_phase_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completeness() {
        let mut report = RunReport::default();
        assert!(report.is_complete());

        report.batches_failed = 1;
        assert!(!report.is_complete());

        report.batches_failed = 0;
        report.neighborhood_phase_failed = true;
        assert!(!report.is_complete());
    }
}
