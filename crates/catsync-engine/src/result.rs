//! Run result types.

use serde::Serialize;

use catsync_types::outcome::SyncStatistics;
use catsync_types::resource::ResourceType;

/// Result of one synchronization run for one resource type.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub resource_type: ResourceType,
    pub stats: SyncStatistics,
    pub pages: u64,
    pub duration_secs: f64,
    /// Whether the run stopped early on a cancellation request.
    pub cancelled: bool,
}

impl RunSummary {
    /// One-line human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        format!(
            "Synced {} '{}' resources in {:.2}s across {} page(s): \
             {} created, {} updated, {} unchanged, {} skipped, {} failed{}",
            self.stats.processed(),
            self.resource_type,
            self.duration_secs,
            self.pages,
            self.stats.created,
            self.stats.updated,
            self.stats.unchanged,
            self.stats.skipped,
            self.stats.failed,
            if self.cancelled { " (cancelled)" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_mentions_every_counter() {
        let summary = RunSummary {
            resource_type: ResourceType::new("product"),
            stats: SyncStatistics {
                created: 1,
                updated: 2,
                unchanged: 3,
                skipped: 4,
                failed: 5,
            },
            pages: 2,
            duration_secs: 1.5,
            cancelled: false,
        };
        let report = summary.report();
        assert!(report.contains("15 'product' resources"));
        assert!(report.contains("1 created"));
        assert!(report.contains("5 failed"));
        assert!(!report.contains("cancelled"));
    }

    #[test]
    fn cancelled_run_is_flagged() {
        let summary = RunSummary {
            resource_type: ResourceType::new("product"),
            stats: SyncStatistics::default(),
            pages: 0,
            duration_secs: 0.1,
            cancelled: true,
        };
        assert!(summary.report().contains("(cancelled)"));
    }
}
