//! Local archive of completed scan results
//!
//! Lets `report` and `history` work on scans from earlier invocations without
//! rescanning. Entries expire after the configured number of days.

mod storage;

use std::time::Duration;

pub use storage::{ArchiveStats, ArchiveStorage, ArchivedScan, ClearStats, LATEST};

/// Retention period for archived results
pub fn retention(days: u32) -> Duration {
    Duration::from_secs(u64::from(days) * 24 * 60 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_days() {
        assert_eq!(retention(0), Duration::ZERO);
        assert_eq!(retention(30), Duration::from_secs(2_592_000));
    }
}
