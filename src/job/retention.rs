/*!
 * Recently-Finished Retention Buffer
 * Bounded, most-recent-first list of terminated non-transient jobs kept for
 * post-mortem inspection. Entries are append-only snapshots.
 */

use super::record::JobRecord;
use crate::core::limits::RECENT_JOBS_CAPACITY;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::SystemTime;

/// Snapshot of one terminated job
#[derive(Debug, Clone)]
pub struct FinishedJob {
    pub record: JobRecord,
    pub finished_at: SystemTime,
}

/// Bounded retention buffer, most recent first
pub struct RecentJobs {
    entries: Mutex<VecDeque<FinishedJob>>,
    capacity: usize,
}

impl RecentJobs {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(RECENT_JOBS_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Record a terminated job, evicting the oldest past capacity
    pub fn record(&self, snapshot: JobRecord) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_back();
        }
        entries.push_front(FinishedJob {
            record: snapshot,
            finished_at: SystemTime::now(),
        });
    }

    /// Snapshot of the buffer, most recent first
    #[must_use]
    pub fn list(&self) -> Vec<FinishedJob> {
        self.entries.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for RecentJobs {
    fn default() -> Self {
        Self::new()
    }
}
