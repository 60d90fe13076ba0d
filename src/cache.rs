//! Caller-owned memo table for cycle reports.
//!
//! The aggregator never consults this table; whoever calls it decides when a
//! cached report is still good enough.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::analyzers::types::{CycleFilter, CycleReport};

/// Default time-to-live: one hour, so an updated dataset is picked up.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct Entry {
    stored_at: Instant,
    report: Arc<CycleReport>,
}

/// Reports keyed by the filter they were computed for, expiring after `ttl`.
pub struct SummaryCache {
    ttl: Duration,
    entries: HashMap<CycleFilter, Entry>,
}

impl SummaryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the report for `filter` if it was stored less than `ttl` before
    /// `now`. An expired entry is evicted.
    pub fn get(&mut self, filter: &CycleFilter, now: Instant) -> Option<Arc<CycleReport>> {
        let fresh = match self.entries.get(filter) {
            Some(entry) => now.saturating_duration_since(entry.stored_at) < self.ttl,
            None => return None,
        };
        if !fresh {
            self.entries.remove(filter);
            return None;
        }
        self.entries.get(filter).map(|e| Arc::clone(&e.report))
    }

    pub fn insert(&mut self, filter: CycleFilter, report: Arc<CycleReport>, now: Instant) {
        self.entries.insert(
            filter,
            Entry {
                stored_at: now,
                report,
            },
        );
    }

    /// Drops every expired entry.
    pub fn purge_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.stored_at) < ttl);
    }

    /// Drops everything, e.g. after the dataset changed.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for SummaryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
