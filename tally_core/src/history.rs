//! Bounded append-only log of accepted stable readings.
//!
//! One shared FIFO across all devices, so an observer gets a unified feed.
//! Both eviction rules (age and count) run on every append and every read;
//! reads are otherwise idempotent.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct HistoryCfg {
    /// Entries older than this are evicted (ms).
    pub retention_ms: u64,
    /// Hard cap on stored entries; oldest evicted first.
    pub max_entries: usize,
}

impl Default for HistoryCfg {
    fn default() -> Self {
        Self {
            retention_ms: 5 * 60 * 1000,
            max_entries: 300,
        }
    }
}

/// Snapshot appended for an accepted stable reading.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub device_id: String,
    pub weight_kg: f64,
    pub item_count: u32,
    pub at_ms: u64,
}

#[derive(Debug)]
pub struct HistoryBuffer {
    cfg: HistoryCfg,
    entries: VecDeque<HistoryEntry>,
}

impl HistoryBuffer {
    pub fn new(cfg: HistoryCfg) -> Self {
        let cap = cfg.max_entries.min(1024);
        Self {
            cfg,
            entries: VecDeque::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, now_ms: u64, entry: HistoryEntry) {
        self.prune_age(now_ms);
        self.entries.push_back(entry);
        while self.entries.len() > self.cfg.max_entries {
            self.entries.pop_front();
        }
    }

    /// Entries in arrival order, optionally for one device. Triggers the
    /// age sweep like any other access.
    pub fn snapshot(&mut self, now_ms: u64, device_id: Option<&str>) -> Vec<HistoryEntry> {
        self.prune_age(now_ms);
        self.entries
            .iter()
            .filter(|e| device_id.is_none_or(|id| e.device_id == id))
            .cloned()
            .collect()
    }

    /// Drop entries older than the retention window.
    pub fn prune_age(&mut self, now_ms: u64) {
        let cutoff = now_ms.saturating_sub(self.cfg.retention_ms);
        while let Some(front) = self.entries.front() {
            if front.at_ms < cutoff {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }
}
