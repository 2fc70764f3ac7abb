/// Per-tab last-active tracking and URL usage counters
use std::collections::HashMap;

use crate::constants::MAX_USAGE_ENTRIES;
use crate::domain::extract_domain;
use crate::tab_data::{BrowserTab, TabId, UsageEntry};

/// In-memory map of tab id → last time the tab was touched
///
/// Mutated on every tab event; written back to storage only on the
/// periodic alarms, so `dirty` tells the flush whether anything changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityTracker {
    last_active: HashMap<TabId, i64>,
    dirty: bool,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from the persisted map; live entries win over stored ones
    pub fn restore(&mut self, stored: HashMap<TabId, i64>) {
        for (tab_id, ts) in stored {
            self.last_active.entry(tab_id).or_insert(ts);
        }
    }

    pub fn mark_active(&mut self, tab_id: TabId, now: i64) {
        self.last_active.insert(tab_id, now);
        self.dirty = true;
    }

    pub fn forget(&mut self, tab_id: TabId) {
        if self.last_active.remove(&tab_id).is_some() {
            self.dirty = true;
        }
    }

    pub fn recorded(&self, tab_id: TabId) -> Option<i64> {
        self.last_active.get(&tab_id).copied()
    }

    /// Tracked time, else the platform's last-accessed time, else `now`
    pub fn last_active_of(&self, tab: &BrowserTab, now: i64) -> i64 {
        self.recorded(tab.id)
            .or_else(|| tab.last_accessed_ms())
            .unwrap_or(now)
    }

    pub fn entries(&self) -> &HashMap<TabId, i64> {
        &self.last_active
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

/// Count a visit to `url`, keeping at most the newest 500 entries
///
/// Entries are keyed by the exact URL. A revisit bumps the existing
/// entry in place; eviction trims from the front of the list.
pub fn record_visit(usage: &mut Vec<UsageEntry>, tab_id: TabId, url: &str, now: i64) -> bool {
    let Some(domain) = extract_domain(url) else {
        return false;
    };

    match usage.iter_mut().find(|entry| entry.url == url) {
        Some(entry) => {
            entry.visit_count += 1;
            entry.last_visit_at = now;
            entry.tab_id = tab_id;
        }
        None => usage.push(UsageEntry {
            tab_id,
            url: url.to_string(),
            domain,
            visit_count: 1,
            total_active_ms: 0,
            last_visit_at: now,
        }),
    }

    if usage.len() > MAX_USAGE_ENTRIES {
        let excess = usage.len() - MAX_USAGE_ENTRIES;
        usage.drain(..excess);
    }
    true
}
