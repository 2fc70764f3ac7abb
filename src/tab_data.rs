/// Data structures shared by the organizer, the platform seam and the UI protocol
use serde::{Deserialize, Serialize};

use crate::constants::{AVG_TAB_MEMORY_MB, DISCARDED_TAB_MEMORY_MB, TAB_GROUP_ID_NONE};

pub type TabId = i32;
pub type WindowId = i32;
pub type GroupId = i32;

/// Colours the platform accepts for tab groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
    Grey,
}

/// Live tab as reported by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserTab {
    pub id: TabId,
    pub window_id: WindowId,
    #[serde(default)]
    pub index: i32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub fav_icon_url: Option<String>,
    #[serde(default = "ungrouped")]
    pub group_id: GroupId,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub discarded: bool,
    #[serde(default)]
    pub last_accessed: Option<f64>,
}

fn ungrouped() -> GroupId {
    TAB_GROUP_ID_NONE
}

impl BrowserTab {
    #[cfg(test)]
    pub fn new(id: TabId, window_id: WindowId, url: &str, title: &str) -> BrowserTab {
        BrowserTab {
            id,
            window_id,
            index: 0,
            url: Some(url.to_string()),
            title: Some(title.to_string()),
            fav_icon_url: None,
            group_id: TAB_GROUP_ID_NONE,
            active: false,
            pinned: false,
            discarded: false,
            last_accessed: None,
        }
    }

    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn last_accessed_ms(&self) -> Option<i64> {
        self.last_accessed.map(|ms| ms as i64)
    }

    pub fn is_grouped(&self) -> bool {
        self.group_id != TAB_GROUP_ID_NONE
    }
}

/// Tab group as reported by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroupInfo {
    pub id: GroupId,
    pub window_id: WindowId,
    #[serde(default)]
    pub title: Option<String>,
    pub color: GroupColor,
    #[serde(default)]
    pub collapsed: bool,
}

/// Derived per-tab view returned to the UI; never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub id: TabId,
    pub window_id: WindowId,
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    pub domain: String,
    pub group_id: GroupId,
    pub last_active_at: i64,
    pub created_at: i64,
    pub is_discarded: bool,
    pub is_duplicate: bool,
    #[serde(rename = "memoryEstimateMB")]
    pub memory_estimate_mb: u32,
}

impl TabRecord {
    pub fn memory_estimate(discarded: bool) -> u32 {
        if discarded {
            DISCARDED_TAB_MEMORY_MB
        } else {
            AVG_TAB_MEMORY_MB
        }
    }
}

/// Aggregate counters for the popup header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabStats {
    pub total_tabs: usize,
    pub grouped_tabs: usize,
    pub duplicate_tabs: usize,
    pub discarded_tabs: usize,
    #[serde(rename = "memorySavedMB")]
    pub memory_saved_mb: u32,
    #[serde(rename = "totalMemoryMB")]
    pub total_memory_mb: u32,
}

impl TabStats {
    pub fn from_records(records: &[TabRecord]) -> TabStats {
        let discarded = records.iter().filter(|t| t.is_discarded).count();
        let active = records.len() - discarded;

        TabStats {
            total_tabs: records.len(),
            grouped_tabs: records.iter().filter(|t| t.group_id != TAB_GROUP_ID_NONE).count(),
            duplicate_tabs: records.iter().filter(|t| t.is_duplicate).count(),
            discarded_tabs: discarded,
            memory_saved_mb: discarded as u32 * (AVG_TAB_MEMORY_MB - DISCARDED_TAB_MEMORY_MB),
            total_memory_mb: active as u32 * AVG_TAB_MEMORY_MB
                + discarded as u32 * DISCARDED_TAB_MEMORY_MB,
        }
    }
}

/// Visit counter for one exact URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    pub tab_id: TabId,
    pub url: String,
    pub domain: String,
    pub visit_count: u32,
    /// Carried for storage compatibility; nothing accumulates into it.
    #[serde(default)]
    pub total_active_ms: u64,
    pub last_visit_at: i64,
}

/// A named snapshot of one window's tabs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedSession {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub tabs: Vec<SavedTab>,
}

/// A saved tab within a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedTab {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_color: Option<GroupColor>,
}
