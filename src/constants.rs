/// Fixed engine constants: storage keys, alarms, timings, palettes

use crate::tab_data::GroupColor;

/// Storage keys (one owner per key)
pub mod keys {
    pub const SETTINGS: &str = "settings";
    pub const TAB_USAGE: &str = "tab_usage";
    pub const SAVED_SESSIONS: &str = "saved_sessions";
    pub const TAB_LAST_ACTIVE: &str = "tab_last_active";
}

/// Alarm names and their periods in minutes
pub mod alarms {
    pub const SUSPEND_CHECK: &str = "suspend-check";
    pub const STATS_UPDATE: &str = "stats-update";

    pub const SUSPEND_CHECK_PERIOD_MIN: u32 = 5;
    pub const STATS_UPDATE_PERIOD_MIN: u32 = 10;
}

/// Delay used to coalesce rapid load-complete events for one window
pub const AUTO_ORGANIZE_DEBOUNCE_MS: i64 = 500;

/// Pause between reopening a session's tabs and organizing the new window
pub const RESTORE_SETTLE_MS: u32 = 1000;

/// Maximum number of usage entries kept in storage
pub const MAX_USAGE_ENTRIES: usize = 500;

/// Timeout applied by close-inactive when suspension is disabled
pub const DEFAULT_CLOSE_INACTIVE_MINUTES: i64 = 30;

pub const AVG_TAB_MEMORY_MB: u32 = 80;
pub const DISCARDED_TAB_MEMORY_MB: u32 = 10;

/// Sentinel group id the platform reports for ungrouped tabs
pub const TAB_GROUP_ID_NONE: i32 = -1;

/// Built-in group colour palette, in hashing order
pub const GROUP_COLORS: [GroupColor; 9] = [
    GroupColor::Blue,
    GroupColor::Red,
    GroupColor::Yellow,
    GroupColor::Green,
    GroupColor::Pink,
    GroupColor::Purple,
    GroupColor::Cyan,
    GroupColor::Orange,
    GroupColor::Grey,
];
