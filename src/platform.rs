/// Seams to the host browser: tabs, storage and time
///
/// Everything the organizer does to the outside world goes through these
/// traits. The browser build implements them in `bridge.rs`; tests use
/// in-memory fakes.
use serde_json::Value;

use crate::error::OrganizerResult;
use crate::tab_data::{BrowserTab, GroupColor, GroupId, TabGroupInfo, TabId, WindowId};

/// Which tabs a query should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabFilter {
    All,
    Window(WindowId),
    CurrentWindow,
    Active,
}

/// Destination for a grouping call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupTarget {
    Existing(GroupId),
    NewInWindow(WindowId),
}

/// Properties applied to a freshly created group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupUpdate {
    pub title: String,
    pub color: GroupColor,
    pub collapsed: bool,
}

#[allow(async_fn_in_trait)]
pub trait TabPlatform {
    async fn query_tabs(&self, filter: TabFilter) -> OrganizerResult<Vec<BrowserTab>>;

    async fn query_groups(&self, window_id: WindowId) -> OrganizerResult<Vec<TabGroupInfo>>;

    async fn window_ids(&self) -> OrganizerResult<Vec<WindowId>>;

    async fn group_tabs(&self, tab_ids: &[TabId], target: GroupTarget) -> OrganizerResult<GroupId>;

    async fn update_group(&self, group_id: GroupId, update: &GroupUpdate) -> OrganizerResult<()>;

    async fn discard_tab(&self, tab_id: TabId) -> OrganizerResult<()>;

    async fn remove_tab(&self, tab_id: TabId) -> OrganizerResult<()>;

    /// Opens a new window, optionally seeded with a URL
    async fn create_window(&self, url: Option<&str>) -> OrganizerResult<WindowId>;

    async fn create_tab(&self, window_id: WindowId, url: &str) -> OrganizerResult<TabId>;

    /// Makes the tab active and returns its refreshed state
    async fn activate_tab(&self, tab_id: TabId) -> OrganizerResult<BrowserTab>;

    async fn focus_window(&self, window_id: WindowId) -> OrganizerResult<()>;

    async fn open_options_page(&self) -> OrganizerResult<()>;
}

/// The two storage areas the extension writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    /// Small, synced user preferences
    Sync,
    /// Larger machine-local data
    Local,
}

impl StorageArea {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageArea::Sync => "sync",
            StorageArea::Local => "local",
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get(&self, area: StorageArea, key: &str) -> OrganizerResult<Option<Value>>;

    async fn set(&self, area: StorageArea, key: &str, value: Value) -> OrganizerResult<()>;
}

#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> i64;

    async fn sleep(&self, ms: u32);
}
