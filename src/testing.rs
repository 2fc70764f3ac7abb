/// In-memory stand-ins for the browser, used by unit tests
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::error::{OrganizerError, OrganizerResult};
use crate::platform::{
    Clock, GroupTarget, GroupUpdate, KeyValueStore, StorageArea, TabFilter, TabPlatform,
};
use crate::tab_data::{BrowserTab, GroupColor, GroupId, TabGroupInfo, TabId, WindowId};

#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<(StorageArea, String), Value>>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, area: StorageArea, key: &str) -> Option<Value> {
        self.entries.borrow().get(&(area, key.to_string())).cloned()
    }

    pub fn put(&self, area: StorageArea, key: &str, value: Value) {
        self.entries.borrow_mut().insert((area, key.to_string()), value);
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, area: StorageArea, key: &str) -> OrganizerResult<Option<Value>> {
        Ok(self.raw(area, key))
    }

    async fn set(&self, area: StorageArea, key: &str, value: Value) -> OrganizerResult<()> {
        self.writes.set(self.writes.get() + 1);
        self.put(area, key, value);
        Ok(())
    }
}

/// Virtual clock; `sleep` advances time instead of waiting
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        ManualClock { now: Cell::new(now) }
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }

    async fn sleep(&self, ms: u32) {
        self.advance(ms as i64);
    }
}

#[derive(Default)]
struct FakeState {
    tabs: Vec<BrowserTab>,
    groups: Vec<TabGroupInfo>,
    windows: Vec<WindowId>,
    current_window: WindowId,
    next_tab_id: TabId,
    next_group_id: GroupId,
    next_window_id: WindowId,
    refuse_discard: HashSet<TabId>,
    refuse_remove: HashSet<TabId>,
    refuse_group: HashSet<TabId>,
    focused: Vec<WindowId>,
    options_opened: bool,
}

/// Scriptable tab strip with failure injection
pub struct FakePlatform {
    state: RefCell<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        FakePlatform {
            state: RefCell::new(FakeState {
                windows: vec![1],
                current_window: 1,
                next_tab_id: 100,
                next_group_id: 500,
                next_window_id: 2,
                ..FakeState::default()
            }),
        }
    }

    /// Append a tab to a window's strip and return its id
    pub fn add_tab(&self, window_id: WindowId, url: &str, title: &str) -> TabId {
        let mut state = self.state.borrow_mut();
        let id = state.next_tab_id;
        state.next_tab_id += 1;
        let index = state.tabs.iter().filter(|t| t.window_id == window_id).count() as i32;
        let mut tab = BrowserTab::new(id, window_id, url, title);
        tab.index = index;
        if !state.windows.contains(&window_id) {
            state.windows.push(window_id);
        }
        state.tabs.push(tab);
        id
    }

    pub fn edit_tab(&self, tab_id: TabId, edit: impl FnOnce(&mut BrowserTab)) {
        let mut state = self.state.borrow_mut();
        if let Some(tab) = state.tabs.iter_mut().find(|t| t.id == tab_id) {
            edit(tab);
        }
    }

    pub fn add_group(&self, window_id: WindowId, title: &str, color: GroupColor) -> GroupId {
        let mut state = self.state.borrow_mut();
        let id = state.next_group_id;
        state.next_group_id += 1;
        state.groups.push(TabGroupInfo {
            id,
            window_id,
            title: Some(title.to_string()),
            color,
            collapsed: false,
        });
        id
    }

    pub fn tab(&self, tab_id: TabId) -> Option<BrowserTab> {
        self.state.borrow().tabs.iter().find(|t| t.id == tab_id).cloned()
    }

    pub fn tabs_in(&self, window_id: WindowId) -> Vec<BrowserTab> {
        let state = self.state.borrow();
        state.tabs.iter().filter(|t| t.window_id == window_id).cloned().collect()
    }

    pub fn groups_in(&self, window_id: WindowId) -> Vec<TabGroupInfo> {
        let state = self.state.borrow();
        state.groups.iter().filter(|g| g.window_id == window_id).cloned().collect()
    }

    pub fn tab_count(&self) -> usize {
        self.state.borrow().tabs.len()
    }

    pub fn refuse_discard(&self, tab_id: TabId) {
        self.state.borrow_mut().refuse_discard.insert(tab_id);
    }

    pub fn refuse_remove(&self, tab_id: TabId) {
        self.state.borrow_mut().refuse_remove.insert(tab_id);
    }

    pub fn refuse_group(&self, tab_id: TabId) {
        self.state.borrow_mut().refuse_group.insert(tab_id);
    }

    pub fn focused_windows(&self) -> Vec<WindowId> {
        self.state.borrow().focused.clone()
    }

    pub fn options_opened(&self) -> bool {
        self.state.borrow().options_opened
    }
}

impl TabPlatform for FakePlatform {
    async fn query_tabs(&self, filter: TabFilter) -> OrganizerResult<Vec<BrowserTab>> {
        let state = self.state.borrow();
        let current = state.current_window;
        Ok(state
            .tabs
            .iter()
            .filter(|t| match filter {
                TabFilter::All => true,
                TabFilter::Window(w) => t.window_id == w,
                TabFilter::CurrentWindow => t.window_id == current,
                TabFilter::Active => t.active,
            })
            .cloned()
            .collect())
    }

    async fn query_groups(&self, window_id: WindowId) -> OrganizerResult<Vec<TabGroupInfo>> {
        Ok(self.groups_in(window_id))
    }

    async fn window_ids(&self) -> OrganizerResult<Vec<WindowId>> {
        Ok(self.state.borrow().windows.clone())
    }

    async fn group_tabs(&self, tab_ids: &[TabId], target: GroupTarget) -> OrganizerResult<GroupId> {
        let mut state = self.state.borrow_mut();
        for id in tab_ids {
            if state.refuse_group.contains(id) || !state.tabs.iter().any(|t| t.id == *id) {
                return Err(OrganizerError::platform(format!("No tab with id: {}", id)));
            }
        }

        let group_id = match target {
            GroupTarget::Existing(group_id) => {
                if !state.groups.iter().any(|g| g.id == group_id) {
                    return Err(OrganizerError::platform(format!("No group with id: {}", group_id)));
                }
                group_id
            }
            GroupTarget::NewInWindow(window_id) => {
                let id = state.next_group_id;
                state.next_group_id += 1;
                state.groups.push(TabGroupInfo {
                    id,
                    window_id,
                    title: None,
                    color: GroupColor::Grey,
                    collapsed: true,
                });
                id
            }
        };

        for tab in state.tabs.iter_mut().filter(|t| tab_ids.contains(&t.id)) {
            tab.group_id = group_id;
        }
        Ok(group_id)
    }

    async fn update_group(&self, group_id: GroupId, update: &GroupUpdate) -> OrganizerResult<()> {
        let mut state = self.state.borrow_mut();
        let group = state
            .groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| OrganizerError::platform(format!("No group with id: {}", group_id)))?;
        group.title = Some(update.title.clone());
        group.color = update.color;
        group.collapsed = update.collapsed;
        Ok(())
    }

    async fn discard_tab(&self, tab_id: TabId) -> OrganizerResult<()> {
        let mut state = self.state.borrow_mut();
        if state.refuse_discard.contains(&tab_id) {
            return Err(OrganizerError::platform("Cannot discard tab"));
        }
        let tab = state
            .tabs
            .iter_mut()
            .find(|t| t.id == tab_id)
            .ok_or_else(|| OrganizerError::platform(format!("No tab with id: {}", tab_id)))?;
        tab.discarded = true;
        Ok(())
    }

    async fn remove_tab(&self, tab_id: TabId) -> OrganizerResult<()> {
        let mut state = self.state.borrow_mut();
        if state.refuse_remove.contains(&tab_id) || !state.tabs.iter().any(|t| t.id == tab_id) {
            return Err(OrganizerError::platform(format!("No tab with id: {}", tab_id)));
        }
        state.tabs.retain(|t| t.id != tab_id);
        Ok(())
    }

    async fn create_window(&self, url: Option<&str>) -> OrganizerResult<WindowId> {
        let window_id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_window_id;
            state.next_window_id += 1;
            state.windows.push(id);
            id
        };
        if let Some(url) = url {
            self.add_tab(window_id, url, "");
        }
        Ok(window_id)
    }

    async fn create_tab(&self, window_id: WindowId, url: &str) -> OrganizerResult<TabId> {
        Ok(self.add_tab(window_id, url, ""))
    }

    async fn activate_tab(&self, tab_id: TabId) -> OrganizerResult<BrowserTab> {
        let mut state = self.state.borrow_mut();
        let window_id = state
            .tabs
            .iter()
            .find(|t| t.id == tab_id)
            .map(|t| t.window_id)
            .ok_or_else(|| OrganizerError::platform(format!("No tab with id: {}", tab_id)))?;
        for tab in state.tabs.iter_mut().filter(|t| t.window_id == window_id) {
            tab.active = tab.id == tab_id;
        }
        state
            .tabs
            .iter()
            .find(|t| t.id == tab_id)
            .cloned()
            .ok_or_else(|| OrganizerError::platform("tab vanished"))
    }

    async fn focus_window(&self, window_id: WindowId) -> OrganizerResult<()> {
        self.state.borrow_mut().focused.push(window_id);
        Ok(())
    }

    async fn open_options_page(&self) -> OrganizerResult<()> {
        self.state.borrow_mut().options_opened = true;
        Ok(())
    }
}
