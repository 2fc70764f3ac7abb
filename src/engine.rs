/// Background engine: owns the settings cache and activity map, reacts to
/// tab events and alarms, and exposes every operation the UI can request.
///
/// All state lives behind `RefCell`s. The host runs one task at a time, so
/// borrows are taken and released between awaits and never held across one.
///
/// The host may tear the process down and start it again without any
/// install or startup event, so anything that reads or flushes the
/// activity map first reloads the persisted copy once per process.
use std::cell::{Cell, RefCell};

use crate::activity::{ActivityTracker, record_visit};
use crate::constants::{AUTO_ORGANIZE_DEBOUNCE_MS, alarms};
use crate::debounce::Debouncer;
use crate::domain::{extract_domain, is_qualifying_url, normalize_url};
use crate::duplicates::{close_duplicates, find_duplicates};
use crate::error::OrganizerResult;
use crate::organizer::{organize_all, organize_window};
use crate::platform::{Clock, KeyValueStore, TabFilter, TabPlatform};
use crate::report::BatchReport;
use crate::sessions::{self, RestoredWindow};
use crate::settings::{Settings, SettingsPatch};
use crate::storage;
use crate::suspension;
use crate::tab_data::{BrowserTab, SavedSession, TabId, TabRecord, TabStats, WindowId};

/// Load state carried by a tab-updated event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// The parts of a tab-updated event the engine cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabChange {
    pub url: Option<String>,
    pub status: Option<LoadStatus>,
}

pub struct Engine<P, S, C> {
    platform: P,
    store: S,
    clock: C,
    settings: RefCell<Settings>,
    activity: RefCell<ActivityTracker>,
    auto_organize: RefCell<Debouncer<WindowId>>,
    ready: Cell<bool>,
}

impl<P, S, C> Engine<P, S, C>
where
    P: TabPlatform,
    S: KeyValueStore,
    C: Clock,
{
    pub fn new(platform: P, store: S, clock: C) -> Self {
        Engine {
            platform,
            store,
            clock,
            settings: RefCell::new(Settings::default()),
            activity: RefCell::new(ActivityTracker::new()),
            auto_organize: RefCell::new(Debouncer::new(AUTO_ORGANIZE_DEBOUNCE_MS)),
            ready: Cell::new(false),
        }
    }

    #[cfg(test)]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // Settings

    /// Re-read settings from storage and refresh the cache
    pub async fn refresh_settings(&self) -> OrganizerResult<Settings> {
        let settings = storage::load_settings(&self.store).await?;
        *self.settings.borrow_mut() = settings.clone();
        Ok(settings)
    }

    #[cfg(test)]
    pub fn cached_settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    pub async fn update_settings(&self, patch: SettingsPatch) -> OrganizerResult<Settings> {
        let merged = self.refresh_settings().await?.merge(patch);
        self.write_settings(merged).await
    }

    pub async fn reset_settings(&self) -> OrganizerResult<Settings> {
        self.write_settings(Settings::default()).await
    }

    async fn write_settings(&self, settings: Settings) -> OrganizerResult<Settings> {
        storage::save_settings(&self.store, &settings).await?;
        *self.settings.borrow_mut() = settings.clone();
        log::info!("Settings updated");
        Ok(settings)
    }

    // Lifecycle

    pub async fn on_installed(&self, first_install: bool) -> OrganizerResult<()> {
        if first_install {
            storage::save_settings(&self.store, &Settings::default()).await?;
            log::info!("Extension installed, defaults applied");
        }
        self.init().await
    }

    /// Load cached state and mark the currently active tabs
    pub async fn init(&self) -> OrganizerResult<()> {
        self.refresh_settings().await?;
        let stored = storage::load_last_active(&self.store).await?;
        self.activity.borrow_mut().restore(stored);
        self.ready.set(true);

        let now = self.clock.now_ms();
        let active = self.platform.query_tabs(TabFilter::Active).await?;
        {
            let mut activity = self.activity.borrow_mut();
            for tab in &active {
                activity.mark_active(tab.id, now);
            }
        }

        log::info!("Background engine initialized");
        Ok(())
    }

    /// Run `init` unless this process already has
    async fn ensure_ready(&self) -> OrganizerResult<()> {
        if self.ready.get() {
            return Ok(());
        }
        self.init().await
    }

    // Tab events

    pub fn on_tab_created(&self, tab_id: TabId) {
        self.activity.borrow_mut().mark_active(tab_id, self.clock.now_ms());
    }

    pub fn on_tab_activated(&self, tab_id: TabId) {
        self.activity.borrow_mut().mark_active(tab_id, self.clock.now_ms());
    }

    pub fn on_tab_removed(&self, tab_id: TabId) {
        self.activity.borrow_mut().forget(tab_id);
    }

    /// Track the update and maybe schedule an auto-organize
    ///
    /// Returns the delay after which `flush_auto_organize` should run when
    /// the tab's window was scheduled.
    pub async fn on_tab_updated(
        &self,
        tab_id: TabId,
        change: &TabChange,
        tab: &BrowserTab,
    ) -> OrganizerResult<Option<i64>> {
        let now = self.clock.now_ms();
        self.activity.borrow_mut().mark_active(tab_id, now);

        if change.url.is_some() && tab.url.is_some() {
            self.record_visit(tab_id, tab.url()).await?;
        }

        if change.status != Some(LoadStatus::Complete) || !is_qualifying_url(tab.url()) {
            return Ok(None);
        }

        let settings = self.refresh_settings().await?;
        if !settings.enabled || !settings.auto_organize {
            return Ok(None);
        }

        let mut debouncer = self.auto_organize.borrow_mut();
        debouncer.schedule(tab.window_id, now);
        Ok(Some(debouncer.delay_ms()))
    }

    /// Organize every window whose quiet period has elapsed
    pub async fn flush_auto_organize(&self) -> OrganizerResult<BatchReport<String>> {
        let due = self.auto_organize.borrow_mut().take_due(self.clock.now_ms());
        let mut report = BatchReport::new();
        if due.is_empty() {
            return Ok(report);
        }

        let settings = self.refresh_settings().await?;
        for window_id in due {
            match organize_window(&self.platform, window_id, &settings).await {
                Ok(window_report) => report.extend(window_report),
                Err(e) => log::warn!("Auto-organize of window {} failed: {}", window_id, e),
            }
        }
        Ok(report)
    }

    pub async fn record_visit(&self, tab_id: TabId, url: &str) -> OrganizerResult<()> {
        let mut usage = storage::load_usage(&self.store).await?;
        if record_visit(&mut usage, tab_id, url, self.clock.now_ms()) {
            storage::save_usage(&self.store, &usage).await?;
        }
        Ok(())
    }

    // Alarms

    pub async fn on_alarm(&self, name: &str) -> OrganizerResult<()> {
        self.ensure_ready().await?;
        match name {
            alarms::SUSPEND_CHECK => {
                let settings = self.refresh_settings().await?;
                if settings.enabled {
                    self.suspend_sweep(&settings).await?;
                }
                self.persist_activity().await
            }
            alarms::STATS_UPDATE => self.persist_activity().await,
            other => {
                log::debug!("Ignoring alarm {}", other);
                Ok(())
            }
        }
    }

    /// Flush the last-active map if it changed since the previous flush
    pub async fn persist_activity(&self) -> OrganizerResult<()> {
        self.ensure_ready().await?;
        let snapshot = {
            let activity = self.activity.borrow();
            if !activity.is_dirty() {
                return Ok(());
            }
            activity.entries().clone()
        };
        storage::save_last_active(&self.store, &snapshot).await?;
        self.activity.borrow_mut().mark_clean();
        Ok(())
    }

    pub fn activity_snapshot(&self) -> ActivityTracker {
        self.activity.borrow().clone()
    }

    // Operations

    pub async fn organize_now(&self) -> OrganizerResult<BatchReport<String>> {
        let settings = self.refresh_settings().await?;
        organize_all(&self.platform, &settings).await
    }

    pub async fn suspend_sweep(&self, settings: &Settings) -> OrganizerResult<BatchReport<TabId>> {
        let activity = self.activity_snapshot();
        suspension::sweep(&self.platform, settings, &activity, self.clock.now_ms()).await
    }

    pub async fn close_inactive(&self) -> OrganizerResult<BatchReport<TabId>> {
        self.ensure_ready().await?;
        let settings = self.refresh_settings().await?;
        let activity = self.activity_snapshot();
        suspension::close_inactive(&self.platform, &settings, &activity, self.clock.now_ms()).await
    }

    pub async fn close_duplicates(&self) -> OrganizerResult<BatchReport<TabId>> {
        close_duplicates(&self.platform).await
    }

    /// Fresh per-tab view across all windows
    pub async fn tab_records(&self) -> OrganizerResult<Vec<TabRecord>> {
        self.ensure_ready().await?;
        let tabs = self.platform.query_tabs(TabFilter::All).await?;
        let duplicate_urls: Vec<String> = find_duplicates(&tabs).into_iter().map(|set| set.url).collect();
        let now = self.clock.now_ms();
        let activity = self.activity.borrow();

        Ok(tabs
            .iter()
            .map(|tab| {
                let url = tab.url().to_string();
                TabRecord {
                    id: tab.id,
                    window_id: tab.window_id,
                    domain: extract_domain(&url).unwrap_or_default(),
                    is_duplicate: duplicate_urls.iter().any(|u| u == normalize_url(&url)),
                    title: tab.title().to_string(),
                    fav_icon_url: tab.fav_icon_url.clone(),
                    group_id: tab.group_id,
                    last_active_at: activity.last_active_of(tab, now),
                    created_at: tab.last_accessed_ms().unwrap_or(now),
                    is_discarded: tab.discarded,
                    memory_estimate_mb: TabRecord::memory_estimate(tab.discarded),
                    url,
                }
            })
            .collect())
    }

    pub async fn stats(&self) -> OrganizerResult<TabStats> {
        Ok(TabStats::from_records(&self.tab_records().await?))
    }

    /// Tabs whose "title url domain" matches the query
    pub async fn search_tabs(&self, query: &str) -> OrganizerResult<Vec<TabRecord>> {
        let records = self.tab_records().await?;
        if query.trim().is_empty() {
            return Ok(records);
        }
        Ok(records
            .into_iter()
            .filter(|t| fuzzy_match(query, &format!("{} {} {}", t.title, t.url, t.domain)))
            .collect())
    }

    pub async fn save_session(&self, name: String) -> OrganizerResult<SavedSession> {
        sessions::save_session(&self.platform, &self.store, &self.clock, name).await
    }

    pub async fn restore_session(&self, session_id: &str) -> OrganizerResult<Option<RestoredWindow>> {
        sessions::restore_session(&self.platform, &self.store, &self.clock, session_id).await
    }

    pub async fn delete_session(&self, session_id: &str) -> OrganizerResult<bool> {
        sessions::delete_session(&self.store, session_id).await
    }

    pub async fn list_sessions(&self) -> OrganizerResult<Vec<SavedSession>> {
        sessions::list_sessions(&self.store).await
    }

    pub async fn switch_to_tab(&self, tab_id: TabId) -> OrganizerResult<()> {
        let tab = self.platform.activate_tab(tab_id).await?;
        self.platform.focus_window(tab.window_id).await
    }

    pub async fn close_tab(&self, tab_id: TabId) -> OrganizerResult<()> {
        self.platform.remove_tab(tab_id).await?;
        self.activity.borrow_mut().forget(tab_id);
        Ok(())
    }

    pub async fn open_options(&self) -> OrganizerResult<()> {
        self.platform.open_options_page().await
    }
}

/// Case-insensitive substring match, else in-order character match
pub fn fuzzy_match(query: &str, text: &str) -> bool {
    let query = query.to_lowercase();
    let text = text.to_lowercase();
    if text.contains(&query) {
        return true;
    }

    let mut wanted = query.chars().peekable();
    for c in text.chars() {
        if wanted.peek() == Some(&c) {
            wanted.next();
        }
    }
    wanted.peek().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{TAB_GROUP_ID_NONE, keys};
    use crate::platform::StorageArea;
    use crate::settings::SuspendTimeout;
    use crate::testing::{FakePlatform, ManualClock, MemoryStore};
    use pollster::block_on;

    const MINUTE: i64 = 60_000;

    fn engine() -> Engine<FakePlatform, MemoryStore, ManualClock> {
        Engine::new(FakePlatform::new(), MemoryStore::new(), ManualClock::new(1_000 * MINUTE))
    }

    fn complete() -> TabChange {
        TabChange {
            url: None,
            status: Some(LoadStatus::Complete),
        }
    }

    #[test]
    fn test_fuzzy_match() {
        assert!(fuzzy_match("git", "GitHub https://github.com github.com"));
        assert!(fuzzy_match("ghb", "GitHub"));
        assert!(!fuzzy_match("bhg", "GitHub"));
    }

    #[test]
    fn test_first_install_writes_defaults() {
        let engine = engine();
        block_on(engine.on_installed(true)).unwrap();

        let raw = engine.store().raw(StorageArea::Sync, keys::SETTINGS).unwrap();
        assert_eq!(raw["suspendTimeout"], 30);
        assert_eq!(engine.cached_settings(), Settings::default());
    }

    #[test]
    fn test_init_restores_activity_and_marks_active_tabs() {
        let engine = engine();
        let id = engine.platform().add_tab(1, "https://a.com", "A");
        engine.platform().edit_tab(id, |t| t.active = true);
        engine.store().put(
            StorageArea::Local,
            keys::TAB_LAST_ACTIVE,
            serde_json::json!({"77": 5}),
        );

        block_on(engine.init()).unwrap();

        let activity = engine.activity_snapshot();
        assert_eq!(activity.recorded(77), Some(5));
        assert_eq!(activity.recorded(id), Some(engine.clock().now_ms()));
    }

    #[test]
    fn test_auto_organize_is_debounced_per_window() {
        let engine = engine();
        let a = engine.platform().add_tab(1, "https://github.com/a", "A");
        let b = engine.platform().add_tab(1, "https://github.com/b", "B");
        let tab_a = engine.platform().tab(a).unwrap();
        let tab_b = engine.platform().tab(b).unwrap();

        let delay = block_on(engine.on_tab_updated(a, &complete(), &tab_a)).unwrap();
        assert_eq!(delay, Some(AUTO_ORGANIZE_DEBOUNCE_MS));
        engine.clock().advance(300);
        block_on(engine.on_tab_updated(b, &complete(), &tab_b)).unwrap();

        engine.clock().advance(300);
        assert!(block_on(engine.flush_auto_organize()).unwrap().is_empty());
        assert!(engine.platform().groups_in(1).is_empty());

        engine.clock().advance(300);
        let report = block_on(engine.flush_auto_organize()).unwrap();
        assert_eq!(report.applied(), 1);
        assert_eq!(engine.platform().groups_in(1).len(), 1);
    }

    #[test]
    fn test_auto_organize_respects_setting() {
        let engine = engine();
        block_on(engine.update_settings(SettingsPatch {
            auto_organize: Some(false),
            ..SettingsPatch::default()
        }))
        .unwrap();
        let a = engine.platform().add_tab(1, "https://github.com/a", "A");
        let tab = engine.platform().tab(a).unwrap();

        let delay = block_on(engine.on_tab_updated(a, &complete(), &tab)).unwrap();

        assert_eq!(delay, None);
    }

    #[test]
    fn test_url_change_records_usage() {
        let engine = engine();
        let a = engine.platform().add_tab(1, "https://a.com/x", "A");
        let tab = engine.platform().tab(a).unwrap();
        let change = TabChange {
            url: Some("https://a.com/x".to_string()),
            status: Some(LoadStatus::Loading),
        };

        block_on(engine.on_tab_updated(a, &change, &tab)).unwrap();
        block_on(engine.on_tab_updated(a, &change, &tab)).unwrap();

        let usage = block_on(storage::load_usage(engine.store())).unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].visit_count, 2);
    }

    #[test]
    fn test_activity_is_persisted_only_on_alarms() {
        let engine = engine();
        engine.on_tab_created(5);
        engine.on_tab_activated(6);
        assert_eq!(engine.store().writes(), 0);

        block_on(engine.on_alarm(alarms::STATS_UPDATE)).unwrap();
        let stored = block_on(storage::load_last_active(engine.store())).unwrap();
        assert_eq!(stored.len(), 2);

        let writes = engine.store().writes();
        block_on(engine.on_alarm(alarms::STATS_UPDATE)).unwrap();
        assert_eq!(engine.store().writes(), writes);

        engine.on_tab_removed(5);
        block_on(engine.on_alarm(alarms::STATS_UPDATE)).unwrap();
        let stored = block_on(storage::load_last_active(engine.store())).unwrap();
        assert_eq!(stored.keys().copied().collect::<Vec<_>>(), vec![6]);
    }

    #[test]
    fn test_restarted_process_keeps_stored_activity() {
        let engine = engine();
        engine.store().put(
            StorageArea::Local,
            keys::TAB_LAST_ACTIVE,
            serde_json::json!({"77": 5, "78": 6}),
        );

        engine.on_tab_activated(9);
        block_on(engine.on_alarm(alarms::STATS_UPDATE)).unwrap();

        let stored = block_on(storage::load_last_active(engine.store())).unwrap();
        assert_eq!(stored.get(&77), Some(&5));
        assert_eq!(stored.get(&78), Some(&6));
        assert_eq!(stored.get(&9), Some(&engine.clock().now_ms()));
    }

    #[test]
    fn test_restarted_process_sweeps_with_stored_activity() {
        let engine = engine();
        let idle = engine.platform().add_tab(1, "https://a.com", "A");
        let stored = serde_json::json!({ (idle.to_string()): engine.clock().now_ms() - 45 * MINUTE });
        engine.store().put(StorageArea::Local, keys::TAB_LAST_ACTIVE, stored);

        block_on(engine.on_alarm(alarms::SUSPEND_CHECK)).unwrap();

        assert!(engine.platform().tab(idle).unwrap().discarded);
    }

    #[test]
    fn test_suspend_alarm_discards_idle_tabs() {
        let engine = engine();
        let old = engine.platform().add_tab(1, "https://a.com", "A");
        engine.on_tab_created(old);
        engine.clock().advance(31 * MINUTE);

        block_on(engine.on_alarm(alarms::SUSPEND_CHECK)).unwrap();

        assert!(engine.platform().tab(old).unwrap().discarded);
    }

    #[test]
    fn test_suspend_alarm_skipped_when_disabled() {
        let engine = engine();
        block_on(engine.update_settings(SettingsPatch {
            enabled: Some(false),
            ..SettingsPatch::default()
        }))
        .unwrap();
        let old = engine.platform().add_tab(1, "https://a.com", "A");
        engine.on_tab_created(old);
        engine.clock().advance(90 * MINUTE);

        block_on(engine.on_alarm(alarms::SUSPEND_CHECK)).unwrap();

        assert!(!engine.platform().tab(old).unwrap().discarded);
    }

    #[test]
    fn test_settings_update_is_seen_by_next_operation() {
        let engine = engine();
        let old = engine.platform().add_tab(1, "https://a.com", "A");
        engine.on_tab_created(old);
        engine.clock().advance(20 * MINUTE);
        block_on(engine.update_settings(SettingsPatch {
            suspend_timeout: Some(SuspendTimeout::Minutes15),
            ..SettingsPatch::default()
        }))
        .unwrap();

        let report = block_on(engine.close_inactive()).unwrap();

        assert_eq!(report.applied(), 1);
    }

    #[test]
    fn test_tab_records_flag_duplicates() {
        let engine = engine();
        engine.platform().add_tab(1, "https://a.com/p#1", "A");
        engine.platform().add_tab(1, "https://a.com/p#2", "A");
        let unique = engine.platform().add_tab(1, "https://www.b.com/", "B");
        engine.platform().edit_tab(unique, |t| t.discarded = true);

        let records = block_on(engine.tab_records()).unwrap();

        assert_eq!(records.len(), 3);
        assert!(records[0].is_duplicate && records[1].is_duplicate);
        assert!(!records[2].is_duplicate);
        assert_eq!(records[2].domain, "b.com");
        assert_eq!(records[2].group_id, TAB_GROUP_ID_NONE);
        assert_eq!(records[2].memory_estimate_mb, 10);

        let stats = block_on(engine.stats()).unwrap();
        assert_eq!(stats.duplicate_tabs, 2);
        assert_eq!(stats.memory_saved_mb, 70);
        assert_eq!(stats.total_memory_mb, 170);
    }

    #[test]
    fn test_search_tabs() {
        let engine = engine();
        engine.platform().add_tab(1, "https://github.com/a", "Pull requests");
        engine.platform().add_tab(1, "https://zinfandel.io/", "Cellar");

        let hits = block_on(engine.search_tabs("github")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(block_on(engine.search_tabs("  ")).unwrap().len(), 2);
    }

    #[test]
    fn test_switch_to_tab_focuses_window() {
        let engine = engine();
        let id = engine.platform().add_tab(4, "https://a.com", "A");

        block_on(engine.switch_to_tab(id)).unwrap();

        assert!(engine.platform().tab(id).unwrap().active);
        assert_eq!(engine.platform().focused_windows(), vec![4]);
        assert!(block_on(engine.switch_to_tab(999)).is_err());
    }
}
