/// Named window snapshots: save, restore, delete, list
use std::collections::HashMap;

use uuid::Uuid;

use crate::constants::RESTORE_SETTLE_MS;
use crate::domain::is_qualifying_url;
use crate::error::OrganizerResult;
use crate::organizer::organize_window;
use crate::platform::{Clock, KeyValueStore, TabFilter, TabPlatform};
use crate::report::BatchReport;
use crate::storage::{load_sessions, load_settings, save_sessions};
use crate::tab_data::{GroupId, SavedSession, SavedTab, TabGroupInfo, WindowId};

/// What a restore produced
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredWindow {
    pub window_id: WindowId,
    pub opened_tabs: usize,
    pub groups: BatchReport<String>,
}

/// Snapshot the current window's http(s) tabs with their group labels
pub async fn save_session<P, S, C>(
    platform: &P,
    store: &S,
    clock: &C,
    name: String,
) -> OrganizerResult<SavedSession>
where
    P: TabPlatform,
    S: KeyValueStore,
    C: Clock,
{
    let tabs = platform.query_tabs(TabFilter::CurrentWindow).await?;
    let groups: HashMap<GroupId, TabGroupInfo> = match tabs.first() {
        Some(tab) => platform
            .query_groups(tab.window_id)
            .await?
            .into_iter()
            .map(|g| (g.id, g))
            .collect(),
        None => HashMap::new(),
    };

    let session = SavedSession {
        id: Uuid::new_v4().to_string(),
        name,
        created_at: clock.now_ms(),
        tabs: tabs
            .iter()
            .filter(|t| is_qualifying_url(t.url()))
            .map(|t| {
                let group = if t.is_grouped() { groups.get(&t.group_id) } else { None };
                SavedTab {
                    url: t.url().to_string(),
                    title: t.title().to_string(),
                    group_name: group.and_then(|g| g.title.clone()),
                    group_color: group.map(|g| g.color),
                }
            })
            .collect(),
    };

    let mut sessions = load_sessions(store).await?;
    sessions.add_session(session.clone());
    save_sessions(store, &sessions).await?;

    log::info!("Saved session '{}' with {} tabs", session.name, session.tabs.len());
    Ok(session)
}

/// Reopen a saved session in a new window, then let the organizer regroup it
///
/// Saved group names are informational; groups are rebuilt by the
/// classifier with the settings current at the time of the regroup.
/// Returns `None` when no session has that id.
pub async fn restore_session<P, S, C>(
    platform: &P,
    store: &S,
    clock: &C,
    session_id: &str,
) -> OrganizerResult<Option<RestoredWindow>>
where
    P: TabPlatform,
    S: KeyValueStore,
    C: Clock,
{
    let sessions = load_sessions(store).await?;
    let Some(session) = sessions.get_session(session_id) else {
        log::debug!("No session with id {}", session_id);
        return Ok(None);
    };

    let first_url = session.tabs.first().map(|t| t.url.as_str());
    let window_id = platform.create_window(first_url).await?;
    let mut opened_tabs = usize::from(first_url.is_some());

    for tab in session.tabs.iter().skip(1) {
        match platform.create_tab(window_id, &tab.url).await {
            Ok(_) => opened_tabs += 1,
            Err(e) => log::warn!("Could not reopen {}: {}", tab.url, e),
        }
    }

    clock.sleep(RESTORE_SETTLE_MS).await;
    let settings = load_settings(store).await?;
    let groups = organize_window(platform, window_id, &settings).await?;

    log::info!("Restored session '{}' into window {}", session.name, window_id);
    Ok(Some(RestoredWindow {
        window_id,
        opened_tabs,
        groups,
    }))
}

/// Remove a session by id; returns whether anything was removed
pub async fn delete_session<S: KeyValueStore>(store: &S, session_id: &str) -> OrganizerResult<bool> {
    let mut sessions = load_sessions(store).await?;
    let removed = sessions.remove_session(session_id);
    save_sessions(store, &sessions).await?;
    Ok(removed)
}

pub async fn list_sessions<S: KeyValueStore>(store: &S) -> OrganizerResult<Vec<SavedSession>> {
    Ok(load_sessions(store).await?.sessions)
}
