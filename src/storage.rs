/// Typed access to the extension's key-value storage
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::keys;
use crate::error::OrganizerResult;
use crate::platform::{KeyValueStore, StorageArea};
use crate::settings::Settings;
use crate::tab_data::{SavedSession, TabId, UsageEntry};

/// Read and decode one key; a missing key is `Ok(None)`
pub async fn load<T, S>(store: &S, area: StorageArea, key: &str) -> OrganizerResult<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore,
{
    match store.get(area, key).await? {
        Some(value) if !value.is_null() => Ok(Some(serde_json::from_value(value)?)),
        _ => Ok(None),
    }
}

pub async fn save<T, S>(store: &S, area: StorageArea, key: &str, value: &T) -> OrganizerResult<()>
where
    T: Serialize,
    S: KeyValueStore,
{
    store.set(area, key, serde_json::to_value(value)?).await
}

/// Stored settings overlaid on defaults; unreadable blobs fall back to defaults
pub async fn load_settings<S: KeyValueStore>(store: &S) -> OrganizerResult<Settings> {
    let raw = store.get(StorageArea::Sync, keys::SETTINGS).await?;
    let settings = match raw {
        Some(value) if !value.is_null() => serde_json::from_value(value).unwrap_or_else(|e| {
            log::warn!("Stored settings unreadable, using defaults: {}", e);
            Settings::default()
        }),
        _ => Settings::default(),
    };
    Ok(settings)
}

pub async fn save_settings<S: KeyValueStore>(store: &S, settings: &Settings) -> OrganizerResult<()> {
    save(store, StorageArea::Sync, keys::SETTINGS, settings).await
}

/// Last-active map; keys are stringified tab ids on disk
pub async fn load_last_active<S: KeyValueStore>(store: &S) -> OrganizerResult<HashMap<TabId, i64>> {
    let stored: HashMap<String, i64> = load(store, StorageArea::Local, keys::TAB_LAST_ACTIVE)
        .await?
        .unwrap_or_default();

    Ok(stored
        .into_iter()
        .filter_map(|(id, ts)| id.parse::<TabId>().ok().map(|id| (id, ts)))
        .collect())
}

pub async fn save_last_active<S: KeyValueStore>(
    store: &S,
    last_active: &HashMap<TabId, i64>,
) -> OrganizerResult<()> {
    let stored: HashMap<String, i64> = last_active
        .iter()
        .map(|(id, ts)| (id.to_string(), *ts))
        .collect();
    save(store, StorageArea::Local, keys::TAB_LAST_ACTIVE, &stored).await
}

pub async fn load_usage<S: KeyValueStore>(store: &S) -> OrganizerResult<Vec<UsageEntry>> {
    Ok(load(store, StorageArea::Local, keys::TAB_USAGE)
        .await?
        .unwrap_or_default())
}

pub async fn save_usage<S: KeyValueStore>(store: &S, usage: &[UsageEntry]) -> OrganizerResult<()> {
    save(store, StorageArea::Local, keys::TAB_USAGE, &usage).await
}

pub async fn load_sessions<S: KeyValueStore>(store: &S) -> OrganizerResult<SessionList> {
    Ok(load(store, StorageArea::Local, keys::SAVED_SESSIONS)
        .await?
        .unwrap_or_default())
}

pub async fn save_sessions<S: KeyValueStore>(store: &S, sessions: &SessionList) -> OrganizerResult<()> {
    save(store, StorageArea::Local, keys::SAVED_SESSIONS, sessions).await
}

/// Saved sessions, persisted as a bare list in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionList {
    pub sessions: Vec<SavedSession>,
}

impl SessionList {
    pub fn add_session(&mut self, session: SavedSession) {
        self.sessions.push(session);
    }

    pub fn remove_session(&mut self, session_id: &str) -> bool {
        let original_len = self.sessions.len();
        self.sessions.retain(|s| s.id != session_id);
        self.sessions.len() < original_len
    }

    pub fn get_session(&self, session_id: &str) -> Option<&SavedSession> {
        self.sessions.iter().find(|s| s.id == session_id)
    }
}
