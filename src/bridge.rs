/// Browser implementations of the platform seams, backed by js/chrome.js
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::WorkerGlobalScope;

use crate::engine::{LoadStatus, TabChange};
use crate::error::{OrganizerError, OrganizerResult};
use crate::platform::{Clock, GroupTarget, GroupUpdate, KeyValueStore, StorageArea, TabFilter, TabPlatform};
use crate::tab_data::{BrowserTab, GroupId, TabGroupInfo, TabId, WindowId};

// Import JS bridge functions
#[wasm_bindgen(module = "/js/chrome.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn queryTabs(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryGroups(window_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getWindowIds() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn groupTabs(tab_ids: JsValue, group_id: JsValue, window_id: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn updateGroup(group_id: i32, props: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn discardTab(tab_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeTab(tab_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn createWindow(url: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn createTab(window_id: i32, url: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn activateTab(tab_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn focusWindow(window_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn openOptionsPage() -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn getStorage(area: &str, key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(area: &str, key: &str, value: JsValue) -> Result<(), JsValue>;
}

fn describe(e: &JsValue) -> String {
    e.as_string()
        .or_else(|| {
            e.dyn_ref::<js_sys::Error>()
                .map(|err| String::from(err.message()))
        })
        .unwrap_or_else(|| format!("{:?}", e))
}

/// Plain-object encoding so maps arrive in JS as objects, not `Map`s
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> OrganizerResult<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| OrganizerError::platform(format!("Failed to serialize: {}", e)))
}

pub fn from_js<T: DeserializeOwned>(value: JsValue) -> OrganizerResult<T> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| OrganizerError::platform(format!("Failed to parse: {}", e)))
}

fn platform_err(action: &str) -> impl Fn(JsValue) -> OrganizerError + '_ {
    move |e| OrganizerError::platform(format!("{} failed: {}", action, describe(&e)))
}

fn storage_err(action: &str) -> impl Fn(JsValue) -> OrganizerError + '_ {
    move |e| OrganizerError::storage(format!("{} failed: {}", action, describe(&e)))
}

/// chrome.tabs / chrome.tabGroups / chrome.windows
#[derive(Debug, Default, Clone, Copy)]
pub struct JsPlatform;

impl TabPlatform for JsPlatform {
    async fn query_tabs(&self, filter: TabFilter) -> OrganizerResult<Vec<BrowserTab>> {
        let query = match filter {
            TabFilter::All => json!({}),
            TabFilter::Window(window_id) => json!({ "windowId": window_id }),
            TabFilter::CurrentWindow => json!({ "currentWindow": true }),
            TabFilter::Active => json!({ "active": true }),
        };
        let tabs = queryTabs(to_js(&query)?).await.map_err(platform_err("Tab query"))?;
        from_js(tabs)
    }

    async fn query_groups(&self, window_id: WindowId) -> OrganizerResult<Vec<TabGroupInfo>> {
        let groups = queryGroups(window_id).await.map_err(platform_err("Group query"))?;
        from_js(groups)
    }

    async fn window_ids(&self) -> OrganizerResult<Vec<WindowId>> {
        let ids = getWindowIds().await.map_err(platform_err("Window query"))?;
        from_js(ids)
    }

    async fn group_tabs(&self, tab_ids: &[TabId], target: GroupTarget) -> OrganizerResult<GroupId> {
        let (group_id, window_id) = match target {
            GroupTarget::Existing(group_id) => (JsValue::from(group_id), JsValue::NULL),
            GroupTarget::NewInWindow(window_id) => (JsValue::NULL, JsValue::from(window_id)),
        };
        let id = groupTabs(to_js(tab_ids)?, group_id, window_id)
            .await
            .map_err(platform_err("Grouping"))?;
        from_js(id)
    }

    async fn update_group(&self, group_id: GroupId, update: &GroupUpdate) -> OrganizerResult<()> {
        let props = json!({
            "title": update.title,
            "color": update.color,
            "collapsed": update.collapsed,
        });
        updateGroup(group_id, to_js(&props)?)
            .await
            .map_err(platform_err("Group update"))
    }

    async fn discard_tab(&self, tab_id: TabId) -> OrganizerResult<()> {
        discardTab(tab_id).await.map_err(platform_err("Discard"))
    }

    async fn remove_tab(&self, tab_id: TabId) -> OrganizerResult<()> {
        removeTab(tab_id).await.map_err(platform_err("Remove"))
    }

    async fn create_window(&self, url: Option<&str>) -> OrganizerResult<WindowId> {
        let url = url.map(JsValue::from).unwrap_or(JsValue::NULL);
        let id = createWindow(url).await.map_err(platform_err("Window create"))?;
        from_js(id)
    }

    async fn create_tab(&self, window_id: WindowId, url: &str) -> OrganizerResult<TabId> {
        let id = createTab(window_id, url).await.map_err(platform_err("Tab create"))?;
        from_js(id)
    }

    async fn activate_tab(&self, tab_id: TabId) -> OrganizerResult<BrowserTab> {
        let tab = activateTab(tab_id).await.map_err(platform_err("Activate"))?;
        from_js(tab)
    }

    async fn focus_window(&self, window_id: WindowId) -> OrganizerResult<()> {
        focusWindow(window_id).await.map_err(platform_err("Focus"))
    }

    async fn open_options_page(&self) -> OrganizerResult<()> {
        openOptionsPage().await.map_err(platform_err("Open options"))
    }
}

/// chrome.storage.sync / chrome.storage.local
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeStorage;

impl KeyValueStore for ChromeStorage {
    async fn get(&self, area: StorageArea, key: &str) -> OrganizerResult<Option<Value>> {
        let value = getStorage(area.as_str(), key)
            .await
            .map_err(storage_err("Storage read"))?;
        if value.is_null() || value.is_undefined() {
            return Ok(None);
        }
        serde_wasm_bindgen::from_value(value)
            .map(Some)
            .map_err(|e| OrganizerError::storage(format!("Failed to parse {}: {}", key, e)))
    }

    async fn set(&self, area: StorageArea, key: &str, value: Value) -> OrganizerResult<()> {
        setStorage(area.as_str(), key, to_js(&value)?)
            .await
            .map_err(storage_err("Storage write"))
    }
}

fn worker_scope() -> Option<WorkerGlobalScope> {
    js_sys::global().dyn_into::<WorkerGlobalScope>().ok()
}

/// Run `callback` after `ms` on the worker's timer queue
pub fn set_timeout(callback: &js_sys::Function, ms: i32) -> OrganizerResult<()> {
    let scope = worker_scope().ok_or_else(|| OrganizerError::platform("No worker scope"))?;
    scope
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback, ms)
        .map(|_| ())
        .map_err(platform_err("setTimeout"))
}

/// Date.now() plus timer-based sleeps
#[derive(Debug, Default, Clone, Copy)]
pub struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> i64 {
        js_sys::Date::now() as i64
    }

    async fn sleep(&self, ms: u32) {
        let mut armed: OrganizerResult<()> = Ok(());
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            armed = set_timeout(&resolve, ms as i32);
        });
        if let Err(e) = armed {
            log::warn!("Sleep skipped: {}", e);
            return;
        }
        let _ = JsFuture::from(promise).await;
    }
}

/// Decode chrome's `changeInfo`; unknown load states are ignored
pub fn tab_change(change_info: JsValue) -> OrganizerResult<TabChange> {
    #[derive(serde::Deserialize)]
    struct ChangeInfo {
        url: Option<String>,
        status: Option<String>,
    }

    let info: ChangeInfo = from_js(change_info)?;
    let status = match info.status.as_deref() {
        Some("loading") => Some(LoadStatus::Loading),
        Some("complete") => Some(LoadStatus::Complete),
        _ => None,
    };
    Ok(TabChange {
        url: info.url,
        status,
    })
}
