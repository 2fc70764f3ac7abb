/// Tab Organizer - background engine for a tab-grouping Chrome extension
/// Built with Rust + WASM

mod activity;
mod bridge;
mod classifier;
mod constants;
mod debounce;
mod domain;
mod duplicates;
mod engine;
mod error;
mod messages;
mod organizer;
mod platform;
mod report;
mod sessions;
mod settings;
mod storage;
mod suspension;
mod tab_data;

#[cfg(test)]
mod testing;

use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::bridge::{ChromeStorage, JsClock, JsPlatform};
use crate::engine::Engine;
use crate::messages::{RawMessage, Response};

type BrowserEngine = Engine<JsPlatform, ChromeStorage, JsClock>;

thread_local! {
    static ENGINE: Rc<BrowserEngine> = Rc::new(Engine::new(JsPlatform, ChromeStorage, JsClock));
}

fn engine() -> Rc<BrowserEngine> {
    ENGINE.with(Rc::clone)
}

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Entry point for `chrome.runtime.onMessage`; always resolves to a reply
#[wasm_bindgen]
pub async fn handle_message(message: JsValue) -> Result<JsValue, JsValue> {
    let engine = engine();
    let response = match bridge::from_js::<RawMessage>(message) {
        Ok(raw) => messages::handle_message(&*engine, &raw).await,
        Err(e) => Response::failure(e.to_string()),
    };
    bridge::to_js(&response).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub async fn on_installed(reason: String) {
    if let Err(e) = engine().on_installed(reason == "install").await {
        log::error!("Install handling failed: {}", e);
    }
}

#[wasm_bindgen]
pub async fn on_startup() {
    if let Err(e) = engine().init().await {
        log::error!("Startup failed: {}", e);
    }
}

#[wasm_bindgen]
pub fn on_tab_created(tab_id: i32) {
    engine().on_tab_created(tab_id);
}

#[wasm_bindgen]
pub fn on_tab_activated(tab_id: i32) {
    engine().on_tab_activated(tab_id);
}

#[wasm_bindgen]
pub fn on_tab_removed(tab_id: i32) {
    engine().on_tab_removed(tab_id);
}

#[wasm_bindgen]
pub async fn on_tab_updated(tab_id: i32, change_info: JsValue, tab: JsValue) {
    let parsed = bridge::tab_change(change_info)
        .and_then(|change| bridge::from_js(tab).map(|tab| (change, tab)));
    let (change, tab) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Ignoring update for tab {}: {}", tab_id, e);
            return;
        }
    };

    match engine().on_tab_updated(tab_id, &change, &tab).await {
        Ok(Some(delay_ms)) => arm_auto_organize(delay_ms),
        Ok(None) => {}
        Err(e) => log::warn!("Update handling for tab {} failed: {}", tab_id, e),
    }
}

/// Fire `flush_auto_organize` once the debounce window has passed
fn arm_auto_organize(delay_ms: i64) {
    let callback = Closure::once_into_js(|| {
        spawn_local(async {
            if let Err(e) = engine().flush_auto_organize().await {
                log::warn!("Auto-organize failed: {}", e);
            }
        })
    });
    if let Err(e) = bridge::set_timeout(callback.unchecked_ref(), delay_ms as i32) {
        log::warn!("Could not schedule auto-organize: {}", e);
    }
}

#[wasm_bindgen]
pub async fn on_alarm(name: String) {
    if let Err(e) = engine().on_alarm(&name).await {
        log::warn!("Alarm {} failed: {}", name, e);
    }
}

/// `[name, periodInMinutes]` pairs for the alarms the worker must create
#[wasm_bindgen]
pub fn alarm_schedule() -> Result<JsValue, JsValue> {
    let schedule = [
        (constants::alarms::SUSPEND_CHECK, constants::alarms::SUSPEND_CHECK_PERIOD_MIN),
        (constants::alarms::STATS_UPDATE, constants::alarms::STATS_UPDATE_PERIOD_MIN),
    ];
    bridge::to_js(&schedule).map_err(|e| JsValue::from_str(&e.to_string()))
}

// Re-export core domain functions for JavaScript access
#[wasm_bindgen]
pub fn extract_domain(url: &str) -> String {
    domain::extract_domain(url).unwrap_or_else(|| "invalid".to_string())
}

/// Group name the default settings would give this page, if any
#[wasm_bindgen]
pub fn classify_url(url: &str, title: &str) -> Option<String> {
    classifier::classify(url, title, &settings::Settings::default())
        .into_group()
        .map(|group| group.name)
}
