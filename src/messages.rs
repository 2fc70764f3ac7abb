/// Popup/options ↔ background message protocol
///
/// Every request gets a `{success, data?, error?}` reply; errors never
/// escape the router.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::engine::Engine;
use crate::error::{OrganizerError, OrganizerResult};
use crate::platform::{Clock, KeyValueStore, TabPlatform};
use crate::settings::SettingsPatch;
use crate::tab_data::TabId;

/// Message as it arrives from the UI, before the type is checked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Ping,
    GetTabs,
    GetStats,
    OrganizeNow,
    CloseDuplicates,
    CloseInactive,
    SaveSession { name: Option<String> },
    RestoreSession { id: Option<String> },
    DeleteSession { id: Option<String> },
    GetSessions,
    SwitchToTab { tab_id: Option<TabId> },
    CloseTab { tab_id: Option<TabId> },
    SearchTabs { query: String },
    GetSettings,
    UpdateSettings(SettingsPatch),
    ResetSettings,
    OpenOptions,
}

#[derive(Debug, Default, Deserialize)]
struct NamePayload {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IdPayload {
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabPayload {
    tab_id: Option<TabId>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryPayload {
    #[serde(default)]
    query: String,
}

fn payload<T: DeserializeOwned + Default>(raw: &Option<Value>) -> OrganizerResult<T> {
    match raw {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| OrganizerError::invalid_payload(e.to_string())),
    }
}

/// Error for a request type the router does not know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMessage(pub String);

impl Request {
    /// Decode a raw message; `Ok(Err(_))` means the type is unknown
    pub fn parse(raw: &RawMessage) -> OrganizerResult<Result<Request, UnknownMessage>> {
        let p = &raw.payload;
        let request = match raw.kind.as_str() {
            "PING" => Request::Ping,
            "GET_TABS" => Request::GetTabs,
            "GET_STATS" => Request::GetStats,
            "ORGANIZE_NOW" => Request::OrganizeNow,
            "CLOSE_DUPLICATES" => Request::CloseDuplicates,
            "CLOSE_INACTIVE" => Request::CloseInactive,
            "SAVE_SESSION" => Request::SaveSession {
                name: payload::<NamePayload>(p)?.name,
            },
            "RESTORE_SESSION" => Request::RestoreSession {
                id: payload::<IdPayload>(p)?.id,
            },
            "DELETE_SESSION" => Request::DeleteSession {
                id: payload::<IdPayload>(p)?.id,
            },
            "GET_SESSIONS" => Request::GetSessions,
            "SWITCH_TO_TAB" => Request::SwitchToTab {
                tab_id: payload::<TabPayload>(p)?.tab_id,
            },
            "CLOSE_TAB" => Request::CloseTab {
                tab_id: payload::<TabPayload>(p)?.tab_id,
            },
            "SEARCH_TABS" => Request::SearchTabs {
                query: payload::<QueryPayload>(p)?.query,
            },
            "GET_SETTINGS" => Request::GetSettings,
            "UPDATE_SETTINGS" => Request::UpdateSettings(payload(p)?),
            "RESET_SETTINGS" => Request::ResetSettings,
            "OPEN_OPTIONS" => Request::OpenOptions,
            other => return Ok(Err(UnknownMessage(other.to_string()))),
        };
        Ok(Ok(request))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Response {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn with_data<T: Serialize>(data: &T) -> OrganizerResult<Self> {
        Ok(Response {
            success: true,
            data: Some(serde_json::to_value(data)?),
            error: None,
        })
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Response {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Default name for a session saved without one
pub fn default_session_name(now_ms: i64) -> String {
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp_nanos(now_ms as i128 * 1_000_000)
        .ok()
        .and_then(|at| at.format(format).ok())
        .map(|stamp| format!("Session {}", stamp))
        .unwrap_or_else(|| "Session".to_string())
}

/// Route one UI message; always produces a structured reply
pub async fn handle_message<P, S, C>(engine: &Engine<P, S, C>, raw: &RawMessage) -> Response
where
    P: TabPlatform,
    S: KeyValueStore,
    C: Clock,
{
    match dispatch(engine, raw).await {
        Ok(response) => response,
        Err(e) => {
            log::warn!("{} failed: {}", raw.kind, e);
            Response::failure(e.to_string())
        }
    }
}

async fn dispatch<P, S, C>(engine: &Engine<P, S, C>, raw: &RawMessage) -> OrganizerResult<Response>
where
    P: TabPlatform,
    S: KeyValueStore,
    C: Clock,
{
    let request = match Request::parse(raw)? {
        Ok(request) => request,
        Err(UnknownMessage(kind)) => {
            return Ok(Response::failure(format!("Unknown message type: {}", kind)));
        }
    };

    match request {
        Request::Ping => Response::with_data(&"pong"),
        Request::GetTabs => Response::with_data(&engine.tab_records().await?),
        Request::GetStats => Response::with_data(&engine.stats().await?),
        Request::OrganizeNow => {
            engine.organize_now().await?;
            Ok(Response::ok())
        }
        Request::CloseDuplicates => Response::with_data(&engine.close_duplicates().await?.applied()),
        Request::CloseInactive => Response::with_data(&engine.close_inactive().await?.applied()),
        Request::SaveSession { name } => {
            let name = name.unwrap_or_else(|| default_session_name(engine.clock().now_ms()));
            Response::with_data(&engine.save_session(name).await?)
        }
        Request::RestoreSession { id } => {
            let id = id.ok_or(OrganizerError::MissingField("No session ID"))?;
            engine.restore_session(&id).await?;
            Ok(Response::ok())
        }
        Request::DeleteSession { id } => {
            let id = id.ok_or(OrganizerError::MissingField("No session ID"))?;
            engine.delete_session(&id).await?;
            Ok(Response::ok())
        }
        Request::GetSessions => Response::with_data(&engine.list_sessions().await?),
        Request::SwitchToTab { tab_id } => {
            let tab_id = tab_id.ok_or(OrganizerError::MissingField("No tab ID"))?;
            Ok(match engine.switch_to_tab(tab_id).await {
                Ok(()) => Response::ok(),
                Err(_) => Response::failure("Tab not found"),
            })
        }
        Request::CloseTab { tab_id } => {
            let tab_id = tab_id.ok_or(OrganizerError::MissingField("No tab ID"))?;
            Ok(match engine.close_tab(tab_id).await {
                Ok(()) => Response::ok(),
                Err(_) => Response::failure("Failed to close tab"),
            })
        }
        Request::SearchTabs { query } => Response::with_data(&engine.search_tabs(&query).await?),
        Request::GetSettings => Response::with_data(&engine.refresh_settings().await?),
        Request::UpdateSettings(patch) => Response::with_data(&engine.update_settings(patch).await?),
        Request::ResetSettings => Response::with_data(&engine.reset_settings().await?),
        Request::OpenOptions => {
            engine.open_options().await?;
            Ok(Response::ok())
        }
    }
}
