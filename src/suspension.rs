/// Idle-tab policies: background discard sweep and explicit close-inactive
use crate::activity::ActivityTracker;
use crate::constants::DEFAULT_CLOSE_INACTIVE_MINUTES;
use crate::domain::{extract_domain, is_excluded, is_qualifying_url};
use crate::error::OrganizerResult;
use crate::platform::{TabFilter, TabPlatform};
use crate::report::BatchReport;
use crate::settings::Settings;
use crate::tab_data::{BrowserTab, TabId};

fn idle_for(tab: &BrowserTab, activity: &ActivityTracker, now: i64) -> i64 {
    now - activity.last_active_of(tab, now)
}

/// Candidate for discard: background, unpinned, loaded, http(s), not excluded
pub fn is_suspendable(tab: &BrowserTab, settings: &Settings) -> bool {
    if tab.active || tab.pinned || tab.discarded || !is_qualifying_url(tab.url()) {
        return false;
    }
    let domain = extract_domain(tab.url()).unwrap_or_default();
    !is_excluded(&domain, &settings.excluded_sites)
}

/// Discard every suspendable tab idle longer than the configured timeout
///
/// Runs against a fresh tab query each call. Refused discards are
/// recorded as skipped and never retried.
pub async fn sweep<P: TabPlatform>(
    platform: &P,
    settings: &Settings,
    activity: &ActivityTracker,
    now: i64,
) -> OrganizerResult<BatchReport<TabId>> {
    let mut report = BatchReport::new();
    let Some(timeout_ms) = settings.suspend_timeout.as_millis() else {
        return Ok(report);
    };

    let tabs = platform.query_tabs(TabFilter::All).await?;
    for tab in tabs
        .iter()
        .filter(|t| is_suspendable(t, settings))
        .filter(|t| idle_for(t, activity, now) > timeout_ms)
    {
        let result = platform.discard_tab(tab.id).await;
        report.record(tab.id, result);
    }

    if !report.is_empty() {
        log::info!("Suspend sweep discarded {} tabs", report.applied());
    }
    Ok(report)
}

/// Close background tabs idle past the timeout (30 minutes when disabled)
pub async fn close_inactive<P: TabPlatform>(
    platform: &P,
    settings: &Settings,
    activity: &ActivityTracker,
    now: i64,
) -> OrganizerResult<BatchReport<TabId>> {
    let timeout_ms = settings
        .suspend_timeout
        .as_millis()
        .unwrap_or(DEFAULT_CLOSE_INACTIVE_MINUTES * 60_000);

    let tabs = platform.query_tabs(TabFilter::All).await?;
    let mut report = BatchReport::new();
    for tab in tabs
        .iter()
        .filter(|t| !t.active && !t.pinned && is_qualifying_url(t.url()))
        .filter(|t| idle_for(t, activity, now) > timeout_ms)
    {
        let result = platform.remove_tab(tab.id).await;
        report.record(tab.id, result);
    }

    log::info!("Closed {} inactive tabs", report.applied());
    Ok(report)
}
