/// Duplicate detection over fragment-stripped URLs
use std::collections::HashMap;

use crate::domain::{is_qualifying_url, normalize_url};
use crate::error::OrganizerResult;
use crate::platform::{TabFilter, TabPlatform};
use crate::report::BatchReport;
use crate::tab_data::{BrowserTab, TabId};

/// Tabs sharing one normalized URL, in platform listing order
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateSet {
    pub url: String,
    pub tabs: Vec<BrowserTab>,
}

impl DuplicateSet {
    /// Everything after the first (oldest-listed) tab
    pub fn extras(&self) -> &[BrowserTab] {
        &self.tabs[1..]
    }
}

/// Group http(s) tabs by URL without fragment; keep only sets of 2+
pub fn find_duplicates(tabs: &[BrowserTab]) -> Vec<DuplicateSet> {
    let mut sets: Vec<DuplicateSet> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for tab in tabs.iter().filter(|t| is_qualifying_url(t.url())) {
        let normalized = normalize_url(tab.url());
        match index.get(normalized) {
            Some(&i) => sets[i].tabs.push(tab.clone()),
            None => {
                index.insert(normalized, sets.len());
                sets.push(DuplicateSet {
                    url: normalized.to_string(),
                    tabs: vec![tab.clone()],
                });
            }
        }
    }

    sets.retain(|set| set.tabs.len() > 1);
    sets
}

/// Close all but the first tab of every duplicate set
///
/// The report only counts closes the platform confirmed.
pub async fn close_duplicates<P: TabPlatform>(platform: &P) -> OrganizerResult<BatchReport<TabId>> {
    let tabs = platform.query_tabs(TabFilter::All).await?;
    let mut report = BatchReport::new();

    for set in find_duplicates(&tabs) {
        for tab in set.extras() {
            let result = platform.remove_tab(tab.id).await;
            report.record(tab.id, result);
        }
    }

    log::info!("Closed {} duplicate tabs", report.applied());
    Ok(report)
}
