/// Turns classifier output into platform tab groups
use std::collections::HashMap;

use crate::classifier::classify;
use crate::domain::color_for_name;
use crate::error::OrganizerResult;
use crate::platform::{GroupTarget, GroupUpdate, TabFilter, TabPlatform};
use crate::report::BatchReport;
use crate::settings::Settings;
use crate::tab_data::{BrowserTab, GroupColor, GroupId, TabId, WindowId};

/// Tabs in one window that share a target group name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBucket {
    pub name: String,
    /// Explicit colour from the first custom rule that fed this bucket
    pub color: Option<GroupColor>,
    pub tab_ids: Vec<TabId>,
}

/// Bucket classifiable tabs by group name, in order of first appearance
pub fn bucket_tabs(tabs: &[BrowserTab], settings: &Settings) -> Vec<GroupBucket> {
    let mut buckets: Vec<GroupBucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for tab in tabs {
        let Some(assignment) = classify(tab.url(), tab.title(), settings).into_group() else {
            continue;
        };

        match index.get(&assignment.name) {
            Some(&i) => {
                let bucket = &mut buckets[i];
                bucket.tab_ids.push(tab.id);
                if bucket.color.is_none() {
                    bucket.color = assignment.color;
                }
            }
            None => {
                index.insert(assignment.name.clone(), buckets.len());
                buckets.push(GroupBucket {
                    name: assignment.name,
                    color: assignment.color,
                    tab_ids: vec![tab.id],
                });
            }
        }
    }

    buckets
}

/// Group every qualifying tab of one window
///
/// Buckets join an existing group with the same title regardless of
/// size; new groups are only created for buckets of two or more tabs.
/// Per-group failures are recorded in the report and do not stop the
/// remaining buckets.
pub async fn organize_window<P: TabPlatform>(
    platform: &P,
    window_id: WindowId,
    settings: &Settings,
) -> OrganizerResult<BatchReport<String>> {
    let tabs = platform.query_tabs(TabFilter::Window(window_id)).await?;
    let existing: HashMap<String, GroupId> = platform
        .query_groups(window_id)
        .await?
        .into_iter()
        .filter_map(|g| match g.title {
            Some(title) if !title.is_empty() => Some((title, g.id)),
            _ => None,
        })
        .collect();

    let mut report = BatchReport::new();

    for bucket in bucket_tabs(&tabs, settings) {
        match existing.get(&bucket.name) {
            Some(&group_id) => {
                let result = platform
                    .group_tabs(&bucket.tab_ids, GroupTarget::Existing(group_id))
                    .await;
                report.record(bucket.name, result);
            }
            None if bucket.tab_ids.len() < 2 => continue,
            None => {
                let update = GroupUpdate {
                    color: bucket.color.unwrap_or_else(|| color_for_name(&bucket.name)),
                    title: bucket.name.clone(),
                    collapsed: false,
                };
                let result = create_group(platform, window_id, &bucket.tab_ids, &update).await;
                report.record(bucket.name, result);
            }
        }
    }

    log::info!(
        "Organized window {}: {} groups applied, {} skipped",
        window_id,
        report.applied(),
        report.skipped().count()
    );
    Ok(report)
}

async fn create_group<P: TabPlatform>(
    platform: &P,
    window_id: WindowId,
    tab_ids: &[TabId],
    update: &GroupUpdate,
) -> OrganizerResult<()> {
    let group_id = platform
        .group_tabs(tab_ids, GroupTarget::NewInWindow(window_id))
        .await?;
    platform.update_group(group_id, update).await
}

/// Organize every open window; a failing window is logged and skipped
pub async fn organize_all<P: TabPlatform>(
    platform: &P,
    settings: &Settings,
) -> OrganizerResult<BatchReport<String>> {
    let mut report = BatchReport::new();
    for window_id in platform.window_ids().await? {
        match organize_window(platform, window_id, settings).await {
            Ok(window_report) => report.extend(window_report),
            Err(e) => log::warn!("Failed to organize window {}: {}", window_id, e),
        }
    }
    Ok(report)
}
