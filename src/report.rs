/// Per-item results for batch operations against the platform
use serde::Serialize;

use crate::error::OrganizerResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum ItemOutcome {
    Applied,
    /// The platform refused or the target vanished mid-batch
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItem<T> {
    pub target: T,
    pub outcome: ItemOutcome,
}

/// Outcomes of one sweep, keyed by whatever the batch acts on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport<T> {
    pub items: Vec<BatchItem<T>>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        BatchReport { items: Vec::new() }
    }
}

impl<T: std::fmt::Debug> BatchReport<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a platform call; failures are logged and kept, never raised
    pub fn record<R>(&mut self, target: T, result: OrganizerResult<R>) -> Option<R> {
        match result {
            Ok(value) => {
                self.items.push(BatchItem {
                    target,
                    outcome: ItemOutcome::Applied,
                });
                Some(value)
            }
            Err(e) => {
                log::debug!("Skipped {:?}: {}", target, e);
                self.items.push(BatchItem {
                    target,
                    outcome: ItemOutcome::Skipped(e.to_string()),
                });
                None
            }
        }
    }

    pub fn applied(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.outcome == ItemOutcome::Applied)
            .count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &BatchItem<T>> {
        self.items
            .iter()
            .filter(|item| item.outcome != ItemOutcome::Applied)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: BatchReport<T>) {
        self.items.extend(other.items);
    }
}
