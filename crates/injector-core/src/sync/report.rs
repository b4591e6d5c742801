//! Report types produced by the [`SyncEngine`](super::SyncEngine)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::model::SecretId;

/// Result of syncing one data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// New content was written
    Written,
    /// On-disk content already matched; nothing was touched
    Skipped,
}

/// Outcome of one item of a secret.
#[derive(Debug)]
pub struct ItemReport {
    pub key: String,
    pub path: PathBuf,
    pub result: Result<SyncOutcome, Error>,
}

/// Per-item outcomes of syncing one secret.
///
/// A failed item never prevents its siblings from being synced.
#[derive(Debug)]
pub struct SecretReport {
    pub secret: SecretId,
    pub items: Vec<ItemReport>,
}

impl SecretReport {
    pub fn new(secret: SecretId) -> Self {
        Self {
            secret,
            items: Vec::new(),
        }
    }

    pub fn written(&self) -> usize {
        self.count(SyncOutcome::Written)
    }

    pub fn skipped(&self) -> usize {
        self.count(SyncOutcome::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|item| item.result.is_err()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Failed items with their errors.
    pub fn errors(&self) -> impl Iterator<Item = (&ItemReport, &Error)> {
        self.items
            .iter()
            .filter_map(|item| item.result.as_ref().err().map(|e| (item, e)))
    }

    fn count(&self, outcome: SyncOutcome) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.result, Ok(o) if o == outcome))
            .count()
    }
}

/// What removing a deleted secret's artifacts did.
#[derive(Debug, Default)]
pub struct RemovalReport {
    /// Files that existed and were removed
    pub removed: Vec<PathBuf>,
    /// Whether the (then empty) target directory was removed too
    pub directory_removed: bool,
    /// Per-key failures
    pub errors: Vec<(String, Error)>,
}

impl RemovalReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Status of a drift check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    /// Everything is in sync
    Healthy,
    /// Some items are missing from the filesystem
    Missing,
    /// Some items differ from the desired content
    Drifted,
    /// The secret cannot be checked at all
    Broken,
}

/// An item that has drifted or is missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftItem {
    /// The secret this item belongs to
    pub secret: String,
    pub key: String,
    pub path: PathBuf,
    /// Human-readable description of the drift
    pub description: String,
}

/// Report from a drift check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub status: CheckStatus,
    pub drifted: Vec<DriftItem>,
    pub missing: Vec<DriftItem>,
    pub messages: Vec<String>,
}

impl CheckReport {
    /// Create a healthy check report with no issues
    pub fn healthy() -> Self {
        Self {
            status: CheckStatus::Healthy,
            drifted: Vec::new(),
            missing: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Create a check report for a secret that could not be checked
    pub fn broken(message: String) -> Self {
        Self {
            status: CheckStatus::Broken,
            drifted: Vec::new(),
            missing: Vec::new(),
            messages: vec![message],
        }
    }

    /// Build a report from collected items, deriving the status
    pub fn from_items(drifted: Vec<DriftItem>, missing: Vec<DriftItem>) -> Self {
        let status = if !drifted.is_empty() {
            CheckStatus::Drifted
        } else if !missing.is_empty() {
            CheckStatus::Missing
        } else {
            CheckStatus::Healthy
        };
        Self {
            status,
            drifted,
            missing,
            messages: Vec::new(),
        }
    }

    /// Merge two check reports, combining their issues
    ///
    /// The resulting status is the "worst" of the two:
    /// Broken > Drifted > Missing > Healthy
    pub fn merge(mut self, other: CheckReport) -> Self {
        self.drifted.extend(other.drifted);
        self.missing.extend(other.missing);
        self.messages.extend(other.messages);

        self.status = match (self.status, other.status) {
            (CheckStatus::Broken, _) | (_, CheckStatus::Broken) => CheckStatus::Broken,
            (CheckStatus::Drifted, _) | (_, CheckStatus::Drifted) => CheckStatus::Drifted,
            (CheckStatus::Missing, _) | (_, CheckStatus::Missing) => CheckStatus::Missing,
            (CheckStatus::Healthy, CheckStatus::Healthy) => CheckStatus::Healthy,
        };

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drift(key: &str) -> DriftItem {
        DriftItem {
            secret: "default/app".to_string(),
            key: key.to_string(),
            path: PathBuf::from("/out/app").join(key),
            description: "test".to_string(),
        }
    }

    #[test]
    fn from_items_prefers_drifted() {
        assert_eq!(CheckReport::from_items(vec![], vec![]).status, CheckStatus::Healthy);
        assert_eq!(
            CheckReport::from_items(vec![], vec![drift("a")]).status,
            CheckStatus::Missing
        );
        assert_eq!(
            CheckReport::from_items(vec![drift("a")], vec![drift("b")]).status,
            CheckStatus::Drifted
        );
    }

    #[test]
    fn merge_keeps_worst_status() {
        let merged = CheckReport::from_items(vec![], vec![drift("a")])
            .merge(CheckReport::from_items(vec![drift("b")], vec![]));
        assert_eq!(merged.status, CheckStatus::Drifted);
        assert_eq!(merged.missing.len(), 1);
        assert_eq!(merged.drifted.len(), 1);

        let broken = merged.merge(CheckReport::broken("no path".into()));
        assert_eq!(broken.status, CheckStatus::Broken);
        assert_eq!(broken.messages, vec!["no path".to_string()]);
    }

    #[test]
    fn secret_report_counts() {
        let mut report = SecretReport::new(SecretId::new(None, "app"));
        report.items.push(ItemReport {
            key: "a".into(),
            path: "/out/a".into(),
            result: Ok(SyncOutcome::Written),
        });
        report.items.push(ItemReport {
            key: "b".into(),
            path: "/out/b".into(),
            result: Ok(SyncOutcome::Skipped),
        });
        report.items.push(ItemReport {
            key: "c".into(),
            path: "/out/c".into(),
            result: Err(Error::shape("boom")),
        });

        assert_eq!(report.written(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert_eq!(report.errors().next().unwrap().0.key, "c");
    }
}
