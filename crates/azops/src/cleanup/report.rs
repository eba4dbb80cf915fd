//! Accumulated cleanup results.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::classifier::CleanupStatus;
use crate::report::TabularRecord;

/// Outcome for one evaluated resource group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceGroupRecord {
    pub subscription: String,
    pub resource_group: String,
    pub location: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub days_inactive: Option<i64>,
    pub status: CleanupStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TabularRecord for ResourceGroupRecord {
    const HEADERS: &'static [&'static str] = &[
        "Subscription",
        "ResourceGroup",
        "Location",
        "LastModified",
        "DaysInactive",
        "Status",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.subscription.clone(),
            self.resource_group.clone(),
            self.location.clone(),
            self.last_modified
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
            self.days_inactive.map(|d| d.to_string()).unwrap_or_default(),
            self.status.to_string(),
        ]
    }
}

impl ResourceGroupRecord {
    /// Attach a detail message, e.g. the error behind a `FAILED` row.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Report rows for a run, each group at most once.
#[derive(Debug, Default)]
pub struct CleanupReport {
    records: Vec<ResourceGroupRecord>,
    seen: HashSet<(String, String)>,
    failed_subscriptions: Vec<String>,
}

impl CleanupReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Returns `false` and keeps the first record when the
    /// (subscription, group) pair was already reported; names compare
    /// case-insensitively.
    pub fn append(&mut self, record: ResourceGroupRecord) -> bool {
        let key = (
            record.subscription.to_ascii_lowercase(),
            record.resource_group.to_ascii_lowercase(),
        );
        if !self.seen.insert(key) {
            return false;
        }
        self.records.push(record);
        true
    }

    #[must_use]
    pub fn contains(&self, subscription: &str, resource_group: &str) -> bool {
        self.seen.contains(&(
            subscription.to_ascii_lowercase(),
            resource_group.to_ascii_lowercase(),
        ))
    }

    #[must_use]
    pub fn records(&self) -> &[ResourceGroupRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Row count per status.
    #[must_use]
    pub fn summary(&self) -> BTreeMap<CleanupStatus, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.status).or_insert(0) += 1;
        }
        counts
    }

    /// Note a subscription whose resource groups could not be listed.
    pub fn record_failed_subscription(&mut self, subscription: &str) {
        if !self
            .failed_subscriptions
            .iter()
            .any(|s| s.eq_ignore_ascii_case(subscription))
        {
            self.failed_subscriptions.push(subscription.to_string());
        }
    }

    /// Subscriptions skipped because listing failed.
    #[must_use]
    pub fn failed_subscriptions(&self) -> &[String] {
        &self.failed_subscriptions
    }

    /// Whether any row failed or any subscription could not be scanned.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed_subscriptions.is_empty()
            || self
                .records
                .iter()
                .any(|r| r.status == CleanupStatus::Failed)
    }
}
