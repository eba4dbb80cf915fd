//! Sequential cleanup run across subscriptions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use azops_cloud::{AzureError, ResourceGroup, ResourceGroupOps};

use super::activity::{Activity, ActivityEvaluator};
use super::classifier::{Action, Candidate, Classifier, CleanupStatus, Decision, SafetyContext};
use super::report::{CleanupReport, ResourceGroupRecord};

/// Default name of the tag merged into groups marked for cleanup.
pub const DEFAULT_CLEANUP_TAG: &str = "cleanup-candidate";

/// Drives scanner, evaluator and classifier over a set of subscriptions.
#[derive(Debug, Clone)]
pub struct CleanupRunner {
    classifier: Classifier,
    evaluator: ActivityEvaluator,
    tag_name: String,
    now: DateTime<Utc>,
}

/// Classification result for a single group before it becomes a record.
struct Evaluated {
    activity: Activity,
    inactive_days: Option<i64>,
    decision: Decision,
}

impl CleanupRunner {
    pub fn new(classifier: Classifier, evaluator: ActivityEvaluator, now: DateTime<Utc>) -> Self {
        Self {
            classifier,
            evaluator,
            tag_name: DEFAULT_CLEANUP_TAG.to_string(),
            now,
        }
    }

    /// Override the cleanup tag name.
    #[must_use]
    pub fn with_tag_name(mut self, tag_name: impl Into<String>) -> Self {
        self.tag_name = tag_name.into();
        self
    }

    /// Process every subscription in order and collect the report.
    pub async fn run<S: ResourceGroupOps>(&self, subscriptions: &[S]) -> CleanupReport {
        let mut report = CleanupReport::new();

        info!(
            subscriptions = subscriptions.len(),
            delete_mode = self.classifier.delete_mode(),
            "Starting resource group cleanup"
        );

        for subscription in subscriptions {
            self.run_subscription(subscription, &mut report).await;
        }

        for (status, count) in report.summary() {
            info!(status = %status, count, "Cleanup summary");
        }
        report
    }

    async fn run_subscription<S: ResourceGroupOps>(&self, sub: &S, report: &mut CleanupReport) {
        let subscription_id = sub.subscription_id();
        let groups = match sub.list_resource_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                warn!(
                    subscription = %subscription_id,
                    error = %e,
                    "Failed to list resource groups, skipping subscription"
                );
                report.record_failed_subscription(subscription_id);
                return;
            }
        };

        debug!(subscription = %subscription_id, count = groups.len(), "Listed resource groups");

        for group in groups {
            if !self.classifier.matches_name(&group.name) {
                debug!(resource_group = %group.name, "Name matches no pattern");
                continue;
            }
            if report.contains(subscription_id, &group.name) {
                debug!(resource_group = %group.name, "Already reported in this run");
                continue;
            }

            let row = match self.evaluate(sub, &group).await {
                Ok(evaluated) => match evaluated.decision {
                    Decision::Report { status, action, rule } => {
                        debug!(resource_group = %group.name, rule, status = %status, "Classified");
                        self.act(
                            sub,
                            &group,
                            evaluated.activity,
                            evaluated.inactive_days,
                            status,
                            action,
                        )
                        .await
                    }
                    Decision::Excluded(reason) => {
                        debug!(resource_group = %group.name, reason = ?reason, "Excluded");
                        continue;
                    }
                    Decision::NeedsSafetyContext => {
                        warn!(
                            subscription = %subscription_id,
                            resource_group = %group.name,
                            "Classification still missing safety context"
                        );
                        record(
                            sub,
                            &group,
                            evaluated.activity,
                            evaluated.inactive_days,
                            CleanupStatus::Failed,
                        )
                        .with_detail("safety context unavailable")
                    }
                },
                Err(e) => {
                    warn!(
                        subscription = %subscription_id,
                        resource_group = %group.name,
                        error = %e,
                        "Failed to evaluate resource group"
                    );
                    record(sub, &group, Activity::Unknown, None, CleanupStatus::Failed)
                        .with_detail(e.to_string())
                }
            };

            report.append(row);
        }
    }

    /// Gather facts and classify. Locks are only fetched when a safety rule
    /// is reached.
    async fn evaluate<S: ResourceGroupOps>(
        &self,
        sub: &S,
        group: &ResourceGroup,
    ) -> Result<Evaluated, AzureError> {
        let resources = sub.list_resources(&group.name).await?;
        let activity = self.evaluator.evaluate(group, &resources);
        let inactive_days = activity.inactive_days(self.now);

        let candidate = Candidate {
            name: &group.name,
            activity,
            inactive_days,
            safety: None,
        };

        let decision = match self.classifier.classify(&candidate) {
            Decision::NeedsSafetyContext => {
                let locks = sub.list_locks(&group.name).await?;
                let safety = SafetyContext::new(&resources, &locks);
                self.classifier.classify(&Candidate {
                    safety: Some(&safety),
                    ..candidate
                })
            }
            decision => decision,
        };

        Ok(Evaluated {
            activity,
            inactive_days,
            decision,
        })
    }

    async fn act<S: ResourceGroupOps>(
        &self,
        sub: &S,
        group: &ResourceGroup,
        activity: Activity,
        inactive_days: Option<i64>,
        status: CleanupStatus,
        action: Action,
    ) -> ResourceGroupRecord {
        let result = match action {
            Action::None => Ok(()),
            Action::Delete => {
                info!(
                    subscription = %sub.subscription_id(),
                    resource_group = %group.name,
                    days_inactive = ?inactive_days,
                    "Submitting resource group deletion"
                );
                sub.begin_delete(&group.name).await
            }
            Action::Tag => {
                let tags = HashMap::from([(
                    self.tag_name.clone(),
                    self.now.format("%Y-%m-%d").to_string(),
                )]);
                info!(
                    subscription = %sub.subscription_id(),
                    resource_group = %group.name,
                    tag = %self.tag_name,
                    "Marking resource group for cleanup"
                );
                sub.merge_tags(&group.name, tags).await
            }
        };

        match result {
            Ok(()) => record(sub, group, activity, inactive_days, status),
            Err(e) => {
                warn!(
                    resource_group = %group.name,
                    action = ?action,
                    error = %e,
                    "Cleanup action failed"
                );
                record(sub, group, activity, inactive_days, CleanupStatus::Failed)
                    .with_detail(e.to_string())
            }
        }
    }
}

fn record<S: ResourceGroupOps>(
    sub: &S,
    group: &ResourceGroup,
    activity: Activity,
    inactive_days: Option<i64>,
    status: CleanupStatus,
) -> ResourceGroupRecord {
    ResourceGroupRecord {
        subscription: sub.subscription_id().to_string(),
        resource_group: group.name.clone(),
        location: group.location.clone(),
        last_modified: activity.last_modified(),
        days_inactive: inactive_days,
        status,
        detail: None,
    }
}
