//! Safety classification of resource groups.
//!
//! Classification is an ordered list of named rules evaluated with early
//! exit. The first rule returning a decision wins:
//!
//! 1. `name_match` - name matches no pattern: excluded
//! 2. `unknown_activity` - no usable timestamp: `UNKNOWN_ACTIVITY`
//! 3. `below_threshold` - inactive for fewer days than the threshold: excluded
//! 4. `critical_resources` - contains an unsafe type: `SKIPPED_CRITICAL_RESOURCES`
//! 5. `locked` - a management lock exists: `SKIPPED_LOCKED`
//! 6. `delete_mode` - deletion mode on: `DELETED`
//! 7. `mark` - otherwise: `MARKED_FOR_CLEANUP`

use std::collections::BTreeSet;

use serde::Serialize;

use azops_cloud::{ManagementLock, Resource};

use super::activity::Activity;
use super::filter::NameFilter;

/// Resource types never auto-deleted by default.
pub const DEFAULT_UNSAFE_TYPES: &[&str] = &[
    "Microsoft.Compute/virtualMachines",
    "Microsoft.Network/networkInterfaces",
    "Microsoft.Network/virtualNetworks",
    "Microsoft.Sql/servers",
    "Microsoft.ContainerService/managedClusters",
];

/// Status recorded for a reported resource group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CleanupStatus {
    /// Contains at least one unsafe resource type.
    SkippedCriticalResources,
    /// Protected by a management lock.
    SkippedLocked,
    /// Deletion submitted.
    Deleted,
    /// Cleanup tag applied.
    MarkedForCleanup,
    /// Last activity could not be determined.
    UnknownActivity,
    /// An API call failed while evaluating or acting on the group.
    Failed,
}

impl CleanupStatus {
    /// Report spelling, e.g. `SKIPPED_LOCKED`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SkippedCriticalResources => "SKIPPED_CRITICAL_RESOURCES",
            Self::SkippedLocked => "SKIPPED_LOCKED",
            Self::Deleted => "DELETED",
            Self::MarkedForCleanup => "MARKED_FOR_CLEANUP",
            Self::UnknownActivity => "UNKNOWN_ACTIVITY",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for CleanupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side effect the runner must perform for a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Report only.
    None,
    /// Submit deletion of the group.
    Delete,
    /// Merge the cleanup tag into the group.
    Tag,
}

/// Why a group is left out of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Name matches no configured pattern.
    NameMismatch,
    /// Inactivity below the threshold.
    BelowThreshold,
}

/// Result of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Not reported.
    Excluded(Exclusion),
    /// Reported with a status, after performing `action`.
    Report {
        status: CleanupStatus,
        action: Action,
        rule: &'static str,
    },
    /// A safety rule was reached without a [`SafetyContext`]; gather it and
    /// classify again.
    NeedsSafetyContext,
}

/// Transient per-group facts needed by the safety rules.
#[derive(Debug, Clone, Default)]
pub struct SafetyContext {
    /// Lowercased resource types contained in the group.
    pub resource_types: BTreeSet<String>,
    /// Whether any management lock applies.
    pub locked: bool,
}

impl SafetyContext {
    /// Build from listed resources and locks.
    #[must_use]
    pub fn new(resources: &[Resource], locks: &[ManagementLock]) -> Self {
        Self {
            resource_types: resources
                .iter()
                .map(|r| r.resource_type.to_ascii_lowercase())
                .collect(),
            locked: !locks.is_empty(),
        }
    }
}

/// Facts about one group under classification.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Resource group name.
    pub name: &'a str,
    /// Evaluated activity.
    pub activity: Activity,
    /// Whole days inactive, when activity is known.
    pub inactive_days: Option<i64>,
    /// Safety facts; `None` until gathered.
    pub safety: Option<&'a SafetyContext>,
}

/// What a rule concludes; the rule's name is attached by [`Classifier::classify`].
enum Verdict {
    Exclude(Exclusion),
    Report(CleanupStatus, Action),
    NeedSafety,
}

impl Verdict {
    fn into_decision(self, rule: &'static str) -> Decision {
        match self {
            Self::Exclude(reason) => Decision::Excluded(reason),
            Self::Report(status, action) => Decision::Report {
                status,
                action,
                rule,
            },
            Self::NeedSafety => Decision::NeedsSafetyContext,
        }
    }
}

type RuleFn = fn(&Classifier, &Candidate<'_>) -> Option<Verdict>;

/// A named predicate rule.
struct Rule {
    name: &'static str,
    apply: RuleFn,
}

/// Applied when no rule in [`RULES`] fires.
const MARK_RULE: &str = "mark";

const RULES: &[Rule] = &[
    Rule {
        name: "name_match",
        apply: |c, cand| {
            (!c.filter.matches(cand.name)).then_some(Verdict::Exclude(Exclusion::NameMismatch))
        },
    },
    Rule {
        name: "unknown_activity",
        apply: |_, cand| {
            (cand.activity == Activity::Unknown)
                .then_some(Verdict::Report(CleanupStatus::UnknownActivity, Action::None))
        },
    },
    Rule {
        name: "below_threshold",
        apply: |c, cand| {
            cand.inactive_days
                .is_some_and(|days| days < c.threshold_days)
                .then_some(Verdict::Exclude(Exclusion::BelowThreshold))
        },
    },
    Rule {
        name: "critical_resources",
        apply: |c, cand| {
            let Some(safety) = cand.safety else {
                return Some(Verdict::NeedSafety);
            };
            safety
                .resource_types
                .iter()
                .any(|t| c.unsafe_types.contains(t))
                .then_some(Verdict::Report(
                    CleanupStatus::SkippedCriticalResources,
                    Action::None,
                ))
        },
    },
    Rule {
        name: "locked",
        apply: |_, cand| {
            cand.safety
                .is_some_and(|s| s.locked)
                .then_some(Verdict::Report(CleanupStatus::SkippedLocked, Action::None))
        },
    },
    Rule {
        name: "delete_mode",
        apply: |c, _| {
            c.delete_mode
                .then_some(Verdict::Report(CleanupStatus::Deleted, Action::Delete))
        },
    },
];

/// Stateless resource group classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    filter: NameFilter,
    threshold_days: i64,
    unsafe_types: BTreeSet<String>,
    delete_mode: bool,
}

impl Classifier {
    /// Create a classifier. `unsafe_types` are compared case-insensitively.
    pub fn new<I, S>(filter: NameFilter, threshold_days: u32, unsafe_types: I, delete_mode: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            filter,
            threshold_days: i64::from(threshold_days),
            unsafe_types: unsafe_types
                .into_iter()
                .map(|t| t.as_ref().to_ascii_lowercase())
                .collect(),
            delete_mode,
        }
    }

    /// Whether deletion mode is on.
    #[must_use]
    pub fn delete_mode(&self) -> bool {
        self.delete_mode
    }

    /// Whether the name passes the pattern filter.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.filter.matches(name)
    }

    /// Rule names in evaluation order.
    pub fn rule_names() -> impl Iterator<Item = &'static str> {
        RULES.iter().map(|r| r.name).chain(std::iter::once(MARK_RULE))
    }

    /// Classify a candidate; first matching rule wins.
    #[must_use]
    pub fn classify(&self, candidate: &Candidate<'_>) -> Decision {
        RULES
            .iter()
            .find_map(|rule| {
                (rule.apply)(self, candidate).map(|verdict| verdict.into_decision(rule.name))
            })
            .unwrap_or(Decision::Report {
                status: CleanupStatus::MarkedForCleanup,
                action: Action::Tag,
                rule: MARK_RULE,
            })
    }
}
