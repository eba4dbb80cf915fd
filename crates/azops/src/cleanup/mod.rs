//! Idle resource group cleanup.
//!
//! A run walks each subscription's resource groups, keeps those whose name
//! matches a configured glob, evaluates their last activity and classifies
//! them with [`Classifier`]. Stale groups are tagged or, in deletion mode,
//! deleted; protected groups are reported and left alone.

mod activity;
mod classifier;
mod filter;
mod report;
mod runner;

pub use activity::{
    parse_tag_timestamp, Activity, ActivityEvaluator, ActivitySource, DEFAULT_CREATION_TAGS,
};
pub use classifier::{
    Action, Candidate, Classifier, CleanupStatus, Decision, Exclusion, SafetyContext,
    DEFAULT_UNSAFE_TYPES,
};
pub use filter::NameFilter;
pub use report::{CleanupReport, ResourceGroupRecord};
pub use runner::{CleanupRunner, DEFAULT_CLEANUP_TAG};
