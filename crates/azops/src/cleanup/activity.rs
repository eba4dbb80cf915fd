//! Last-activity evaluation for resource groups.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use azops_cloud::{Resource, ResourceGroup};

/// Tag names consulted when no contained resource carries a timestamp.
pub const DEFAULT_CREATION_TAGS: &[&str] = &["CreatedDate", "createdOn", "created"];

/// Accepted date-time layouts for creation tags, besides RFC 3339.
const TAG_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"];

/// Accepted date-only layouts for creation tags.
const TAG_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Where a last-activity timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    /// Most recently modified contained resource.
    Resource,
    /// Creation tag on the group.
    CreationTag,
}

/// Outcome of activity evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// A last-modified timestamp was determined.
    Known {
        last_modified: DateTime<Utc>,
        source: ActivitySource,
    },
    /// No resource timestamp and no usable creation tag.
    Unknown,
}

impl Activity {
    /// Last-modified timestamp, if known.
    #[must_use]
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Known { last_modified, .. } => Some(*last_modified),
            Self::Unknown => None,
        }
    }

    /// Whole days since last modification, clamped at zero.
    #[must_use]
    pub fn inactive_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_modified()
            .map(|last| (now - last).num_days().max(0))
    }
}

/// Determines a group's last activity from its resources and tags.
#[derive(Debug, Clone)]
pub struct ActivityEvaluator {
    creation_tags: Vec<String>,
}

impl Default for ActivityEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_CREATION_TAGS.iter().map(|s| (*s).to_string()))
    }
}

impl ActivityEvaluator {
    /// Create an evaluator consulting the given creation tag names, in order.
    pub fn new(creation_tags: impl IntoIterator<Item = String>) -> Self {
        Self {
            creation_tags: creation_tags.into_iter().collect(),
        }
    }

    /// Evaluate a group's last activity.
    #[must_use]
    pub fn evaluate(&self, group: &ResourceGroup, resources: &[Resource]) -> Activity {
        let newest = resources
            .iter()
            .filter_map(|r| r.changed_time.or(r.created_time))
            .max();

        if let Some(last_modified) = newest {
            return Activity::Known {
                last_modified,
                source: ActivitySource::Resource,
            };
        }

        self.creation_tag(group)
            .map_or(Activity::Unknown, |last_modified| Activity::Known {
                last_modified,
                source: ActivitySource::CreationTag,
            })
    }

    /// First configured creation tag that is present and parses.
    fn creation_tag(&self, group: &ResourceGroup) -> Option<DateTime<Utc>> {
        self.creation_tags.iter().find_map(|wanted| {
            group
                .tags
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
                .and_then(|(_, value)| parse_tag_timestamp(value))
        })
    }
}

/// Parse a creation tag value. Naive values are taken as UTC.
#[must_use]
pub fn parse_tag_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in TAG_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    TAG_DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone;

    use super::*;

    fn group(tags: &[(&str, &str)]) -> ResourceGroup {
        ResourceGroup {
            id: "/subscriptions/s/resourceGroups/rg".into(),
            name: "rg".into(),
            location: "westeurope".into(),
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn resource(
        created: Option<DateTime<Utc>>,
        changed: Option<DateTime<Utc>>,
    ) -> Resource {
        Resource {
            id: "id".into(),
            name: "r".into(),
            resource_type: "Microsoft.Storage/storageAccounts".into(),
            created_time: created,
            changed_time: changed,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_newest_resource_wins() {
        let resources = vec![
            resource(Some(day(2024, 1, 1)), Some(day(2024, 2, 1))),
            resource(Some(day(2024, 1, 5)), Some(day(2024, 3, 1))),
        ];
        let activity = ActivityEvaluator::default().evaluate(&group(&[]), &resources);
        assert_eq!(
            activity,
            Activity::Known {
                last_modified: day(2024, 3, 1),
                source: ActivitySource::Resource
            }
        );
    }

    #[test]
    fn test_created_time_used_when_changed_missing() {
        let resources = vec![resource(Some(day(2024, 4, 1)), None)];
        let activity = ActivityEvaluator::default().evaluate(&group(&[]), &resources);
        assert_eq!(activity.last_modified(), Some(day(2024, 4, 1)));
    }

    #[test]
    fn test_falls_back_to_creation_tag() {
        let activity = ActivityEvaluator::default()
            .evaluate(&group(&[("createddate", "2024-02-10")]), &[]);
        assert_eq!(
            activity,
            Activity::Known {
                last_modified: day(2024, 2, 10),
                source: ActivitySource::CreationTag
            }
        );
    }

    #[test]
    fn test_resources_without_times_fall_back_to_tag() {
        let activity = ActivityEvaluator::default().evaluate(
            &group(&[("created", "02/10/2024")]),
            &[resource(None, None)],
        );
        assert_eq!(activity.last_modified(), Some(day(2024, 2, 10)));
    }

    #[test]
    fn test_unknown_without_tag() {
        let activity = ActivityEvaluator::default().evaluate(&group(&[("owner", "qa")]), &[]);
        assert_eq!(activity, Activity::Unknown);
        assert_eq!(activity.inactive_days(day(2024, 5, 1)), None);
    }

    #[test]
    fn test_unknown_with_malformed_tag() {
        let activity =
            ActivityEvaluator::default().evaluate(&group(&[("CreatedDate", "last spring")]), &[]);
        assert_eq!(activity, Activity::Unknown);
    }

    #[test]
    fn test_later_tag_used_when_first_is_malformed() {
        let activity = ActivityEvaluator::default().evaluate(
            &group(&[("CreatedDate", "n/a"), ("createdOn", "2024-01-01T10:00:00Z")]),
            &[],
        );
        assert_eq!(
            activity.last_modified(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_inactive_days() {
        let activity = Activity::Known {
            last_modified: day(2024, 1, 1),
            source: ActivitySource::Resource,
        };
        assert_eq!(activity.inactive_days(day(2024, 2, 15)), Some(45));
        // Future timestamps (clock skew) clamp to zero.
        assert_eq!(activity.inactive_days(day(2023, 12, 1)), Some(0));
    }

    #[test]
    fn test_parse_tag_formats() {
        assert_eq!(parse_tag_timestamp("2024-03-04"), Some(day(2024, 3, 4)));
        assert_eq!(parse_tag_timestamp("03/04/2024"), Some(day(2024, 3, 4)));
        assert_eq!(
            parse_tag_timestamp("2024-03-04 06:30:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 4, 6, 30, 0).unwrap())
        );
        assert_eq!(
            parse_tag_timestamp("2024-03-04T06:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 4, 4, 30, 0).unwrap())
        );
        assert_eq!(parse_tag_timestamp(""), None);
        assert_eq!(parse_tag_timestamp("13/45/2024"), None);
    }
}
