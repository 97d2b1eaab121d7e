//! Membership cron job runs list.

use super::{non_blank, DateRange};
use crate::filter::ListFilter;
use once_cell::sync::Lazy;
use serde::Serialize;
use sift_core::{transform, FieldMapping, FilterSchema, SearchSpec};
use std::sync::Arc;

pub const VIEW: &str = "membership_cron_jobs";
pub const RESOURCE: &str = "membership-cron-jobs";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipCronJobFilter {
    pub job_name: Vec<String>,
    pub status: Vec<String>,
    pub tier: Option<String>,
    pub last_run_at: Option<DateRange>,
    pub search: Option<String>,
}

impl ListFilter for MembershipCronJobFilter {
    fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    fn set_search(&mut self, search: Option<String>) {
        self.search = search;
    }
}

static SCHEMA: Lazy<Arc<FilterSchema>> = Lazy::new(|| {
    Arc::new(
        FilterSchema::new(vec![
            FieldMapping::direct("jobName"),
            FieldMapping::direct("status"),
            FieldMapping::direct("tier")
                .nested("membershipTier", "name")
                .with_transform(transform::uppercase())
                .when(non_blank),
            FieldMapping::direct("lastRunAt").with_transform(transform::iso_datetime()),
        ])
        .with_search(SearchSpec::new(["jobName", "membershipTier.name"])),
    )
});

pub fn schema() -> Arc<FilterSchema> {
    Arc::clone(&SCHEMA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tier_maps_to_relation() {
        let filter = MembershipCronJobFilter {
            tier: Some("gold".to_string()),
            ..Default::default()
        };
        assert_eq!(
            schema().compile(&filter.raw_values()).into_json(),
            json!({ "membershipTier": { "name": "GOLD" } })
        );
    }

    #[test]
    fn test_search_reaches_relation_field() {
        let filter = MembershipCronJobFilter {
            search: Some("plat".to_string()),
            ..Default::default()
        };
        assert_eq!(
            schema().compile(&filter.raw_values()).into_json(),
            json!({
                "OR": [
                    { "jobName": { "contains": "plat", "mode": "insensitive" } },
                    { "membershipTier": { "name": { "contains": "plat", "mode": "insensitive" } } }
                ]
            })
        );
        assert!(!filter.is_active());
    }
}
