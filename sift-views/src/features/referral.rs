//! Referral transactions list.

use super::{non_blank, AmountRange, DateRange};
use crate::filter::ListFilter;
use once_cell::sync::Lazy;
use serde::Serialize;
use sift_core::{transform, FieldMapping, FilterSchema, SearchSpec};
use std::sync::Arc;

pub const VIEW: &str = "referral_transactions";
pub const RESOURCE: &str = "referral-transactions";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralTransactionFilter {
    pub status: Vec<String>,
    #[serde(rename = "type")]
    pub transaction_type: Vec<String>,
    pub amount: Option<AmountRange>,
    pub created_at: Option<DateRange>,
    pub user_email: Option<String>,
    pub search: Option<String>,
}

impl ListFilter for ReferralTransactionFilter {
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
            FieldMapping::direct("status"),
            FieldMapping::direct("type"),
            FieldMapping::direct("amount").with_transform(transform::to_number()),
            FieldMapping::direct("createdAt").with_transform(transform::iso_datetime()),
            FieldMapping::direct("userEmail")
                .nested("user", "email")
                .with_transform(transform::lowercase())
                .when(non_blank),
        ])
        .with_search(SearchSpec::new(["referenceId", "user.email", "user.fullName"])),
    )
});

pub fn schema() -> Arc<FilterSchema> {
    Arc::clone(&SCHEMA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_full_filter_compiles() {
        let filter = ReferralTransactionFilter {
            status: vec!["PAID".to_string(), "PENDING".to_string()],
            amount: Some(AmountRange::new(Some("10"), None)),
            created_at: Some(DateRange::new(
                NaiveDate::from_ymd_opt(2024, 3, 1),
                NaiveDate::from_ymd_opt(2024, 3, 5),
            )),
            user_email: Some("Ada@Example.com".to_string()),
            search: Some("REF-1".to_string()),
            ..Default::default()
        };

        let condition = schema().compile(&filter.raw_values());
        assert_eq!(
            condition.into_json(),
            json!({
                "AND": [
                    {
                        "amount": { "gte": 10 },
                        "createdAt": { "gte": "2024-03-01T00:00:00.000Z", "lte": "2024-03-05T23:59:59.999Z" },
                        "user": { "email": "ada@example.com" },
                        "AND": [{ "OR": [{ "status": "PAID" }, { "status": "PENDING" }] }]
                    },
                    {
                        "OR": [
                            { "referenceId": { "contains": "REF-1", "mode": "insensitive" } },
                            { "user": { "email": { "contains": "REF-1", "mode": "insensitive" } } },
                            { "user": { "fullName": { "contains": "REF-1", "mode": "insensitive" } } }
                        ]
                    }
                ]
            })
        );
    }

    #[test]
    fn test_blank_email_is_skipped() {
        let filter = ReferralTransactionFilter {
            user_email: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(schema().compile(&filter.raw_values()).is_empty());
        assert!(filter.is_active());
    }

    #[test]
    fn test_default_filter_compiles_empty() {
        let filter = ReferralTransactionFilter::default();
        assert!(schema().compile(&filter.raw_values()).is_empty());
        assert!(!filter.is_active());
    }
}
