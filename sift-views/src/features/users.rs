//! User management list.

use super::{non_blank, DateRange};
use crate::filter::ListFilter;
use once_cell::sync::Lazy;
use serde::Serialize;
use sift_core::{transform, FieldMapping, FilterSchema, SearchSpec};
use std::sync::Arc;

pub const VIEW: &str = "users";
pub const RESOURCE: &str = "users";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserManagementFilter {
    /// Any of these roles.
    pub role: Vec<String>,
    pub status: Option<String>,
    pub tier: Option<String>,
    pub joined: Option<DateRange>,
    pub email_verified: Option<bool>,
    pub search: Option<String>,
}

impl ListFilter for UserManagementFilter {
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
            FieldMapping::direct("role").or(),
            FieldMapping::direct("status").when(non_blank),
            FieldMapping::direct("tier")
                .nested("membershipTier", "name")
                .with_transform(transform::uppercase())
                .when(non_blank),
            FieldMapping::direct("joined")
                .to_field("createdAt")
                .with_transform(transform::iso_datetime()),
            FieldMapping::direct("emailVerified"),
        ])
        .with_search(SearchSpec::new(["email", "fullName", "phone"])),
    )
});

pub fn schema() -> Arc<FilterSchema> {
    Arc::clone(&SCHEMA)
}
