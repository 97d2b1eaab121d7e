//! Wallet settings list (per-currency withdrawal configuration).

use super::AmountRange;
use crate::filter::ListFilter;
use once_cell::sync::Lazy;
use serde::Serialize;
use sift_core::{transform, FieldMapping, FilterSchema, SearchSpec};
use std::sync::Arc;

pub const VIEW: &str = "wallet_settings";
pub const RESOURCE: &str = "wallet-settings";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSettingsFilter {
    pub currency: Vec<String>,
    pub is_enabled: Option<bool>,
    pub min_withdrawal: Option<AmountRange>,
    pub search: Option<String>,
}

impl ListFilter for WalletSettingsFilter {
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
            FieldMapping::direct("currency").with_transform(transform::uppercase()),
            FieldMapping::direct("isEnabled"),
            FieldMapping::direct("minWithdrawal")
                .to_field("minWithdrawalAmount")
                .with_transform(transform::to_number()),
        ])
        .with_search(SearchSpec::new(["currency", "name"])),
    )
});

pub fn schema() -> Arc<FilterSchema> {
    Arc::clone(&SCHEMA)
}
