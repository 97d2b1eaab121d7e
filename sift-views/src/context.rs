//! Wiring shared by every list view: config, HTTP client and notifications.

use crate::api_client::{RestClient, RestDataSource};
use crate::config::SiftConfig;
use crate::debounce::SearchDebouncer;
use crate::error::ViewResult;
use crate::filter::{FilterPanel, ListFilter};
use crate::notifications::NotificationCenter;
use crate::orchestrator::ListOrchestrator;
use crate::store::FilterStore;
use serde::de::DeserializeOwned;
use sift_core::FilterSchema;
use sift_storage::{withdraw_referral_balance, DataSource, TransferReceipt, WalletStore, WithdrawalRequest};
use std::sync::Arc;
use tracing::info;

/// Builds the per-view pieces from one validated [`SiftConfig`].
#[derive(Debug, Clone)]
pub struct ViewContext {
    config: SiftConfig,
    client: RestClient,
    notifications: NotificationCenter,
}

impl ViewContext {
    pub fn new(config: SiftConfig) -> ViewResult<Self> {
        config.validate()?;
        let client = RestClient::new(&config)?;
        info!(base_url = %client.base_url(), views = config.views.len(), "View context ready");
        Ok(Self {
            config,
            client,
            notifications: NotificationCenter::new(),
        })
    }

    /// Load from `--config` or `SIFT_CONFIG`.
    pub fn load() -> ViewResult<Self> {
        Self::new(SiftConfig::load()?)
    }

    pub fn config(&self) -> &SiftConfig {
        &self.config
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn rest_source<T>(&self, resource: &str) -> RestDataSource<T>
    where
        T: DeserializeOwned + Send,
    {
        RestDataSource::new(self.client.clone(), resource)
    }

    /// Orchestrator sized by the view's `page_size`.
    pub fn orchestrator<F, S>(&self, view: &str, schema: Arc<FilterSchema>, source: S) -> ListOrchestrator<F, S>
    where
        F: ListFilter,
        S: DataSource,
        S::Item: Clone,
    {
        let page_size = self.config.view(view).page_size;
        ListOrchestrator::new(view, schema, source, page_size, self.notifications.clone())
    }

    pub fn debouncer<F: ListFilter>(&self, view: &str, store: Arc<FilterStore<F>>) -> SearchDebouncer<F> {
        SearchDebouncer::from_millis(store, self.config.view(view).debounce_ms)
    }

    pub fn panel<F: ListFilter>(&self, store: Arc<FilterStore<F>>) -> FilterPanel<F> {
        FilterPanel::with_policy(store, self.config.resync_policy)
    }

    /// Move referral earnings to the main wallet with the configured retry
    /// budget.
    pub async fn withdraw<S>(&self, store: &S, request: &WithdrawalRequest) -> ViewResult<TransferReceipt>
    where
        S: WalletStore + ?Sized,
    {
        Ok(withdraw_referral_balance(store, request, self.config.withdrawal_max_retries).await?)
    }
}
