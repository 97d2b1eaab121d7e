//! Paged list fetching for one list view.
//!
//! Triggers:
//! - [`ListOrchestrator::mount`] and [`ListOrchestrator::refresh`] load page 1.
//! - [`ListOrchestrator::apply_filter`] with a different filter clears the
//!   list, assumes more pages exist and loads page 1.
//! - [`ListOrchestrator::load_more`] appends the next page, but only when no
//!   fetch is in flight and `has_more` holds. Otherwise it is dropped.
//!
//! Every fetch carries a request epoch. A response whose epoch is no longer
//! the latest issued is discarded, so a slow page from an old filter can
//! never overwrite the current list. A fetch whose future is dropped before
//! its response lands clears the in-flight flag on the way out.
//!
//! Filters arriving from a [`FilterStore`] carry the store revision they were
//! committed at; one older than the newest already applied is ignored.

use crate::filter::ListFilter;
use crate::notifications::{Notification, NotificationAction, NotificationCenter};
use crate::store::{FilterStore, SubscriptionId};
use sift_core::{DataSourceError, FilterSchema};
use sift_storage::{DataSource, ListQuery, OrderBy};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, warn};

/// Result of one trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// A page landed.
    Loaded { page: u32, received: usize },
    /// Dropped by the in-flight guard, exhausted pagination or an unchanged
    /// filter. No request was made.
    Skipped,
    /// The response arrived after a newer request was issued and was thrown
    /// away.
    Superseded,
    Failed(DataSourceError),
}

/// Read-only copy of a list view's state.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot<T> {
    pub items: Vec<T>,
    /// Last page that landed; 0 before the first.
    pub page: u32,
    pub total: u64,
    pub has_more: bool,
    pub loading: bool,
    pub last_error: Option<DataSourceError>,
}

struct ListState<F, T> {
    filter: F,
    items: Vec<T>,
    page: u32,
    total: u64,
    has_more: bool,
    loading: bool,
    epoch: u64,
    /// Newest store revision applied through [`ListOrchestrator::apply_committed`].
    applied_revision: u64,
    last_error: Option<DataSourceError>,
}

impl<F, T> ListState<F, T> {
    /// Clear the list for a fresh page-1 load of `filter`. Returns its epoch.
    fn restart(&mut self, filter: F) -> u64 {
        self.epoch += 1;
        self.filter = filter;
        self.items.clear();
        self.page = 0;
        self.total = 0;
        self.has_more = true;
        self.loading = true;
        self.last_error = None;
        self.epoch
    }
}

/// Held across a fetch's await. Dropped unsettled (the caller gave up on the
/// future), it clears `loading` unless a newer request has taken over.
struct InFlight<'a, F, T> {
    state: &'a Mutex<ListState<F, T>>,
    epoch: u64,
    settled: bool,
}

impl<'a, F, T> InFlight<'a, F, T> {
    fn new(state: &'a Mutex<ListState<F, T>>, epoch: u64) -> Self {
        Self {
            state,
            epoch,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl<F, T> Drop for InFlight<'_, F, T> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.epoch == self.epoch {
            state.loading = false;
            debug!(epoch = self.epoch, "Fetch cancelled before its response");
        }
    }
}

/// Fetch orchestrator for one list view.
pub struct ListOrchestrator<F, S>
where
    F: ListFilter,
    S: DataSource,
{
    view: String,
    schema: Arc<FilterSchema>,
    source: S,
    page_size: u32,
    order_by: Option<OrderBy>,
    notifications: NotificationCenter,
    state: Mutex<ListState<F, S::Item>>,
}

impl<F, S> ListOrchestrator<F, S>
where
    F: ListFilter,
    S: DataSource,
    S::Item: Clone,
{
    pub fn new(
        view: impl Into<String>,
        schema: Arc<FilterSchema>,
        source: S,
        page_size: u32,
        notifications: NotificationCenter,
    ) -> Self {
        Self {
            view: view.into(),
            schema,
            source,
            page_size: page_size.max(1),
            order_by: None,
            notifications,
            state: Mutex::new(ListState {
                filter: F::default(),
                items: Vec::new(),
                page: 0,
                total: 0,
                has_more: true,
                loading: false,
                epoch: 0,
                applied_revision: 0,
                last_error: None,
            }),
        }
    }

    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Start from a filter other than the default.
    pub fn with_filter(self, filter: F) -> Self {
        self.lock().filter = filter;
        self
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn lock(&self) -> MutexGuard<'_, ListState<F, S::Item>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn filter(&self) -> F {
        self.lock().filter.clone()
    }

    pub fn snapshot(&self) -> ListSnapshot<S::Item> {
        let state = self.lock();
        ListSnapshot {
            items: state.items.clone(),
            page: state.page,
            total: state.total,
            has_more: state.has_more,
            loading: state.loading,
            last_error: state.last_error.clone(),
        }
    }

    /// Initial load of page 1 with the current filter.
    pub async fn mount(&self) -> FetchOutcome {
        let filter = self.filter();
        self.reload(filter).await
    }

    /// Reload page 1 with the current filter, re-enabling pagination.
    pub async fn refresh(&self) -> FetchOutcome {
        self.mount().await
    }

    /// React to a committed-filter change. An equal filter is ignored once
    /// the list has been loaded.
    pub async fn apply_filter(&self, filter: F) -> FetchOutcome {
        let epoch = {
            let mut state = self.lock();
            if state.filter == filter && state.epoch > 0 {
                return FetchOutcome::Skipped;
            }
            state.restart(filter.clone())
        };
        self.fetch(epoch, 1, &filter).await
    }

    /// [`Self::apply_filter`] for a filter committed to a store at
    /// `revision`. Revisions at or below the newest applied one are skipped.
    pub async fn apply_committed(&self, filter: F, revision: u64) -> FetchOutcome {
        let epoch = {
            let mut state = self.lock();
            if revision <= state.applied_revision {
                debug!(view = %self.view, revision, applied = state.applied_revision, "Ignoring out-of-order filter");
                return FetchOutcome::Skipped;
            }
            state.applied_revision = revision;
            if state.filter == filter && state.epoch > 0 {
                return FetchOutcome::Skipped;
            }
            state.restart(filter.clone())
        };
        self.fetch(epoch, 1, &filter).await
    }

    /// Append the next page if one exists and nothing is in flight.
    pub async fn load_more(&self) -> FetchOutcome {
        let (epoch, page, filter) = {
            let mut state = self.lock();
            if state.loading || !state.has_more {
                debug!(view = %self.view, loading = state.loading, has_more = state.has_more, "load_more dropped");
                return FetchOutcome::Skipped;
            }
            state.epoch += 1;
            state.loading = true;
            (state.epoch, state.page + 1, state.filter.clone())
        };
        self.fetch(epoch, page, &filter).await
    }

    async fn reload(&self, filter: F) -> FetchOutcome {
        let epoch = self.lock().restart(filter.clone());
        self.fetch(epoch, 1, &filter).await
    }

    async fn fetch(&self, epoch: u64, page: u32, filter: &F) -> FetchOutcome {
        let in_flight = InFlight::new(&self.state, epoch);
        let mut query = ListQuery::new(self.schema.compile(&filter.raw_values()), page, self.page_size);
        query.order_by = self.order_by.clone();
        debug!(view = %self.view, page, epoch, "Fetching list page");

        let result = self.source.list(&query).await;
        in_flight.settle();

        let mut state = self.lock();
        if state.epoch != epoch {
            debug!(view = %self.view, page, epoch, latest = state.epoch, "Discarding stale response");
            return FetchOutcome::Superseded;
        }
        state.loading = false;

        match result {
            Ok(loaded) => {
                let received = loaded.items.len();
                // Derived from the request, not the page numbers echoed back.
                state.has_more = u64::from(page) * u64::from(self.page_size) < loaded.total;
                state.total = loaded.total;
                state.page = page;
                state.last_error = None;
                if page <= 1 {
                    state.items = loaded.items;
                } else {
                    state.items.extend(loaded.items);
                }
                debug!(view = %self.view, page, received, total = state.total, has_more = state.has_more, "List page loaded");
                FetchOutcome::Loaded { page, received }
            }
            Err(error) => {
                state.has_more = false;
                if page <= 1 {
                    state.items.clear();
                }
                state.last_error = Some(error.clone());
                drop(state);

                warn!(view = %self.view, page, error = %error, "List fetch failed");
                self.notifications.push(
                    Notification::error(format!("Could not load {}: {}", self.view, error))
                        .with_action(NotificationAction::Retry),
                );
                FetchOutcome::Failed(error)
            }
        }
    }
}

impl<F, S> ListOrchestrator<F, S>
where
    F: ListFilter,
    S: DataSource + 'static,
    S::Item: Clone + Send + 'static,
{
    /// Re-fetch on every committed-filter change in `store`.
    ///
    /// Each change spawns [`Self::apply_committed`] on the current Tokio runtime.
    /// The subscription holds only a weak reference to the orchestrator.
    pub fn watch(self: &Arc<Self>, store: &FilterStore<F>) -> SubscriptionId {
        let weak: Weak<Self> = Arc::downgrade(self);
        let view = self.view.clone();
        store.subscribe(move |filter, source, revision| {
            let Some(orchestrator) = weak.upgrade() else {
                return;
            };
            let filter = filter.clone();
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    debug!(view = %view, ?source, revision, "Committed filter changed, refetching");
                    handle.spawn(async move {
                        orchestrator.apply_committed(filter, revision).await;
                    });
                }
                Err(e) => warn!(view = %view, error = %e, "No runtime to refetch on filter change"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::{json, Value};
    use sift_core::FieldMapping;
    use sift_storage::InMemoryDataSource;

    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    struct Filter {
        status: Vec<String>,
        search: Option<String>,
    }

    impl ListFilter for Filter {
        fn search(&self) -> Option<&str> {
            self.search.as_deref()
        }

        fn set_search(&mut self, search: Option<String>) {
            self.search = search;
        }
    }

    fn rows(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({ "id": i, "status": if i % 2 == 0 { "PAID" } else { "PENDING" } }))
            .collect()
    }

    fn orchestrator(n: usize, page_size: u32) -> ListOrchestrator<Filter, InMemoryDataSource<Value>> {
        let schema = Arc::new(FilterSchema::new(vec![FieldMapping::direct("status")]));
        ListOrchestrator::new("rows", schema, InMemoryDataSource::new("rows", rows(n)), page_size, NotificationCenter::new())
    }

    #[tokio::test]
    async fn test_mount_loads_first_page() {
        let list = orchestrator(25, 10);
        assert_eq!(list.mount().await, FetchOutcome::Loaded { page: 1, received: 10 });
        let snapshot = list.snapshot();
        assert_eq!(snapshot.total, 25);
        assert!(snapshot.has_more);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_load_more_appends() {
        let list = orchestrator(25, 10);
        list.mount().await;
        list.load_more().await;
        assert_eq!(list.load_more().await, FetchOutcome::Loaded { page: 3, received: 5 });
        let snapshot = list.snapshot();
        assert_eq!(snapshot.items.len(), 25);
        assert!(!snapshot.has_more);
        assert_eq!(list.load_more().await, FetchOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_apply_filter_resets_to_page_one() {
        let list = orchestrator(25, 10);
        list.mount().await;
        list.load_more().await;

        let paid = Filter {
            status: vec!["PAID".to_string()],
            search: None,
        };
        assert_eq!(list.apply_filter(paid.clone()).await, FetchOutcome::Loaded { page: 1, received: 10 });
        let snapshot = list.snapshot();
        assert_eq!(snapshot.total, 13);
        assert!(snapshot.items.iter().all(|r| r["status"] == "PAID"));
        assert_eq!(list.apply_filter(paid).await, FetchOutcome::Skipped);
    }

    /// Echoes 0-based page numbers and its own page size back.
    struct ZeroBasedSource(InMemoryDataSource<Value>);

    #[async_trait::async_trait]
    impl DataSource for ZeroBasedSource {
        type Item = Value;

        async fn list(&self, query: &ListQuery) -> Result<sift_storage::Page<Value>, DataSourceError> {
            let mut page = self.0.query(query)?;
            page.page = query.page - 1;
            page.page_size = 100;
            Ok(page)
        }
    }

    #[tokio::test]
    async fn test_has_more_follows_the_request_not_the_echo() {
        let schema = Arc::new(FilterSchema::new(vec![FieldMapping::direct("status")]));
        let source = ZeroBasedSource(InMemoryDataSource::new("rows", rows(25)));
        let list: ListOrchestrator<Filter, _> = ListOrchestrator::new("rows", schema, source, 10, NotificationCenter::new());

        list.mount().await;
        assert!(list.snapshot().has_more);
        list.load_more().await;
        assert!(list.snapshot().has_more);
        assert_eq!(list.load_more().await, FetchOutcome::Loaded { page: 3, received: 5 });
        assert!(!list.snapshot().has_more);
        assert_eq!(list.load_more().await, FetchOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_older_committed_revision_is_ignored() {
        let list = orchestrator(25, 10);
        let paid = Filter {
            status: vec!["PAID".to_string()],
            search: None,
        };
        let pending = Filter {
            status: vec!["PENDING".to_string()],
            search: None,
        };

        assert_eq!(list.apply_committed(paid.clone(), 2).await, FetchOutcome::Loaded { page: 1, received: 10 });
        assert_eq!(list.apply_committed(pending.clone(), 1).await, FetchOutcome::Skipped);
        assert_eq!(list.apply_committed(paid.clone(), 2).await, FetchOutcome::Skipped);
        assert_eq!(list.filter(), paid);

        assert_eq!(list.apply_committed(pending.clone(), 3).await, FetchOutcome::Loaded { page: 1, received: 10 });
        assert_eq!(list.filter(), pending);
    }
}
