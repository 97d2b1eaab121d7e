//! Sift Views - Filter State and List Orchestration
//!
//! The stateful half of sift. Per list view:
//!
//! - a [`FilterStore`] holds the committed filter and notifies subscribers,
//! - a [`FilterPanel`] edits a private draft and commits it on Apply,
//! - a [`SearchDebouncer`] writes the search box into the store after a pause,
//! - a [`ListOrchestrator`] compiles the committed filter and pages through a
//!   [`sift_storage::DataSource`].
//!
//! [`ViewContext`] builds these from a [`SiftConfig`]. The [`features`]
//! module holds the typed filters and schemas of the application's views.

pub mod api_client;
pub mod config;
pub mod context;
pub mod debounce;
pub mod error;
pub mod features;
pub mod filter;
pub mod notifications;
pub mod orchestrator;
pub mod store;

pub use api_client::{ApiClientError, RestClient, RestDataSource};
pub use config::{AuthConfig, ConfigError, DateBounds, SiftConfig, ViewConfig};
pub use context::ViewContext;
pub use debounce::{SearchDebouncer, DEFAULT_DEBOUNCE_MS};
pub use error::{ViewError, ViewResult};
pub use filter::{FilterPanel, ListFilter, PanelState, ResyncPolicy, SyncOutcome};
pub use notifications::{Notification, NotificationAction, NotificationCenter, NotificationLevel};
pub use orchestrator::{FetchOutcome, ListOrchestrator, ListSnapshot};
pub use store::{ChangeSource, FilterStore, SubscriptionId};
