//! Committed/draft filter state for a list view's filter panel.
//!
//! ```text
//!            open                edit
//!  Closed ─────────▶ OpenClean ─────────▶ OpenDirty
//!    ▲                  │                     │
//!    └──── dismiss / apply / reset ───────────┘
//! ```
//!
//! Only [`FilterPanel::apply`] and [`FilterPanel::reset`] write the
//! committed filter. Dismissing throws the draft away.

use crate::store::{ChangeSource, FilterStore};
use serde::{Deserialize, Serialize};
use sift_core::RawValues;
use std::sync::Arc;
use tracing::{debug, warn};

/// A list view's typed filter.
///
/// Serializes to the raw value bag the view's `FilterSchema` compiles.
/// `Default` is the all-empty filter a Reset restores.
pub trait ListFilter: Clone + PartialEq + Default + Serialize + Send + Sync + 'static {
    fn search(&self) -> Option<&str>;

    fn set_search(&mut self, search: Option<String>);

    fn raw_values(&self) -> RawValues {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => RawValues::new(),
        }
    }

    /// True iff any field other than search differs from its default.
    fn is_active(&self) -> bool {
        self.without_search() != Self::default()
    }

    fn without_search(&self) -> Self {
        let mut copy = self.clone();
        copy.set_search(None);
        copy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Closed,
    OpenClean,
    OpenDirty,
}

/// What to do with unsaved draft edits when the committed filter changes
/// underneath an open panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResyncPolicy {
    /// Last write wins from the committed side; unsaved edits are dropped.
    #[default]
    Overwrite,
    /// Keep the dirty draft and report it.
    KeepDirtyDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Committed filter did not move.
    Unchanged,
    /// Draft now mirrors committed (or took its new search text).
    Resynced,
    /// Draft was dirty and has been overwritten.
    DiscardedUnsavedEdits,
    /// Draft was dirty and has been kept; committed differs from it.
    KeptDirtyDraft,
}

/// Draft editor bound to a [`FilterStore`].
pub struct FilterPanel<F: ListFilter> {
    store: Arc<FilterStore<F>>,
    draft: F,
    state: PanelState,
    policy: ResyncPolicy,
    /// Committed value and revision the draft was last reconciled with.
    base: F,
    base_revision: u64,
}

impl<F: ListFilter + std::fmt::Debug> std::fmt::Debug for FilterPanel<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPanel")
            .field("draft", &self.draft)
            .field("state", &self.state)
            .field("policy", &self.policy)
            .field("base_revision", &self.base_revision)
            .finish()
    }
}

impl<F: ListFilter> FilterPanel<F> {
    pub fn new(store: Arc<FilterStore<F>>) -> Self {
        Self::with_policy(store, ResyncPolicy::default())
    }

    pub fn with_policy(store: Arc<FilterStore<F>>, policy: ResyncPolicy) -> Self {
        let (committed, revision) = store.snapshot();
        Self {
            store,
            draft: committed.clone(),
            state: PanelState::Closed,
            policy,
            base: committed,
            base_revision: revision,
        }
    }

    pub fn store(&self) -> &Arc<FilterStore<F>> {
        &self.store
    }

    pub fn draft(&self) -> &F {
        &self.draft
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != PanelState::Closed
    }

    pub fn is_dirty(&self) -> bool {
        self.state == PanelState::OpenDirty
    }

    /// The "filter active" badge: the draft has a non-default field.
    pub fn is_active(&self) -> bool {
        self.draft.is_active()
    }

    /// Copy committed into the draft and open. No-op when already open.
    pub fn open(&mut self) {
        if self.is_open() {
            return;
        }
        self.rebase();
        self.draft = self.base.clone();
        self.state = PanelState::OpenClean;
    }

    /// Mutate the draft. Opens the panel first if needed.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut F) -> R) -> R {
        self.open();
        let before = self.draft.clone();
        let result = f(&mut self.draft);
        if self.draft != before {
            self.state = PanelState::OpenDirty;
        }
        result
    }

    /// Commit the draft and close. Returns whether committed changed.
    pub fn apply(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        let changed = self.store.commit(self.draft.clone(), ChangeSource::Apply);
        self.rebase();
        self.draft = self.base.clone();
        self.state = PanelState::Closed;
        changed
    }

    /// Close without applying; the draft reverts to committed.
    pub fn dismiss(&mut self) {
        self.rebase();
        self.draft = self.base.clone();
        self.state = PanelState::Closed;
    }

    /// Reset committed and draft to the all-default filter and close.
    pub fn reset(&mut self) -> bool {
        let changed = self.store.reset();
        self.rebase();
        self.draft = F::default();
        self.state = PanelState::Closed;
        changed
    }

    /// Reconcile the draft with a committed filter that moved since the last
    /// open/apply/sync.
    ///
    /// A search-only change updates just the draft's search text. Any other
    /// change replaces a clean draft; a dirty draft follows the panel's
    /// [`ResyncPolicy`].
    pub fn sync(&mut self) -> SyncOutcome {
        let (committed, revision) = self.store.snapshot();
        if revision == self.base_revision {
            return SyncOutcome::Unchanged;
        }
        let search_only = committed.without_search() == self.base.without_search();
        self.base = committed.clone();
        self.base_revision = revision;

        if search_only {
            self.draft.set_search(committed.search().map(str::to_string));
            return SyncOutcome::Resynced;
        }

        match (self.state, self.policy) {
            (PanelState::OpenDirty, ResyncPolicy::KeepDirtyDraft) => {
                debug!(revision, "Keeping dirty draft over external filter change");
                SyncOutcome::KeptDirtyDraft
            }
            (PanelState::OpenDirty, ResyncPolicy::Overwrite) => {
                warn!(revision, "External filter change discarded unsaved draft edits");
                self.draft = committed;
                self.state = PanelState::OpenClean;
                SyncOutcome::DiscardedUnsavedEdits
            }
            _ => {
                self.draft = committed;
                SyncOutcome::Resynced
            }
        }
    }

    fn rebase(&mut self) {
        let (committed, revision) = self.store.snapshot();
        self.base = committed;
        self.base_revision = revision;
    }
}
