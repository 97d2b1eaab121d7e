//! Observable committed-filter store.
//!
//! The committed filter is the one piece of state shared by a list view's
//! filter panel, search box, "filter active" badge and fetch orchestrator.
//! Only the panel (on Apply/Reset) and the debounced search box write it.

use crate::filter::ListFilter;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Handle returned by [`FilterStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Who replaced the committed filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// A filter panel applied its draft.
    Apply,
    /// A filter panel reset everything to defaults.
    Reset,
    /// The debounced search box.
    Search,
    /// Anything else (navigation, deep links, another view).
    External,
}

type Listener<F> = Arc<dyn Fn(&F, ChangeSource, u64) + Send + Sync>;

struct StoreState<F> {
    committed: F,
    revision: u64,
    next_subscription: u64,
    listeners: Vec<(SubscriptionId, Listener<F>)>,
}

/// Committed filter plus its subscribers.
///
/// Replacing the filter with an equal value is a no-op: the revision does
/// not move and no listener runs. Listeners run on the writer's thread after
/// the internal lock is released, so they may read or write the store.
///
/// Writers on different threads can deliver their notifications out of
/// order. Every notification carries the revision it was committed at; a
/// listener that keeps state must ignore revisions older than the newest it
/// has seen.
pub struct FilterStore<F: ListFilter> {
    state: Mutex<StoreState<F>>,
}

impl<F: ListFilter> Default for FilterStore<F> {
    fn default() -> Self {
        Self::with_committed(F::default())
    }
}

impl<F: ListFilter> std::fmt::Debug for FilterStore<F>
where
    F: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FilterStore")
            .field("committed", &state.committed)
            .field("revision", &state.revision)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl<F: ListFilter> FilterStore<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_committed(committed: F) -> Self {
        Self {
            state: Mutex::new(StoreState {
                committed,
                revision: 0,
                next_subscription: 0,
                listeners: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState<F>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_committed(&self) -> F {
        self.lock().committed.clone()
    }

    /// Number of effective changes so far.
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Committed filter and revision, read together.
    pub fn snapshot(&self) -> (F, u64) {
        let state = self.lock();
        (state.committed.clone(), state.revision)
    }

    /// Replace the committed filter from outside any panel.
    pub fn set_committed(&self, filter: F) -> bool {
        self.commit(filter, ChangeSource::External)
    }

    /// Replace the committed filter. Returns whether anything changed.
    pub fn commit(&self, filter: F, source: ChangeSource) -> bool {
        let (revision, listeners) = {
            let mut state = self.lock();
            if state.committed == filter {
                return false;
            }
            state.committed = filter.clone();
            state.revision += 1;
            debug!(revision = state.revision, ?source, "Committed filter changed");
            let listeners = state
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect::<Vec<_>>();
            (state.revision, listeners)
        };
        for listener in listeners {
            listener(&filter, source, revision);
        }
        true
    }

    /// Restore the all-default filter.
    pub fn reset(&self) -> bool {
        self.commit(F::default(), ChangeSource::Reset)
    }

    /// Write only the free-text search field.
    pub fn set_search(&self, search: Option<String>) -> bool {
        let mut next = self.get_committed();
        next.set_search(search);
        self.commit(next, ChangeSource::Search)
    }

    pub fn subscribe<L>(&self, listener: L) -> SubscriptionId
    where
        L: Fn(&F, ChangeSource, u64) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.listeners.push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(existing, _)| *existing != id);
        state.listeners.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

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

    fn paid() -> Filter {
        Filter {
            status: vec!["PAID".to_string()],
            search: None,
        }
    }

    #[test]
    fn test_equal_replacement_is_silent() {
        let store = FilterStore::<Filter>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        store.subscribe(move |_, _, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(store.set_committed(paid()));
        assert!(!store.set_committed(paid()));
        assert_eq!(store.revision(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_sees_source() {
        let store = FilterStore::<Filter>::new();
        let sources = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sources);
        store.subscribe(move |_, source, _| sink.lock().unwrap().push(source));

        store.commit(paid(), ChangeSource::Apply);
        store.set_search(Some("ada".to_string()));
        store.reset();

        assert_eq!(
            *sources.lock().unwrap(),
            vec![ChangeSource::Apply, ChangeSource::Search, ChangeSource::Reset]
        );
        assert_eq!(store.get_committed(), Filter::default());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let store = FilterStore::<Filter>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let id = store.subscribe(move |_, _, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set_committed(paid());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_may_read_store() {
        let store = Arc::new(FilterStore::<Filter>::new());
        let observed = Arc::new(Mutex::new(None));
        let (reader, sink) = (Arc::clone(&store), Arc::clone(&observed));
        store.subscribe(move |_, _, _| {
            *sink.lock().unwrap() = Some(reader.revision());
        });

        store.set_committed(paid());
        assert_eq!(*observed.lock().unwrap(), Some(1));
    }

    #[test]
    fn test_racing_writers_converge_by_revision() {
        for _ in 0..500 {
            let store = Arc::new(FilterStore::<Filter>::new());
            let newest: Arc<Mutex<(u64, Filter)>> = Arc::new(Mutex::new((0, Filter::default())));
            let sink = Arc::clone(&newest);
            store.subscribe(move |filter, _, revision| {
                let mut newest = sink.lock().unwrap();
                if revision > newest.0 {
                    *newest = (revision, filter.clone());
                }
            });

            let failed = Filter {
                status: vec!["FAILED".to_string()],
                search: None,
            };
            let writers: Vec<_> = [paid(), failed]
                .into_iter()
                .map(|filter| {
                    let store = Arc::clone(&store);
                    std::thread::spawn(move || store.set_committed(filter))
                })
                .collect();
            for writer in writers {
                writer.join().unwrap();
            }

            let (committed, revision) = store.snapshot();
            let newest = newest.lock().unwrap();
            assert_eq!(newest.0, revision);
            assert_eq!(newest.1, committed);
        }
    }

    #[test]
    fn test_listener_receives_revision() {
        let store = FilterStore::<Filter>::new();
        let revisions = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&revisions);
        store.subscribe(move |_, _, revision| sink.lock().unwrap().push(revision));

        store.set_committed(paid());
        store.set_committed(paid());
        store.reset();
        assert_eq!(*revisions.lock().unwrap(), vec![1, 2]);
    }
}
