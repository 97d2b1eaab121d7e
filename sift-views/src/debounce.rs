//! Debounced free-text search input.

use crate::filter::ListFilter;
use crate::store::FilterStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_DEBOUNCE_MS: u64 = 350;

struct Pending {
    generation: u64,
    text: Option<String>,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<Pending>,
}

/// Writes search text into a [`FilterStore`] after input pauses.
///
/// Each keystroke restarts the timer; only the last text survives. The
/// committed search is the trimmed text, or `None` when blank.
pub struct SearchDebouncer<F: ListFilter> {
    store: Arc<FilterStore<F>>,
    delay: Duration,
    slot: Arc<Mutex<Slot>>,
}

fn normalize(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl<F: ListFilter> SearchDebouncer<F> {
    pub fn new(store: Arc<FilterStore<F>>, delay: Duration) -> Self {
        Self {
            store,
            delay,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn from_millis(store: Arc<FilterStore<F>>, debounce_ms: u64) -> Self {
        Self::new(store, Duration::from_millis(debounce_ms))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record new input and restart the timer.
    ///
    /// Outside a Tokio runtime the text is committed immediately.
    pub fn input(&self, text: &str) {
        let text = normalize(text);
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                self.cancel();
                self.store.set_search(text);
                return;
            }
        };

        let mut slot = self.lock();
        if let Some(Pending { timer, .. }) = slot.pending.take() {
            timer.abort();
        }
        slot.generation += 1;
        let generation = slot.generation;

        let store = Arc::clone(&self.store);
        let shared = Arc::clone(&self.slot);
        let delay = self.delay;
        let value = text.clone();
        let timer = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slot = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.pending.as_ref().map(|p| p.generation) != Some(generation) {
                    return;
                }
                slot.pending = None;
            }
            debug!(search = ?value, "Debounced search committed");
            store.set_search(value);
        });
        slot.pending = Some(Pending {
            generation,
            text,
            timer,
        });
    }

    /// Commit pending input now. Returns whether anything was pending.
    pub fn flush(&self) -> bool {
        let taken = self.lock().pending.take();
        match taken {
            Some(Pending { text, timer, .. }) => {
                timer.abort();
                self.store.set_search(text);
                true
            }
            None => false,
        }
    }

    /// Drop pending input without committing it.
    pub fn cancel(&self) {
        let taken = self.lock().pending.take();
        if let Some(Pending { timer, .. }) = taken {
            timer.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.lock().pending.is_some()
    }
}

impl<F: ListFilter> Drop for SearchDebouncer<F> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  ada "), Some("ada".to_string()));
        assert_eq!(normalize("   "), None);
    }
}
