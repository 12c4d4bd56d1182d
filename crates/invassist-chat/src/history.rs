//! Append-only conversation log.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use crate::types::ChatEntry;

/// Change notifications for renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    /// `count` entries were added to the end.
    Appended { count: usize },
    /// The whole log was discarded.
    Cleared,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<ChatEntry>,
    generation: u64,
}

/// Ordered chat entries. Insertion order is display order.
///
/// A generation counter advances on every clear or explicit invalidation.
/// Responses started under an older generation can be dropped with
/// [`ChatHistory::append_if_generation`].
#[derive(Debug, Clone)]
pub struct ChatHistory {
    inner: Arc<Mutex<Inner>>,
    event_tx: broadcast::Sender<HistoryEvent>,
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatHistory {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            event_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add entries to the end, preserving their order.
    pub fn append(&self, entries: Vec<ChatEntry>) {
        if entries.is_empty() {
            return;
        }
        let count = entries.len();
        self.lock().entries.extend(entries);
        self.notify(HistoryEvent::Appended { count });
    }

    /// Append only if no clear happened since `generation` was read.
    ///
    /// Returns `false` and drops the entries when the history has moved on.
    pub fn append_if_generation(&self, generation: u64, entries: Vec<ChatEntry>) -> bool {
        let count = entries.len();
        {
            let mut inner = self.lock();
            if inner.generation != generation {
                tracing::debug!(
                    expected = generation,
                    current = inner.generation,
                    dropped = count,
                    "Discarding stale entries"
                );
                return false;
            }
            inner.entries.extend(entries);
        }
        if count > 0 {
            self.notify(HistoryEvent::Appended { count });
        }
        true
    }

    /// Discard every entry at once.
    pub fn clear(&self) {
        {
            let mut inner = self.lock();
            inner.entries.clear();
            inner.generation += 1;
        }
        tracing::debug!("History cleared");
        self.notify(HistoryEvent::Cleared);
    }

    /// Advance the generation without touching entries, so that pending
    /// responses are dropped.
    pub fn invalidate(&self) {
        self.lock().generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Copy of the current entries.
    pub fn snapshot(&self) -> Vec<ChatEntry> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.event_tx.subscribe()
    }

    fn notify(&self, event: HistoryEvent) {
        // No receivers is fine.
        let _ = self.event_tx.send(event);
    }
}
