//! Listener identifiers and copy-on-write listener lists.
//!
//! Dispatch takes a snapshot (`Arc` clone under a read lock) and releases the
//! lock before calling anything, so listeners can be added or removed from
//! inside a listener without deadlocking or disturbing the pass in progress.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle returned by every listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocates the next process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Snapshot of a [`ListenerList`], in registration order.
pub type Snapshot<F> = Arc<[(ListenerId, Arc<F>)]>;

/// Ordered, copy-on-write set of listeners.
pub struct ListenerList<F: ?Sized> {
    entries: RwLock<Snapshot<F>>,
}

impl<F: ?Sized> ListenerList<F> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Appends a listener and returns its id.
    pub fn push(&self, listener: Arc<F>) -> ListenerId {
        let id = ListenerId::next();
        let mut entries = self.entries.write();
        let mut next = Vec::with_capacity(entries.len() + 1);
        next.extend(entries.iter().cloned());
        next.push((id, listener));
        *entries = Arc::from(next);
        id
    }

    /// Removes a listener. Returns false if it was not in this list.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        if !entries.iter().any(|(entry_id, _)| *entry_id == id) {
            return false;
        }
        let next: Vec<_> = entries
            .iter()
            .filter(|(entry_id, _)| *entry_id != id)
            .cloned()
            .collect();
        *entries = Arc::from(next);
        true
    }

    /// Returns the current listeners without holding any lock afterwards.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<F> {
        Arc::clone(&*self.entries.read())
    }

    /// Drops every listener.
    pub fn clear(&self) {
        *self.entries.write() = Arc::from(Vec::new());
    }

    /// Number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if there are no listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<F: ?Sized> Default for ListenerList<F> {
    fn default() -> Self {
        Self::new()
    }
}
