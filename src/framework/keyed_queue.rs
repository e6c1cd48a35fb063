//! # Keyed Queues
//!
//! [`KeyedQueue`] is a FIFO that can also hand out an item by key. It backs
//! the ready-orders queue: the FIFO strategy pops the oldest entry, while the
//! matched strategy removes the exact entry its courier was dispatched for.
//!
//! Entries are indexed twice, by insertion sequence (`BTreeMap`) and by key
//! (`HashMap`), so both kinds of removal avoid scanning the queue. Waiters for a
//! specific key park on a [`Notify`] that fires on every mutation.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;
use tokio::sync::Notify;
use tracing::trace;

/// Something that can be looked up in a [`KeyedQueue`].
pub trait Keyed {
    type Key: Eq + Hash + Clone + Debug + Send + Sync;

    fn key(&self) -> Self::Key;
}

struct Index<T: Keyed> {
    next_seq: u64,
    by_seq: BTreeMap<u64, T>,
    seq_by_key: HashMap<T::Key, u64>,
}

impl<T: Keyed> Index<T> {
    fn remove_key(&mut self, key: &T::Key) -> Option<T> {
        let seq = self.seq_by_key.remove(key)?;
        self.by_seq.remove(&seq)
    }
}

/// An async FIFO queue with O(log n) removal by key.
pub struct KeyedQueue<T: Keyed> {
    name: &'static str,
    inner: Mutex<Index<T>>,
    changed: Notify,
}

impl<T: Keyed> KeyedQueue<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(Index {
                next_seq: 0,
                by_seq: BTreeMap::new(),
                seq_by_key: HashMap::new(),
            }),
            changed: Notify::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Appends `item` at the back.
    ///
    /// An entry already queued under the same key is moved to the back rather
    /// than duplicated.
    pub fn push(&self, item: T) {
        let key = item.key();
        let len = {
            let mut inner = self.inner.lock();
            inner.remove_key(&key);
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.seq_by_key.insert(key.clone(), seq);
            inner.by_seq.insert(seq, item);
            inner.by_seq.len()
        };
        trace!(queue = self.name, ?key, len, "push");
        self.changed.notify_waiters();
    }

    /// Removes the oldest entry if there is one.
    pub fn try_take(&self) -> Option<T> {
        let item = {
            let mut inner = self.inner.lock();
            let (_, item) = inner.by_seq.pop_first()?;
            inner.seq_by_key.remove(&item.key());
            item
        };
        self.changed.notify_waiters();
        Some(item)
    }

    /// Waits for and removes the oldest entry.
    pub async fn take(&self) -> T {
        loop {
            let changed = self.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            if let Some(item) = self.try_take() {
                return item;
            }
            changed.await;
        }
    }

    /// Removes the entry queued under `key`, if present.
    pub fn take_by_key(&self, key: &T::Key) -> Option<T> {
        let item = self.inner.lock().remove_key(key)?;
        self.changed.notify_waiters();
        Some(item)
    }

    /// Waits until an entry with `key` is queued, then removes it.
    pub async fn wait_take(&self, key: &T::Key) -> T {
        loop {
            let changed = self.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            if let Some(item) = self.take_by_key(key) {
                return item;
            }
            changed.await;
        }
    }

    /// Waits until the queue holds no entries.
    pub async fn wait_empty(&self) {
        loop {
            let changed = self.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            if self.is_empty() {
                return;
            }
            changed.await;
        }
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.inner.lock().seq_by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().by_seq.is_empty()
    }
}

impl<T: Keyed + Clone> KeyedQueue<T> {
    /// Returns a copy of the queued entries, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.lock().by_seq.values().cloned().collect()
    }
}

impl<T: Keyed> std::fmt::Debug for KeyedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedQueue")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}
