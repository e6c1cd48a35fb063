//! # Work Queues
//!
//! [`WorkQueue`] is the async FIFO that connects pipeline stages. It is safe for
//! any number of concurrent producers and consumers and can optionally be
//! bounded, in which case [`WorkQueue::put`] applies back-pressure.
//!
//! ## Wake-ups
//!
//! Waiters register with a [`Notify`] *before* inspecting the queue and every
//! mutation wakes all registered waiters, so a push can never slip between a
//! consumer's check and its park. Losers of the race simply re-register.
//!
//! ## Cancel safety
//!
//! Items leave the queue only inside a synchronous critical section. Dropping a
//! pending [`WorkQueue::take`] (for example from a `select!` or a timeout)
//! therefore never loses an item.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::trace;

/// An async multi-producer, multi-consumer FIFO queue.
pub struct WorkQueue<T> {
    name: &'static str,
    items: Mutex<VecDeque<T>>,
    capacity: Option<usize>,
    pushed: Notify,
    popped: Notify,
}

impl<T> WorkQueue<T> {
    /// Creates a queue with no capacity limit.
    pub fn unbounded(name: &'static str) -> Self {
        Self::with_capacity(name, None)
    }

    /// Creates a queue that holds at most `capacity` items.
    pub fn bounded(name: &'static str, capacity: usize) -> Self {
        Self::with_capacity(name, Some(capacity))
    }

    pub fn with_capacity(name: &'static str, capacity: Option<usize>) -> Self {
        Self {
            name,
            items: Mutex::new(VecDeque::new()),
            capacity,
            pushed: Notify::new(),
            popped: Notify::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Appends an item without waiting, ignoring the capacity limit.
    ///
    /// Used by producers whose queue is unbounded by construction (idle pool
    /// returns, ready publications).
    pub fn push(&self, item: T) {
        let len = {
            let mut items = self.items.lock();
            items.push_back(item);
            items.len()
        };
        trace!(queue = self.name, len, "push");
        self.pushed.notify_waiters();
    }

    /// Appends an item, waiting for space if the queue is bounded and full.
    pub async fn put(&self, item: T) {
        let Some(capacity) = self.capacity else {
            self.push(item);
            return;
        };

        loop {
            let popped = self.popped.notified();
            tokio::pin!(popped);
            popped.as_mut().enable();

            {
                let mut items = self.items.lock();
                if items.len() < capacity {
                    items.push_back(item);
                    drop(items);
                    self.pushed.notify_waiters();
                    return;
                }
            }

            trace!(queue = self.name, capacity, "put waiting for space");
            popped.await;
        }
    }

    /// Removes the front item if there is one.
    pub fn try_take(&self) -> Option<T> {
        let item = self.items.lock().pop_front();
        if item.is_some() {
            self.popped.notify_waiters();
        }
        item
    }

    /// Waits for and removes the front item.
    pub async fn take(&self) -> T {
        loop {
            let pushed = self.pushed.notified();
            tokio::pin!(pushed);
            pushed.as_mut().enable();

            if let Some(item) = self.try_take() {
                return item;
            }
            pushed.await;
        }
    }

    /// Waits up to `timeout` for the front item.
    pub async fn take_timeout(&self, timeout: Duration) -> Option<T> {
        tokio::time::timeout(timeout, self.take()).await.ok()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Removes and returns every queued item in FIFO order.
    pub fn drain(&self) -> Vec<T> {
        let drained: Vec<T> = self.items.lock().drain(..).collect();
        if !drained.is_empty() {
            self.popped.notify_waiters();
        }
        drained
    }
}

impl<T: Clone> WorkQueue<T> {
    /// Returns a copy of the queued items in FIFO order.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().iter().cloned().collect()
    }
}

impl<T> fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("name", &self.name)
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
