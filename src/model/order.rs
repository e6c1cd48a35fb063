/// Represents a food order moving through the kitchen.
///
/// An order is created unready by the intake, flipped to ready exactly once by
/// its preparation timer, and read-only from then on. It is shared between
/// stages as a [`SharedOrder`].
///
/// # Ready state
/// The finished timestamp and the ready flag are one value: a `watch` cell
/// holding `Option<Instant>`. Setting it is a single critical section that
/// also wakes every [`Order::await_ready`] caller, so readers can never observe
/// a ready order without its timestamp or the other way around.
use crate::framework::Keyed;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Type-safe identifier for Orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An order shared between the kitchen, its timer, and the dispatcher.
pub type SharedOrder = Arc<Order>;

#[derive(Debug)]
pub struct Order {
    id: OrderId,
    name: String,
    prep_time: Duration,
    finished_at: watch::Sender<Option<Instant>>,
    requeue_attempts: AtomicU32,
}

impl Order {
    /// Creates a new, not-yet-ready Order.
    ///
    /// # Arguments
    /// * `id` - Unique identifier; the true key of the order
    /// * `name` - Display label of the food item
    /// * `prep_time` - How long the kitchen needs before the order is ready
    pub fn new(id: impl Into<OrderId>, name: impl Into<String>, prep_time: Duration) -> Self {
        let (finished_at, _) = watch::channel(None);
        Self {
            id: id.into(),
            name: name.into(),
            prep_time,
            finished_at,
            requeue_attempts: AtomicU32::new(0),
        }
    }

    /// Wraps the order for sharing between stages.
    pub fn shared(self) -> SharedOrder {
        Arc::new(self)
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prep_time(&self) -> Duration {
        self.prep_time
    }

    /// When the order became ready, if it has.
    pub fn finished_at(&self) -> Option<Instant> {
        *self.finished_at.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.finished_at().is_some()
    }

    /// Marks the order ready as of `at` and wakes all waiters.
    ///
    /// Returns `false` (and changes nothing) if the order was already ready.
    pub fn mark_ready(&self, at: Instant) -> bool {
        self.finished_at.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(at);
            true
        })
    }

    /// Parks until the order is ready and returns its finished timestamp.
    pub async fn await_ready(&self) -> Instant {
        let mut rx = self.finished_at.subscribe();
        loop {
            let finished = *rx.borrow_and_update();
            if let Some(at) = finished {
                return at;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    pub fn requeue_attempts(&self) -> u32 {
        self.requeue_attempts.load(Ordering::SeqCst)
    }

    /// Counts one more trip back through the ready queue; returns the new total.
    pub fn record_requeue(&self) -> u32 {
        self.requeue_attempts.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Keyed for SharedOrder {
    type Key = OrderId;

    fn key(&self) -> OrderId {
        self.id.clone()
    }
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name && self.prep_time == other.prep_time
    }
}

impl Eq for Order {}
