//! # Run Context
//!
//! Everything one simulation run shares between its stages: the four queues,
//! the statistics collector, and read handles for the completion latches.
//!
//! A context is created per run and dropped with it; nothing here is global.
//! [`RunContext::new`] also hands back [`RunSetters`], the single write handle
//! of each latch, so that every flag is owned by exactly one stage.
//!
//! ```text
//!  Waiter ──► pending_orders ──► KitchenService ──► timers ──┬─► ready_orders ───┐
//!                                    ▲                       └─► ready_couriers ─┤
//!                                    │                                           ▼
//!                                    └──────────── idle_couriers ◄──────── Dispatcher
//! ```

use crate::framework::{latch, KeyedQueue, Latch, LatchSetter, WorkQueue};
use crate::model::{Courier, SharedOrder, StatisticsCollector};
use std::sync::Arc;
use tracing::info;

/// Orders whose preparation has finished, oldest first, indexed by id.
pub type ReadyOrders = KeyedQueue<SharedOrder>;

/// Shared queues and latch readers for one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Submitted by the intake, consumed by the kitchen.
    pub pending_orders: Arc<WorkQueue<SharedOrder>>,
    /// Couriers available for dispatch.
    pub idle_couriers: Arc<WorkQueue<Courier>>,
    /// Couriers that reached the kitchen.
    pub ready_couriers: Arc<WorkQueue<Courier>>,
    /// Orders that finished preparation.
    pub ready_orders: Arc<ReadyOrders>,
    pub statistics: Arc<StatisticsCollector>,
    /// Every order has been handed to the kitchen.
    pub submitted: Latch,
    /// The kitchen loop has finished for good.
    pub kitchen_exhausted: Latch,
    /// Every order has been resolved by the dispatcher.
    pub delivered: Latch,
    /// External cancellation request.
    pub interrupt: Latch,
}

/// The single write handle of each run latch.
#[derive(Debug)]
pub struct RunSetters {
    pub submitted: LatchSetter,
    pub kitchen_exhausted: LatchSetter,
    pub delivered: LatchSetter,
    pub interrupt: LatchSetter,
}

impl RunContext {
    /// Creates empty queues and unset latches.
    ///
    /// `pending_capacity` bounds the pending-orders queue; `None` leaves it
    /// unbounded.
    pub fn new(pending_capacity: Option<usize>) -> (Self, RunSetters) {
        let (submitted_tx, submitted) = latch();
        let (exhausted_tx, kitchen_exhausted) = latch();
        let (delivered_tx, delivered) = latch();
        let (interrupt_tx, interrupt) = latch();

        let context = Self {
            pending_orders: Arc::new(WorkQueue::with_capacity("pending_orders", pending_capacity)),
            idle_couriers: Arc::new(WorkQueue::unbounded("idle_couriers")),
            ready_couriers: Arc::new(WorkQueue::unbounded("ready_couriers")),
            ready_orders: Arc::new(KeyedQueue::new("ready_orders")),
            statistics: Arc::new(StatisticsCollector::new()),
            submitted,
            kitchen_exhausted,
            delivered,
            interrupt,
        };
        let setters = RunSetters {
            submitted: submitted_tx,
            kitchen_exhausted: exhausted_tx,
            delivered: delivered_tx,
            interrupt: interrupt_tx,
        };
        (context, setters)
    }

    /// Fills the idle pool with couriers `0..count`.
    pub fn seed_couriers(&self, count: usize) {
        for id in 0..count {
            self.idle_couriers.push(Courier::new(id as u32));
        }
        info!(total = self.idle_couriers.len(), "Couriers ready");
    }
}
