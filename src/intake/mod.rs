//! # Order Intake
//!
//! The [`Waiter`] is the pipeline's producer. It walks the loaded orders in
//! order, submitting them to the pending-orders queue in small batches with a
//! fixed pause after each batch.
//!
//! The *all orders submitted* latch is held as a set-on-drop guard for the whole
//! run, so it is set on normal completion, on interrupt, and even if the task
//! is aborted mid-batch. Downstream stages therefore never wait for
//! submissions that cannot arrive.

use crate::context::RunContext;
use crate::framework::{Latch, LatchSetter, StageExit, WorkQueue};
use crate::model::SharedOrder;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Pacing of the intake loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeSettings {
    /// Orders submitted back to back before pausing.
    pub batch_size: usize,
    /// Pause after each batch.
    pub interval: Duration,
}

impl Default for IntakeSettings {
    fn default() -> Self {
        Self {
            batch_size: 2,
            interval: Duration::from_secs(1),
        }
    }
}

/// Feeds orders into the kitchen at a fixed pace.
pub struct Waiter {
    orders: Vec<SharedOrder>,
    pending: Arc<WorkQueue<SharedOrder>>,
    interrupt: Latch,
    settings: IntakeSettings,
}

impl Waiter {
    pub fn new(orders: Vec<SharedOrder>, ctx: &RunContext, settings: IntakeSettings) -> Self {
        Self {
            orders,
            pending: ctx.pending_orders.clone(),
            interrupt: ctx.interrupt.clone(),
            settings,
        }
    }

    /// Number of orders this run will submit.
    pub fn total_orders(&self) -> usize {
        self.orders.len()
    }

    /// Submits every order, then sets `submitted`.
    #[instrument(name = "intake", skip_all)]
    pub async fn run(self, submitted: LatchSetter) -> StageExit {
        let _submitted = submitted.set_on_drop();
        info!(total = self.orders.len(), batch_size = self.settings.batch_size, "Waiter is reading orders");

        let batch_size = self.settings.batch_size.max(1);
        for batch in self.orders.chunks(batch_size) {
            for order in batch {
                let put = self.pending.put(order.clone());
                if self.interrupt.interruptible("pending order space", put).await.is_err() {
                    info!("Waiter interrupted");
                    return StageExit::Cancelled;
                }
                debug!(order_id = %order.id(), name = order.name(), "Order submitted");
            }

            let pause = tokio::time::sleep(self.settings.interval);
            if self.interrupt.interruptible("intake pacing", pause).await.is_err() {
                info!("Waiter interrupted");
                return StageExit::Cancelled;
            }
        }

        info!(total = self.orders.len(), "All orders submitted");
        StageExit::Completed
    }
}
