//! # Dispatch Timers
//!
//! The kitchen starts two timers per matched pair: a preparation timer for the
//! order and an arrival timer for the courier. [`DispatchTimers`] runs them as
//! tasks in a [`JoinSet`] owned by the kitchen, admitted through a semaphore so
//! that no more than `max_in_flight` timers ever exist at once.
//!
//! Every timer races its sleep against the run's interrupt latch. An
//! interrupted timer drops its entity without publishing it.

use crate::context::{ReadyOrders, RunContext};
use crate::framework::{FrameworkError, Latch, WorkQueue};
use crate::kitchen::arrival::courier_arrival;
use crate::kitchen::preparation::prepare_order;
use crate::model::{Courier, SharedOrder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info_span, warn, Instrument};

pub struct DispatchTimers {
    tasks: JoinSet<()>,
    permits: Arc<Semaphore>,
    interrupt: Latch,
    ready_orders: Arc<ReadyOrders>,
    ready_couriers: Arc<WorkQueue<Courier>>,
}

impl DispatchTimers {
    pub fn new(ctx: &RunContext, max_in_flight: usize) -> Self {
        Self {
            tasks: JoinSet::new(),
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            interrupt: ctx.interrupt.clone(),
            ready_orders: ctx.ready_orders.clone(),
            ready_couriers: ctx.ready_couriers.clone(),
        }
    }

    /// Starts the preparation timer for `order`.
    pub async fn prepare(&mut self, order: SharedOrder) -> Result<(), FrameworkError> {
        let permit = self.admit().await?;
        let span = info_span!("prepare", order_id = %order.id());
        let interrupt = self.interrupt.clone();
        let ready_orders = self.ready_orders.clone();

        self.tasks.spawn(
            async move {
                let _permit = permit;
                let prepared = prepare_order(order, &ready_orders);
                if interrupt.interruptible("preparation", prepared).await.is_err() {
                    debug!("Preparation abandoned");
                }
            }
            .instrument(span),
        );
        self.reap();
        Ok(())
    }

    /// Starts the arrival timer for a dispatched `courier`.
    pub async fn dispatch(&mut self, courier: Courier, travel: Duration) -> Result<(), FrameworkError> {
        let permit = self.admit().await?;
        let span = info_span!("travel", courier_id = %courier.id());
        let interrupt = self.interrupt.clone();
        let ready_couriers = self.ready_couriers.clone();

        self.tasks.spawn(
            async move {
                let _permit = permit;
                let arrived = courier_arrival(courier, travel, &ready_couriers);
                if interrupt.interruptible("courier travel", arrived).await.is_err() {
                    debug!("Courier recalled");
                }
            }
            .instrument(span),
        );
        self.reap();
        Ok(())
    }

    /// Timers started and not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Waits for every outstanding timer to finish.
    pub async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Timer task failed");
            }
        }
    }

    /// Aborts every outstanding timer.
    pub async fn abort(mut self) {
        self.tasks.shutdown().await;
    }

    async fn admit(&self) -> Result<OwnedSemaphorePermit, FrameworkError> {
        let acquire = self.permits.clone().acquire_owned();
        self.interrupt
            .interruptible("timer slot", acquire)
            .await?
            .map_err(|_| FrameworkError::Closed("timer slot"))
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                warn!(error = %e, "Timer task failed");
            }
        }
    }
}
