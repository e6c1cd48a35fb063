//! First-in, first-out dispatch: the oldest ready order goes to whichever
//! courier reaches the kitchen next, regardless of who was sent for it.

use crate::dispatch::{DispatchContext, DispatchKind, DispatchStrategy, Pairing};
use crate::model::SharedOrder;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoSettings {
    /// How long a ready order waits for any courier before it is requeued.
    pub courier_wait: Duration,
    /// Requeues allowed before an order is abandoned.
    pub max_requeue_attempts: u32,
}

impl Default for FifoSettings {
    fn default() -> Self {
        Self {
            courier_wait: Duration::from_secs(5),
            max_requeue_attempts: 3,
        }
    }
}

#[derive(Debug, Default)]
pub struct FifoStrategy {
    settings: FifoSettings,
    /// The order currently waiting for a courier.
    holding: Option<SharedOrder>,
}

impl FifoStrategy {
    pub fn new(settings: FifoSettings) -> Self {
        Self { settings, holding: None }
    }
}

#[async_trait]
impl DispatchStrategy for FifoStrategy {
    fn kind(&self) -> DispatchKind {
        DispatchKind::Fifo
    }

    async fn next_pairing(&mut self, ctx: &DispatchContext) -> Pairing {
        let order = match self.holding.take() {
            Some(order) => order,
            None => {
                let order = ctx.ready_orders.take().await;
                if !order.is_ready() {
                    return Pairing::Discarded(order);
                }
                order
            }
        };
        self.holding = Some(order.clone());

        debug!(order_id = %order.id(), "Waiting for any courier");
        let courier = ctx.ready_couriers.take_timeout(self.settings.courier_wait).await;
        self.holding = None;

        match courier {
            Some(courier) => Pairing::Delivered { courier, order },
            None if order.requeue_attempts() >= self.settings.max_requeue_attempts => Pairing::Abandoned(order),
            None => {
                order.record_requeue();
                ctx.ready_orders.push(order.clone());
                Pairing::Requeued(order)
            }
        }
    }
}
