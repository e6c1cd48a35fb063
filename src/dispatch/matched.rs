//! Matched dispatch: each courier waits for the exact order it was sent for.
//!
//! The wait is a keyed lookup that wakes whenever the ready-orders queue
//! changes. It has no timeout, so a courier whose order never becomes ready
//! waits for the rest of the run.

use crate::dispatch::{DispatchContext, DispatchKind, DispatchStrategy, Pairing};
use crate::model::Courier;
use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Default)]
pub struct MatchedStrategy {
    /// The courier currently waiting for its order.
    holding: Option<Courier>,
}

impl MatchedStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DispatchStrategy for MatchedStrategy {
    fn kind(&self) -> DispatchKind {
        DispatchKind::Matched
    }

    async fn next_pairing(&mut self, ctx: &DispatchContext) -> Pairing {
        let courier = match self.holding.take() {
            Some(courier) => courier,
            None => ctx.ready_couriers.take().await,
        };
        let Some(order_id) = courier.assigned_order().cloned() else {
            return Pairing::Unassigned(courier);
        };
        self.holding = Some(courier.clone());

        debug!(courier_id = %courier.id(), order_id = %order_id, "Courier waiting for its order");
        let order = ctx.ready_orders.wait_take(&order_id).await;
        order.await_ready().await;
        self.holding = None;

        Pairing::Delivered { courier, order }
    }
}
