//! Order preparation timer: one per dispatched order.

use crate::context::ReadyOrders;
use crate::model::SharedOrder;
use tokio::time::Instant;
use tracing::{debug, info};

/// Waits out the order's preparation time, marks it ready, and publishes it.
///
/// Readiness is set before publication, so anything taken from the
/// ready-orders queue is already ready. Dropping this future before the sleep
/// ends leaves the order unready and unpublished.
pub async fn prepare_order(order: SharedOrder, ready_orders: &ReadyOrders) {
    debug!(prep_ms = order.prep_time().as_millis() as u64, "Order is being prepared");
    tokio::time::sleep(order.prep_time()).await;

    order.mark_ready(Instant::now());
    ready_orders.push(order.clone());
    info!(order_id = %order.id(), name = order.name(), "Order ready for pickup");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Order;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_order_is_ready_before_it_is_published() {
        let ready_orders = ReadyOrders::new("ready_orders");
        let order = Order::new("1", "Pizza", Duration::from_secs(5)).shared();
        let start = Instant::now();

        prepare_order(order.clone(), &ready_orders).await;

        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert!(order.is_ready());
        assert_eq!(order.finished_at(), Some(start + Duration::from_secs(5)));
        let published = ready_orders.try_take().unwrap();
        assert!(published.is_ready());
        assert_eq!(published.id(), order.id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_preparation_publishes_nothing() {
        let ready_orders = ReadyOrders::new("ready_orders");
        let order = Order::new("1", "Pizza", Duration::from_secs(5)).shared();

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            prepare_order(order.clone(), &ready_orders),
        )
        .await;

        assert!(result.is_err());
        assert!(!order.is_ready());
        assert!(ready_orders.is_empty());
    }
}
