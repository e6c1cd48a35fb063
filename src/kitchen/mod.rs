//! # Kitchen Service
//!
//! The supply-matching stage. Each turn of the loop borrows one idle courier,
//! waits briefly for a pending order, and on success hands the pair to a
//! [`DispatchTimers`] set: a preparation timer for the order and a travel timer
//! for the courier. The courier carries the order id as its pairing key.
//!
//! When no order shows up within `order_wait` the courier goes back to the idle
//! pool. Once every order has been submitted and resolved the loop drains its
//! timers, reclaims couriers that arrived after their order was settled, and
//! sets the *kitchen work exhausted* latch.
//!
//! Courier acquisition also watches the "submitted and delivered" condition,
//! so a run with an empty courier pool still terminates.

pub mod arrival;
pub mod preparation;
pub mod timers;

pub use arrival::TravelTime;
pub use timers::DispatchTimers;

use crate::context::RunContext;
use crate::framework::{FrameworkError, Latch, LatchSetter, StageExit, WorkQueue};
use crate::model::{Courier, SharedOrder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Tuning for the kitchen loop and its timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KitchenSettings {
    /// How long a borrowed courier waits for a pending order.
    pub order_wait: Duration,
    pub travel_min: Duration,
    pub travel_max: Duration,
    /// Upper bound on concurrently running timers.
    pub max_in_flight_timers: usize,
    /// Seed for travel times; `None` draws from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for KitchenSettings {
    fn default() -> Self {
        Self {
            order_wait: Duration::from_secs(1),
            travel_min: Duration::from_secs(3),
            travel_max: Duration::from_secs(15),
            max_in_flight_timers: 1024,
            rng_seed: None,
        }
    }
}

pub struct KitchenService {
    pending: Arc<WorkQueue<SharedOrder>>,
    idle: Arc<WorkQueue<Courier>>,
    ready_couriers: Arc<WorkQueue<Courier>>,
    submitted: Latch,
    delivered: Latch,
    interrupt: Latch,
    timers: DispatchTimers,
    travel: TravelTime,
    order_wait: Duration,
}

impl KitchenService {
    pub fn new(ctx: &RunContext, settings: &KitchenSettings) -> Self {
        Self {
            pending: ctx.pending_orders.clone(),
            idle: ctx.idle_couriers.clone(),
            ready_couriers: ctx.ready_couriers.clone(),
            submitted: ctx.submitted.clone(),
            delivered: ctx.delivered.clone(),
            interrupt: ctx.interrupt.clone(),
            timers: DispatchTimers::new(ctx, settings.max_in_flight_timers),
            travel: TravelTime::new(settings.travel_min, settings.travel_max, settings.rng_seed),
            order_wait: settings.order_wait,
        }
    }

    /// Runs the loop until the work is exhausted or the run is interrupted.
    ///
    /// `exhausted` is set only on normal completion.
    #[instrument(name = "kitchen", skip_all)]
    pub async fn run(mut self, exhausted: LatchSetter) -> StageExit {
        info!("Kitchen is open");
        let exit = self.serve().await;

        match exit {
            StageExit::Cancelled => {
                info!(in_flight = self.timers.in_flight(), "Kitchen interrupted, recalling timers");
                self.timers.abort().await;
            }
            _ => {
                self.timers.drain().await;
                let reclaimed = self.reclaim_couriers();
                exhausted.set();
                info!(reclaimed, "Kitchen work exhausted");
            }
        }
        exit
    }

    /// Returns couriers nobody will collect to the idle pool.
    ///
    /// Only called once `delivered` is set, so the dispatcher is done with the
    /// arrival queue. A courier whose order was abandoned lands here.
    fn reclaim_couriers(&self) -> usize {
        let stray = self.ready_couriers.drain();
        let count = stray.len();
        for mut courier in stray {
            let order_id = courier.release();
            debug!(courier_id = %courier.id(), ?order_id, "Courier reclaimed");
            self.idle.push(courier);
        }
        count
    }

    async fn serve(&mut self) -> StageExit {
        loop {
            let mut courier = match self.next_courier().await {
                Ok(Some(courier)) => courier,
                Ok(None) => return StageExit::Completed,
                Err(_) => return StageExit::Cancelled,
            };

            let wait = self.pending.take_timeout(self.order_wait);
            let order = match self.interrupt.interruptible("pending order", wait).await {
                Ok(order) => order,
                Err(_) => {
                    self.idle.push(courier);
                    return StageExit::Cancelled;
                }
            };

            let Some(order) = order else {
                self.idle.push(courier);
                if self.work_done() {
                    return StageExit::Completed;
                }
                continue;
            };

            courier.assign(order.id().clone());
            let travel = self.travel.sample();
            info!(
                order_id = %order.id(),
                courier_id = %courier.id(),
                travel_ms = travel.as_millis() as u64,
                "Courier dispatched"
            );

            if self.timers.dispatch(courier, travel).await.is_err() {
                return StageExit::Cancelled;
            }
            if self.timers.prepare(order).await.is_err() {
                return StageExit::Cancelled;
            }
        }
    }

    /// Borrows an idle courier, or `None` once all work is done.
    async fn next_courier(&self) -> Result<Option<Courier>, FrameworkError> {
        let work_done = async {
            self.submitted.wait().await;
            self.delivered.wait().await;
        };
        let acquire = async {
            tokio::select! {
                biased;
                courier = self.idle.take() => Some(courier),
                _ = work_done => None,
            }
        };

        let courier = self.interrupt.interruptible("idle courier", acquire).await?;
        if let Some(courier) = &courier {
            debug!(courier_id = %courier.id(), "Courier borrowed");
        }
        Ok(courier)
    }

    fn work_done(&self) -> bool {
        self.submitted.is_set() && self.delivered.is_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Order, OrderId};

    fn settings() -> KitchenSettings {
        KitchenSettings {
            travel_min: Duration::from_secs(3),
            travel_max: Duration::from_secs(3),
            rng_seed: Some(1),
            ..KitchenSettings::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pairs_courier_with_order_and_starts_timers() {
        let (ctx, setters) = RunContext::new(None);
        ctx.seed_couriers(1);
        ctx.pending_orders.push(Order::new("1", "Ramen", Duration::from_secs(2)).shared());

        let kitchen = KitchenService::new(&ctx, &settings());
        let handle = tokio::spawn(kitchen.run(setters.kitchen_exhausted));

        tokio::time::sleep(Duration::from_secs(4)).await;
        let order = ctx.ready_orders.try_take().unwrap();
        assert_eq!(order.id(), &OrderId::from("1"));
        assert!(order.is_ready());
        let courier = ctx.ready_couriers.try_take().unwrap();
        assert_eq!(courier.assigned_order(), Some(&OrderId::from("1")));
        assert!(ctx.idle_couriers.is_empty());

        setters.interrupt.set();
        assert_eq!(handle.await.unwrap(), StageExit::Cancelled);
        assert!(!ctx.kitchen_exhausted.is_set());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_courier_to_idle_pool() {
        let (ctx, setters) = RunContext::new(None);
        ctx.seed_couriers(1);
        setters.submitted.set();
        setters.delivered.set();

        let exit = KitchenService::new(&ctx, &settings())
            .run(setters.kitchen_exhausted)
            .await;

        assert_eq!(exit, StageExit::Completed);
        assert!(ctx.kitchen_exhausted.is_set());
        assert_eq!(ctx.idle_couriers.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_courier_pool_still_terminates() {
        let (ctx, setters) = RunContext::new(None);
        setters.submitted.set();
        setters.delivered.set();

        let exit = KitchenService::new(&ctx, &settings())
            .run(setters.kitchen_exhausted)
            .await;

        assert_eq!(exit, StageExit::Completed);
        assert!(ctx.kitchen_exhausted.is_set());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_waiting_until_work_is_done() {
        let (ctx, setters) = RunContext::new(None);
        ctx.seed_couriers(1);
        let kitchen = KitchenService::new(&ctx, &settings());
        let handle = tokio::spawn(kitchen.run(setters.kitchen_exhausted));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!handle.is_finished());
        assert!(!ctx.kitchen_exhausted.is_set());

        setters.submitted.set();
        setters.delivered.set();
        assert_eq!(handle.await.unwrap(), StageExit::Completed);
        assert_eq!(ctx.idle_couriers.len(), 1);
        assert!(ctx.kitchen_exhausted.is_set());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_recalls_outstanding_timers() {
        let (ctx, setters) = RunContext::new(None);
        ctx.seed_couriers(1);
        let order = Order::new("1", "Curry", Duration::from_secs(20)).shared();
        ctx.pending_orders.push(order.clone());

        let kitchen = KitchenService::new(&ctx, &settings());
        let handle = tokio::spawn(kitchen.run(setters.kitchen_exhausted));

        tokio::time::sleep(Duration::from_secs(1)).await;
        setters.interrupt.set();
        assert_eq!(handle.await.unwrap(), StageExit::Cancelled);

        // Neither timer publishes after the recall.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!order.is_ready());
        assert!(ctx.ready_orders.is_empty());
        assert!(ctx.ready_couriers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_courier_is_reclaimed_before_exhaustion() {
        let (ctx, setters) = RunContext::new(None);
        ctx.seed_couriers(1);
        ctx.pending_orders.push(Order::new("1", "Gyoza", Duration::ZERO).shared());

        let kitchen = KitchenService::new(&ctx, &settings());
        let handle = tokio::spawn(kitchen.run(setters.kitchen_exhausted));

        // The order is settled elsewhere while its courier is still travelling.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(ctx.idle_couriers.is_empty());
        setters.submitted.set();
        setters.delivered.set();

        assert_eq!(handle.await.unwrap(), StageExit::Completed);
        assert!(ctx.kitchen_exhausted.is_set());
        assert!(ctx.ready_couriers.is_empty());
        let courier = ctx.idle_couriers.try_take().unwrap();
        assert_eq!(courier.assigned_order(), None);
    }
}
