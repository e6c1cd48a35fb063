//! # Dispatch
//!
//! The consumer end of the pipeline: pairs ready couriers with ready orders and
//! records each delivery.
//!
//! ## Architecture Note
//! Both strategies share one contract, so the loop around them is written once
//! in [`Dispatcher`]. A [`DispatchStrategy`] only decides *which* courier meets
//! *which* order and reports that decision as a [`Pairing`]. The dispatcher
//! owns everything else:
//!
//! - the termination check (every order resolved),
//! - racing each step against the interrupt and shutdown signals,
//! - statistics, the processed-order counters, and returning couriers to idle,
//! - setting the *all orders delivered* latch.
//!
//! ## Strategies
//! - [`FifoStrategy`] - first ready order meets first ready courier
//! - [`MatchedStrategy`] - each courier waits for the order it was dispatched for

pub mod error;
pub mod fifo;
pub mod matched;

pub use error::DispatchError;
pub use fifo::{FifoSettings, FifoStrategy};
pub use matched::MatchedStrategy;

use crate::context::{ReadyOrders, RunContext};
use crate::framework::{Latch, LatchSetter, StageExit, WorkQueue};
use crate::model::{Courier, SharedOrder, StatisticsCollector};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, field, info, instrument, warn, Span};

/// Selects the pairing policy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchKind {
    Fifo,
    #[default]
    Matched,
}

impl fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchKind::Fifo => f.write_str("fifo"),
            DispatchKind::Matched => f.write_str("matched"),
        }
    }
}

impl FromStr for DispatchKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(DispatchKind::Fifo),
            "matched" => Ok(DispatchKind::Matched),
            _ => Err(DispatchError::UnknownStrategy(s.to_string())),
        }
    }
}

/// The slice of the run context a dispatcher is allowed to touch.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub ready_orders: Arc<ReadyOrders>,
    pub ready_couriers: Arc<WorkQueue<Courier>>,
    pub idle_couriers: Arc<WorkQueue<Courier>>,
    pub statistics: Arc<StatisticsCollector>,
    pub kitchen_exhausted: Latch,
    pub interrupt: Latch,
}

impl From<&RunContext> for DispatchContext {
    fn from(ctx: &RunContext) -> Self {
        Self {
            ready_orders: ctx.ready_orders.clone(),
            ready_couriers: ctx.ready_couriers.clone(),
            idle_couriers: ctx.idle_couriers.clone(),
            statistics: ctx.statistics.clone(),
            kitchen_exhausted: ctx.kitchen_exhausted.clone(),
            interrupt: ctx.interrupt.clone(),
        }
    }
}

/// What one strategy step decided.
#[derive(Debug)]
pub enum Pairing {
    /// The courier picked up the order.
    Delivered { courier: Courier, order: SharedOrder },
    /// A stale entry that was not actually ready; dropped.
    Discarded(SharedOrder),
    /// No courier in time; the order went back to the ready queue.
    Requeued(SharedOrder),
    /// No courier in time and no retries left.
    Abandoned(SharedOrder),
    /// A courier arrived without an assignment; it goes back to idle.
    Unassigned(Courier),
}

/// A pairing policy.
///
/// `next_pairing` must be cancel-safe: the dispatcher drops it whenever an
/// interrupt or shutdown wins the race, and an entity already taken from a
/// queue has to survive into the next call.
#[async_trait]
pub trait DispatchStrategy: Send + 'static {
    fn kind(&self) -> DispatchKind;

    /// Blocks until the next pairing decision.
    async fn next_pairing(&mut self, ctx: &DispatchContext) -> Pairing;
}

/// Final tally of a dispatcher run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub exit: StageExit,
    pub delivered: usize,
    pub abandoned: usize,
    pub discarded: usize,
}

impl DispatchOutcome {
    /// Orders that will never be seen again.
    pub fn resolved(&self) -> usize {
        self.delivered + self.abandoned + self.discarded
    }
}

enum Step {
    Interrupted,
    Shutdown,
    Paired(Pairing),
}

/// The dispatch loop, generic over the pairing policy.
pub struct Dispatcher<S: DispatchStrategy> {
    strategy: S,
    ctx: DispatchContext,
    total_orders: usize,
    delivered: usize,
    abandoned: usize,
    discarded: usize,
}

impl<S: DispatchStrategy> Dispatcher<S> {
    pub fn new(strategy: S, ctx: impl Into<DispatchContext>, total_orders: usize) -> Self {
        Self {
            strategy,
            ctx: ctx.into(),
            total_orders,
            delivered: 0,
            abandoned: 0,
            discarded: 0,
        }
    }

    /// Runs until every order is resolved, the pipeline shuts down, or the run
    /// is interrupted. `delivered` is set only in the first case.
    #[instrument(name = "dispatch", skip_all, fields(strategy = field::Empty))]
    pub async fn run(mut self, delivered: LatchSetter) -> DispatchOutcome {
        Span::current().record("strategy", field::display(self.strategy.kind()));
        info!(total = self.total_orders, "Dispatcher started");

        let exit = loop {
            if self.resolved() >= self.total_orders {
                break StageExit::Completed;
            }
            // Backstop for "every order prepared and none left to hand over".
            // Not reached from `Simulation`: there the kitchen only exhausts
            // after `delivered`, which this loop sets on its way out.
            if self.ctx.kitchen_exhausted.is_set() && self.ctx.ready_orders.is_empty() {
                break StageExit::Shutdown;
            }

            let step = tokio::select! {
                biased;
                _ = self.ctx.interrupt.wait() => Step::Interrupted,
                _ = shutdown_signal(&self.ctx) => Step::Shutdown,
                pairing = self.strategy.next_pairing(&self.ctx) => Step::Paired(pairing),
            };

            match step {
                Step::Interrupted => break StageExit::Cancelled,
                Step::Shutdown => break StageExit::Shutdown,
                Step::Paired(pairing) => self.settle(pairing),
            }
        };

        let outcome = self.outcome(exit);
        match exit {
            StageExit::Completed => {
                delivered.set();
                info!(delivered = outcome.delivered, abandoned = outcome.abandoned, "All orders delivered");
            }
            StageExit::Shutdown => {
                info!(resolved = outcome.resolved(), total = self.total_orders, "Dispatcher shut down")
            }
            StageExit::Cancelled => {
                info!(resolved = outcome.resolved(), total = self.total_orders, "Dispatcher interrupted")
            }
        }
        outcome
    }

    fn settle(&mut self, pairing: Pairing) {
        match pairing {
            Pairing::Delivered { courier, order } => {
                match self.ctx.statistics.record(&courier, &order, Instant::now()) {
                    Ok(_) => self.delivered += 1,
                    Err(e) => warn!(error = %e, "Delivery rejected"),
                }
                self.return_to_idle(courier);
            }
            Pairing::Requeued(order) => {
                debug!(order_id = %order.id(), attempts = order.requeue_attempts(), "Order requeued");
            }
            Pairing::Abandoned(order) => {
                warn!(order_id = %order.id(), attempts = order.requeue_attempts(), "Order abandoned, no courier came");
                self.abandoned += 1;
            }
            Pairing::Discarded(order) => {
                warn!(order_id = %order.id(), "Discarded order that was not ready");
                self.discarded += 1;
            }
            Pairing::Unassigned(courier) => {
                warn!(courier_id = %courier.id(), "Courier arrived without an order");
                self.return_to_idle(courier);
            }
        }
    }

    fn return_to_idle(&self, mut courier: Courier) {
        courier.release();
        debug!(courier_id = %courier.id(), "Courier back in the idle pool");
        self.ctx.idle_couriers.push(courier);
    }

    fn resolved(&self) -> usize {
        self.delivered + self.abandoned + self.discarded
    }

    fn outcome(&self, exit: StageExit) -> DispatchOutcome {
        DispatchOutcome {
            exit,
            delivered: self.delivered,
            abandoned: self.abandoned,
            discarded: self.discarded,
        }
    }
}

/// Resolves once no order can ever reach the ready queue again.
///
/// Mirrors the shutdown check at the top of [`Dispatcher::run`] and is a
/// backstop in the same way: a full pipeline exhausts the kitchen only after
/// the dispatcher has set `delivered`, so the race is live only when the
/// latches are driven by something other than a [`KitchenService`].
///
/// [`KitchenService`]: crate::kitchen::KitchenService
async fn shutdown_signal(ctx: &DispatchContext) {
    ctx.kitchen_exhausted.wait().await;
    ctx.ready_orders.wait_empty().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Order;
    use std::time::Duration;

    /// Hands out scripted pairings, then blocks forever.
    struct Scripted(Vec<Pairing>);

    #[async_trait]
    impl DispatchStrategy for Scripted {
        fn kind(&self) -> DispatchKind {
            DispatchKind::Fifo
        }

        async fn next_pairing(&mut self, _ctx: &DispatchContext) -> Pairing {
            if self.0.is_empty() {
                std::future::pending::<()>().await;
            }
            self.0.remove(0)
        }
    }

    fn ready_order(id: &str) -> SharedOrder {
        let order = Order::new(id, "Soup", Duration::ZERO).shared();
        order.mark_ready(Instant::now());
        order
    }

    #[test]
    fn test_kind_parses_and_displays() {
        assert_eq!("fifo".parse::<DispatchKind>().unwrap(), DispatchKind::Fifo);
        assert_eq!(" Matched ".parse::<DispatchKind>().unwrap(), DispatchKind::Matched);
        assert_eq!(
            "lifo".parse::<DispatchKind>().unwrap_err(),
            DispatchError::UnknownStrategy("lifo".to_string())
        );
        assert_eq!(DispatchKind::Fifo.to_string(), "fifo");
        assert_eq!(DispatchKind::default(), DispatchKind::Matched);
    }

    #[tokio::test]
    async fn test_zero_orders_completes_immediately() {
        let (ctx, setters) = RunContext::new(None);
        let dispatcher = Dispatcher::new(Scripted(vec![]), &ctx, 0);

        let outcome = dispatcher.run(setters.delivered).await;

        assert_eq!(outcome.exit, StageExit::Completed);
        assert_eq!(outcome.resolved(), 0);
        assert!(ctx.delivered.is_set());
    }

    #[tokio::test]
    async fn test_delivery_returns_released_courier_and_records_sample() {
        let (ctx, setters) = RunContext::new(None);
        let courier = Courier::new(3).assigned_to("1");
        let script = vec![Pairing::Delivered { courier, order: ready_order("1") }];

        let outcome = Dispatcher::new(Scripted(script), &ctx, 1).run(setters.delivered).await;

        assert_eq!(outcome.exit, StageExit::Completed);
        assert_eq!(outcome.delivered, 1);
        assert_eq!(ctx.statistics.len(), 1);
        let idle = ctx.idle_couriers.try_take().unwrap();
        assert_eq!(idle.assigned_order(), None);
        assert!(ctx.delivered.is_set());
    }

    #[tokio::test]
    async fn test_abandoned_and_discarded_orders_count_as_resolved() {
        let (ctx, setters) = RunContext::new(None);
        let stale = Order::new("3", "Soup", Duration::ZERO).shared();
        let script = vec![
            Pairing::Requeued(ready_order("1")),
            Pairing::Abandoned(ready_order("1")),
            Pairing::Unassigned(Courier::new(0)),
            Pairing::Discarded(stale),
            Pairing::Delivered { courier: Courier::new(1), order: ready_order("2") },
        ];

        let outcome = Dispatcher::new(Scripted(script), &ctx, 3).run(setters.delivered).await;

        assert_eq!(
            outcome,
            DispatchOutcome { exit: StageExit::Completed, delivered: 1, abandoned: 1, discarded: 1 }
        );
        assert_eq!(ctx.idle_couriers.len(), 2);
        assert!(ctx.delivered.is_set());
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_not_counted_twice() {
        let (ctx, setters) = RunContext::new(None);
        let order = ready_order("1");
        let script = vec![
            Pairing::Delivered { courier: Courier::new(0), order: order.clone() },
            Pairing::Delivered { courier: Courier::new(1), order },
        ];
        let handle = tokio::spawn(Dispatcher::new(Scripted(script), &ctx, 2).run(setters.delivered));

        while ctx.idle_couriers.len() < 2 {
            tokio::task::yield_now().await;
        }
        setters.interrupt.set();
        let outcome = handle.await.unwrap();

        assert_eq!(outcome.exit, StageExit::Cancelled);
        assert_eq!(outcome.delivered, 1);
        assert_eq!(ctx.statistics.len(), 1);
        assert_eq!(ctx.idle_couriers.len(), 2);
        assert!(!ctx.delivered.is_set());
    }

    #[tokio::test]
    async fn test_shutdown_when_kitchen_exhausted_and_nothing_ready() {
        let (ctx, setters) = RunContext::new(None);
        let handle = tokio::spawn(Dispatcher::new(Scripted(vec![]), &ctx, 5).run(setters.delivered));

        setters.kitchen_exhausted.set();
        let outcome = handle.await.unwrap();

        assert_eq!(outcome.exit, StageExit::Shutdown);
        assert!(!ctx.delivered.is_set());
    }

    #[tokio::test]
    async fn test_interrupt_stops_without_setting_delivered() {
        let (ctx, setters) = RunContext::new(None);
        let handle = tokio::spawn(Dispatcher::new(Scripted(vec![]), &ctx, 5).run(setters.delivered));

        setters.interrupt.set();
        let outcome = handle.await.unwrap();

        assert_eq!(outcome.exit, StageExit::Cancelled);
        assert!(!ctx.delivered.is_set());
    }
}
