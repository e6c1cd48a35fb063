use crate::config::SimulationConfig;
use crate::context::{RunContext, RunSetters};
use crate::dispatch::{DispatchKind, DispatchOutcome, Dispatcher, FifoStrategy, MatchedStrategy};
use crate::framework::{LatchSetter, StageExit};
use crate::intake::Waiter;
use crate::kitchen::KitchenService;
use crate::lifecycle::SimulationError;
use crate::model::{Order, SharedOrder, StatisticsSummary};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared write access to a run's interrupt latch.
///
/// Cloneable, unlike the [`LatchSetter`] it wraps: the first
/// [`interrupt`](Self::interrupt) from any clone fires the latch and later
/// calls do nothing.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    setter: Arc<Mutex<Option<LatchSetter>>>,
}

impl InterruptHandle {
    fn new(setter: LatchSetter) -> Self {
        Self {
            setter: Arc::new(Mutex::new(Some(setter))),
        }
    }

    /// Fires the interrupt latch. Returns `false` if it had already fired.
    pub fn interrupt(&self) -> bool {
        match self.setter.lock().take() {
            Some(setter) => {
                setter.set();
                true
            }
            None => false,
        }
    }
}

/// The orchestrator for one simulation run.
///
/// `Simulation` is responsible for:
/// - **Wiring**: building the [`RunContext`] and handing each stage its latch setter
/// - **Startup**: spawning intake, kitchen, and dispatcher as independent tasks
/// - **Completion**: joining all three and assembling a [`SimulationReport`]
/// - **Failure**: interrupting the surviving stages when one of them panics
///
/// It holds no business logic of its own.
///
/// # Example
///
/// ```ignore
/// let simulation = Simulation::start(&config, orders);
/// let report = simulation.join().await?;
/// println!("{report}");
/// ```
pub struct Simulation {
    strategy: DispatchKind,
    courier_count: usize,
    total_orders: usize,
    context: RunContext,
    interrupt: InterruptHandle,
    intake: JoinHandle<StageExit>,
    kitchen: JoinHandle<StageExit>,
    dispatch: JoinHandle<DispatchOutcome>,
}

impl Simulation {
    /// Seeds the courier pool and spawns every stage. Returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &SimulationConfig, orders: Vec<Order>) -> Self {
        let (context, setters) = RunContext::new(config.pending_capacity);
        let RunSetters {
            submitted,
            kitchen_exhausted,
            delivered,
            interrupt,
        } = setters;

        context.seed_couriers(config.courier_count);
        let orders: Vec<SharedOrder> = orders.into_iter().map(Order::shared).collect();
        let total_orders = orders.len();
        info!(
            strategy = %config.strategy,
            orders = total_orders,
            couriers = config.courier_count,
            "Starting simulation"
        );

        let waiter = Waiter::new(orders, &context, config.intake_settings());
        let kitchen = KitchenService::new(&context, &config.kitchen_settings());

        let intake = tokio::spawn(waiter.run(submitted));
        let kitchen = tokio::spawn(kitchen.run(kitchen_exhausted));
        let dispatch = match config.strategy {
            DispatchKind::Fifo => {
                let strategy = FifoStrategy::new(config.fifo_settings());
                tokio::spawn(Dispatcher::new(strategy, &context, total_orders).run(delivered))
            }
            DispatchKind::Matched => {
                let strategy = MatchedStrategy::new();
                tokio::spawn(Dispatcher::new(strategy, &context, total_orders).run(delivered))
            }
        };

        Self {
            strategy: config.strategy,
            courier_count: config.courier_count,
            total_orders,
            context,
            interrupt: InterruptHandle::new(interrupt),
            intake,
            kitchen,
            dispatch,
        }
    }

    /// Starts a run and waits for it to finish.
    pub async fn run(config: &SimulationConfig, orders: Vec<Order>) -> Result<SimulationReport, SimulationError> {
        Self::start(config, orders).join().await
    }

    /// Read access to the run's queues and latches.
    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// A handle on the interrupt latch for the caller, e.g. a signal handler.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Fires the interrupt latch unless it has already fired.
    pub fn interrupt(&self) {
        if self.interrupt.interrupt() {
            info!("Interrupting simulation");
        }
    }

    /// Waits for all three stages and reports the outcome.
    ///
    /// The stages are awaited together. If one of them fails the interrupt
    /// fires, the others unwind, and the first failure is returned once all
    /// three have stopped.
    pub async fn join(self) -> Result<SimulationReport, SimulationError> {
        let (intake, kitchen, dispatch) = tokio::join!(
            join_stage("intake", self.intake, &self.interrupt),
            join_stage("kitchen", self.kitchen, &self.interrupt),
            join_stage("dispatch", self.dispatch, &self.interrupt),
        );
        let (intake, kitchen, dispatch) = (intake?, kitchen?, dispatch?);

        let report = SimulationReport {
            strategy: self.strategy,
            total_orders: self.total_orders,
            courier_count: self.courier_count,
            delivered: dispatch.delivered,
            abandoned: dispatch.abandoned,
            discarded: dispatch.discarded,
            idle_couriers: self.context.idle_couriers.len(),
            statistics: self.context.statistics.summary(),
            intake,
            kitchen,
            dispatch: dispatch.exit,
        };
        info!(
            delivered = report.delivered,
            abandoned = report.abandoned,
            dispatch = %report.dispatch,
            "Simulation finished"
        );
        Ok(report)
    }

    /// Interrupts the run and waits for every stage to unwind.
    pub async fn shutdown(self) -> Result<SimulationReport, SimulationError> {
        self.interrupt();
        self.join().await
    }
}

async fn join_stage<T>(
    stage: &'static str,
    handle: JoinHandle<T>,
    interrupt: &InterruptHandle,
) -> Result<T, SimulationError> {
    handle.await.map_err(|source| {
        error!(stage, error = %source, "Stage task failed, interrupting the run");
        interrupt.interrupt();
        SimulationError::StageFailed { stage, source }
    })
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub strategy: DispatchKind,
    pub total_orders: usize,
    pub courier_count: usize,
    pub delivered: usize,
    pub abandoned: usize,
    pub discarded: usize,
    /// Size of the idle pool after every stage stopped.
    pub idle_couriers: usize,
    pub statistics: StatisticsSummary,
    pub intake: StageExit,
    pub kitchen: StageExit,
    pub dispatch: StageExit,
}

impl SimulationReport {
    /// Whether the dispatcher resolved every order.
    pub fn completed(&self) -> bool {
        self.dispatch == StageExit::Completed
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Strategy: {}", self.strategy)?;
        writeln!(
            f,
            "Orders: {} total, {} delivered, {} abandoned, {} discarded",
            self.total_orders, self.delivered, self.abandoned, self.discarded
        )?;
        writeln!(f, "Couriers: {} in pool, {} idle at end", self.courier_count, self.idle_couriers)?;
        writeln!(f, "Statistics: {}", self.statistics)?;
        write!(
            f,
            "Stages: intake {}, kitchen {}, dispatch {}",
            self.intake, self.kitchen, self.dispatch
        )
    }
}
