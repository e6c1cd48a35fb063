//! # Run Lifecycle & Orchestration
//!
//! The stages are simple on their own; wiring them into one run is what this
//! module does.
//!
//! **Key Responsibilities:**
//! 1. **Context creation** - One [`RunContext`](crate::context::RunContext) per run, no globals
//! 2. **Latch ownership** - Each completion latch's setter goes to exactly one stage
//! 3. **Startup** - Intake, kitchen, and one dispatcher spawned as independent tasks
//! 4. **Join & report** - Await all three and summarize in a [`SimulationReport`]
//! 5. **Observability setup** - [`setup_tracing`]
//!
//! ## Termination
//!
//! ```text
//!   Waiter ── sets ──► submitted ───────────────┐
//!                                               ├──► KitchenService ── sets ──► kitchen_exhausted
//!   Dispatcher ── sets ──► delivered ───────────┘                                     │
//!        ▲                                                                            │
//!        └────────────── shutdown: exhausted and no ready orders ◄────────────────────┘
//! ```
//!
//! An interrupt ([`Simulation::shutdown`], or a caller holding a handle from
//! [`Simulation::interrupt_handle`]) unwinds every stage. Latches already set
//! stay set. A stage that panics fires the interrupt too, so the others stop
//! instead of waiting on a latch that will never be set.

pub mod error;
pub mod simulation;
pub mod tracing;

pub use error::SimulationError;
pub use simulation::{InterruptHandle, Simulation, SimulationReport};
pub use self::tracing::setup_tracing;
