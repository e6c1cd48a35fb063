//! # Kitchen Dispatch
//!
//! > **A concurrent food-order dispatch simulation on Tokio.**
//!
//! Orders are submitted by a waiter, prepared by the kitchen, and picked up by
//! couriers who travel to the kitchen for a random time. Two dispatch policies
//! decide which courier leaves with which order, and every delivery feeds two
//! statistics: how long food sat ready and how long couriers stood waiting.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### A pipeline of stages, wired by queues
//! Each stage runs in its own task and only talks to the others through shared
//! queues and set-once latches held in a per-run [`RunContext`](context::RunContext).
//! A stage owns the queues it produces into; nothing else mutates them.
//!
//! ```text
//!  Waiter ──► pending ──► KitchenService ──► timers ──┬─► ready orders ───┐
//!                              ▲                      └─► ready couriers ─┤
//!                              └──────── idle couriers ◄──── Dispatcher ◄─┘
//! ```
//!
//! ### The dispatch loop is written once
//! [`Dispatcher<S>`](dispatch::Dispatcher) runs the termination checks,
//! bookkeeping, and statistics for any [`DispatchStrategy`](dispatch::DispatchStrategy).
//! A strategy only decides the next pairing.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Set-once flags by construction
//! The three completion flags are [`Latch`](framework::Latch)es. Each has a single
//! non-cloneable setter that is consumed by `set()`, so a flag has exactly one
//! writer and can never go back to false.
//!
//! ### 2. No busy polling
//! Waits are notifications, not sleeps: orders broadcast readiness through a
//! `watch` cell, and the ready-orders queue wakes keyed waiters on publish.
//!
//! ### 3. Cooperative cancellation
//! Every blocking wait races the run's interrupt latch. Interrupted stages
//! return [`StageExit::Cancelled`](framework::StageExit) and unpublished
//! entities are dropped, leaving queues and latches consistent.
//!
//! ### 4. Bounded timers
//! Preparation and travel timers run in a `JoinSet` admitted through a
//! semaphore, so a large run never has more than a configured number in flight.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Plumbing ([`framework`])
//! - **Key items**: [`WorkQueue`](framework::WorkQueue), [`KeyedQueue`](framework::KeyedQueue), [`Latch`](framework::Latch).
//!
//! ### 2. The Entities ([`model`])
//! - **Key items**: [`Order`](model::Order), [`Courier`](model::Courier), [`StatisticsCollector`](model::StatisticsCollector).
//!
//! ### 3. The Stages ([`intake`], [`kitchen`], [`dispatch`])
//! - **Key items**: [`Waiter`](intake::Waiter), [`KitchenService`](kitchen::KitchenService),
//!   [`FifoStrategy`](dispatch::FifoStrategy), [`MatchedStrategy`](dispatch::MatchedStrategy).
//!
//! ### 4. The Orchestrator ([`lifecycle`])
//! - **Key items**: [`Simulation`](lifecycle::Simulation), [`SimulationReport`](lifecycle::SimulationReport).
//!
//! ### 5. Inputs ([`config`], [`loader`])
//! - **Key items**: [`SimulationConfig`](config::SimulationConfig), [`load_orders`](loader::load_orders).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Matched strategy, sample orders, info logs
//! RUST_LOG=info cargo run
//!
//! # FIFO with a faster clock
//! DISPATCH_STRATEGY=fifo DISPATCH_TIME_UNIT_MS=100 RUST_LOG=info cargo run
//! ```

pub mod config;
pub mod context;
pub mod dispatch;
pub mod framework;
pub mod intake;
pub mod kitchen;
pub mod lifecycle;
pub mod loader;
pub mod model;
