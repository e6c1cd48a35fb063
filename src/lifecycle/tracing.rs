//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter driven by
//! `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Stages**: one span each, `intake`, `kitchen`, and `dispatch{strategy}`
//! - **Timers**: `prepare{order_id}` and `travel{courier_id}` spans per entity
//! - **Deliveries**: one `info` line per delivery with both waits in milliseconds
//! - **Anomalies**: requeued, abandoned, and discarded orders at `debug`/`warn`
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle and deliveries
//! RUST_LOG=info cargo run
//!
//! # Queue traffic and courier borrowing as well
//! RUST_LOG=debug cargo run
//!
//! # Only the dispatcher
//! RUST_LOG=kitchen_dispatch::dispatch=debug cargo run
//! ```
//!
//! With `RUST_LOG=info` a delivery in a matched run reads:
//!
//! ```text
//! INFO dispatch: Delivered strategy=matched order_id=a8cfcb76 courier_id=3 food_wait_ms=2000 courier_wait_ms=0
//! ```

/// Initializes the global subscriber. Call once, at the top of `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // Spans already name the stage
        .compact()
        .init();
}
