//! Runs one simulation from `dispatch.toml` (or `$DISPATCH_CONFIG`) and logs the report.
//!
//! Ctrl-C interrupts the run; the stages unwind and the partial report is still
//! printed.

use kitchen_dispatch::config::SimulationConfig;
use kitchen_dispatch::lifecycle::{setup_tracing, Simulation, SimulationError};
use kitchen_dispatch::loader::load_orders;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<(), SimulationError> {
    setup_tracing();

    let config_path = std::env::var("DISPATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("dispatch.toml"));
    let config = SimulationConfig::load(Some(config_path.as_path()))?;
    info!(config = %config_path.display(), strategy = %config.strategy, "Configuration loaded");

    let orders = load_orders(&config.orders_path, config.time_unit())?;

    let simulation = Simulation::start(&config, orders);
    let interrupt = simulation.interrupt_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Ctrl-C received, stopping the simulation");
                interrupt.interrupt();
            }
            Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
        }
    });

    let report = simulation.join().await?;
    for line in report.to_string().lines() {
        info!("{line}");
    }
    match serde_json::to_string(&report) {
        Ok(json) => debug!(report = %json, "Simulation report"),
        Err(e) => warn!(error = %e, "Could not serialize the report"),
    }

    if !report.completed() {
        warn!(dispatch = %report.dispatch, "Simulation ended before every order was resolved");
    }
    Ok(())
}
