//! # Configuration
//!
//! [`SimulationConfig`] carries every knob of a run. It is read with the
//! `config` crate from an optional TOML file, then overridden by `DISPATCH_*`
//! environment variables (`DISPATCH_COURIER_COUNT=4`, `DISPATCH_STRATEGY=fifo`).
//! Every field has a default, so an empty source yields a runnable config.
//!
//! Delays are whole numbers of *time units*; one unit is `time_unit_ms`
//! milliseconds (one second by default).

use crate::dispatch::{DispatchKind, FifoSettings};
use crate::intake::IntakeSettings;
use crate::kitchen::KitchenSettings;
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Source(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// JSON file with the orders to simulate.
    pub orders_path: PathBuf,
    pub courier_count: usize,
    pub strategy: DispatchKind,
    pub time_unit_ms: u64,

    pub intake_batch_size: usize,
    pub intake_interval_units: u32,
    /// Bound on the pending-orders queue; unbounded when absent.
    pub pending_capacity: Option<usize>,

    pub kitchen_order_wait_units: u32,
    pub courier_travel_min_units: u32,
    pub courier_travel_max_units: u32,
    pub max_in_flight_timers: usize,
    pub rng_seed: Option<u64>,

    pub fifo_courier_wait_units: u32,
    pub max_requeue_attempts: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            orders_path: PathBuf::from("data/dispatch_orders.json"),
            courier_count: 10,
            strategy: DispatchKind::Matched,
            time_unit_ms: 1000,
            intake_batch_size: 2,
            intake_interval_units: 1,
            pending_capacity: None,
            kitchen_order_wait_units: 1,
            courier_travel_min_units: 3,
            courier_travel_max_units: 15,
            max_in_flight_timers: 1024,
            rng_seed: None,
            fifo_courier_wait_units: 5,
            max_requeue_attempts: 3,
        }
    }
}

impl SimulationConfig {
    /// Loads the optional file at `path`, applies `DISPATCH_*` overrides, and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let config: Self = builder
            .add_source(Environment::with_prefix("DISPATCH").try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_unit_ms == 0 {
            return Err(ConfigError::Invalid("time_unit_ms must be positive".into()));
        }
        if self.intake_batch_size == 0 {
            return Err(ConfigError::Invalid("intake_batch_size must be positive".into()));
        }
        if self.courier_travel_min_units > self.courier_travel_max_units {
            return Err(ConfigError::Invalid(format!(
                "courier travel range {}..={} is inverted",
                self.courier_travel_min_units, self.courier_travel_max_units
            )));
        }
        if self.max_in_flight_timers == 0 {
            return Err(ConfigError::Invalid("max_in_flight_timers must be positive".into()));
        }
        if self.pending_capacity == Some(0) {
            return Err(ConfigError::Invalid("pending_capacity must be positive when set".into()));
        }
        Ok(())
    }

    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    fn units(&self, n: u32) -> Duration {
        self.time_unit().saturating_mul(n)
    }

    pub fn intake_settings(&self) -> IntakeSettings {
        IntakeSettings {
            batch_size: self.intake_batch_size,
            interval: self.units(self.intake_interval_units),
        }
    }

    pub fn kitchen_settings(&self) -> KitchenSettings {
        KitchenSettings {
            order_wait: self.units(self.kitchen_order_wait_units),
            travel_min: self.units(self.courier_travel_min_units),
            travel_max: self.units(self.courier_travel_max_units),
            max_in_flight_timers: self.max_in_flight_timers,
            rng_seed: self.rng_seed,
        }
    }

    pub fn fifo_settings(&self) -> FifoSettings {
        FifoSettings {
            courier_wait: self.units(self.fifo_courier_wait_units),
            max_requeue_attempts: self.max_requeue_attempts,
        }
    }
}
