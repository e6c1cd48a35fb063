//! Courier arrival timer and the travel-time sampler that feeds it.

use crate::framework::WorkQueue;
use crate::model::Courier;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Waits out `travel`, stamps the courier's arrival, and publishes it.
///
/// Dropping this future before the sleep ends leaves the courier unpublished.
pub async fn courier_arrival(mut courier: Courier, travel: Duration, ready_couriers: &WorkQueue<Courier>) {
    tokio::time::sleep(travel).await;

    courier.arrive(Instant::now());
    info!(courier_id = %courier.id(), "Courier is ready to pick up an order");
    ready_couriers.push(courier);
}

/// Uniform sampler of courier travel times over an inclusive range.
#[derive(Debug)]
pub struct TravelTime {
    rng: StdRng,
    min: Duration,
    max: Duration,
}

impl TravelTime {
    /// Creates a sampler over `[min, max]`. A `seed` makes the sequence reproducible.
    ///
    /// The bounds are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            min: min.min(max),
            max: max.max(min),
        }
    }

    pub fn sample(&mut self) -> Duration {
        self.rng.gen_range(self.min..=self.max)
    }
}
