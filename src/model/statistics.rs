//! # Delivery Statistics
//!
//! [`StatisticsCollector`] receives one `(courier, order, completed_at)` triple
//! per delivery and summarizes two waits:
//!
//! - **food wait**: `completed_at - order.finished_at` (how long food sat ready)
//! - **courier wait**: `completed_at - courier.arrived_at` (how long the courier waited)
//!
//! Averages of an empty sample set are zero. An order can be recorded at most
//! once; a second delivery of the same order id is rejected.

use crate::model::{Courier, CourierId, Order, OrderId};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::info;

/// Errors raised while recording a delivery.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StatisticsError {
    /// The order already has a delivery sample.
    #[error("Order {0} was already delivered")]
    DuplicateDelivery(OrderId),

    /// The order has no finished timestamp, so its food wait is undefined.
    #[error("Order {0} is not ready")]
    OrderNotReady(OrderId),
}

/// One delivery as seen by the statistics feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliverySample {
    pub order_id: OrderId,
    pub courier_id: CourierId,
    #[serde(rename = "food_wait_ms", serialize_with = "as_millis")]
    pub food_wait: Duration,
    #[serde(rename = "courier_wait_ms", serialize_with = "as_millis")]
    pub courier_wait: Duration,
}

/// Averages over every recorded delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatisticsSummary {
    pub deliveries: usize,
    #[serde(rename = "average_food_wait_ms", serialize_with = "as_millis")]
    pub average_food_wait: Duration,
    #[serde(rename = "average_courier_wait_ms", serialize_with = "as_millis")]
    pub average_courier_wait: Duration,
}

impl fmt::Display for StatisticsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} deliveries, average food wait {} ms, average courier wait {} ms",
            self.deliveries,
            self.average_food_wait.as_millis(),
            self.average_courier_wait.as_millis()
        )
    }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[derive(Debug, Default)]
struct Samples {
    delivered: HashSet<OrderId>,
    samples: Vec<DeliverySample>,
}

/// Thread-safe accumulator of delivery samples.
#[derive(Debug, Default)]
pub struct StatisticsCollector {
    inner: Mutex<Samples>,
}

impl StatisticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one delivery completed at `completed_at`.
    pub fn record(
        &self,
        courier: &Courier,
        order: &Order,
        completed_at: Instant,
    ) -> Result<DeliverySample, StatisticsError> {
        let finished_at = order
            .finished_at()
            .ok_or_else(|| StatisticsError::OrderNotReady(order.id().clone()))?;

        let mut inner = self.inner.lock();
        if !inner.delivered.insert(order.id().clone()) {
            return Err(StatisticsError::DuplicateDelivery(order.id().clone()));
        }

        let sample = DeliverySample {
            order_id: order.id().clone(),
            courier_id: courier.id(),
            food_wait: completed_at.saturating_duration_since(finished_at),
            courier_wait: completed_at.saturating_duration_since(courier.arrived_at()),
        };
        inner.samples.push(sample.clone());
        drop(inner);

        info!(
            order_id = %sample.order_id,
            courier_id = %sample.courier_id,
            food_wait_ms = sample.food_wait.as_millis() as u64,
            courier_wait_ms = sample.courier_wait.as_millis() as u64,
            "Delivered"
        );
        Ok(sample)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().samples.is_empty()
    }

    /// Copy of every recorded sample in recording order.
    pub fn samples(&self) -> Vec<DeliverySample> {
        self.inner.lock().samples.clone()
    }

    pub fn average_food_wait(&self) -> Duration {
        let inner = self.inner.lock();
        average(inner.samples.iter().map(|s| s.food_wait))
    }

    pub fn average_courier_wait(&self) -> Duration {
        let inner = self.inner.lock();
        average(inner.samples.iter().map(|s| s.courier_wait))
    }

    pub fn summary(&self) -> StatisticsSummary {
        let inner = self.inner.lock();
        StatisticsSummary {
            deliveries: inner.samples.len(),
            average_food_wait: average(inner.samples.iter().map(|s| s.food_wait)),
            average_courier_wait: average(inner.samples.iter().map(|s| s.courier_wait)),
        }
    }
}

/// Integer mean of `waits`; zero for an empty set.
fn average(waits: impl Iterator<Item = Duration>) -> Duration {
    let (total, count) = waits.fold((Duration::ZERO, 0u32), |(total, count), wait| {
        (total.saturating_add(wait), count.saturating_add(1))
    });
    if count == 0 {
        return Duration::ZERO;
    }
    total / count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_order(id: &str, finished_at: Instant) -> Order {
        let order = Order::new(id, "Pizza", Duration::from_secs(1));
        order.mark_ready(finished_at);
        order
    }

    #[test]
    fn test_empty_averages_are_zero() {
        let stats = StatisticsCollector::new();
        assert!(stats.is_empty());
        assert_eq!(stats.average_food_wait(), Duration::ZERO);
        assert_eq!(stats.average_courier_wait(), Duration::ZERO);
        assert_eq!(stats.summary().deliveries, 0);
    }

    #[test]
    fn test_waits_are_measured_from_each_timestamp() {
        let stats = StatisticsCollector::new();
        let base = Instant::now();

        let mut courier = Courier::new(1);
        courier.arrive(base + Duration::from_millis(500));
        let order = ready_order("1", base);

        let sample = stats
            .record(&courier, &order, base + Duration::from_millis(2_000))
            .unwrap();
        assert_eq!(sample.food_wait, Duration::from_millis(2_000));
        assert_eq!(sample.courier_wait, Duration::from_millis(1_500));
        assert_eq!(stats.len(), 1);
    }

    #[test]
    fn test_averages_use_integer_mean() {
        let stats = StatisticsCollector::new();
        let base = Instant::now();

        for (id, food_ms) in [("1", 100u64), ("2", 200), ("3", 400)] {
            let mut courier = Courier::new(0);
            courier.arrive(base);
            let order = ready_order(id, base);
            stats
                .record(&courier, &order, base + Duration::from_millis(food_ms))
                .unwrap();
        }

        // 700 / 3 rounds down.
        assert_eq!(stats.average_food_wait(), Duration::from_nanos(233_333_333));
        let summary = stats.summary();
        assert_eq!(summary.deliveries, 3);
        assert_eq!(summary.average_courier_wait, summary.average_food_wait);
    }

    #[test]
    fn test_duplicate_delivery_is_rejected() {
        let stats = StatisticsCollector::new();
        let base = Instant::now();
        let courier = Courier::new(0);
        let order = ready_order("1", base);

        stats.record(&courier, &order, base).unwrap();
        let err = stats.record(&courier, &order, base).unwrap_err();
        assert_eq!(err, StatisticsError::DuplicateDelivery(OrderId::from("1")));
        assert_eq!(stats.len(), 1);
    }

    #[test]
    fn test_unready_order_is_rejected() {
        let stats = StatisticsCollector::new();
        let order = Order::new("9", "Soup", Duration::from_secs(1));
        let err = stats
            .record(&Courier::new(0), &order, Instant::now())
            .unwrap_err();
        assert_eq!(err, StatisticsError::OrderNotReady(OrderId::from("9")));
        assert!(stats.is_empty());
    }

    #[test]
    fn test_summary_serializes_in_millis() {
        let summary = StatisticsSummary {
            deliveries: 2,
            average_food_wait: Duration::from_millis(1_250),
            average_courier_wait: Duration::from_secs(3),
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["deliveries"], 2);
        assert_eq!(json["average_food_wait_ms"], 1_250);
        assert_eq!(json["average_courier_wait_ms"], 3_000);
    }
}
