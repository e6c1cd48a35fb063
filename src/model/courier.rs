/// Represents a courier that carries orders out of the kitchen.
///
/// Couriers are plain owned values: they move by value from the idle pool to an
/// arrival timer, onto the ready queue, through a dispatcher, and back to the
/// idle pool. Whoever holds a courier is the only one who can touch it.
use crate::model::OrderId;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tokio::time::Instant;

/// Type-safe identifier for Couriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourierId(pub u32);

impl From<u32> for CourierId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for CourierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Courier {
    id: CourierId,
    arrived_at: Instant,
    assigned_order: Option<OrderId>,
}

impl Courier {
    /// Creates an idle courier whose arrival time is "now".
    pub fn new(id: impl Into<CourierId>) -> Self {
        Self {
            id: id.into(),
            arrived_at: Instant::now(),
            assigned_order: None,
        }
    }

    /// Builder-style assignment, handy when seeding queues directly.
    pub fn assigned_to(mut self, order_id: impl Into<OrderId>) -> Self {
        self.assign(order_id);
        self
    }

    pub fn id(&self) -> CourierId {
        self.id
    }

    pub fn arrived_at(&self) -> Instant {
        self.arrived_at
    }

    /// The order this courier was dispatched for, if any.
    pub fn assigned_order(&self) -> Option<&OrderId> {
        self.assigned_order.as_ref()
    }

    /// Records the order this courier is being dispatched for.
    pub fn assign(&mut self, order_id: impl Into<OrderId>) {
        self.assigned_order = Some(order_id.into());
    }

    /// Records that the courier reached the kitchen at `at`.
    pub fn arrive(&mut self, at: Instant) {
        self.arrived_at = at;
    }

    /// Clears the assignment, returning it. Called when the courier goes back to idle.
    pub fn release(&mut self) -> Option<OrderId> {
        self.assigned_order.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_courier_is_idle() {
        let courier = Courier::new(3);
        assert_eq!(courier.id(), CourierId(3));
        assert_eq!(courier.id().to_string(), "3");
        assert!(courier.assigned_order().is_none());
    }

    #[test]
    fn test_assign_and_release() {
        let mut courier = Courier::new(0).assigned_to("42");
        assert_eq!(courier.assigned_order(), Some(&OrderId::from("42")));

        courier.assign("43");
        assert_eq!(courier.release(), Some(OrderId::from("43")));
        assert!(courier.assigned_order().is_none());
    }

    #[test]
    fn test_arrive_updates_timestamp() {
        let mut courier = Courier::new(1);
        let later = courier.arrived_at() + Duration::from_secs(9);
        courier.arrive(later);
        assert_eq!(courier.arrived_at(), later);
    }
}
