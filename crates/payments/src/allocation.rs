//! Waterfall allocation policy (pure).
//!
//! Given a payment amount and a customer's open orders, decide how much to
//! apply to each order. Deterministic: status rank, then priority rank, then
//! oldest order date, then order id. Status rank places outstanding
//! (shipped/delivered) orders ahead of advance-eligible ones, so one payment
//! settles deliveries before funding production.

use core::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credit_core::OrderId;
use credit_orders::{CreditOrder, OrderPriority, OrderStatus};

/// Snapshot of an order as the policy sees it.
///
/// A snapshot, not the entity: the engine validates at commit time that the
/// order rows still carry the versions this snapshot was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub priority: OrderPriority,
    pub order_date: DateTime<Utc>,
    pub balance_due: u64,
    pub version: u64,
}

impl OpenOrder {
    pub fn from_order(order: &CreditOrder) -> Self {
        Self {
            order_id: *credit_core::Entity::id(order),
            status: order.status(),
            priority: order.priority(),
            order_date: order.order_date(),
            balance_due: order.balance_due(),
            version: order.version(),
        }
    }

    fn allocation_order(a: &Self, b: &Self) -> Ordering {
        a.status
            .allocation_rank()
            .cmp(&b.status.allocation_rank())
            .then_with(|| a.priority.allocation_rank().cmp(&b.priority.allocation_rank()))
            .then_with(|| a.order_date.cmp(&b.order_date))
            .then_with(|| a.order_id.as_uuid().cmp(b.order_id.as_uuid()))
    }
}

/// One planned application of funds to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAllocation {
    pub order_id: OrderId,
    pub amount: u64,
}

/// Outcome of the policy: per-order applications plus whatever could not be
/// placed. The caller decides what the remainder becomes (held advance or
/// rejection); the policy only reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub applied: Vec<PlannedAllocation>,
    pub remainder: u64,
}

impl AllocationPlan {
    pub fn allocated_total(&self) -> u64 {
        self.applied.iter().map(|a| a.amount).sum()
    }
}

/// Walk the orders in policy order, applying
/// `min(remaining payment, balance_due)` to each until the payment or the
/// orders are exhausted. Never allocates zero to an order.
pub fn allocate(payment_amount: u64, orders: &[OpenOrder]) -> AllocationPlan {
    let mut ranked: Vec<&OpenOrder> = orders.iter().filter(|o| o.balance_due > 0).collect();
    ranked.sort_by(|a, b| OpenOrder::allocation_order(a, b));

    let mut remaining = payment_amount;
    let mut applied = Vec::new();

    for order in ranked {
        if remaining == 0 {
            break;
        }
        let amount = remaining.min(order.balance_due);
        applied.push(PlannedAllocation {
            order_id: order.order_id,
            amount,
        });
        remaining -= amount;
    }

    AllocationPlan {
        applied,
        remainder: remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn open_order(
        status: OrderStatus,
        priority: OrderPriority,
        age_days: i64,
        balance_due: u64,
    ) -> OpenOrder {
        OpenOrder {
            order_id: OrderId::new(),
            status,
            priority,
            order_date: Utc::now() - Duration::days(age_days),
            balance_due,
            version: 1,
        }
    }

    #[test]
    fn waterfall_funds_ranked_orders_first() {
        let o1 = open_order(OrderStatus::InProduction, OrderPriority::Urgent, 10, 500);
        let o2 = open_order(OrderStatus::Approved, OrderPriority::Normal, 0, 500);

        let plan = allocate(700, &[o2, o1]);

        assert_eq!(plan.applied.len(), 2);
        assert_eq!(plan.applied[0], PlannedAllocation { order_id: o1.order_id, amount: 500 });
        assert_eq!(plan.applied[1], PlannedAllocation { order_id: o2.order_id, amount: 200 });
        assert_eq!(plan.remainder, 0);
    }

    #[test]
    fn remainder_reported_when_orders_exhausted() {
        let o1 = open_order(OrderStatus::Delivered, OrderPriority::Normal, 5, 400);
        let plan = allocate(1_000, &[o1]);

        assert_eq!(plan.allocated_total(), 400);
        assert_eq!(plan.remainder, 600);
    }

    #[test]
    fn exhausted_payment_stops_the_walk() {
        let o1 = open_order(OrderStatus::InProduction, OrderPriority::Urgent, 3, 300);
        let o2 = open_order(OrderStatus::Approved, OrderPriority::Normal, 1, 300);
        let plan = allocate(300, &[o1, o2]);

        assert_eq!(plan.applied.len(), 1);
        assert_eq!(plan.applied[0].order_id, o1.order_id);
        assert_eq!(plan.remainder, 0);
    }

    #[test]
    fn settled_orders_are_skipped() {
        let settled = open_order(OrderStatus::Delivered, OrderPriority::Urgent, 9, 0);
        let open = open_order(OrderStatus::Delivered, OrderPriority::Normal, 1, 100);
        let plan = allocate(100, &[settled, open]);

        assert_eq!(plan.applied.len(), 1);
        assert_eq!(plan.applied[0].order_id, open.order_id);
    }

    #[test]
    fn no_orders_means_full_remainder() {
        let plan = allocate(250, &[]);
        assert!(plan.applied.is_empty());
        assert_eq!(plan.remainder, 250);
    }

    proptest! {
        /// Property: funds are conserved and no order is overfunded.
        #[test]
        fn allocation_conserves_funds(
            payment in 1u64..10_000_000u64,
            dues in prop::collection::vec(0u64..1_000_000u64, 0..20)
        ) {
            let orders: Vec<OpenOrder> = dues
                .iter()
                .map(|&due| open_order(OrderStatus::Approved, OrderPriority::Normal, 1, due))
                .collect();

            let plan = allocate(payment, &orders);

            prop_assert_eq!(plan.allocated_total() + plan.remainder, payment);
            for planned in &plan.applied {
                prop_assert!(planned.amount > 0);
                let order = orders.iter().find(|o| o.order_id == planned.order_id).unwrap();
                prop_assert!(planned.amount <= order.balance_due);
            }
        }

        /// Property: every order but the last funded one is fully settled
        /// (the waterfall never skips ahead).
        #[test]
        fn waterfall_fills_in_order(
            payment in 1u64..5_000_000u64,
            dues in prop::collection::vec(1u64..500_000u64, 1..15)
        ) {
            let orders: Vec<OpenOrder> = dues
                .iter()
                .enumerate()
                .map(|(i, &due)| {
                    open_order(OrderStatus::Approved, OrderPriority::Normal, i as i64, due)
                })
                .collect();

            let plan = allocate(payment, &orders);

            for (i, planned) in plan.applied.iter().enumerate() {
                let order = orders.iter().find(|o| o.order_id == planned.order_id).unwrap();
                if i + 1 < plan.applied.len() {
                    prop_assert_eq!(planned.amount, order.balance_due);
                }
            }
        }
    }
}
