use core::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credit_core::{CustomerId, DomainError, DomainResult, Entity, OrderId};

/// Credit order status lifecycle.
///
/// Status is a workflow field, driven by callers; payment never advances it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    PendingApproval,
    Approved,
    InProduction,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Rank used by the allocation ordering; lower funds first.
    ///
    /// Outstanding balances (delivered, then shipped) settle before orders
    /// still awaiting shipment; within the advance class, the closer to
    /// delivery the sooner it funds: in_production > approved >
    /// pending_approval > draft.
    pub fn allocation_rank(self) -> u8 {
        match self {
            OrderStatus::Delivered => 0,
            OrderStatus::Shipped => 1,
            OrderStatus::InProduction => 2,
            OrderStatus::Approved => 3,
            OrderStatus::PendingApproval => 4,
            OrderStatus::Draft => 5,
            OrderStatus::Cancelled => u8::MAX,
        }
    }

    /// Eligible for advance payments (not yet shipped).
    pub fn is_advance_eligible(self) -> bool {
        matches!(
            self,
            OrderStatus::Draft
                | OrderStatus::PendingApproval
                | OrderStatus::Approved
                | OrderStatus::InProduction
        )
    }

    /// Eligible for settlement of an outstanding balance.
    pub fn is_outstanding_eligible(self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }
}

/// Order priority, second allocation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderPriority {
    Urgent,
    High,
    Normal,
    Low,
}

impl OrderPriority {
    /// Rank used by the allocation ordering; lower funds first.
    pub fn allocation_rank(self) -> u8 {
        match self {
            OrderPriority::Urgent => 0,
            OrderPriority::High => 1,
            OrderPriority::Normal => 2,
            OrderPriority::Low => 3,
        }
    }
}

/// Entity: CreditOrder.
///
/// Invariants, held at every observable point:
/// - `balance_due == total_amount - amount_paid`
/// - `amount_paid <= total_amount`
/// - `advance_paid <= amount_paid`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditOrder {
    id: OrderId,
    customer_id: CustomerId,
    status: OrderStatus,
    priority: OrderPriority,
    order_date: DateTime<Utc>,
    /// All monetary fields are in smallest currency unit.
    total_amount: u64,
    /// Portion of `amount_paid` received before shipment.
    advance_paid: u64,
    amount_paid: u64,
    balance_due: u64,
    /// Bumped on every in-place mutation; checked at commit time.
    version: u64,
}

impl CreditOrder {
    pub fn place(
        id: OrderId,
        customer_id: CustomerId,
        priority: OrderPriority,
        order_date: DateTime<Utc>,
        total_amount: u64,
    ) -> DomainResult<Self> {
        if total_amount == 0 {
            return Err(DomainError::validation("order total must be positive"));
        }

        Ok(Self {
            id,
            customer_id,
            status: OrderStatus::Draft,
            priority,
            order_date,
            total_amount,
            advance_paid: 0,
            amount_paid: 0,
            balance_due: total_amount,
            version: 1,
        })
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn priority(&self) -> OrderPriority {
        self.priority
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn advance_paid(&self) -> u64 {
        self.advance_paid
    }

    pub fn amount_paid(&self) -> u64 {
        self.amount_paid
    }

    pub fn balance_due(&self) -> u64 {
        self.balance_due
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether this order can currently absorb an allocation.
    pub fn is_open_for_allocation(&self) -> bool {
        self.status != OrderStatus::Cancelled && self.balance_due > 0
    }

    /// Workflow transition, caller-driven. Payment completeness and status
    /// are independent concerns: settling `balance_due` never moves status.
    pub fn set_status(&mut self, status: OrderStatus) -> DomainResult<()> {
        if self.status == OrderStatus::Cancelled {
            return Err(DomainError::conflict("order is cancelled"));
        }
        self.status = status;
        self.version += 1;
        Ok(())
    }

    pub fn set_priority(&mut self, priority: OrderPriority) {
        self.priority = priority;
        self.version += 1;
    }

    /// Apply an allocated payment amount to this order's balances.
    ///
    /// `is_advance` records whether the money arrived before shipment.
    pub fn apply_payment(&mut self, amount: u64, is_advance: bool) -> DomainResult<()> {
        if amount == 0 {
            return Err(DomainError::validation("applied amount must be positive"));
        }
        if self.status == OrderStatus::Cancelled {
            return Err(DomainError::invariant("cannot pay a cancelled order"));
        }
        if amount > self.balance_due {
            return Err(DomainError::invariant(format!(
                "applied amount {amount} exceeds balance due {}",
                self.balance_due
            )));
        }

        let new_paid = self
            .amount_paid
            .checked_add(amount)
            .ok_or_else(|| DomainError::invariant("amount_paid overflow"))?;
        debug_assert!(new_paid <= self.total_amount);

        self.amount_paid = new_paid;
        if is_advance {
            self.advance_paid += amount;
        }
        self.balance_due = self.total_amount - self.amount_paid;
        self.version += 1;
        Ok(())
    }

    /// Undo a previously applied amount (payment reversal flow).
    pub fn revert_payment(&mut self, amount: u64, was_advance: bool) -> DomainResult<()> {
        if amount == 0 {
            return Err(DomainError::validation("reverted amount must be positive"));
        }
        if amount > self.amount_paid {
            return Err(DomainError::invariant(format!(
                "reverted amount {amount} exceeds amount paid {}",
                self.amount_paid
            )));
        }
        if was_advance && amount > self.advance_paid {
            return Err(DomainError::invariant(
                "reverted advance exceeds advance paid",
            ));
        }

        self.amount_paid -= amount;
        if was_advance {
            self.advance_paid -= amount;
        }
        self.balance_due = self.total_amount - self.amount_paid;
        self.version += 1;
        Ok(())
    }
}

impl Entity for CreditOrder {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Deterministic allocation ordering over open orders.
///
/// Primary: status rank, secondary: priority rank, tertiary: order date
/// ascending (oldest obligations funded first), then order id for a total
/// order.
pub fn allocation_order(a: &CreditOrder, b: &CreditOrder) -> Ordering {
    a.status()
        .allocation_rank()
        .cmp(&b.status().allocation_rank())
        .then_with(|| {
            a.priority()
                .allocation_rank()
                .cmp(&b.priority().allocation_rank())
        })
        .then_with(|| a.order_date().cmp(&b.order_date()))
        .then_with(|| a.id().as_uuid().cmp(b.id().as_uuid()))
}
