use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credit_core::{
    AllocationId, CustomerId, DomainError, DomainResult, Entity, JournalEntryId, OrderId,
    PaymentId,
};

/// How the money arrived; decides which asset account the journal debits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Cheque,
    Card,
}

/// Allocation lifecycle of a received payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Unallocated,
    PartiallyAllocated,
    FullyAllocated,
    /// Offset by a reversal flow; amounts were returned to the orders.
    Reversed,
}

/// Entity: CustomerPayment.
///
/// Created once per received payment; immutable after allocation except for
/// `allocation_status` (and the journal reference set in the same unit of
/// work that records the allocation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPayment {
    id: PaymentId,
    customer_id: CustomerId,
    /// Smallest currency unit; always positive.
    amount: u64,
    method: PaymentMethod,
    date: DateTime<Utc>,
    allocation_status: AllocationStatus,
    journal_ref: Option<JournalEntryId>,
    /// Client-assigned key for duplicate-submission detection.
    idempotency_key: Option<String>,
}

impl CustomerPayment {
    pub fn receive(
        id: PaymentId,
        customer_id: CustomerId,
        amount: u64,
        method: PaymentMethod,
        date: DateTime<Utc>,
        idempotency_key: Option<String>,
    ) -> DomainResult<Self> {
        if amount == 0 {
            return Err(DomainError::validation("payment amount must be positive"));
        }

        Ok(Self {
            id,
            customer_id,
            amount,
            method,
            date,
            allocation_status: AllocationStatus::Unallocated,
            journal_ref: None,
            idempotency_key,
        })
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn allocation_status(&self) -> AllocationStatus {
        self.allocation_status
    }

    pub fn journal_ref(&self) -> Option<JournalEntryId> {
        self.journal_ref
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }

    /// Record the allocation outcome: how much of the amount found an order.
    pub fn mark_allocated(
        &mut self,
        allocated_total: u64,
        journal_ref: JournalEntryId,
    ) -> DomainResult<()> {
        if allocated_total > self.amount {
            return Err(DomainError::invariant(
                "allocated total exceeds payment amount",
            ));
        }
        self.allocation_status = if allocated_total == self.amount {
            AllocationStatus::FullyAllocated
        } else if allocated_total > 0 {
            AllocationStatus::PartiallyAllocated
        } else {
            AllocationStatus::Unallocated
        };
        self.journal_ref = Some(journal_ref);
        Ok(())
    }

    pub fn is_reversed(&self) -> bool {
        self.allocation_status == AllocationStatus::Reversed
    }

    /// Mark this payment as offset by a reversal. One-shot.
    pub fn mark_reversed(&mut self) -> DomainResult<()> {
        if self.is_reversed() {
            return Err(DomainError::conflict("payment is already reversed"));
        }
        self.allocation_status = AllocationStatus::Reversed;
        Ok(())
    }
}

impl Entity for CustomerPayment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One row of the payment→order many-to-many: how much of `payment_id`
/// went to `order_id`. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAllocation {
    pub id: AllocationId,
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    /// Always positive; the sum over a payment never exceeds its amount.
    pub allocated_amount: u64,
    /// Whether the order was in the advance-eligible class at allocation time.
    pub is_advance: bool,
}
