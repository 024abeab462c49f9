use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use credit_core::{CustomerId, ExpectedVersion, JournalEntryId, OrderId, PaymentId};
use credit_customers::Customer;
use credit_accounting::JournalEntry;
use credit_ledger::CustomerLedgerEntry;
use credit_orders::CreditOrder;
use credit_payments::{CustomerPayment, PaymentAllocation};

/// Storage operation error.
///
/// These are infrastructure errors (concurrency, commit shape, IO) as
/// opposed to domain errors (validation, invariants).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency check failed: a row or the ledger tail moved
    /// between snapshot and commit.
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    /// The commit carried a new payment whose idempotency key was already
    /// recorded for that customer.
    #[error("duplicate idempotency key: {0}")]
    DuplicateKey(String),

    /// The commit set itself is malformed (broken ledger chain, balance cache
    /// out of step with the appended tail, unknown rows). Programming fault.
    #[error("invalid commit: {0}")]
    InvalidCommit(String),

    /// The underlying storage failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Everything one `record_payment` (or adjustment/reversal) call writes,
/// staged off-lock and applied atomically.
///
/// Expected versions are the ones the computation's snapshot was taken at;
/// the store validates every one of them before touching any row, so the
/// whole set applies or none of it does.
#[derive(Debug, Clone)]
pub struct CommitSet {
    pub customer_id: CustomerId,
    /// Ledger length for the customer at snapshot time; the commit fails
    /// with [`StoreError::Conflict`] if the ledger grew since.
    pub expected_ledger_seq: u64,
    /// Updated customer row plus the version it was read at.
    pub customer_update: Option<(Customer, ExpectedVersion)>,
    /// Updated order rows plus the versions they were read at.
    pub order_updates: Vec<(CreditOrder, ExpectedVersion)>,
    /// A freshly received payment (record flow).
    pub new_payment: Option<CustomerPayment>,
    /// A status change on an existing payment (reversal flow).
    pub payment_update: Option<CustomerPayment>,
    pub new_allocations: Vec<PaymentAllocation>,
    /// Ledger rows, already chained onto the snapshot tail.
    pub ledger_appends: Vec<CustomerLedgerEntry>,
    pub journal_append: Option<JournalEntry>,
}

impl CommitSet {
    pub fn for_customer(customer_id: CustomerId, expected_ledger_seq: u64) -> Self {
        Self {
            customer_id,
            expected_ledger_seq,
            customer_update: None,
            order_updates: Vec::new(),
            new_payment: None,
            payment_update: None,
            new_allocations: Vec::new(),
            ledger_appends: Vec::new(),
            journal_append: None,
        }
    }
}

/// Transactional read/write interface over the five credit entities.
///
/// Reads return point-in-time clones. `commit` is the single mutation entry
/// point; implementations must serialize commits touching the same customer
/// (the in-memory store uses one write lock, a SQL backend may use row
/// locks) and must apply a commit set all-or-nothing.
pub trait CreditStore: Send + Sync {
    fn get_customer(&self, customer_id: CustomerId) -> Result<Option<Customer>, StoreError>;

    fn get_order(&self, order_id: OrderId) -> Result<Option<CreditOrder>, StoreError>;

    /// Orders of this customer with `balance_due > 0`, cancelled excluded.
    fn open_orders(&self, customer_id: CustomerId) -> Result<Vec<CreditOrder>, StoreError>;

    fn get_payment(&self, payment_id: PaymentId) -> Result<Option<CustomerPayment>, StoreError>;

    fn allocations_for_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<Vec<PaymentAllocation>, StoreError>;

    fn find_payment_by_key(
        &self,
        customer_id: CustomerId,
        idempotency_key: &str,
    ) -> Result<Option<CustomerPayment>, StoreError>;

    fn get_journal(
        &self,
        journal_entry_id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, StoreError>;

    /// All ledger entries for a customer in canonical (append) order.
    fn ledger_entries(&self, customer_id: CustomerId)
        -> Result<Vec<CustomerLedgerEntry>, StoreError>;

    /// Number of ledger entries for the customer; the snapshot token for
    /// [`CommitSet::expected_ledger_seq`].
    fn ledger_seq(&self, customer_id: CustomerId) -> Result<u64, StoreError>;

    /// Latest ledger entry, if any.
    fn ledger_tail(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<CustomerLedgerEntry>, StoreError>;

    /// Latest `balance_after` strictly before `date`; 0 if none. Used for
    /// opening balances of period statements.
    fn balance_as_of(
        &self,
        customer_id: CustomerId,
        date: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Apply a staged commit set atomically, validating every expected
    /// version first.
    fn commit(&self, set: CommitSet) -> Result<(), StoreError>;
}

impl<S> CreditStore for Arc<S>
where
    S: CreditStore + ?Sized,
{
    fn get_customer(&self, customer_id: CustomerId) -> Result<Option<Customer>, StoreError> {
        (**self).get_customer(customer_id)
    }

    fn get_order(&self, order_id: OrderId) -> Result<Option<CreditOrder>, StoreError> {
        (**self).get_order(order_id)
    }

    fn open_orders(&self, customer_id: CustomerId) -> Result<Vec<CreditOrder>, StoreError> {
        (**self).open_orders(customer_id)
    }

    fn get_payment(&self, payment_id: PaymentId) -> Result<Option<CustomerPayment>, StoreError> {
        (**self).get_payment(payment_id)
    }

    fn allocations_for_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<Vec<PaymentAllocation>, StoreError> {
        (**self).allocations_for_payment(payment_id)
    }

    fn find_payment_by_key(
        &self,
        customer_id: CustomerId,
        idempotency_key: &str,
    ) -> Result<Option<CustomerPayment>, StoreError> {
        (**self).find_payment_by_key(customer_id, idempotency_key)
    }

    fn get_journal(
        &self,
        journal_entry_id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, StoreError> {
        (**self).get_journal(journal_entry_id)
    }

    fn ledger_entries(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<CustomerLedgerEntry>, StoreError> {
        (**self).ledger_entries(customer_id)
    }

    fn ledger_seq(&self, customer_id: CustomerId) -> Result<u64, StoreError> {
        (**self).ledger_seq(customer_id)
    }

    fn ledger_tail(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<CustomerLedgerEntry>, StoreError> {
        (**self).ledger_tail(customer_id)
    }

    fn balance_as_of(
        &self,
        customer_id: CustomerId,
        date: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        (**self).balance_as_of(customer_id, date)
    }

    fn commit(&self, set: CommitSet) -> Result<(), StoreError> {
        (**self).commit(set)
    }
}
