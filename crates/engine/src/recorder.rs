//! Payment recording orchestration.
//!
//! `PaymentRecorder` stages the whole unit of work off-lock (payment row,
//! allocation rows, order balance updates, chained ledger entries, the
//! refreshed customer balance, one balanced journal entry) and then submits
//! it through [`CreditStore::commit`] in one shot. Nothing is visible unless
//! the commit succeeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credit_accounting::{AccountRole, ChartOfAccounts, JournalEntry, TransactionLine};
use credit_core::{
    AllocationId, CustomerId, Entity, ExpectedVersion, JournalEntryId, LedgerEntryId, OrderId,
    PaymentId,
};
use credit_customers::Customer;
use credit_ledger::{CustomerLedgerEntry, TransactionType};
use credit_orders::CreditOrder;
use credit_payments::{
    allocate, AllocationPlan, CustomerPayment, OpenOrder, PaymentAllocation, PaymentMethod,
};

use crate::error::EngineError;
use crate::store::{CommitSet, CreditStore};

/// How many times a conflicted allocation is recomputed against fresh
/// balances before the conflict surfaces.
const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

/// What to do with funds left over after every eligible order is satisfied.
///
/// Surfaced per request rather than hidden in the engine: the operator
/// recording the payment decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Fail the whole unit of work with an over-allocation error.
    Reject,
    /// Hold the remainder as an unapplied advance: one extra ledger credit
    /// entry and a customer-advances journal line. Requires the customer to
    /// be credit-eligible.
    HoldAsAdvance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub customer_id: CustomerId,
    /// Smallest currency unit; must be positive.
    pub amount: u64,
    pub method: PaymentMethod,
    pub date: DateTime<Utc>,
    /// Settle exactly this order instead of running the waterfall.
    pub explicit_order: Option<OrderId>,
    pub remainder_policy: RemainderPolicy,
    /// Client-assigned key for duplicate-submission detection.
    pub idempotency_key: Option<String>,
}

/// One order's share of a recorded payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedAllocation {
    pub order_id: OrderId,
    pub amount: u64,
    /// `AdvancePayment` when the order had not shipped, `Payment` otherwise.
    pub transaction_type: TransactionType,
}

/// Full success result: per-order breakdown plus any held remainder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment_id: PaymentId,
    pub applied: Vec<AppliedAllocation>,
    pub allocated_total: u64,
    /// Unapplied remainder held as an advance (0 unless `HoldAsAdvance`).
    pub remainder_held: u64,
    pub journal_entry_id: JournalEntryId,
    pub new_balance: i64,
}

/// Result of a payment reversal (offsetting flow).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalReceipt {
    pub payment_id: PaymentId,
    pub journal_entry_id: JournalEntryId,
    /// Per-order amounts returned to `balance_due`.
    pub restored: Vec<(OrderId, u64)>,
    pub new_balance: i64,
}

/// Result of a manual ledger adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentReceipt {
    pub ledger_entry_id: LedgerEntryId,
    pub journal_entry_id: JournalEntryId,
    pub new_balance: i64,
}

/// Which asset account a payment method lands in.
fn method_account_role(method: PaymentMethod) -> AccountRole {
    match method {
        PaymentMethod::Cash => AccountRole::Cash,
        PaymentMethod::BankTransfer | PaymentMethod::Cheque | PaymentMethod::Card => {
            AccountRole::Bank
        }
    }
}

/// Orchestrator for the credit ledger & payment allocation engine.
pub struct PaymentRecorder<S, C> {
    store: S,
    chart: C,
}

impl<S, C> PaymentRecorder<S, C>
where
    S: CreditStore,
    C: ChartOfAccounts,
{
    pub fn new(store: S, chart: C) -> Self {
        Self { store, chart }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record a customer payment as one all-or-nothing unit of work.
    ///
    /// Either every row lands (payment, allocations, order updates, ledger
    /// entries, customer balance, journal entry) or none do. Concurrent
    /// mutation of the same customer triggers recomputation against fresh
    /// balances, a bounded number of times.
    pub fn record_payment(
        &self,
        request: &RecordPaymentRequest,
    ) -> Result<PaymentReceipt, EngineError> {
        let mut attempt = 1;
        loop {
            match self.try_record_payment(request) {
                Err(EngineError::StateConflict { reason, .. })
                    if attempt < MAX_ALLOCATION_ATTEMPTS =>
                {
                    tracing::warn!(
                        customer_id = %request.customer_id,
                        attempt,
                        %reason,
                        "allocation conflicted; recomputing against fresh balances"
                    );
                    attempt += 1;
                }
                Err(EngineError::StateConflict { reason, .. }) => {
                    return Err(EngineError::StateConflict {
                        attempts: attempt,
                        reason,
                    });
                }
                Ok(receipt) => {
                    tracing::info!(
                        customer_id = %request.customer_id,
                        payment_id = %receipt.payment_id,
                        amount = request.amount,
                        allocated = receipt.allocated_total,
                        remainder_held = receipt.remainder_held,
                        orders = receipt.applied.len(),
                        "payment recorded"
                    );
                    return Ok(receipt);
                }
                Err(other) => return Err(other),
            }
        }
    }

    fn try_record_payment(
        &self,
        request: &RecordPaymentRequest,
    ) -> Result<PaymentReceipt, EngineError> {
        if request.amount == 0 {
            return Err(EngineError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }

        let customer = self
            .store
            .get_customer(request.customer_id)?
            .ok_or_else(|| EngineError::Validation("unknown customer".to_string()))?;
        if !customer.can_transact() {
            return Err(EngineError::Validation(
                "customer is blacklisted".to_string(),
            ));
        }

        // Early duplicate check; the commit re-checks under the write lock.
        if let Some(key) = request.idempotency_key.as_deref() {
            if self
                .store
                .find_payment_by_key(request.customer_id, key)?
                .is_some()
            {
                return Err(EngineError::DuplicatePayment(key.to_string()));
            }
        }

        // Snapshot: ledger tail + eligible orders, with the versions we read.
        let (ledger_seq, tail_balance) =
            self.snapshot_ledger(request.customer_id, request.date)?;

        let orders = self.resolve_eligible_orders(request)?;
        let snapshots: Vec<OpenOrder> = orders.iter().map(OpenOrder::from_order).collect();

        let plan = allocate(request.amount, &snapshots);
        let remainder_held = self.resolve_remainder(request, &customer, &plan)?;

        // Stage every mutation off-lock.
        let payment = CustomerPayment::receive(
            PaymentId::new(),
            request.customer_id,
            request.amount,
            request.method,
            request.date,
            request.idempotency_key.clone(),
        )?;

        let mut set = CommitSet::for_customer(request.customer_id, ledger_seq);
        let mut applied = Vec::with_capacity(plan.applied.len());
        let mut balance = tail_balance;

        for planned in &plan.applied {
            let snapshot = snapshots
                .iter()
                .find(|s| s.order_id == planned.order_id)
                .ok_or_else(|| {
                    EngineError::ConsistencyViolation("plan references unknown order".to_string())
                })?;
            let mut order = orders
                .iter()
                .find(|o| *o.id() == planned.order_id)
                .cloned()
                .ok_or_else(|| {
                    EngineError::ConsistencyViolation("plan references unknown order".to_string())
                })?;

            let is_advance = order.status().is_advance_eligible();
            order
                .apply_payment(planned.amount, is_advance)
                .map_err(|e| EngineError::ConsistencyViolation(e.to_string()))?;

            let transaction_type = if is_advance {
                TransactionType::AdvancePayment
            } else {
                TransactionType::Payment
            };

            let entry = CustomerLedgerEntry::chained(
                LedgerEntryId::new(),
                request.customer_id,
                request.date,
                transaction_type,
                0,
                planned.amount,
                balance,
                format!("payment {} applied to order {}", payment.id(), order.id()),
                Some(planned.order_id),
            )?;
            balance = entry.balance_after;

            set.order_updates
                .push((order, ExpectedVersion::Exact(snapshot.version)));
            set.new_allocations.push(PaymentAllocation {
                id: AllocationId::new(),
                payment_id: *payment.id(),
                order_id: planned.order_id,
                allocated_amount: planned.amount,
                is_advance,
            });
            set.ledger_appends.push(entry);
            applied.push(AppliedAllocation {
                order_id: planned.order_id,
                amount: planned.amount,
                transaction_type,
            });
        }

        if remainder_held > 0 {
            let entry = CustomerLedgerEntry::chained(
                LedgerEntryId::new(),
                request.customer_id,
                request.date,
                TransactionType::AdvancePayment,
                0,
                remainder_held,
                balance,
                format!("payment {} held as unapplied advance", payment.id()),
                None,
            )?;
            balance = entry.balance_after;
            set.ledger_appends.push(entry);
        }

        let allocated_total = plan.allocated_total();
        let journal = self.payment_journal(request, allocated_total, remainder_held)?;
        let journal_entry_id = journal.id;

        let mut payment = payment;
        payment.mark_allocated(allocated_total, journal_entry_id)?;
        let payment_id = *payment.id();

        let customer_expected = ExpectedVersion::Exact(customer.version());
        let mut customer = customer;
        customer.set_current_balance(balance);

        set.customer_update = Some((customer, customer_expected));
        set.new_payment = Some(payment);
        set.journal_append = Some(journal);

        self.store.commit(set)?;

        Ok(PaymentReceipt {
            payment_id,
            applied,
            allocated_total,
            remainder_held,
            journal_entry_id,
            new_balance: balance,
        })
    }

    /// Explicit single order, or every open order of the customer
    /// (outstanding before advance-eligible, per the allocation ranking).
    fn resolve_eligible_orders(
        &self,
        request: &RecordPaymentRequest,
    ) -> Result<Vec<CreditOrder>, EngineError> {
        match request.explicit_order {
            Some(order_id) => {
                let order = self
                    .store
                    .get_order(order_id)?
                    .ok_or_else(|| EngineError::Validation("unknown order".to_string()))?;
                if order.customer_id() != request.customer_id {
                    return Err(EngineError::Validation(
                        "order belongs to a different customer".to_string(),
                    ));
                }
                if !order.is_open_for_allocation() {
                    return Err(EngineError::Validation(
                        "order has no outstanding balance".to_string(),
                    ));
                }
                Ok(vec![order])
            }
            None => Ok(self.store.open_orders(request.customer_id)?),
        }
    }

    /// Snapshot the customer's ledger tail (sequence + running balance).
    ///
    /// Rejects movements dated before the latest entry: the chain is stored
    /// in append order, and append order must agree with transaction-date
    /// order for `balance_as_of` and period statements to be truthful.
    fn snapshot_ledger(
        &self,
        customer_id: CustomerId,
        date: DateTime<Utc>,
    ) -> Result<(u64, i64), EngineError> {
        let ledger_seq = self.store.ledger_seq(customer_id)?;
        let tail = self.store.ledger_tail(customer_id)?;
        if let Some(tail) = &tail {
            if date < tail.transaction_date {
                return Err(EngineError::Validation(
                    "transaction date precedes the customer's latest ledger entry".to_string(),
                ));
            }
        }
        Ok((ledger_seq, tail.map(|e| e.balance_after).unwrap_or(0)))
    }

    fn resolve_remainder(
        &self,
        request: &RecordPaymentRequest,
        customer: &Customer,
        plan: &AllocationPlan,
    ) -> Result<u64, EngineError> {
        if plan.remainder == 0 {
            return Ok(0);
        }
        match request.remainder_policy {
            RemainderPolicy::Reject => Err(EngineError::OverAllocation {
                requested: request.amount,
                allocatable: plan.allocated_total(),
            }),
            RemainderPolicy::HoldAsAdvance => {
                if !customer.is_credit_eligible() {
                    return Err(EngineError::OverAllocation {
                        requested: request.amount,
                        allocatable: plan.allocated_total(),
                    });
                }
                Ok(plan.remainder)
            }
        }
    }

    /// One balanced journal entry for the full payment amount:
    /// debit cash/bank, credit receivables for the allocated portion and
    /// customer-advances for any held remainder.
    fn payment_journal(
        &self,
        request: &RecordPaymentRequest,
        allocated_total: u64,
        remainder_held: u64,
    ) -> Result<JournalEntry, EngineError> {
        let debit_account = self.resolve_role(method_account_role(request.method))?;
        let mut lines = vec![TransactionLine::debit(debit_account, request.amount)];
        if allocated_total > 0 {
            let receivables = self.resolve_role(AccountRole::AccountsReceivable)?;
            lines.push(TransactionLine::credit(receivables, allocated_total));
        }
        if remainder_held > 0 {
            let advances = self.resolve_role(AccountRole::CustomerAdvances)?;
            lines.push(TransactionLine::credit(advances, remainder_held));
        }

        JournalEntry::post(
            &self.chart,
            JournalEntryId::new(),
            request.date,
            format!("payment received from customer {}", request.customer_id),
            lines,
        )
        .map_err(|e| EngineError::ConsistencyViolation(e.to_string()))
    }

    fn resolve_role(&self, role: AccountRole) -> Result<credit_accounting::AccountCode, EngineError> {
        self.chart
            .resolve(role)
            .map(|a| a.code)
            .ok_or_else(|| {
                EngineError::ConsistencyViolation(format!(
                    "chart of accounts missing role {role:?}"
                ))
            })
    }

    /// Reverse a recorded payment with offsetting entries (never in-place):
    /// order balances are restored, one ledger debit entry per original
    /// allocation (plus one for a held remainder) is appended, the original
    /// journal entry is posted reversed, and the payment is marked reversed.
    pub fn reverse_payment(
        &self,
        payment_id: PaymentId,
        date: DateTime<Utc>,
    ) -> Result<ReversalReceipt, EngineError> {
        let mut attempt = 1;
        loop {
            match self.try_reverse_payment(payment_id, date) {
                Err(EngineError::StateConflict { reason, .. })
                    if attempt < MAX_ALLOCATION_ATTEMPTS =>
                {
                    tracing::warn!(%payment_id, attempt, %reason, "reversal conflicted; retrying");
                    attempt += 1;
                }
                Err(EngineError::StateConflict { reason, .. }) => {
                    return Err(EngineError::StateConflict {
                        attempts: attempt,
                        reason,
                    });
                }
                Ok(receipt) => {
                    tracing::info!(
                        %payment_id,
                        restored_orders = receipt.restored.len(),
                        "payment reversed"
                    );
                    return Ok(receipt);
                }
                Err(other) => return Err(other),
            }
        }
    }

    fn try_reverse_payment(
        &self,
        payment_id: PaymentId,
        date: DateTime<Utc>,
    ) -> Result<ReversalReceipt, EngineError> {
        let mut payment = self
            .store
            .get_payment(payment_id)?
            .ok_or_else(|| EngineError::Validation("unknown payment".to_string()))?;
        payment.mark_reversed()?;

        let customer = self
            .store
            .get_customer(payment.customer_id())?
            .ok_or_else(|| EngineError::Validation("unknown customer".to_string()))?;

        let original_journal_id = payment.journal_ref().ok_or_else(|| {
            EngineError::ConsistencyViolation("payment has no journal reference".to_string())
        })?;
        let original_journal = self.store.get_journal(original_journal_id)?.ok_or_else(|| {
            EngineError::ConsistencyViolation("referenced journal entry missing".to_string())
        })?;

        let allocations = self.store.allocations_for_payment(payment_id)?;
        let allocated_total: u64 = allocations.iter().map(|a| a.allocated_amount).sum();
        // A committed payment is fully accounted: anything not allocated to
        // an order was held as an advance.
        let remainder_held = payment.amount() - allocated_total;

        let (ledger_seq, mut balance) = self.snapshot_ledger(payment.customer_id(), date)?;

        let mut set = CommitSet::for_customer(payment.customer_id(), ledger_seq);
        let mut restored = Vec::with_capacity(allocations.len());

        for allocation in &allocations {
            let mut order = self
                .store
                .get_order(allocation.order_id)?
                .ok_or_else(|| {
                    EngineError::ConsistencyViolation("allocated order missing".to_string())
                })?;
            let expected = ExpectedVersion::Exact(order.version());
            order.revert_payment(allocation.allocated_amount, allocation.is_advance)?;

            let entry = CustomerLedgerEntry::chained(
                LedgerEntryId::new(),
                payment.customer_id(),
                date,
                TransactionType::DebitNote,
                allocation.allocated_amount,
                0,
                balance,
                format!("reversal of payment {payment_id} on order {}", order.id()),
                Some(allocation.order_id),
            )?;
            balance = entry.balance_after;

            restored.push((allocation.order_id, allocation.allocated_amount));
            set.order_updates.push((order, expected));
            set.ledger_appends.push(entry);
        }

        if remainder_held > 0 {
            let entry = CustomerLedgerEntry::chained(
                LedgerEntryId::new(),
                payment.customer_id(),
                date,
                TransactionType::DebitNote,
                remainder_held,
                0,
                balance,
                format!("reversal of advance held from payment {payment_id}"),
                None,
            )?;
            balance = entry.balance_after;
            set.ledger_appends.push(entry);
        }

        let reversal_journal = original_journal.reversed(JournalEntryId::new(), date);
        let journal_entry_id = reversal_journal.id;

        let customer_expected = ExpectedVersion::Exact(customer.version());
        let mut customer = customer;
        customer.set_current_balance(balance);

        set.customer_update = Some((customer, customer_expected));
        set.payment_update = Some(payment);
        set.journal_append = Some(reversal_journal);

        self.store.commit(set)?;

        Ok(ReversalReceipt {
            payment_id,
            journal_entry_id,
            restored,
            new_balance: balance,
        })
    }

    /// Append a manual ledger movement (adjustment, credit note, debit note)
    /// with a balancing journal entry. Same atomicity rules as payments.
    pub fn record_adjustment(
        &self,
        customer_id: CustomerId,
        date: DateTime<Utc>,
        transaction_type: TransactionType,
        debit_amount: u64,
        credit_amount: u64,
        description: &str,
    ) -> Result<AdjustmentReceipt, EngineError> {
        let mut attempt = 1;
        loop {
            match self.try_record_adjustment(
                customer_id,
                date,
                transaction_type,
                debit_amount,
                credit_amount,
                description,
            ) {
                Err(EngineError::StateConflict { reason, .. })
                    if attempt < MAX_ALLOCATION_ATTEMPTS =>
                {
                    tracing::warn!(%customer_id, attempt, %reason, "adjustment conflicted; retrying");
                    attempt += 1;
                }
                Err(EngineError::StateConflict { reason, .. }) => {
                    return Err(EngineError::StateConflict {
                        attempts: attempt,
                        reason,
                    });
                }
                other => return other,
            }
        }
    }

    fn try_record_adjustment(
        &self,
        customer_id: CustomerId,
        date: DateTime<Utc>,
        transaction_type: TransactionType,
        debit_amount: u64,
        credit_amount: u64,
        description: &str,
    ) -> Result<AdjustmentReceipt, EngineError> {
        if !matches!(
            transaction_type,
            TransactionType::Adjustment | TransactionType::CreditNote | TransactionType::DebitNote
        ) {
            return Err(EngineError::Validation(
                "adjustments must be adjustment, credit_note or debit_note".to_string(),
            ));
        }

        let customer = self
            .store
            .get_customer(customer_id)?
            .ok_or_else(|| EngineError::Validation("unknown customer".to_string()))?;
        if !customer.can_transact() {
            return Err(EngineError::Validation(
                "customer is blacklisted".to_string(),
            ));
        }

        let (ledger_seq, balance) = self.snapshot_ledger(customer_id, date)?;

        let entry = CustomerLedgerEntry::chained(
            LedgerEntryId::new(),
            customer_id,
            date,
            transaction_type,
            debit_amount,
            credit_amount,
            balance,
            description,
            None,
        )?;
        let new_balance = entry.balance_after;
        let ledger_entry_id = entry.id;

        let receivables = self.resolve_role(AccountRole::AccountsReceivable)?;
        let adjustments = self.resolve_role(AccountRole::Adjustments)?;
        let lines = if debit_amount > 0 {
            vec![
                TransactionLine::debit(receivables, debit_amount),
                TransactionLine::credit(adjustments, debit_amount),
            ]
        } else {
            vec![
                TransactionLine::debit(adjustments, credit_amount),
                TransactionLine::credit(receivables, credit_amount),
            ]
        };
        let journal = JournalEntry::post(
            &self.chart,
            JournalEntryId::new(),
            date,
            description.to_string(),
            lines,
        )
        .map_err(|e| EngineError::ConsistencyViolation(e.to_string()))?;
        let journal_entry_id = journal.id;

        let customer_expected = ExpectedVersion::Exact(customer.version());
        let mut customer = customer;
        customer.set_current_balance(new_balance);

        let mut set = CommitSet::for_customer(customer_id, ledger_seq);
        set.customer_update = Some((customer, customer_expected));
        set.ledger_appends.push(entry);
        set.journal_append = Some(journal);

        self.store.commit(set)?;

        tracing::info!(%customer_id, ?transaction_type, debit_amount, credit_amount, "adjustment recorded");

        Ok(AdjustmentReceipt {
            ledger_entry_id,
            journal_entry_id,
            new_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::TimeZone;

    use credit_accounting::StaticChart;
    use credit_orders::OrderPriority;

    use crate::store::StoreError;

    use super::*;

    #[test]
    fn cash_lands_in_cash_everything_else_in_bank() {
        assert_eq!(method_account_role(PaymentMethod::Cash), AccountRole::Cash);
        for method in [
            PaymentMethod::BankTransfer,
            PaymentMethod::Cheque,
            PaymentMethod::Card,
        ] {
            assert_eq!(method_account_role(method), AccountRole::Bank);
        }
    }

    /// A store whose commit always loses the optimistic concurrency race.
    struct ContestedStore {
        customer: Customer,
        order: CreditOrder,
        commits: AtomicU32,
    }

    impl ContestedStore {
        fn new() -> Self {
            let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
            let customer_id = CustomerId::new();
            let customer =
                Customer::register(customer_id, "Contested Traders", 100_000, now).unwrap();
            let order = CreditOrder::place(
                OrderId::new(),
                customer_id,
                OrderPriority::Normal,
                now,
                50_000,
            )
            .unwrap();
            Self {
                customer,
                order,
                commits: AtomicU32::new(0),
            }
        }
    }

    impl CreditStore for ContestedStore {
        fn get_customer(
            &self,
            customer_id: CustomerId,
        ) -> Result<Option<Customer>, StoreError> {
            Ok((customer_id == *self.customer.id()).then(|| self.customer.clone()))
        }

        fn get_order(&self, order_id: OrderId) -> Result<Option<CreditOrder>, StoreError> {
            Ok((order_id == *self.order.id()).then(|| self.order.clone()))
        }

        fn open_orders(
            &self,
            customer_id: CustomerId,
        ) -> Result<Vec<CreditOrder>, StoreError> {
            if customer_id == self.order.customer_id() {
                Ok(vec![self.order.clone()])
            } else {
                Ok(Vec::new())
            }
        }

        fn get_payment(
            &self,
            _payment_id: PaymentId,
        ) -> Result<Option<CustomerPayment>, StoreError> {
            Ok(None)
        }

        fn allocations_for_payment(
            &self,
            _payment_id: PaymentId,
        ) -> Result<Vec<PaymentAllocation>, StoreError> {
            Ok(Vec::new())
        }

        fn find_payment_by_key(
            &self,
            _customer_id: CustomerId,
            _idempotency_key: &str,
        ) -> Result<Option<CustomerPayment>, StoreError> {
            Ok(None)
        }

        fn get_journal(
            &self,
            _journal_entry_id: JournalEntryId,
        ) -> Result<Option<JournalEntry>, StoreError> {
            Ok(None)
        }

        fn ledger_entries(
            &self,
            _customer_id: CustomerId,
        ) -> Result<Vec<CustomerLedgerEntry>, StoreError> {
            Ok(Vec::new())
        }

        fn ledger_seq(&self, _customer_id: CustomerId) -> Result<u64, StoreError> {
            Ok(0)
        }

        fn ledger_tail(
            &self,
            _customer_id: CustomerId,
        ) -> Result<Option<CustomerLedgerEntry>, StoreError> {
            Ok(None)
        }

        fn balance_as_of(
            &self,
            _customer_id: CustomerId,
            _date: DateTime<Utc>,
        ) -> Result<i64, StoreError> {
            Ok(0)
        }

        fn commit(&self, _set: CommitSet) -> Result<(), StoreError> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Conflict("ledger tail moved".to_string()))
        }
    }

    #[test]
    fn persistent_commit_conflict_surfaces_after_bounded_retries() {
        let store = ContestedStore::new();
        let customer_id = *store.customer.id();
        let date = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        let recorder = PaymentRecorder::new(store, StaticChart::standard());

        let result = recorder.record_payment(&RecordPaymentRequest {
            customer_id,
            amount: 10_000,
            method: PaymentMethod::BankTransfer,
            date,
            explicit_order: None,
            remainder_policy: RemainderPolicy::Reject,
            idempotency_key: None,
        });

        match result {
            Err(EngineError::StateConflict { attempts, .. }) => {
                assert_eq!(attempts, MAX_ALLOCATION_ATTEMPTS);
            }
            other => panic!("expected a state conflict, got {other:?}"),
        }
        assert_eq!(
            recorder.store().commits.load(Ordering::SeqCst),
            MAX_ALLOCATION_ATTEMPTS
        );
    }
}
