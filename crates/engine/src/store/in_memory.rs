use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use credit_core::{CustomerId, Entity, JournalEntryId, OrderId, PaymentId};
use credit_accounting::JournalEntry;
use credit_customers::{Customer, CustomerDirectory, CustomerProfile};
use credit_ledger::{chain_balance, CustomerLedgerEntry};
use credit_orders::CreditOrder;
use credit_payments::{CustomerPayment, PaymentAllocation};

use super::r#trait::{CommitSet, CreditStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    customers: HashMap<CustomerId, Customer>,
    orders: HashMap<OrderId, CreditOrder>,
    payments: HashMap<PaymentId, CustomerPayment>,
    allocations: Vec<PaymentAllocation>,
    ledgers: HashMap<CustomerId, Vec<CustomerLedgerEntry>>,
    journal: Vec<JournalEntry>,
    idempotency: HashMap<(CustomerId, String), PaymentId>,
}

/// In-memory credit store.
///
/// Intended for tests/dev. The single `RwLock` write section is the commit
/// point: reads stay concurrent, commits are serialized, and every expected
/// version is validated before any row is touched, so a commit set applies
/// all-or-nothing.
#[derive(Debug, Default)]
pub struct InMemoryCreditStore {
    inner: RwLock<Inner>,
}

impl InMemoryCreditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a customer row (registration is outside the engine's scope).
    pub fn insert_customer(&self, customer: Customer) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.customers.insert(*customer.id(), customer);
        Ok(())
    }

    /// Seed an order row (order lifecycle is outside the engine's scope).
    pub fn insert_order(&self, order: CreditOrder) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.orders.insert(*order.id(), order);
        Ok(())
    }

    pub fn journal_entries(&self) -> Result<Vec<JournalEntry>, StoreError> {
        Ok(self.read()?.journal.clone())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }

    fn validate(inner: &Inner, set: &CommitSet) -> Result<(), StoreError> {
        let ledger = inner.ledgers.get(&set.customer_id);
        let current_seq = ledger.map(|l| l.len() as u64).unwrap_or(0);
        if current_seq != set.expected_ledger_seq {
            return Err(StoreError::Conflict(format!(
                "ledger tail moved (expected seq {}, found {})",
                set.expected_ledger_seq, current_seq
            )));
        }

        if let Some((customer, expected)) = &set.customer_update {
            let current = inner.customers.get(customer.id()).ok_or_else(|| {
                StoreError::InvalidCommit(format!("unknown customer {}", customer.id()))
            })?;
            if !expected.matches(current.version()) {
                return Err(StoreError::Conflict(format!(
                    "customer {} moved (expected {expected:?}, found {})",
                    customer.id(),
                    current.version()
                )));
            }
        }

        for (order, expected) in &set.order_updates {
            let current = inner
                .orders
                .get(order.id())
                .ok_or_else(|| StoreError::InvalidCommit(format!("unknown order {}", order.id())))?;
            if !expected.matches(current.version()) {
                return Err(StoreError::Conflict(format!(
                    "order {} moved (expected {expected:?}, found {})",
                    order.id(),
                    current.version()
                )));
            }
        }

        if let Some(payment) = &set.new_payment {
            if let Some(key) = payment.idempotency_key() {
                if inner
                    .idempotency
                    .contains_key(&(set.customer_id, key.to_string()))
                {
                    return Err(StoreError::DuplicateKey(key.to_string()));
                }
            }
        }

        if let Some(payment) = &set.payment_update {
            if !inner.payments.contains_key(payment.id()) {
                return Err(StoreError::InvalidCommit(format!(
                    "unknown payment {}",
                    payment.id()
                )));
            }
        }

        // Consistency checks on the staged rows themselves: the appended
        // entries must chain onto the current tail, and the materialized
        // customer balance must equal the new tail.
        let mut balance = ledger
            .and_then(|l| l.last())
            .map(|e| e.balance_after)
            .unwrap_or(0);
        for entry in &set.ledger_appends {
            if entry.customer_id != set.customer_id {
                return Err(StoreError::InvalidCommit(
                    "ledger append for a different customer".to_string(),
                ));
            }
            let chained = chain_balance(balance, entry.debit_amount, entry.credit_amount)
                .map_err(|e| StoreError::InvalidCommit(e.to_string()))?;
            if chained != entry.balance_after {
                return Err(StoreError::InvalidCommit(format!(
                    "ledger chain broken at entry {} (stored {}, expected {})",
                    entry.id, entry.balance_after, chained
                )));
            }
            balance = chained;
        }

        if !set.ledger_appends.is_empty() {
            if let Some((customer, _)) = &set.customer_update {
                if customer.current_balance() != balance {
                    return Err(StoreError::InvalidCommit(format!(
                        "customer balance cache {} out of step with ledger tail {balance}",
                        customer.current_balance()
                    )));
                }
            }
        }

        Ok(())
    }
}

impl CreditStore for InMemoryCreditStore {
    fn get_customer(&self, customer_id: CustomerId) -> Result<Option<Customer>, StoreError> {
        Ok(self.read()?.customers.get(&customer_id).cloned())
    }

    fn get_order(&self, order_id: OrderId) -> Result<Option<CreditOrder>, StoreError> {
        Ok(self.read()?.orders.get(&order_id).cloned())
    }

    fn open_orders(&self, customer_id: CustomerId) -> Result<Vec<CreditOrder>, StoreError> {
        Ok(self
            .read()?
            .orders
            .values()
            .filter(|o| o.customer_id() == customer_id && o.is_open_for_allocation())
            .cloned()
            .collect())
    }

    fn get_payment(&self, payment_id: PaymentId) -> Result<Option<CustomerPayment>, StoreError> {
        Ok(self.read()?.payments.get(&payment_id).cloned())
    }

    fn allocations_for_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<Vec<PaymentAllocation>, StoreError> {
        Ok(self
            .read()?
            .allocations
            .iter()
            .filter(|a| a.payment_id == payment_id)
            .cloned()
            .collect())
    }

    fn find_payment_by_key(
        &self,
        customer_id: CustomerId,
        idempotency_key: &str,
    ) -> Result<Option<CustomerPayment>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .idempotency
            .get(&(customer_id, idempotency_key.to_string()))
            .and_then(|payment_id| inner.payments.get(payment_id))
            .cloned())
    }

    fn get_journal(
        &self,
        journal_entry_id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, StoreError> {
        Ok(self
            .read()?
            .journal
            .iter()
            .find(|e| e.id == journal_entry_id)
            .cloned())
    }

    fn ledger_entries(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<CustomerLedgerEntry>, StoreError> {
        // Append order is the canonical order: commits only extend the tail
        // (guarded by the ledger seq check), so no re-sort is needed.
        Ok(self
            .read()?
            .ledgers
            .get(&customer_id)
            .cloned()
            .unwrap_or_default())
    }

    fn ledger_seq(&self, customer_id: CustomerId) -> Result<u64, StoreError> {
        Ok(self
            .read()?
            .ledgers
            .get(&customer_id)
            .map(|l| l.len() as u64)
            .unwrap_or(0))
    }

    fn ledger_tail(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<CustomerLedgerEntry>, StoreError> {
        Ok(self
            .read()?
            .ledgers
            .get(&customer_id)
            .and_then(|l| l.last().cloned()))
    }

    fn balance_as_of(
        &self,
        customer_id: CustomerId,
        date: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let entries = self.ledger_entries(customer_id)?;
        Ok(entries
            .iter()
            .rev()
            .find(|e| e.transaction_date < date)
            .map(|e| e.balance_after)
            .unwrap_or(0))
    }

    fn commit(&self, set: CommitSet) -> Result<(), StoreError> {
        let mut inner = self.write()?;

        Self::validate(&inner, &set)?;

        // Past this point nothing can fail: apply every staged row.
        if let Some(payment) = set.new_payment {
            if let Some(key) = payment.idempotency_key() {
                inner
                    .idempotency
                    .insert((set.customer_id, key.to_string()), *payment.id());
            }
            inner.payments.insert(*payment.id(), payment);
        }
        if let Some(payment) = set.payment_update {
            inner.payments.insert(*payment.id(), payment);
        }
        for (order, _) in set.order_updates {
            inner.orders.insert(*order.id(), order);
        }
        if let Some((customer, _)) = set.customer_update {
            inner.customers.insert(*customer.id(), customer);
        }
        inner
            .ledgers
            .entry(set.customer_id)
            .or_default()
            .extend(set.ledger_appends);
        inner.allocations.extend(set.new_allocations);
        if let Some(entry) = set.journal_append {
            inner.journal.push(entry);
        }

        Ok(())
    }
}

/// The read-only customer lookup exposed to collaborators outside the
/// engine (display/report layer). Lock poisoning degrades to "not found".
impl CustomerDirectory for InMemoryCreditStore {
    fn get_customer(&self, customer_id: CustomerId) -> Option<CustomerProfile> {
        let inner = self.inner.read().ok()?;
        inner.customers.get(&customer_id).map(|c| CustomerProfile {
            customer_id,
            credit_limit: c.credit_limit(),
            status: c.status(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use credit_core::{ExpectedVersion, LedgerEntryId};
    use credit_ledger::TransactionType;
    use credit_orders::OrderPriority;
    use credit_payments::PaymentMethod;

    fn seeded() -> (InMemoryCreditStore, CustomerId, OrderId) {
        let store = InMemoryCreditStore::new();
        let customer =
            Customer::register(CustomerId::new(), "Test Customer", 10_000, Utc::now()).unwrap();
        let customer_id = *customer.id();
        store.insert_customer(customer).unwrap();

        let order = CreditOrder::place(
            OrderId::new(),
            customer_id,
            OrderPriority::Normal,
            Utc::now(),
            500,
        )
        .unwrap();
        let order_id = *order.id();
        store.insert_order(order).unwrap();

        (store, customer_id, order_id)
    }

    fn credit_entry(customer_id: CustomerId, amount: u64, previous: i64) -> CustomerLedgerEntry {
        CustomerLedgerEntry::chained(
            LedgerEntryId::new(),
            customer_id,
            Utc::now(),
            TransactionType::Payment,
            0,
            amount,
            previous,
            "test entry",
            None,
        )
        .unwrap()
    }

    #[test]
    fn commit_rejects_stale_ledger_seq() {
        let (store, customer_id, _) = seeded();

        let mut first = CommitSet::for_customer(customer_id, 0);
        first.ledger_appends.push(credit_entry(customer_id, 100, 0));
        store.commit(first).unwrap();

        // Second commit staged against the pre-append snapshot.
        let mut stale = CommitSet::for_customer(customer_id, 0);
        stale.ledger_appends.push(credit_entry(customer_id, 50, 0));
        let err = store.commit(stale).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // The losing commit wrote nothing.
        assert_eq!(store.ledger_seq(customer_id).unwrap(), 1);
    }

    #[test]
    fn commit_rejects_stale_order_version() {
        let (store, customer_id, order_id) = seeded();

        let mut order = store.get_order(order_id).unwrap().unwrap();
        let snapshot_version = order.version();
        order.apply_payment(100, false).unwrap();

        let mut winner = CommitSet::for_customer(customer_id, 0);
        winner
            .order_updates
            .push((order.clone(), ExpectedVersion::Exact(snapshot_version)));
        winner.ledger_appends.push(credit_entry(customer_id, 100, 0));
        store.commit(winner).unwrap();

        // Loser carries the same stale expectation.
        let mut loser = CommitSet::for_customer(customer_id, 1);
        loser
            .order_updates
            .push((order, ExpectedVersion::Exact(snapshot_version)));
        let err = store.commit(loser).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn commit_rejects_duplicate_idempotency_key() {
        let (store, customer_id, _) = seeded();

        let payment = |key: &str| {
            CustomerPayment::receive(
                credit_core::PaymentId::new(),
                customer_id,
                100,
                PaymentMethod::Cash,
                Utc::now(),
                Some(key.to_string()),
            )
            .unwrap()
        };

        let mut first = CommitSet::for_customer(customer_id, 0);
        first.new_payment = Some(payment("key-1"));
        store.commit(first).unwrap();

        let mut dup = CommitSet::for_customer(customer_id, 0);
        dup.new_payment = Some(payment("key-1"));
        let err = store.commit(dup).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));

        assert!(store
            .find_payment_by_key(customer_id, "key-1")
            .unwrap()
            .is_some());
    }

    #[test]
    fn commit_rejects_broken_chain() {
        let (store, customer_id, _) = seeded();

        // Chained against a phantom previous balance of 999.
        let mut set = CommitSet::for_customer(customer_id, 0);
        set.ledger_appends.push(credit_entry(customer_id, 100, 999));
        let err = store.commit(set).unwrap_err();
        assert!(matches!(err, StoreError::InvalidCommit(_)));
        assert_eq!(store.ledger_seq(customer_id).unwrap(), 0);
    }

    #[test]
    fn directory_exposes_credit_facts() {
        let (store, customer_id, _) = seeded();

        let profile = CustomerDirectory::get_customer(&store, customer_id).unwrap();
        assert_eq!(profile.credit_limit, 10_000);
        assert!(profile.can_transact());
        assert!(store.is_credit_eligible(customer_id));
        assert!(!store.is_credit_eligible(CustomerId::new()));
    }

    #[test]
    fn balance_as_of_is_strictly_before() {
        let (store, customer_id, _) = seeded();

        let entry = credit_entry(customer_id, 100, 0);
        let entry_date = entry.transaction_date;
        let mut set = CommitSet::for_customer(customer_id, 0);
        set.ledger_appends.push(entry);
        store.commit(set).unwrap();

        assert_eq!(store.balance_as_of(customer_id, entry_date).unwrap(), 0);
        assert_eq!(
            store
                .balance_as_of(customer_id, entry_date + chrono::Duration::seconds(1))
                .unwrap(),
            -100
        );
    }
}
