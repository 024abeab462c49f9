use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credit_core::{CustomerId, DomainError, DomainResult, LedgerEntryId, OrderId};

/// Kind of movement recorded against a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Invoice,
    Payment,
    AdvancePayment,
    Adjustment,
    CreditNote,
    DebitNote,
}

/// One immutable row of a customer's ledger.
///
/// Entries are append-only; corrections are new offsetting entries, never
/// in-place edits. `balance_after` for entry *n* equals `balance_after` of
/// entry *n−1* (ordered by `transaction_date`, then id) plus debit minus
/// credit; the first entry's predecessor balance is 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerLedgerEntry {
    pub id: LedgerEntryId,
    pub customer_id: CustomerId,
    pub transaction_date: DateTime<Utc>,
    pub transaction_type: TransactionType,
    /// Exactly one of `debit_amount`/`credit_amount` is positive.
    pub debit_amount: u64,
    pub credit_amount: u64,
    /// Running balance snapshot; negative means the customer is in credit.
    pub balance_after: i64,
    pub description: String,
    /// The order this movement settles or funds, when there is one.
    pub order_ref: Option<OrderId>,
}

impl CustomerLedgerEntry {
    /// Build an entry chained onto `previous_balance`.
    ///
    /// This is the only constructor; it enforces the single-sided-amount rule
    /// and computes `balance_after` so callers cannot desynchronize the chain.
    #[allow(clippy::too_many_arguments)]
    pub fn chained(
        id: LedgerEntryId,
        customer_id: CustomerId,
        transaction_date: DateTime<Utc>,
        transaction_type: TransactionType,
        debit_amount: u64,
        credit_amount: u64,
        previous_balance: i64,
        description: impl Into<String>,
        order_ref: Option<OrderId>,
    ) -> DomainResult<Self> {
        if (debit_amount == 0) == (credit_amount == 0) {
            return Err(DomainError::validation(
                "exactly one of debit/credit must be positive",
            ));
        }

        let balance_after = chain_balance(previous_balance, debit_amount, credit_amount)?;

        Ok(Self {
            id,
            customer_id,
            transaction_date,
            transaction_type,
            debit_amount,
            credit_amount,
            balance_after,
            description: description.into(),
            order_ref,
        })
    }

}

/// Chain one movement onto a running balance, checked.
pub fn chain_balance(previous: i64, debit: u64, credit: u64) -> DomainResult<i64> {
    let next = previous as i128 + debit as i128 - credit as i128;
    i64::try_from(next).map_err(|_| DomainError::invariant("running balance overflow"))
}

/// Recompute the running balance by replaying `entries` from a zero
/// predecessor, in the order given.
pub fn replay_balance(entries: &[CustomerLedgerEntry]) -> DomainResult<i64> {
    let mut balance = 0i64;
    for entry in entries {
        balance = chain_balance(balance, entry.debit_amount, entry.credit_amount)?;
    }
    Ok(balance)
}

/// Verify that every stored `balance_after` matches a fresh replay.
///
/// Used as the consistency check before trusting a materialized balance.
pub fn verify_chain(entries: &[CustomerLedgerEntry]) -> DomainResult<()> {
    let mut balance = 0i64;
    for entry in entries {
        balance = chain_balance(balance, entry.debit_amount, entry.credit_amount)?;
        if entry.balance_after != balance {
            return Err(DomainError::invariant(format!(
                "ledger chain broken at entry {}: stored {}, replayed {}",
                entry.id, entry.balance_after, balance
            )));
        }
    }
    Ok(())
}

/// Read-side view of a ledger slice: opening balance, entries in range,
/// closing balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStatement {
    pub customer_id: CustomerId,
    pub opening_balance: i64,
    pub entries: Vec<CustomerLedgerEntry>,
    pub closing_balance: i64,
}
