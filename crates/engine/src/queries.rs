//! Read-side queries over the credit store.
//!
//! Pure reads: no query here ever writes, so repeating one is always safe.

use chrono::{DateTime, Utc};

use credit_core::CustomerId;
use credit_ledger::LedgerStatement;
use credit_orders::{allocation_order, CreditOrder};

use crate::error::EngineError;
use crate::store::CreditStore;

/// Orders still awaiting shipment that can absorb advance payments,
/// in allocation order.
pub fn open_orders_for_advance<S: CreditStore>(
    store: &S,
    customer_id: CustomerId,
) -> Result<Vec<CreditOrder>, EngineError> {
    let mut orders: Vec<CreditOrder> = store
        .open_orders(customer_id)?
        .into_iter()
        .filter(|o| o.status().is_advance_eligible())
        .collect();
    orders.sort_by(allocation_order);
    Ok(orders)
}

/// Shipped or delivered orders with an unpaid balance, in allocation order.
pub fn outstanding_orders<S: CreditStore>(
    store: &S,
    customer_id: CustomerId,
) -> Result<Vec<CreditOrder>, EngineError> {
    let mut orders: Vec<CreditOrder> = store
        .open_orders(customer_id)?
        .into_iter()
        .filter(|o| o.status().is_outstanding_eligible())
        .collect();
    orders.sort_by(allocation_order);
    Ok(orders)
}

/// Ledger statement over `[from, to)`: opening balance carried forward from
/// everything strictly before `from`, entries inside the window, and the
/// closing balance read off the last entry's running balance.
pub fn ledger_statement<S: CreditStore>(
    store: &S,
    customer_id: CustomerId,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<LedgerStatement, EngineError> {
    if to < from {
        return Err(EngineError::Validation(
            "statement window end precedes its start".to_string(),
        ));
    }

    let opening_balance = store.balance_as_of(customer_id, from)?;
    let entries: Vec<_> = store
        .ledger_entries(customer_id)?
        .into_iter()
        .filter(|e| e.transaction_date >= from && e.transaction_date < to)
        .collect();
    let closing_balance = entries
        .last()
        .map(|e| e.balance_after)
        .unwrap_or(opening_balance);

    Ok(LedgerStatement {
        customer_id,
        opening_balance,
        entries,
        closing_balance,
    })
}
