use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credit_core::{DomainError, DomainResult, JournalEntryId};

use crate::accounts::{AccountCode, ChartOfAccounts};

/// One side of a journal entry (immutable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLine {
    pub account: AccountCode,
    /// Positive amount in smallest unit (e.g., cents).
    pub amount: u64,
    /// true = debit, false = credit.
    pub is_debit: bool,
}

impl TransactionLine {
    pub fn debit(account: AccountCode, amount: u64) -> Self {
        Self {
            account,
            amount,
            is_debit: true,
        }
    }

    pub fn credit(account: AccountCode, amount: u64) -> Self {
        Self {
            account,
            amount,
            is_debit: false,
        }
    }
}

/// A balanced double-entry journal entry.
///
/// All lines of one entry are persisted together or not at all; the entry is
/// immutable once posted. There is no rounding tolerance: debits must equal
/// credits to the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub date: DateTime<Utc>,
    pub description: String,
    pub lines: Vec<TransactionLine>,
}

impl JournalEntry {
    /// Validate and assemble a journal entry.
    ///
    /// Rejects entries with fewer than two lines, non-positive line amounts,
    /// lines against accounts missing from the chart, and unbalanced totals.
    pub fn post<C>(
        chart: &C,
        id: JournalEntryId,
        date: DateTime<Utc>,
        description: impl Into<String>,
        lines: Vec<TransactionLine>,
    ) -> DomainResult<Self>
    where
        C: ChartOfAccounts + ?Sized,
    {
        if lines.len() < 2 {
            return Err(DomainError::validation(
                "journal entry must have at least two lines",
            ));
        }

        let mut debit_total: i128 = 0;
        let mut credit_total: i128 = 0;

        for line in &lines {
            if line.amount == 0 {
                return Err(DomainError::validation("line amount must be positive"));
            }
            if !chart.account_exists(&line.account) {
                return Err(DomainError::validation(format!(
                    "unknown account: {}",
                    line.account
                )));
            }
            if line.is_debit {
                debit_total += line.amount as i128;
            } else {
                credit_total += line.amount as i128;
            }
        }

        if debit_total != credit_total {
            return Err(DomainError::invariant(format!(
                "debits must equal credits (debit {debit_total}, credit {credit_total})"
            )));
        }

        Ok(Self {
            id,
            date,
            description: description.into(),
            lines,
        })
    }

    pub fn debit_total(&self) -> u128 {
        self.lines
            .iter()
            .filter(|l| l.is_debit)
            .map(|l| l.amount as u128)
            .sum()
    }

    pub fn credit_total(&self) -> u128 {
        self.lines
            .iter()
            .filter(|l| !l.is_debit)
            .map(|l| l.amount as u128)
            .sum()
    }

    /// A reversed copy of this entry: every debit becomes a credit and vice
    /// versa. Used by the payment reversal flow (offsetting, never in-place).
    pub fn reversed(&self, id: JournalEntryId, date: DateTime<Utc>) -> Self {
        Self {
            id,
            date,
            description: format!("reversal of {}", self.id),
            lines: self
                .lines
                .iter()
                .map(|l| TransactionLine {
                    account: l.account.clone(),
                    amount: l.amount,
                    is_debit: !l.is_debit,
                })
                .collect(),
        }
    }
}
