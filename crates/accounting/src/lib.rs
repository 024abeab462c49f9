//! Accounting module (double-entry journal).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod accounts;
pub mod journal;

pub use accounts::{Account, AccountCode, AccountKind, AccountRole, ChartOfAccounts, StaticChart};
pub use journal::{JournalEntry, TransactionLine};
