//! Customer ledger domain module (append-only running balance).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns. The
//! engine crate owns where entries live; this crate owns what a valid chain
//! of entries looks like.

pub mod entry;

pub use entry::{
    chain_balance, replay_balance, verify_chain, CustomerLedgerEntry, LedgerStatement,
    TransactionType,
};
