//! Credit orders domain module.
//!
//! This crate contains business rules for credit orders and their balance
//! tracking, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod order;

pub use order::{allocation_order, CreditOrder, OrderPriority, OrderStatus};
