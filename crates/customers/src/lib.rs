//! Customers domain module.
//!
//! This crate contains business rules for credit customers, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod customer;
pub mod directory;

pub use customer::{ContactInfo, Customer, CustomerStatus};
pub use directory::{CustomerDirectory, CustomerProfile};
