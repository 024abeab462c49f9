//! Transactional storage boundary for the payment engine.
//!
//! This module defines an infrastructure-facing abstraction for reading
//! credit state and committing one payment's worth of row mutations
//! atomically, without making any storage assumptions.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryCreditStore;
pub use r#trait::{CommitSet, CreditStore, StoreError};
