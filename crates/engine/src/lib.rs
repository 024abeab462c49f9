//! `credit-engine` — payment recording orchestration + storage.
//!
//! This crate composes the pure domain crates into the engine behind the
//! admin console: it validates a payment, runs the allocation policy, stages
//! order/ledger/journal mutations, and commits them as one atomic unit of
//! work through the [`store::CreditStore`] abstraction.

pub mod error;
pub mod queries;
pub mod recorder;
pub mod store;


pub use error::EngineError;
pub use recorder::{
    AdjustmentReceipt, AppliedAllocation, PaymentReceipt, PaymentRecorder, RecordPaymentRequest,
    RemainderPolicy, ReversalReceipt,
};
pub use store::{CommitSet, CreditStore, InMemoryCreditStore, StoreError};
