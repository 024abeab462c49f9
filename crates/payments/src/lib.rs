//! Payments domain module.
//!
//! Customer payments, their allocations to orders, and the pure waterfall
//! allocation policy. No IO, no HTTP, no storage.

pub mod allocation;
pub mod payment;

pub use allocation::{allocate, AllocationPlan, OpenOrder, PlannedAllocation};
pub use payment::{AllocationStatus, CustomerPayment, PaymentAllocation, PaymentMethod};
