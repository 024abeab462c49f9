//! Customer directory collaborator contract.
//!
//! The engine never walks the customer table itself; it asks a directory for
//! the few facts payment recording needs. Storage backends implement this.

use credit_core::CustomerId;
use serde::{Deserialize, Serialize};

use crate::customer::CustomerStatus;

/// The slice of customer state the payment engine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: CustomerId,
    pub credit_limit: u64,
    pub status: CustomerStatus,
}

impl CustomerProfile {
    pub fn can_transact(&self) -> bool {
        self.status != CustomerStatus::Blacklisted
    }
}

/// Read-only lookup of customer credit facts.
pub trait CustomerDirectory: Send + Sync {
    fn get_customer(&self, customer_id: CustomerId) -> Option<CustomerProfile>;

    /// Whether new credit exposure is allowed for this customer.
    fn is_credit_eligible(&self, customer_id: CustomerId) -> bool {
        self.get_customer(customer_id)
            .map(|p| p.status == CustomerStatus::Active)
            .unwrap_or(false)
    }
}
