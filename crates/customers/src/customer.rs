use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credit_core::{CustomerId, DomainError, DomainResult, Entity};

/// Customer status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Active,
    Inactive,
    Blacklisted,
}

/// Contact information for a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Entity: Customer (credit account holder).
///
/// `current_balance` is a materialized cache of the customer's ledger tail:
/// it must always equal the `balance_after` of the latest ledger entry. The
/// engine recomputes it from the ledger on every payment and never applies
/// ad hoc increments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    name: String,
    contact: ContactInfo,
    status: CustomerStatus,
    /// Credit ceiling in smallest currency unit.
    credit_limit: u64,
    /// Amount owed in smallest currency unit; negative when the customer is
    /// in credit (a held advance).
    current_balance: i64,
    registered_at: DateTime<Utc>,
    /// Bumped on every in-place mutation; checked at commit time.
    version: u64,
}

impl Customer {
    pub fn register(
        id: CustomerId,
        name: impl Into<String>,
        credit_limit: u64,
        registered_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("customer name must not be empty"));
        }

        Ok(Self {
            id,
            name,
            contact: ContactInfo::default(),
            status: CustomerStatus::Active,
            credit_limit,
            current_balance: 0,
            registered_at,
            version: 1,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn status(&self) -> CustomerStatus {
        self.status
    }

    pub fn credit_limit(&self) -> u64 {
        self.credit_limit
    }

    pub fn current_balance(&self) -> i64 {
        self.current_balance
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Invariant helper: whether this customer may transact at all.
    ///
    /// Blacklisted customers cannot transact.
    pub fn can_transact(&self) -> bool {
        self.status != CustomerStatus::Blacklisted
    }

    /// Whether new credit exposure (advances, unapplied remainders) is allowed.
    pub fn is_credit_eligible(&self) -> bool {
        self.status == CustomerStatus::Active
    }

    /// Remaining headroom under the credit limit (0 when over the limit).
    pub fn credit_available(&self) -> u64 {
        let limit = self.credit_limit as i128;
        let balance = self.current_balance as i128;
        u64::try_from((limit - balance).max(0)).unwrap_or(u64::MAX)
    }

    pub fn set_contact(&mut self, contact: ContactInfo) {
        self.contact = contact;
        self.version += 1;
    }

    pub fn set_status(&mut self, status: CustomerStatus) {
        self.status = status;
        self.version += 1;
    }

    /// Replace the materialized running balance with a freshly chained one.
    ///
    /// Only the engine calls this, with a balance derived from the ledger tail
    /// inside the same unit of work that appended the entries.
    pub fn set_current_balance(&mut self, balance: i64) {
        self.current_balance = balance;
        self.version += 1;
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
