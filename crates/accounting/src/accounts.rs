//! Chart-of-accounts types and the resolution contract.
//!
//! The catalog itself is an external collaborator; the engine only needs to
//! resolve a handful of well-known roles and to check that journal lines
//! reference accounts that exist.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Account code as it appears in the chart (e.g. "1000").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountCode(pub String);

impl AccountCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AccountCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// High-level account kind (determines normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

/// Account identifier + metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub code: AccountCode,
    pub name: String, // e.g. "Cash"
    pub kind: AccountKind,
}

/// Well-known roles the payment engine books against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Cash,
    Bank,
    AccountsReceivable,
    CustomerAdvances,
    /// Write-offs, credit/debit notes and manual corrections.
    Adjustments,
}

/// Resolution of roles/codes against the chart of accounts.
pub trait ChartOfAccounts: Send + Sync {
    fn lookup(&self, code: &AccountCode) -> Option<Account>;

    fn resolve(&self, role: AccountRole) -> Option<Account>;

    fn account_exists(&self, code: &AccountCode) -> bool {
        self.lookup(code).is_some()
    }
}

/// Fixed in-memory chart, sufficient for the engine's bookings and tests.
#[derive(Debug, Clone)]
pub struct StaticChart {
    accounts: HashMap<AccountCode, Account>,
    roles: HashMap<AccountRole, AccountCode>,
}

impl StaticChart {
    /// The minimal chart the payment engine needs.
    pub fn standard() -> Self {
        let mut chart = Self {
            accounts: HashMap::new(),
            roles: HashMap::new(),
        };
        chart.insert(AccountRole::Cash, "1000", "Cash", AccountKind::Asset);
        chart.insert(AccountRole::Bank, "1010", "Bank", AccountKind::Asset);
        chart.insert(
            AccountRole::AccountsReceivable,
            "1200",
            "Accounts Receivable",
            AccountKind::Asset,
        );
        chart.insert(
            AccountRole::CustomerAdvances,
            "2300",
            "Customer Advances",
            AccountKind::Liability,
        );
        chart.insert(
            AccountRole::Adjustments,
            "4900",
            "Adjustments and Write-offs",
            AccountKind::Expense,
        );
        chart
    }

    fn insert(&mut self, role: AccountRole, code: &str, name: &str, kind: AccountKind) {
        let code = AccountCode::new(code);
        self.accounts.insert(
            code.clone(),
            Account {
                code: code.clone(),
                name: name.to_string(),
                kind,
            },
        );
        self.roles.insert(role, code);
    }
}

impl ChartOfAccounts for StaticChart {
    fn lookup(&self, code: &AccountCode) -> Option<Account> {
        self.accounts.get(code).cloned()
    }

    fn resolve(&self, role: AccountRole) -> Option<Account> {
        self.roles.get(&role).and_then(|code| self.lookup(code))
    }
}
