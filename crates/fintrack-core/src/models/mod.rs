//! Data models for FinTrack entities.
//!
//! - `UserProfile` and the account forms (`RegistrationForm`, `PasswordChange`, `ProfileUpdate`)
//! - `Transaction`, `TransactionDraft`, `TransactionFilter`
//! - `Budget`, `BudgetDraft`
//! - `DashboardSummary`
//!
//! Drafts and forms validate locally and report `ApiError::Validation` before
//! anything is sent.

pub mod budget;
pub mod dashboard;
pub mod transaction;
pub mod user;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use budget::{Budget, BudgetDraft, BudgetPeriod};
pub use dashboard::DashboardSummary;
pub use transaction::{Transaction, TransactionDraft, TransactionFilter, TransactionKind};
pub use user::{PasswordChange, ProfileUpdate, RegistrationForm, UserProfile};

/// Record identifier. One backend uses numeric ids, the other document ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl PartialEq<i64> for EntityId {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, EntityId::Number(n) if n == other)
    }
}

impl PartialEq<&str> for EntityId {
    fn eq(&self, other: &&str) -> bool {
        match self {
            EntityId::Text(s) => s == other,
            EntityId::Number(n) => n.to_string() == *other,
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Number(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}
