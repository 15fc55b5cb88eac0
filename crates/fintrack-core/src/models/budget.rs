use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Yearly => "yearly",
        })
    }
}

impl FromStr for BudgetPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(BudgetPeriod::Weekly),
            "monthly" => Ok(BudgetPeriod::Monthly),
            "yearly" => Ok(BudgetPeriod::Yearly),
            other => Err(format!("unknown budget period: {}", other)),
        }
    }
}

/// A spending limit for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub period: BudgetPeriod,
    /// Spent so far in the current period, computed by the backend.
    #[serde(default)]
    pub spent: f64,
}

impl Budget {
    pub fn remaining(&self) -> f64 {
        self.amount - self.spent
    }

    /// Percentage of the budget used; zero for a zero budget.
    pub fn percent_used(&self) -> f64 {
        if self.amount <= 0.0 {
            0.0
        } else {
            self.spent / self.amount * 100.0
        }
    }

    pub fn is_over_budget(&self) -> bool {
        self.percent_used() > 100.0
    }
}

/// Fields submitted when creating or editing a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetDraft {
    pub category: String,
    pub amount: f64,
    pub period: BudgetPeriod,
}

impl BudgetDraft {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.category.trim().is_empty() {
            return Err(ApiError::Validation("Please fill in all required fields".to_string()));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ApiError::Validation("Amount must be greater than zero".to_string()));
        }
        Ok(())
    }
}

impl From<&Budget> for BudgetDraft {
    fn from(b: &Budget) -> Self {
        Self {
            category: b.category.clone(),
            amount: b.amount,
            period: b.period,
        }
    }
}
