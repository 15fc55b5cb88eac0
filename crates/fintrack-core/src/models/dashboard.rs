use serde::{Deserialize, Serialize};

use super::Transaction;

/// Balance summary shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub income: f64,
    #[serde(default)]
    pub expenses: f64,
    #[serde(default)]
    pub recent_transactions: Vec<Transaction>,
}

impl DashboardSummary {
    /// Share of income not spent, as a percentage. `None` without income.
    pub fn savings_rate(&self) -> Option<f64> {
        if self.income > 0.0 {
            Some((self.income - self.expenses) / self.income * 100.0)
        } else {
            None
        }
    }
}
