use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::api::ApiError;

const EXPENSE_CATEGORIES: &[&str] = &[
    "Food & Dining",
    "Transportation",
    "Housing",
    "Utilities",
    "Entertainment",
    "Shopping",
    "Health & Fitness",
    "Education",
    "Personal Care",
    "Travel",
    "Gifts & Donations",
    "Other",
];

const INCOME_CATEGORIES: &[&str] = &[
    "Salary",
    "Freelance",
    "Investments",
    "Gifts",
    "Refunds",
    "Rental Income",
    "Side Business",
    "Other",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    /// Categories offered when entering a transaction of this kind.
    pub fn suggested_categories(&self) -> &'static [&'static str] {
        match self {
            TransactionKind::Income => INCOME_CATEGORIES,
            TransactionKind::Expense => EXPENSE_CATEGORIES,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

/// A recorded income or expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(alias = "_id")]
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// ISO date or timestamp, as sent by the backend.
    pub date: String,
}

impl Transaction {
    /// Calendar date of the transaction, if the backend value parses.
    pub fn date(&self) -> Option<NaiveDate> {
        let day: String = self.date.chars().take(10).collect();
        NaiveDate::parse_from_str(&day, "%Y-%m-%d").ok()
    }

    /// Amount with expenses negative.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}

/// Fields submitted when creating or editing a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
}

impl TransactionDraft {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ApiError::Validation("Amount must be greater than zero".to_string()));
        }
        if self.description.trim().is_empty() || self.category.trim().is_empty() {
            return Err(ApiError::Validation("Please fill in all required fields".to_string()));
        }
        Ok(())
    }
}

impl From<&Transaction> for TransactionDraft {
    fn from(t: &Transaction) -> Self {
        Self {
            kind: t.kind,
            amount: t.amount,
            description: t.description.clone(),
            category: t.category.clone(),
            date: t.date().unwrap_or_else(|| chrono::Utc::now().date_naive()),
        }
    }
}

/// List filter. Sent as query parameters and also usable on an already fetched list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// `None` means all kinds.
    pub kind: Option<TransactionKind>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<String>,
}

impl TransactionFilter {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(kind) = self.kind {
            query.push(("type", kind.as_str().to_string()));
        }
        if let Some(start) = self.start_date {
            query.push(("startDate", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            query.push(("endDate", end.format("%Y-%m-%d").to_string()));
        }
        if let Some(category) = self.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            query.push(("category", category.to_string()));
        }
        query
    }

    /// Date bounds are inclusive; category matching ignores case.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(kind) = self.kind {
            if transaction.kind != kind {
                return false;
            }
        }
        if self.start_date.is_some() || self.end_date.is_some() {
            let Some(date) = transaction.date() else {
                return false;
            };
            if self.start_date.is_some_and(|start| date < start) {
                return false;
            }
            if self.end_date.is_some_and(|end| date > end) {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            if !transaction.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, transactions: &'a [Transaction]) -> Vec<&'a Transaction> {
        transactions.iter().filter(|t| self.matches(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: i64, kind: TransactionKind, category: &str, date: &str) -> Transaction {
        Transaction {
            id: EntityId::Number(id),
            kind,
            amount: 10.0,
            description: "test".to_string(),
            category: category.to_string(),
            date: date.to_string(),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_backend_transaction() {
        let json = r#"{"_id":"t1","type":"expense","amount":12.5,"description":"Lunch","category":"Food & Dining","date":"2024-03-05T00:00:00.000Z"}"#;
        let t: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(t.id, "t1");
        assert_eq!(t.kind, TransactionKind::Expense);
        assert_eq!(t.date(), Some(day("2024-03-05")));
        assert_eq!(t.signed_amount(), -12.5);
    }

    #[test]
    fn test_empty_filter_sends_nothing() {
        assert!(TransactionFilter::default().to_query().is_empty());

        let blank_category = TransactionFilter {
            category: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank_category.to_query().is_empty());
    }

    #[test]
    fn test_filter_query() {
        let filter = TransactionFilter {
            kind: Some(TransactionKind::Income),
            start_date: Some(day("2024-01-01")),
            end_date: Some(day("2024-01-31")),
            category: Some("Salary".to_string()),
        };
        assert_eq!(
            filter.to_query(),
            vec![
                ("type", "income".to_string()),
                ("startDate", "2024-01-01".to_string()),
                ("endDate", "2024-01-31".to_string()),
                ("category", "Salary".to_string()),
            ]
        );
    }

    #[test]
    fn test_filter_matches_client_side() {
        let list = vec![
            tx(1, TransactionKind::Expense, "Travel", "2024-01-10"),
            tx(2, TransactionKind::Income, "Salary", "2024-01-31"),
            tx(3, TransactionKind::Expense, "travel", "2024-02-01"),
            tx(4, TransactionKind::Expense, "Travel", "garbage"),
        ];

        let filter = TransactionFilter {
            kind: Some(TransactionKind::Expense),
            end_date: Some(day("2024-01-31")),
            category: Some("TRAVEL".to_string()),
            ..Default::default()
        };
        let ids: Vec<String> = filter.apply(&list).iter().map(|t| t.id.to_string()).collect();
        assert_eq!(ids, vec!["1"]);

        let by_category = TransactionFilter {
            category: Some("travel".to_string()),
            ..Default::default()
        };
        assert_eq!(by_category.apply(&list).len(), 3);
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = TransactionDraft {
            kind: TransactionKind::Expense,
            amount: 4.5,
            description: "Coffee".to_string(),
            category: "Food & Dining".to_string(),
            date: day("2024-03-01"),
        };
        assert!(draft.validate().is_ok());

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["type"], "expense");
        assert_eq!(json["date"], "2024-03-01");

        draft.amount = 0.0;
        assert!(draft.validate().is_err());
        draft.amount = 4.5;
        draft.category.clear();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Income".parse::<TransactionKind>(), Ok(TransactionKind::Income));
        assert!("transfer".parse::<TransactionKind>().is_err());
        assert!(TransactionKind::Expense.suggested_categories().contains(&"Housing"));
    }
}
