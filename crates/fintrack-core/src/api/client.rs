//! Typed client for the finance resources: transactions, budgets, dashboard
//! and the signed-in user's profile.
//!
//! All calls go through the [`Gateway`]; this module only knows paths and shapes.

use tracing::{debug, info};

use crate::config::Endpoints;
use crate::models::{
    Budget, BudgetDraft, DashboardSummary, EntityId, PasswordChange, ProfileUpdate, Transaction,
    TransactionDraft, TransactionFilter, UserProfile,
};

use super::{ApiError, ApiRequest, Gateway};

/// Clone is cheap - the gateway shares its connection pool.
#[derive(Clone)]
pub struct FinanceApi {
    gateway: Gateway,
    endpoints: Endpoints,
}

impl FinanceApi {
    pub fn new(gateway: Gateway, endpoints: Endpoints) -> Self {
        Self { gateway, endpoints }
    }

    fn item_path(base: &str, id: &EntityId) -> String {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            urlencoding::encode(&id.to_string())
        )
    }

    // ===== Transactions =====

    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, ApiError> {
        let request = ApiRequest::get(&self.endpoints.transactions).query(filter.to_query());
        let transactions: Vec<Transaction> = self.gateway.send(request).await?;
        debug!(count = transactions.len(), "Fetched transactions");
        Ok(transactions)
    }

    pub async fn get_transaction(&self, id: &EntityId) -> Result<Transaction, ApiError> {
        self.gateway
            .get(&Self::item_path(&self.endpoints.transactions, id))
            .await
    }

    /// Not idempotent: every call creates a new record.
    pub async fn create_transaction(
        &self,
        draft: &TransactionDraft,
    ) -> Result<Transaction, ApiError> {
        draft.validate()?;
        let created: Transaction = self.gateway.post(&self.endpoints.transactions, draft).await?;
        info!(id = %created.id, "Transaction created");
        Ok(created)
    }

    pub async fn update_transaction(
        &self,
        id: &EntityId,
        draft: &TransactionDraft,
    ) -> Result<Transaction, ApiError> {
        draft.validate()?;
        self.gateway
            .put(&Self::item_path(&self.endpoints.transactions, id), draft)
            .await
    }

    pub async fn delete_transaction(&self, id: &EntityId) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .gateway
            .delete(&Self::item_path(&self.endpoints.transactions, id))
            .await?;
        info!(id = %id, "Transaction deleted");
        Ok(())
    }

    // ===== Budgets =====

    pub async fn list_budgets(&self) -> Result<Vec<Budget>, ApiError> {
        self.gateway.get(&self.endpoints.budgets).await
    }

    pub async fn get_budget(&self, id: &EntityId) -> Result<Budget, ApiError> {
        self.gateway
            .get(&Self::item_path(&self.endpoints.budgets, id))
            .await
    }

    pub async fn create_budget(&self, draft: &BudgetDraft) -> Result<Budget, ApiError> {
        draft.validate()?;
        let created: Budget = self.gateway.post(&self.endpoints.budgets, draft).await?;
        info!(id = %created.id, "Budget created");
        Ok(created)
    }

    pub async fn update_budget(&self, id: &EntityId, draft: &BudgetDraft) -> Result<Budget, ApiError> {
        draft.validate()?;
        self.gateway
            .put(&Self::item_path(&self.endpoints.budgets, id), draft)
            .await
    }

    pub async fn delete_budget(&self, id: &EntityId) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .gateway
            .delete(&Self::item_path(&self.endpoints.budgets, id))
            .await?;
        info!(id = %id, "Budget deleted");
        Ok(())
    }

    // ===== Dashboard =====

    pub async fn dashboard(&self) -> Result<DashboardSummary, ApiError> {
        self.gateway.get(&self.endpoints.dashboard).await
    }

    // ===== Profile =====

    /// Returns the server-confirmed profile. Pass it to
    /// `SessionManager::update_user` to refresh the session.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        update.validate()?;
        self.gateway.put(&self.endpoints.profile, update).await
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        change.validate()?;
        let _: serde_json::Value = self
            .gateway
            .put(&self.endpoints.password, &change.payload())
            .await?;
        info!("Password changed");
        Ok(())
    }
}
