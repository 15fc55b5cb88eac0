//! Resource calls made through the session's gateway.

use std::sync::Arc;

use chrono::NaiveDate;
use fintrack_core::auth::{MemoryStore, TOKEN_KEY};
use fintrack_core::models::{
    BudgetDraft, BudgetPeriod, EntityId, PasswordChange, ProfileUpdate, TransactionDraft, TransactionFilter,
    TransactionKind,
};
use fintrack_core::{Config, CredentialStore, ErrorKind, FinanceApi, SessionManager, SubmitGuard};
use mockito::Matcher;

async fn signed_in(server: &mut mockito::ServerGuard) -> (SessionManager, FinanceApi) {
    let _login = server
        .mock("POST", "/auth/login")
        .with_status(200)
        .with_body(r#"{"user":{"id":1,"name":"Alice","currency":"USD"},"token":"tok1"}"#)
        .create_async()
        .await;

    let config = Config::with_api_url(server.url());
    let session = SessionManager::new(&config, Arc::new(MemoryStore::new())).unwrap();
    session.login("alice", "correct-pw").await.unwrap();
    let api = FinanceApi::new(session.gateway().clone(), config.endpoints.clone());
    (session, api)
}

fn coffee() -> TransactionDraft {
    TransactionDraft {
        kind: TransactionKind::Expense,
        amount: 4.5,
        description: "Coffee".to_string(),
        category: "Food & Dining".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    }
}

#[tokio::test]
async fn rapid_identical_creates_are_not_deduplicated() {
    let mut server = mockito::Server::new_async().await;
    let (_session, api) = signed_in(&mut server).await;
    let create = server
        .mock("POST", "/transactions")
        .match_header("authorization", "Bearer tok1")
        .match_body(Matcher::PartialJson(serde_json::json!({"type": "expense", "amount": 4.5})))
        .with_status(201)
        .with_body(r#"{"_id":"t-new","type":"expense","amount":4.5,"description":"Coffee","category":"Food & Dining","date":"2024-03-01"}"#)
        .expect(2)
        .create_async()
        .await;

    let draft = coffee();
    let (first, second) =
        futures::future::join(api.create_transaction(&draft), api.create_transaction(&draft)).await;
    assert!(first.is_ok());
    assert!(second.is_ok());
    create.assert_async().await;
}

#[tokio::test]
async fn submit_guard_blocks_duplicate_while_pending() {
    let mut server = mockito::Server::new_async().await;
    let (_session, api) = signed_in(&mut server).await;
    let create = server
        .mock("POST", "/transactions")
        .with_status(201)
        .with_body(r#"{"_id":"t1","type":"expense","amount":4.5,"date":"2024-03-01"}"#)
        .expect(1)
        .create_async()
        .await;

    let guard = SubmitGuard::new();
    let draft = coffee();
    let (first, second) = futures::future::join(
        guard.run(api.create_transaction(&draft)),
        guard.run(api.create_transaction(&draft)),
    )
    .await;

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err().kind(), ErrorKind::Validation);
    create.assert_async().await;
}

#[tokio::test]
async fn transaction_list_sends_filter_as_query() {
    let mut server = mockito::Server::new_async().await;
    let (_session, api) = signed_in(&mut server).await;
    let list = server
        .mock("GET", "/transactions")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("type".into(), "income".into()),
            Matcher::UrlEncoded("startDate".into(), "2024-01-01".into()),
        ]))
        .with_status(200)
        .with_body(r#"[{"_id":"t1","type":"income","amount":2000,"description":"Pay","category":"Salary","date":"2024-01-31T00:00:00.000Z"}]"#)
        .create_async()
        .await;

    let filter = TransactionFilter {
        kind: Some(TransactionKind::Income),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        ..Default::default()
    };
    let transactions = api.list_transactions(&filter).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].id, "t1");
    assert!(filter.matches(&transactions[0]));
    list.assert_async().await;
}

#[tokio::test]
async fn invalid_draft_never_hits_network() {
    let mut server = mockito::Server::new_async().await;
    let (_session, api) = signed_in(&mut server).await;
    let create = server
        .mock("POST", "/budgets")
        .expect(0)
        .create_async()
        .await;

    let draft = BudgetDraft {
        category: String::new(),
        amount: 100.0,
        period: BudgetPeriod::Monthly,
    };
    let err = api.create_budget(&draft).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    create.assert_async().await;
}

#[tokio::test]
async fn delete_accepts_empty_body() {
    let mut server = mockito::Server::new_async().await;
    let (_session, api) = signed_in(&mut server).await;
    let delete = server
        .mock("DELETE", "/budgets/b1")
        .with_status(204)
        .create_async()
        .await;

    api.delete_budget(&EntityId::from("b1")).await.unwrap();
    delete.assert_async().await;
}

#[tokio::test]
async fn profile_update_flows_into_session() {
    let mut server = mockito::Server::new_async().await;
    let (session, api) = signed_in(&mut server).await;
    let _update = server
        .mock("PUT", "/auth/profile")
        .match_body(Matcher::Json(serde_json::json!({
            "name": "Alice L",
            "email": "alice@example.com",
            "currency": "EUR"
        })))
        .with_status(200)
        .with_body(r#"{"id":1,"name":"Alice L","email":"alice@example.com","currency":"EUR"}"#)
        .create_async()
        .await;

    let mut update = ProfileUpdate::from_profile(&session.current_user().unwrap());
    update.name = "Alice L".to_string();
    update.email = "alice@example.com".to_string();
    update.currency = "EUR".to_string();

    let confirmed = api.update_profile(&update).await.unwrap();
    session.update_user(confirmed);

    let user = session.current_user().unwrap();
    assert_eq!(user.currency, "EUR");
    assert_eq!(user.name.as_deref(), Some("Alice L"));
}

#[tokio::test]
async fn password_change_sends_only_current_and_new() {
    let mut server = mockito::Server::new_async().await;
    let (session, api) = signed_in(&mut server).await;
    let change = server
        .mock("PUT", "/auth/password")
        .match_header("authorization", "Bearer tok1")
        .match_body(Matcher::Json(serde_json::json!({
            "currentPassword": "correct-pw",
            "newPassword": "longer-secret"
        })))
        .with_status(200)
        .with_body(r#"{"message":"Password updated"}"#)
        .create_async()
        .await;

    let request = PasswordChange {
        current_password: "correct-pw".to_string(),
        new_password: "longer-secret".to_string(),
        confirm_password: "longer-secret".to_string(),
    };
    api.change_password(&request).await.unwrap();
    assert!(session.is_authenticated());
    change.assert_async().await;
}

#[tokio::test]
async fn expired_session_on_resource_call_logs_out() {
    let mut server = mockito::Server::new_async().await;
    let store = Arc::new(MemoryStore::new());
    store.set(TOKEN_KEY, "tok1").unwrap();
    let _me = server
        .mock("GET", "/auth/me")
        .with_status(200)
        .with_body(r#"{"id":1}"#)
        .create_async()
        .await;
    let _dashboard = server
        .mock("GET", "/dashboard")
        .with_status(403)
        .create_async()
        .await;

    let config = Config::with_api_url(server.url());
    let session = SessionManager::new(&config, store.clone()).unwrap();
    session.bootstrap().await;
    assert!(session.is_authenticated());

    let api = FinanceApi::new(session.gateway().clone(), config.endpoints.clone());
    let err = api.dashboard().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert!(!session.is_authenticated());
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}
