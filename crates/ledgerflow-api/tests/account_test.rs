//! Integration tests for the account endpoints.

mod common;

use axum::Router;
use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

async fn open_account(app: &Router, account_id: Uuid) {
    let (status, _) = common::post_json(
        app.clone(),
        "/api/v1/accounts",
        &json!({ "account_id": account_id, "currency": "EUR" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn move_money(app: &Router, action: &str, account_id: Uuid, amount: i64) -> StatusCode {
    let (status, _) = common::post_json(
        app.clone(),
        &format!("/api/v1/accounts/{action}"),
        &json!({ "account_id": account_id, "amount": amount, "currency": "EUR" }),
    )
    .await;
    status
}

#[tokio::test]
async fn test_new_account_is_active_with_zero_balance() {
    // Arrange
    let app = common::build_test_app();
    let account_id = Uuid::new_v4();

    // Act
    open_account(&app, account_id).await;
    let (status, json) = common::get_json(app, &format!("/api/v1/accounts/{account_id}")).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["currency"], "EUR");
    assert_eq!(json["balance"], 0);
    assert_eq!(json["debt_limit"], 500);
    assert_eq!(json["state"], "active");
    assert_eq!(json["version"], 1);
}

#[tokio::test]
async fn test_withdrawal_past_debt_limit_is_refused() {
    // Arrange
    let app = common::build_test_app();
    let account_id = Uuid::new_v4();
    open_account(&app, account_id).await;

    // Act
    let (status, json) = common::post_json(
        app.clone(),
        "/api/v1/accounts/withdraw-money",
        &json!({ "account_id": account_id, "amount": 600, "currency": "EUR" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "negative_balance");
    let (_, events) =
        common::get_json(app, &format!("/api/v1/accounts/{account_id}/events")).await;
    assert_eq!(events.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_self_blocking_withdrawal_blocks_later_operations() {
    // Arrange
    let app = common::build_test_app();
    let account_id = Uuid::new_v4();
    open_account(&app, account_id).await;
    assert_eq!(move_money(&app, "add-money", account_id, 100).await, StatusCode::OK);

    // Act
    let status = move_money(&app, "withdraw-money", account_id, 200).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    let (_, events) =
        common::get_json(app.clone(), &format!("/api/v1/accounts/{account_id}/events")).await;
    let types: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec![
            "account.account_created",
            "account.money_added",
            "account.money_withdrawn",
            "account.account_blocked",
        ]
    );

    let (_, view) = common::get_json(app.clone(), &format!("/api/v1/accounts/{account_id}")).await;
    assert_eq!(view["balance"], -100);
    assert_eq!(view["state"], "blocked");

    let (status, json) = common::post_json(
        app,
        "/api/v1/accounts/add-money",
        &json!({ "account_id": account_id, "amount": 10, "currency": "EUR" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "account_blocked");
}

#[tokio::test]
async fn test_explicit_block_is_recorded_with_cause() {
    let app = common::build_test_app();
    let account_id = Uuid::new_v4();
    open_account(&app, account_id).await;

    let (status, json) = common::post_json(
        app.clone(),
        "/api/v1/accounts/block",
        &json!({ "account_id": account_id, "cause": "fraud review" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["account_id"], account_id.to_string());
    let (_, events) =
        common::get_json(app, &format!("/api/v1/accounts/{account_id}/events")).await;
    assert_eq!(events[1]["event_type"], "account.account_blocked");
    assert_eq!(events[1]["payload"]["cause"], "fraud review");
    assert_eq!(events[1]["correlation_id"], json["correlation_id"]);
}

#[tokio::test]
async fn test_currency_mismatch_returns_400() {
    let app = common::build_test_app();
    let account_id = Uuid::new_v4();
    open_account(&app, account_id).await;

    let (status, json) = common::post_json(
        app,
        "/api/v1/accounts/add-money",
        &json!({ "account_id": account_id, "amount": 10, "currency": "USD" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_opening_an_account_twice_returns_409() {
    let app = common::build_test_app();
    let account_id = Uuid::new_v4();
    open_account(&app, account_id).await;

    let (status, json) = common::post_json(
        app,
        "/api/v1/accounts",
        &json!({ "account_id": account_id, "currency": "EUR" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "concurrency_conflict");
}

#[tokio::test]
async fn test_unknown_account_returns_404() {
    let app = common::build_test_app();
    let account_id = Uuid::new_v4();

    let (status, json) = common::get_json(app.clone(), &format!("/api/v1/accounts/{account_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "aggregate_not_found");

    let (status, _) =
        common::get_json(app, &format!("/api/v1/accounts/{account_id}/events")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_accounts_reflects_published_events() {
    // Arrange
    let app = common::build_test_app();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    open_account(&app, first).await;
    open_account(&app, second).await;
    assert_eq!(move_money(&app, "add-money", second, 250).await, StatusCode::OK);

    // Act
    let (status, json) = common::get_json(app, "/api/v1/accounts").await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    let summaries = json.as_array().unwrap();
    assert_eq!(summaries.len(), 2);
    let funded = summaries
        .iter()
        .find(|s| s["account_id"] == second.to_string())
        .unwrap();
    assert_eq!(funded["balance"], 250);
    assert_eq!(funded["last_sequence_number"], 2);
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn test_account_lifecycle_against_postgres(pool: PgPool) {
    let app = common::build_pg_test_app(pool);
    let account_id = Uuid::new_v4();
    open_account(&app, account_id).await;
    assert_eq!(move_money(&app, "add-money", account_id, 100).await, StatusCode::OK);
    assert_eq!(
        move_money(&app, "withdraw-money", account_id, 700).await,
        StatusCode::UNPROCESSABLE_ENTITY
    );

    let (status, view) = common::get_json(app, &format!("/api/v1/accounts/{account_id}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["balance"], 100);
    assert_eq!(view["version"], 2);
}
