//! Routes for the Account bounded context.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use ledgerflow_account::application::query_handlers::{self, AccountEventView, AccountView};
use ledgerflow_account::application::subscribers::AccountSummary;
use ledgerflow_account::domain::commands;
use ledgerflow_core::command::Command;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /api/v1/accounts.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Identifier of the new account.
    pub account_id: Uuid,
    /// Three-letter currency code.
    pub currency: String,
}

/// Request body for POST /add-money and /withdraw-money.
#[derive(Debug, Deserialize)]
pub struct MoneyRequest {
    /// The account to move money on.
    pub account_id: Uuid,
    /// Amount in minor units.
    pub amount: i64,
    /// Three-letter currency code.
    pub currency: String,
}

/// Request body for POST /block.
#[derive(Debug, Deserialize)]
pub struct BlockAccountRequest {
    /// The account to block.
    pub account_id: Uuid,
    /// Why the account is blocked.
    pub cause: String,
}

/// Response body returned after a command is committed.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// The account the command targeted.
    pub account_id: Uuid,
    /// Correlation ID stamped on the produced events.
    pub correlation_id: Uuid,
}

async fn dispatch<C: Command>(state: &AppState, command: C) -> Result<CommandResponse, ApiError> {
    let response = CommandResponse {
        account_id: command.aggregate_id(),
        correlation_id: command.correlation_id(),
    };
    info!(correlation_id = %response.correlation_id, command_type = C::COMMAND_TYPE, "handling command");
    state.commands.dispatch(command).await?;
    Ok(response)
}

/// POST /api/v1/accounts
#[instrument(skip(state, request), fields(account_id = %request.account_id))]
async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let command = commands::CreateAccount {
        correlation_id: Uuid::new_v4(),
        account_id: request.account_id,
        currency: request.currency,
    };
    let response = dispatch(&state, command).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/accounts/add-money
#[instrument(skip(state, request), fields(account_id = %request.account_id))]
async fn add_money(
    State(state): State<AppState>,
    Json(request): Json<MoneyRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::AddMoney {
        correlation_id: Uuid::new_v4(),
        account_id: request.account_id,
        amount: request.amount,
        currency: request.currency,
    };
    Ok(Json(dispatch(&state, command).await?))
}

/// POST /api/v1/accounts/withdraw-money
#[instrument(skip(state, request), fields(account_id = %request.account_id))]
async fn withdraw_money(
    State(state): State<AppState>,
    Json(request): Json<MoneyRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::WithdrawMoney {
        correlation_id: Uuid::new_v4(),
        account_id: request.account_id,
        amount: request.amount,
        currency: request.currency,
    };
    Ok(Json(dispatch(&state, command).await?))
}

/// POST /api/v1/accounts/block
#[instrument(skip(state, request), fields(account_id = %request.account_id))]
async fn block_account(
    State(state): State<AppState>,
    Json(request): Json<BlockAccountRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::BlockAccount {
        correlation_id: Uuid::new_v4(),
        account_id: request.account_id,
        cause: request.cause,
    };
    Ok(Json(dispatch(&state, command).await?))
}

/// GET /api/v1/accounts/{id}
#[instrument(skip(state))]
async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountView>, ApiError> {
    let view = query_handlers::get_account_by_id(account_id, state.event_store.as_ref()).await?;
    Ok(Json(view))
}

/// GET /api/v1/accounts/{id}/events
#[instrument(skip(state))]
async fn get_account_events(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<AccountEventView>>, ApiError> {
    let events =
        query_handlers::get_account_events(account_id, state.event_store.as_ref()).await?;
    Ok(Json(events))
}

/// GET /api/v1/accounts
async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountSummary>>, ApiError> {
    Ok(Json(state.projection.summaries()?))
}

/// Returns the router for the account context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/accounts", post(create_account).get(list_accounts))
        .route("/api/v1/accounts/add-money", post(add_money))
        .route("/api/v1/accounts/withdraw-money", post(withdraw_money))
        .route("/api/v1/accounts/block", post(block_account))
        .route("/api/v1/accounts/{id}", get(get_account))
        .route("/api/v1/accounts/{id}/events", get(get_account_events))
}
