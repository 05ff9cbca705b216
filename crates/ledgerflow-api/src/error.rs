//! Ledgerflow API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ledgerflow_account::domain::errors::AccountError;
use ledgerflow_core::command_bus::CommandBusError;
use ledgerflow_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The event store could not be prepared.
    #[error("event store error: {0}")]
    EventStore(#[from] DomainError),

    /// Handler registration failed.
    #[error("wiring error: {0}")]
    Wiring(#[from] CommandBusError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl From<CommandBusError> for ApiError {
    fn from(err: CommandBusError) -> Self {
        match err {
            CommandBusError::Dispatch { cause, .. } => Self(cause),
            other => Self(DomainError::Infrastructure(other.to_string())),
        }
    }
}

fn rejection_status(err: &DomainError) -> (StatusCode, &'static str) {
    match err.rejection::<AccountError>() {
        Some(AccountError::Blocked(_)) => (StatusCode::UNPROCESSABLE_ENTITY, "account_blocked"),
        Some(AccountError::NegativeBalance { .. }) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "negative_balance")
        }
        Some(
            AccountError::CurrencyMismatch { .. }
            | AccountError::NonPositiveAmount(_)
            | AccountError::InvalidCurrency(_),
        ) => (StatusCode::BAD_REQUEST, "validation_error"),
        None => (StatusCode::UNPROCESSABLE_ENTITY, "rule_violation"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            DomainError::AggregateNotFound(_) => (StatusCode::NOT_FOUND, "aggregate_not_found"),
            DomainError::ConcurrencyConflict { .. } => {
                (StatusCode::CONFLICT, "concurrency_conflict")
            }
            DomainError::Rejected(_) => rejection_status(&self.0),
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::UnknownEventType { .. }
            | DomainError::TransactionScope { .. }
            | DomainError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use ledgerflow_account::domain::money::{Currency, Money};
    use uuid::Uuid;

    fn status_of(err: DomainError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    fn eur(amount: i64) -> Money {
        Money::new(amount, Currency::parse("EUR").unwrap())
    }

    #[test]
    fn test_aggregate_not_found_maps_to_404() {
        let id = Uuid::new_v4();
        assert_eq!(
            status_of(DomainError::AggregateNotFound(id)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_concurrency_conflict_maps_to_409() {
        assert_eq!(
            status_of(DomainError::ConcurrencyConflict {
                aggregate_id: Uuid::new_v4(),
                expected: 1,
                actual: 2,
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_blocked_and_negative_balance_map_to_422() {
        assert_eq!(
            status_of(AccountError::Blocked(Uuid::new_v4()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(
                AccountError::NegativeBalance {
                    account_id: Uuid::new_v4(),
                    balance: eur(0),
                    requested: eur(600),
                }
                .into()
            ),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_malformed_amounts_map_to_400() {
        assert_eq!(
            status_of(AccountError::NonPositiveAmount(0).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AccountError::InvalidCurrency("euro".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::Validation("bad input".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_infrastructure_maps_to_500() {
        assert_eq!(
            status_of(DomainError::Infrastructure("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_dispatch_failure_unwraps_to_its_cause() {
        let account_id = Uuid::new_v4();
        let err = CommandBusError::Dispatch {
            command_type: "account.add_money",
            cause: DomainError::AggregateNotFound(account_id),
        };

        let api_error = ApiError::from(err);

        match api_error.0 {
            DomainError::AggregateNotFound(id) => assert_eq!(id, account_id),
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_routing_failure_maps_to_500() {
        let api_error = ApiError::from(CommandBusError::Routing("account.close_account"));

        assert_eq!(
            api_error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
