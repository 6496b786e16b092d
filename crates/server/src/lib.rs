use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;
use serde::Serialize;

pub use server::{ServerState, router, run_with_listener, spawn_with_listener};

mod admin;
mod auth;
mod payment;
mod prices;
mod server;
mod transactions;
mod users;
mod views;
mod wallet;

pub enum ServerError {
    Engine(EngineError),
    Unauthorized,
    Forbidden,
    Generic(String),
}

/// Failure envelope shared by every endpoint.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::ExistingKey(_)
        | EngineError::InvalidAmount(_)
        | EngineError::UnknownCurrency(_)
        | EngineError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ServerError::Forbidden => {
                (StatusCode::FORBIDDEN, "admin access required".to_string())
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error,
            }),
        )
            .into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
