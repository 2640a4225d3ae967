use agent::{AgentError, CalendarError, DispatchError};
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;
use fx::FxError;

use api_types::ErrorBody;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod categories;
mod chat;
mod currency;
mod events;
mod forecasts;
mod health;
mod reports;
mod server;
mod transactions;

pub enum ServerError {
    Engine(EngineError),
    Fx(FxError),
    Dispatch(DispatchError),
    Calendar(CalendarError),
    Agent(AgentError),
    Generic(String),
    /// Failure on our side; the detail is logged, never returned.
    Internal(String),
}

const HIDDEN: &str = "internal server error";

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidName(_)
        | EngineError::InvalidId(_)
        | EngineError::InvalidKind(_)
        | EngineError::InvalidStatus(_)
        | EngineError::InvalidDateRange(_)
        | EngineError::CurrencyMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            HIDDEN.to_string()
        }
        other => other.to_string(),
    }
}

fn fx_error(err: FxError) -> (StatusCode, String) {
    match err {
        FxError::InvalidAmount(_)
        | FxError::InvalidDate(_)
        | FxError::UnsupportedCurrency(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        FxError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        FxError::Provider(_) | FxError::Http(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        FxError::Database(db_err) => {
            tracing::error!("rate cache error: {db_err}");
            (StatusCode::INTERNAL_SERVER_ERROR, HIDDEN.to_string())
        }
    }
}

fn dispatch_error(err: DispatchError) -> (StatusCode, String) {
    let status = match &err {
        DispatchError::UnknownFunction(_) => StatusCode::BAD_REQUEST,
        DispatchError::InvalidArguments(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
        DispatchError::Forbidden(_) => StatusCode::FORBIDDEN,
        DispatchError::Conflict(_) => StatusCode::CONFLICT,
        DispatchError::Upstream(_) => StatusCode::BAD_GATEWAY,
        DispatchError::Internal(detail) => {
            tracing::error!("function call failed: {detail}");
            return (StatusCode::INTERNAL_SERVER_ERROR, HIDDEN.to_string());
        }
    };
    (status, err.to_string())
}

fn calendar_error(err: CalendarError) -> (StatusCode, String) {
    match err {
        CalendarError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
        other => (StatusCode::BAD_GATEWAY, other.to_string()),
    }
}

fn agent_error(err: AgentError) -> (StatusCode, String) {
    match err {
        AgentError::EmptyMessage | AgentError::MessageTooLong(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        AgentError::Provider(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Fx(err) => fx_error(err),
            ServerError::Dispatch(err) => dispatch_error(err),
            ServerError::Calendar(err) => calendar_error(err),
            ServerError::Agent(err) => agent_error(err),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
            ServerError::Internal(detail) => {
                tracing::error!("{detail}");
                (StatusCode::INTERNAL_SERVER_ERROR, HIDDEN.to_string())
            }
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<FxError> for ServerError {
    fn from(value: FxError) -> Self {
        Self::Fx(value)
    }
}

impl From<DispatchError> for ServerError {
    fn from(value: DispatchError) -> Self {
        Self::Dispatch(value)
    }
}

impl From<CalendarError> for ServerError {
    fn from(value: CalendarError) -> Self {
        Self::Calendar(value)
    }
}

impl From<AgentError> for ServerError {
    fn from(value: AgentError) -> Self {
        Self::Agent(value)
    }
}
