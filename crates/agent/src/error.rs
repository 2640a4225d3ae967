//! Errors of the dispatcher, the calendar bridge and the chat loop.
use engine::EngineError;
use fx::FxError;
use reqwest::StatusCode;
use thiserror::Error;

/// Typed failure of a function call.
#[derive(Error, Debug, PartialEq)]
pub enum DispatchError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("upstream failure: {0}")]
    Upstream(String),
    #[error("internal error")]
    Internal(String),
}

impl DispatchError {
    /// Short machine readable tag, used in tool results fed to the LLM.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownFunction(_) => "unknown_function",
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::Upstream(_) => "upstream",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<EngineError> for DispatchError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::KeyNotFound(_) => Self::NotFound(err.to_string()),
            EngineError::Forbidden(_) => Self::Forbidden(err.to_string()),
            EngineError::ExistingKey(_) => Self::Conflict(err.to_string()),
            EngineError::Database(db) => Self::Internal(db.to_string()),
            other => Self::InvalidArguments(other.to_string()),
        }
    }
}

impl From<FxError> for DispatchError {
    fn from(err: FxError) -> Self {
        match err {
            FxError::InvalidAmount(_)
            | FxError::InvalidDate(_)
            | FxError::UnsupportedCurrency(_) => {
                Self::InvalidArguments(err.to_string())
            }
            FxError::Database(db) => Self::Internal(db.to_string()),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<CalendarError> for DispatchError {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::Engine(engine) => engine.into(),
            other => Self::Upstream(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("calendar network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("calendar provider answered {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type ResultCalendar<T> = Result<T, CalendarError>;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("llm network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("llm provider answered {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("invalid llm response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("message must be at most {0} characters")]
    MessageTooLong(usize),
    #[error(transparent)]
    Provider(#[from] LlmError),
}
