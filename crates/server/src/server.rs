use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use std::sync::Arc;

use crate::{categories, chat, currency, events, forecasts, health, reports, transactions};
use agent::Agent;
use engine::{Engine, EngineError};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub agent: Arc<Agent>,
    /// Browser origins allowed to call the API. Empty allows any origin.
    pub allowed_origins: Arc<Vec<String>>,
}

impl ServerState {
    pub fn new(engine: Arc<Engine>, agent: Arc<Agent>) -> Self {
        Self {
            engine,
            agent,
            allowed_origins: Arc::new(Vec::new()),
        }
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = Arc::new(origins);
        self
    }
}

/// Resolves the bearer token to a merchant and stores it as an extension.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(Authorization(bearer))) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let merchant = match state.engine.merchant_by_token(bearer.token()).await {
        Ok(merchant) => merchant,
        Err(EngineError::Database(err)) => {
            tracing::error!("token lookup failed: {err}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        Err(_) => return Err(StatusCode::UNAUTHORIZED),
    };

    request.extensions_mut().insert(merchant);
    Ok(next.run(request).await)
}

/// Rejects requests from origins outside `allowed_origins` and echoes the
/// accepted origin back.
async fn check_origin(
    State(state): State<ServerState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let origin = request.headers().get(header::ORIGIN).cloned();
    let Some(origin) = origin else {
        return Ok(next.run(request).await);
    };
    if state.allowed_origins.is_empty() {
        return Ok(next.run(request).await);
    }
    let allowed = origin
        .to_str()
        .is_ok_and(|value| state.allowed_origins.iter().any(|o| o == value));
    if !allowed {
        tracing::warn!("rejected request from origin {origin:?}");
        return Err(StatusCode::FORBIDDEN);
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    response
        .headers_mut()
        .insert(header::VARY, HeaderValue::from_static("origin"));
    Ok(response)
}

pub fn router(state: ServerState) -> Router {
    let api = Router::new()
        .route("/chat/", post(chat::chat))
        .route("/conversation/history/", get(chat::history))
        .route("/conversation/clear/", post(chat::clear))
        .route("/function-call/", post(chat::function_call))
        .route("/chained-operations/", post(chat::chained_operations))
        .route("/tools/", get(chat::tools))
        .route("/reports/generate/", post(reports::generate))
        .route("/reports/quick/", post(reports::quick))
        .route("/reports/query/", post(reports::query))
        .route("/reports/export/{format}", get(reports::export))
        .route(
            "/transactions/",
            get(transactions::list).post(transactions::create),
        )
        .route("/transactions/{id}", get(transactions::get_one))
        .route("/transactions/{id}/reverse", post(transactions::reverse))
        .route(
            "/categories/",
            get(categories::list).post(categories::create),
        )
        .route("/categories/{id}", patch(categories::update))
        .route("/events/", get(events::list).post(events::create))
        .route(
            "/events/{id}",
            patch(events::update).delete(events::delete),
        )
        .route("/forecasts/", get(forecasts::list).post(forecasts::save))
        .route("/forecasts/project", post(forecasts::project))
        .route("/currency/rate", get(currency::rate))
        .route("/currency/convert/", post(currency::convert))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .route("/health/", get(health::health));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), check_origin))
        .with_state(state)
}

pub async fn run(state: ServerState, addr: &str) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(state, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
