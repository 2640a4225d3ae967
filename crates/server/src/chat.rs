//! Assistant endpoints: chat, direct function calls and chained calls.

use agent::{ChainStep, ChatMessage, ChatOutcome, Role, ToolDefinition};
use api_types::chat::{
    ChainedOperations, ChatRequest, ClearResponse, FunctionCall, FunctionCallResponse,
    HistoryMessage, HistoryResponse,
};
use axum::{Extension, Json, extract::State};
use chrono::Utc;
use engine::Merchant;
use serde_json::{Value, json};

use crate::{ServerError, server::ServerState};

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn map_message(message: ChatMessage) -> HistoryMessage {
    HistoryMessage {
        role: role_name(message.role).to_string(),
        content: message.content,
        function_calls: message.tool_calls.into_iter().map(|call| call.name).collect(),
    }
}

pub async fn chat(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatOutcome>, ServerError> {
    let outcome = state.agent.chat(merchant.id, &payload.message).await?;
    Ok(Json(outcome))
}

pub async fn history(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
) -> Json<HistoryResponse> {
    let messages = state
        .agent
        .history(merchant.id)
        .await
        .into_iter()
        .map(map_message)
        .collect();
    Json(HistoryResponse { messages })
}

pub async fn clear(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
) -> Json<ClearResponse> {
    let cleared = state.agent.clear(merchant.id).await;
    tracing::info!(owner = %merchant.id, cleared, "conversation cleared");
    Json(ClearResponse { cleared })
}

pub async fn function_call(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Json(payload): Json<FunctionCall>,
) -> Result<Json<FunctionCallResponse>, ServerError> {
    let result = state
        .agent
        .dispatcher()
        .dispatch(merchant.id, &payload.function, &payload.arguments)
        .await?;
    Ok(Json(FunctionCallResponse {
        function: payload.function,
        result,
        timestamp: Utc::now(),
    }))
}

pub async fn chained_operations(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Json(payload): Json<ChainedOperations>,
) -> Result<Json<Value>, ServerError> {
    if payload.operations.is_empty() {
        return Err(ServerError::Generic(
            "operations must not be empty".to_string(),
        ));
    }
    let steps: Vec<ChainStep> = payload
        .operations
        .into_iter()
        .map(|op| ChainStep {
            function: op.function,
            arguments: op.arguments,
            result_key: op.result_key,
        })
        .collect();
    let report = state
        .agent
        .dispatcher()
        .dispatch_chain(merchant.id, &steps)
        .await;
    Ok(Json(json!({
        "completed": report.completed,
        "results": report.steps,
        "timestamp": Utc::now(),
    })))
}

pub async fn tools(State(state): State<ServerState>) -> Json<Vec<ToolDefinition>> {
    Json(state.agent.dispatcher().tools())
}
