//! Conversation loop between the merchant, the LLM and the dispatcher.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    AgentError, ChatMessage, Dispatcher, LlmProvider, Role,
    registry::{self, ToolDefinition},
};

const MAX_MESSAGE_CHARS: usize = 4000;
const EXHAUSTED_REPLY: &str = "I'm sorry, I could not complete this request. \
Please try again with a more specific question.";

pub const SYSTEM_PROMPT: &str = "You are the Merchant Financial Agent, an assistant that helps \
small business owners manage their finances, schedule deadlines and analyze their business. \
Use the available functions to read the ledger, record income and expenses, produce reports, \
convert currencies and manage calendar events. Amounts in function results are integer minor \
units of the merchant currency. Be precise, explain key findings briefly, and confirm actions \
that change data.";

#[derive(Clone, Debug)]
pub struct AgentSettings {
    pub max_tool_rounds: usize,
    pub max_history: usize,
    pub system_prompt: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: 4,
            max_history: 20,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }
}

/// A function call made while answering.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolResult {
    pub function: String,
    pub arguments: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    pub tool_results: Vec<ToolResult>,
    pub timestamp: DateTime<Utc>,
}

/// Per-merchant chat sessions.
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    dispatcher: Dispatcher,
    settings: AgentSettings,
    tools: Vec<ToolDefinition>,
    conversations: Mutex<HashMap<Uuid, Vec<ChatMessage>>>,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        dispatcher: Dispatcher,
        settings: AgentSettings,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            settings,
            tools: registry::tools(),
            conversations: Mutex::new(HashMap::new()),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Answers `text` for `owner`, running the function calls the model asks
    /// for (at most `max_tool_rounds` model calls).
    ///
    /// Dispatch errors are returned to the model as tool results. Provider
    /// errors abort the turn and leave the history unchanged.
    pub async fn chat(&self, owner: Uuid, text: &str) -> Result<ChatOutcome, AgentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::EmptyMessage);
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AgentError::MessageTooLong(MAX_MESSAGE_CHARS));
        }

        let history = self.history(owner).await;
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.settings.system_prompt.clone()));
        messages.extend(history);
        let turn_start = messages.len();
        messages.push(ChatMessage::user(text));

        let mut tool_results = Vec::new();
        let mut response = None;
        for round in 0..self.settings.max_tool_rounds {
            let reply = self.provider.complete(&messages, &self.tools).await?;
            if reply.tool_calls.is_empty() {
                let content = reply.content.unwrap_or_default();
                messages.push(ChatMessage::assistant(content.clone()));
                response = Some(content);
                break;
            }

            debug!(%owner, round, calls = reply.tool_calls.len(), "model requested functions");
            let calls = reply.tool_calls.clone();
            messages.push(ChatMessage::assistant_calls(reply.content, reply.tool_calls));
            for call in calls {
                let outcome = self
                    .dispatcher
                    .dispatch(owner, &call.name, &call.arguments)
                    .await;
                let (payload, result) = match outcome {
                    Ok(value) => (value.clone(), ToolResult {
                        function: call.name.clone(),
                        arguments: call.arguments.clone(),
                        result: Some(value),
                        error: None,
                    }),
                    Err(err) => (
                        json!({ "error": err.to_string(), "code": err.code() }),
                        ToolResult {
                            function: call.name.clone(),
                            arguments: call.arguments.clone(),
                            result: None,
                            error: Some(err.to_string()),
                        },
                    ),
                };
                messages.push(ChatMessage::tool(call.id, payload.to_string()));
                tool_results.push(result);
            }
        }

        let response = match response {
            Some(response) => response,
            None => {
                info!(%owner, "tool rounds exhausted");
                messages.push(ChatMessage::assistant(EXHAUSTED_REPLY));
                EXHAUSTED_REPLY.to_string()
            }
        };

        let new_messages = messages.split_off(turn_start);
        let mut conversations = self.conversations.lock().await;
        let stored = conversations.entry(owner).or_default();
        stored.extend(new_messages);
        trim_history(stored, self.settings.max_history);

        Ok(ChatOutcome {
            response,
            tool_results,
            timestamp: Utc::now(),
        })
    }

    pub async fn history(&self, owner: Uuid) -> Vec<ChatMessage> {
        self.conversations
            .lock()
            .await
            .get(&owner)
            .cloned()
            .unwrap_or_default()
    }

    /// Forgets the conversation, returning how many messages were dropped.
    pub async fn clear(&self, owner: Uuid) -> usize {
        self.conversations
            .lock()
            .await
            .remove(&owner)
            .map_or(0, |messages| messages.len())
    }
}

/// Drops the oldest messages until at most `max` remain, cutting only in
/// front of a user message so tool call exchanges stay whole. When no such
/// cut fits, the history restarts at the latest user message.
pub(crate) fn trim_history(messages: &mut Vec<ChatMessage>, max: usize) {
    if messages.len() <= max {
        return;
    }
    let min_cut = messages.len() - max;
    let cut = messages
        .iter()
        .enumerate()
        .skip(min_cut)
        .find(|(_, message)| message.role == Role::User)
        .map(|(index, _)| index)
        .or_else(|| messages.iter().rposition(|message| message.role == Role::User));
    match cut {
        Some(cut) => {
            messages.drain(..cut);
        }
        None => messages.clear(),
    }
}
