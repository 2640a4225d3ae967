//! LLM providers for the conversational layer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{LlmError, registry::ToolDefinition};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A function call requested by the model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolCall {
    pub id: String,
    /// Registry name, `<service>.<operation>`.
    pub name: String,
    pub arguments: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    pub fn assistant_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Either a final answer or function calls to run first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LlmReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LlmReply, LlmError>;

    fn name(&self) -> &str;
}

/// Used when no LLM is configured: answers by echoing the last user message.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineProvider;

#[async_trait]
impl LlmProvider for OfflineProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<LlmReply, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .and_then(|message| message.content.as_deref())
            .unwrap_or_default();
        Ok(LlmReply {
            content: Some(format!(
                "(offline) I received your message: '{last_user}'. No language model is configured."
            )),
            tool_calls: Vec::new(),
        })
    }

    fn name(&self) -> &str {
        "offline"
    }
}

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

/// OpenAI compatible `chat/completions` with function calling.
#[derive(Clone, Debug)]
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

// Wire function names may not contain dots.
fn encode_name(name: &str) -> String {
    name.replacen('.', "__", 1)
}

fn decode_name(name: &str) -> String {
    name.replacen("__", ".", 1)
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Value {
        let messages: Vec<Value> = messages.iter().map(wire_message).collect();
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });
        if !tools.is_empty() {
            let tools: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": encode_name(tool.name),
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = json!("auto");
        }
        body
    }
}

fn wire_message(message: &ChatMessage) -> Value {
    let mut value = json!({
        "role": message.role,
        "content": message.content,
    });
    if !message.tool_calls.is_empty() {
        let calls: Vec<Value> = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": encode_name(&call.name),
                        "arguments": call.arguments.to_string(),
                    }
                })
            })
            .collect();
        value["tool_calls"] = Value::Array(calls);
    }
    if let Some(id) = &message.tool_call_id {
        value["tool_call_id"] = json!(id);
    }
    value
}

fn parse_reply(response: CompletionResponse) -> Result<LlmReply, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("no choices".to_string()))?;
    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| ToolCall {
            id: call.id,
            name: decode_name(&call.function.name),
            // Unparseable arguments are passed through as a string so the
            // dispatcher reports them back to the model.
            arguments: serde_json::from_str(&call.function.arguments)
                .unwrap_or(Value::String(call.function.arguments)),
        })
        .collect();
    Ok(LlmReply {
        content: choice.message.content,
        tool_calls,
    })
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LlmReply, LlmError> {
        let response = self
            .client
            .post(self.url())
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(messages, tools))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorEnvelope>().await {
                Ok(envelope) => envelope.error.message,
                Err(_) => "llm provider error".to_string(),
            };
            return Err(LlmError::Api { status, message });
        }
        parse_reply(response.json().await?)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn names_round_trip_through_wire_format() {
        for spec in registry::registry() {
            let wire = encode_name(spec.name);
            assert!(!wire.contains('.'));
            assert_eq!(decode_name(&wire), spec.name);
        }
    }

    #[test]
    fn request_carries_tools_and_tool_messages() {
        let provider = OpenAiProvider::new(OpenAiConfig::new("key")).unwrap();
        let messages = vec![
            ChatMessage::user("rate?"),
            ChatMessage::assistant_calls(
                None,
                vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "currency_service.get_rate".to_string(),
                    arguments: json!({"base_currency": "USD", "target_currency": "EUR"}),
                }],
            ),
            ChatMessage::tool("call_1", r#"{"rate":"0.9"}"#),
        ];
        let body = provider.request_body(&messages, &registry::tools());
        assert_eq!(body["tools"].as_array().unwrap().len(), 21);
        assert_eq!(body["tools"][0]["function"]["name"], "financial_db_adapter__query_transactions");
        assert_eq!(body["messages"][1]["tool_calls"][0]["function"]["name"], "currency_service__get_rate");
        assert_eq!(body["messages"][2]["role"], "tool");
        assert_eq!(body["messages"][2]["tool_call_id"], "call_1");
    }

    #[test]
    fn reply_decodes_tool_calls() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": null, "tool_calls": [
                {"id": "a", "type": "function", "function": {
                    "name": "currency_service__get_rate",
                    "arguments": "{\"base_currency\":\"USD\",\"target_currency\":\"EUR\"}"
                }},
                {"id": "b", "type": "function", "function": {
                    "name": "calendar_service__delete_event",
                    "arguments": "not json"
                }}
            ]}}]
        }))
        .unwrap();
        let reply = parse_reply(response).unwrap();
        assert_eq!(reply.content, None);
        assert_eq!(reply.tool_calls[0].name, "currency_service.get_rate");
        assert_eq!(reply.tool_calls[0].arguments["base_currency"], "USD");
        assert_eq!(reply.tool_calls[1].arguments, json!("not json"));
    }

    #[tokio::test]
    async fn offline_provider_echoes_last_user_message() {
        let reply = OfflineProvider
            .complete(&[ChatMessage::user("hello")], &[])
            .await
            .unwrap();
        assert!(reply.content.unwrap().contains("'hello'"));
        assert!(reply.tool_calls.is_empty());
    }
}
