mod common;

use std::sync::{Arc, Mutex};

use agent::{
    Agent, AgentError, AgentSettings, ChatMessage, LlmError, LlmProvider, LlmReply, Role,
    ToolCall, ToolDefinition,
};
use async_trait::async_trait;
use common::fixture;
use serde_json::json;

/// Replays queued replies and records what the model was sent.
#[derive(Default)]
struct ScriptedLlm {
    replies: Mutex<Vec<Result<LlmReply, String>>>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    fn new(mut replies: Vec<Result<LlmReply, String>>) -> Arc<Self> {
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(replies),
            seen: Mutex::default(),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LlmReply, LlmError> {
        assert_eq!(tools.len(), 21);
        self.seen.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(LlmError::InvalidResponse(message)),
            None => Ok(LlmReply {
                content: None,
                tool_calls: vec![call("loop", "currency_service.supported_currencies", json!({}))],
            }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn text(content: &str) -> Result<LlmReply, String> {
    Ok(LlmReply {
        content: Some(content.to_string()),
        tool_calls: Vec::new(),
    })
}

fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

#[tokio::test]
async fn plain_reply_is_returned_and_remembered() {
    let fx = fixture().await;
    let llm = ScriptedLlm::new(vec![text("Hello!")]);
    let agent = Agent::new(llm.clone(), fx.dispatcher.clone(), AgentSettings::default());

    let outcome = agent.chat(fx.owner, "  hi  ").await.unwrap();
    assert_eq!(outcome.response, "Hello!");
    assert!(outcome.tool_results.is_empty());

    let history = agent.history(fx.owner).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content.as_deref(), Some("hi"));
    assert_eq!(history[1].role, Role::Assistant);

    let sent = &llm.seen.lock().unwrap()[0];
    assert_eq!(sent[0].role, Role::System);
    assert_eq!(sent.last().unwrap().content.as_deref(), Some("hi"));
}

#[tokio::test]
async fn tool_calls_are_dispatched_and_fed_back() {
    let fx = fixture().await;
    let llm = ScriptedLlm::new(vec![
        Ok(LlmReply {
            content: None,
            tool_calls: vec![
                call(
                    "c1",
                    "currency_service.convert_currency",
                    json!({"amount": 100, "from_currency": "USD", "to_currency": "EUR"}),
                ),
                call("c2", "financial_db_adapter.drop_everything", json!({})),
            ],
        }),
        text("100 USD is 90.00 EUR."),
    ]);
    let agent = Agent::new(llm.clone(), fx.dispatcher.clone(), AgentSettings::default());

    let outcome = agent.chat(fx.owner, "convert 100 USD").await.unwrap();
    assert_eq!(outcome.response, "100 USD is 90.00 EUR.");
    assert_eq!(outcome.tool_results.len(), 2);
    assert_eq!(outcome.tool_results[0].result.as_ref().unwrap()["converted"], "90.00");
    assert!(outcome.tool_results[1].error.is_some());

    let seen = llm.seen.lock().unwrap();
    let second_round = &seen[1];
    let tool_messages: Vec<&ChatMessage> = second_round
        .iter()
        .filter(|message| message.role == Role::Tool)
        .collect();
    assert_eq!(tool_messages.len(), 2);
    assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("c1"));
    let error: serde_json::Value =
        serde_json::from_str(tool_messages[1].content.as_deref().unwrap()).unwrap();
    assert_eq!(error["code"], "unknown_function");

    // user, assistant(calls), tool, tool, assistant
    assert_eq!(agent.history(fx.owner).await.len(), 5);
}

#[tokio::test]
async fn rounds_are_bounded() {
    let fx = fixture().await;
    let llm = ScriptedLlm::new(Vec::new());
    let agent = Agent::new(llm.clone(), fx.dispatcher.clone(), AgentSettings::default());

    let outcome = agent.chat(fx.owner, "loop forever").await.unwrap();
    assert!(outcome.response.contains("sorry"));
    assert_eq!(outcome.tool_results.len(), 4);
    assert_eq!(llm.seen.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn provider_failure_keeps_history_unchanged() {
    let fx = fixture().await;
    let llm = ScriptedLlm::new(vec![text("first"), Err("boom".to_string())]);
    let agent = Agent::new(llm, fx.dispatcher.clone(), AgentSettings::default());

    agent.chat(fx.owner, "one").await.unwrap();
    let err = agent.chat(fx.owner, "two").await.unwrap_err();
    assert!(matches!(err, AgentError::Provider(_)));
    assert_eq!(agent.history(fx.owner).await.len(), 2);
}

#[tokio::test]
async fn history_is_trimmed_and_cleared_per_owner() {
    let fx = fixture().await;
    let replies = (0..15).map(|i| text(&format!("answer {i}"))).collect();
    let agent = Agent::new(
        ScriptedLlm::new(replies),
        fx.dispatcher.clone(),
        AgentSettings::default(),
    );
    let other = fx
        .engine
        .create_merchant("second-shop", engine::Currency::EUR)
        .await
        .unwrap()
        .merchant
        .id;

    for i in 0..12 {
        agent.chat(fx.owner, &format!("question {i}")).await.unwrap();
    }
    agent.chat(other, "hello").await.unwrap();

    let history = agent.history(fx.owner).await;
    assert_eq!(history.len(), 20);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content.as_deref(), Some("question 2"));
    assert_eq!(agent.history(other).await.len(), 2);

    assert_eq!(agent.clear(fx.owner).await, 20);
    assert!(agent.history(fx.owner).await.is_empty());
    assert_eq!(agent.history(other).await.len(), 2);
}

#[tokio::test]
async fn empty_messages_are_rejected() {
    let fx = fixture().await;
    let agent = Agent::new(
        ScriptedLlm::new(Vec::new()),
        fx.dispatcher.clone(),
        AgentSettings::default(),
    );
    assert!(matches!(
        agent.chat(fx.owner, "   ").await,
        Err(AgentError::EmptyMessage)
    ));
}
