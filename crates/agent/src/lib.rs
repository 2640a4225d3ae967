//! The merchant assistant: a fixed function registry, the dispatcher that
//! validates and runs calls against the ledger, the currency service and the
//! calendar, and the chat loop that lets an LLM drive those calls.
pub use args::{ArgValue, Args};
pub use calendar::{
    CalendarEntry, CalendarProvider, CalendarService, GOOGLE_CALENDAR_URL, GoogleCalendarConfig,
    GoogleCalendarProvider,
};
pub use chat::{Agent, AgentSettings, ChatOutcome, SYSTEM_PROMPT, ToolResult};
pub use dispatch::{ChainReport, ChainStep, Dispatcher, StepOutcome, StepStatus};
pub use error::{AgentError, CalendarError, DispatchError, LlmError, ResultCalendar};
pub use llm::{
    ChatMessage, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_URL, LlmProvider, LlmReply, OfflineProvider,
    OpenAiConfig, OpenAiProvider, Role, ToolCall,
};
pub use registry::{
    FunctionSpec, Operation, Param, ParamKind, ToolDefinition, lookup, registry, tools,
};

mod args;
mod calendar;
mod chat;
mod dispatch;
mod error;
mod llm;
mod registry;
