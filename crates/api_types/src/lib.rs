//! Request and response bodies of the HTTP API.
//!
//! Amounts are integer minor units of the merchant currency unless the field
//! says otherwise. Timestamps are RFC 3339, dates `YYYY-MM-DD`.
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentMethod {
        Cash,
        #[default]
        Card,
        BankTransfer,
        Mobile,
        Other,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub kind: TransactionKind,
        /// Must be > 0.
        pub amount_minor: i64,
        /// Defaults to the merchant currency, any other value is rejected.
        pub currency: Option<String>,
        pub category_id: Option<Uuid>,
        pub payment_method: Option<PaymentMethod>,
        pub description: Option<String>,
        pub reference_id: Option<String>,
        /// Defaults to now.
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }

    /// Query string of `GET /api/transactions/`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionListQuery {
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
        pub kind: Option<TransactionKind>,
        pub category_id: Option<Uuid>,
        pub payment_method: Option<PaymentMethod>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        /// `amount_minor` with the kind sign applied.
        pub signed_amount_minor: i64,
        pub currency: String,
        pub category_id: Option<Uuid>,
        pub payment_method: PaymentMethod,
        pub description: Option<String>,
        pub reference_id: Option<String>,
        pub occurred_at: DateTime<Utc>,
        pub created_at: DateTime<Utc>,
        /// Set on reversal entries.
        pub reverses_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionReverse {
        pub note: Option<String>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub kind: TransactionKind,
        pub description: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryListQuery {
        pub kind: Option<TransactionKind>,
        pub include_archived: Option<bool>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        pub name: Option<String>,
        /// An empty string clears the description.
        pub description: Option<String>,
        pub archived: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub kind: TransactionKind,
        pub description: Option<String>,
        pub archived: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryListResponse {
        pub categories: Vec<CategoryView>,
    }
}

pub mod event {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EventKind {
        Tax,
        Invoice,
        Meeting,
        Reminder,
        LoanRepayment,
        #[default]
        Other,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EventStatus {
        Upcoming,
        Overdue,
        Completed,
        Cancelled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EventNew {
        pub title: String,
        pub description: Option<String>,
        pub kind: Option<EventKind>,
        pub due_at: DateTime<FixedOffset>,
        pub amount_minor: Option<i64>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct EventListQuery {
        pub from: Option<DateTime<FixedOffset>>,
        pub to: Option<DateTime<FixedOffset>>,
        pub kind: Option<EventKind>,
        /// `overdue` selects upcoming events already due.
        pub status: Option<EventStatus>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct EventUpdate {
        pub title: Option<String>,
        /// An empty string clears the description.
        pub description: Option<String>,
        pub due_at: Option<DateTime<FixedOffset>>,
        /// `overdue` is derived and cannot be set.
        pub status: Option<EventStatus>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EventView {
        pub id: Uuid,
        pub title: String,
        pub description: Option<String>,
        pub kind: EventKind,
        pub due_at: DateTime<Utc>,
        /// Stored status.
        pub status: EventStatus,
        /// `status`, with upcoming events past due reported as overdue.
        pub effective_status: EventStatus,
        pub amount_minor: Option<i64>,
        pub calendar_ref: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EventListResponse {
        pub events: Vec<EventView>,
    }
}

pub mod forecast {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ForecastKind {
        Revenue,
        Expense,
        Profit,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ForecastNew {
        /// `YYYY-MM`.
        pub period: String,
        pub kind: ForecastKind,
        pub projected_minor: i64,
        pub notes: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ForecastListQuery {
        pub from: Option<String>,
        pub to: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ForecastProject {
        pub kind: ForecastKind,
        /// Complete months averaged, 1..=24, default 3.
        pub months: Option<u32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ForecastView {
        pub id: Uuid,
        pub period: String,
        pub kind: ForecastKind,
        pub projected_minor: i64,
        pub basis: String,
        pub notes: Option<String>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ForecastListResponse {
        pub forecasts: Vec<ForecastView>,
    }
}

pub mod report {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportGenerate {
        pub start_date: NaiveDate,
        pub end_date: NaiveDate,
        /// `income`, `expense`, `profit_loss` or `summary` (default).
        pub kind: Option<String>,
        /// `day`, `week` or `month` (default).
        pub bucket: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct QuickReport {
        /// `week`, `month`, `quarter` or `year`.
        pub period: String,
        pub kind: Option<String>,
        pub bucket: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum QueryType {
        CategoryBreakdown,
        PaymentMethods,
        TopTransactions,
        CashFlow,
        RevenueTrend,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportQuery {
        pub query_type: QueryType,
        /// Both dates default to the last 30 days.
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
        pub kind: Option<TransactionKind>,
        /// `top_transactions` only, default 10.
        pub limit: Option<u64>,
        /// `revenue_trend` only: `month`, `quarter` or `year`.
        pub period: Option<String>,
        /// `revenue_trend` only, default 3.
        pub periods: Option<u32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportQueryResponse {
        pub query_type: QueryType,
        pub result: serde_json::Value,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExportQuery {
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
    }
}

pub mod currency {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RateQuery {
        pub base: String,
        pub quote: String,
        pub force_refresh: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConvertRequest {
        /// Major units, e.g. `"100.00"` or `100`.
        pub amount: rust_decimal::Decimal,
        pub from_currency: String,
        pub to_currency: String,
        pub force_refresh: Option<bool>,
    }
}

pub mod chat {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ChatRequest {
        pub message: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FunctionCall {
        pub function: String,
        #[serde(default)]
        pub arguments: serde_json::Value,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FunctionCallResponse {
        pub function: String,
        pub result: serde_json::Value,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ChainedOperation {
        pub function: String,
        #[serde(default)]
        pub arguments: serde_json::Value,
        pub result_key: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ChainedOperations {
        pub operations: Vec<ChainedOperation>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryMessage {
        pub role: String,
        pub content: Option<String>,
        pub function_calls: Vec<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryResponse {
        pub messages: Vec<HistoryMessage>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ClearResponse {
        pub cleared: usize,
    }
}

pub mod health {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HealthResponse {
        /// `ok` or `degraded`.
        pub status: String,
        pub database: bool,
        pub fx_provider: String,
        pub llm_provider: String,
        pub calendar_provider: Option<String>,
        pub registry_size: usize,
        pub timestamp: DateTime<Utc>,
    }
}
