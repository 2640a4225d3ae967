//! The fixed table of callable functions.
//!
//! Names are `<service>.<operation>`. Each entry carries the parameter
//! schema the dispatcher validates against and renders for the LLM.

use serde::Serialize;
use serde_json::{Map, Value, json};

/// Accepted shape of one argument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamKind {
    Text { max_len: usize },
    Integer { min: i64, max: i64 },
    /// Non-negative decimal number in major units.
    Amount,
    Boolean,
    /// `YYYY-MM-DD`.
    Date,
    /// RFC 3339.
    DateTime,
    /// ISO 4217 code, `^[A-Z]{3}$`.
    Currency,
    Currencies,
    Id,
    Enum(&'static [&'static str]),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

/// Handler selected for a registry entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    QueryTransactions,
    RecordTransaction,
    GenerateSummary,
    AnalyzeRevenue,
    AnalyzeExpenses,
    AnalyzeCashFlow,
    ListCategories,
    CreateCategory,
    GetRate,
    ConvertCurrency,
    GetMultipleRates,
    GetHistoricalRate,
    SupportedCurrencies,
    GetCurrencyInfo,
    CreateEvent,
    FindEvents,
    UpdateEvent,
    UpdateEventStatus,
    DeleteEvent,
    CheckAvailability,
    GetFreeTime,
}

#[derive(Clone, Copy, Debug)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub operation: Operation,
    pub params: &'static [Param],
}

/// LLM facing description of a function.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Param {
    Param {
        name,
        kind,
        required: true,
        description,
    }
}

const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Param {
    Param {
        name,
        kind,
        required: false,
        description,
    }
}

const TRANSACTION_KINDS: &[&str] = &["income", "expense"];
const PAYMENT_METHODS: &[&str] = &["cash", "card", "bank_transfer", "mobile", "other"];
const TIMEFRAMES: &[&str] = &["week", "month", "quarter", "year", "custom"];
const TREND_PERIODS: &[&str] = &["month", "quarter", "year"];
const ANALYSIS_PERIODS: &[&str] = &["week", "month", "quarter", "year"];
const REPORT_KINDS: &[&str] = &["income", "expense", "profit_loss", "summary"];
const BUCKETS: &[&str] = &["day", "week", "month"];
const EVENT_KINDS: &[&str] = &[
    "tax",
    "invoice",
    "meeting",
    "reminder",
    "loan_repayment",
    "other",
];
const EVENT_FILTER_STATUSES: &[&str] = &["upcoming", "overdue", "completed", "cancelled"];
const EVENT_STATUSES: &[&str] = &["upcoming", "completed", "cancelled"];

const NAME: ParamKind = ParamKind::Text { max_len: 100 };
const NOTE: ParamKind = ParamKind::Text { max_len: 500 };

static REGISTRY: &[FunctionSpec] = &[
    FunctionSpec {
        name: "financial_db_adapter.query_transactions",
        description: "List ledger transactions, newest first, with optional filters.",
        operation: Operation::QueryTransactions,
        params: &[
            optional("start_date", ParamKind::Date, "First day included (YYYY-MM-DD)"),
            optional("end_date", ParamKind::Date, "Last day included (YYYY-MM-DD), defaults to today"),
            optional("kind", ParamKind::Enum(TRANSACTION_KINDS), "Only income or only expenses"),
            optional("category_id", ParamKind::Id, "Only transactions of this category"),
            optional("payment_method", ParamKind::Enum(PAYMENT_METHODS), "Only this payment method"),
            optional("limit", ParamKind::Integer { min: 1, max: 1000 }, "Maximum rows, default 100"),
        ],
    },
    FunctionSpec {
        name: "financial_db_adapter.record_transaction",
        description: "Record an income or an expense in the ledger.",
        operation: Operation::RecordTransaction,
        params: &[
            required("kind", ParamKind::Enum(TRANSACTION_KINDS), "income or expense"),
            required("amount", ParamKind::Amount, "Positive amount in major units, e.g. 12.50"),
            optional("currency", ParamKind::Currency, "Must match the merchant currency"),
            optional("category_id", ParamKind::Id, "Category of the same kind"),
            optional("payment_method", ParamKind::Enum(PAYMENT_METHODS), "Defaults to card"),
            optional("description", NOTE, "Free text note"),
            optional("reference_id", NAME, "Invoice or receipt reference"),
            optional("occurred_at", ParamKind::DateTime, "When it happened, defaults to now"),
        ],
    },
    FunctionSpec {
        name: "financial_db_adapter.generate_summary",
        description: "Income, expense and profit totals for a timeframe, with category and time breakdowns.",
        operation: Operation::GenerateSummary,
        params: &[
            required("timeframe", ParamKind::Enum(TIMEFRAMES), "Preset window ending today, or custom"),
            optional("start_date", ParamKind::Date, "Start of a custom timeframe"),
            optional("end_date", ParamKind::Date, "End of a custom timeframe"),
            optional("kind", ParamKind::Enum(REPORT_KINDS), "Report kind, default summary"),
            optional("bucket", ParamKind::Enum(BUCKETS), "Time bucket, default month"),
        ],
    },
    FunctionSpec {
        name: "financial_db_adapter.analyze_revenue",
        description: "Revenue of consecutive periods and the growth of the latest one.",
        operation: Operation::AnalyzeRevenue,
        params: &[
            required("period", ParamKind::Enum(TREND_PERIODS), "Length of each compared window"),
            optional(
                "comparison_periods",
                ParamKind::Integer { min: 2, max: 12 },
                "Number of windows, default 3",
            ),
        ],
    },
    FunctionSpec {
        name: "financial_db_adapter.analyze_expenses",
        description: "Top expense categories and their share of total expenses.",
        operation: Operation::AnalyzeExpenses,
        params: &[
            required("period", ParamKind::Enum(ANALYSIS_PERIODS), "Window ending today"),
            optional(
                "top_categories",
                ParamKind::Integer { min: 1, max: 20 },
                "Number of categories, default 10",
            ),
        ],
    },
    FunctionSpec {
        name: "financial_db_adapter.analyze_cash_flow",
        description: "Monthly income, expenses and net flow with a next month projection.",
        operation: Operation::AnalyzeCashFlow,
        params: &[
            optional("period", ParamKind::Enum(ANALYSIS_PERIODS), "Window ending today, default quarter"),
            optional("start_date", ParamKind::Date, "Custom start, overrides period"),
            optional("end_date", ParamKind::Date, "Custom end, defaults to today"),
        ],
    },
    FunctionSpec {
        name: "financial_db_adapter.list_categories",
        description: "Categories of the merchant.",
        operation: Operation::ListCategories,
        params: &[
            optional("kind", ParamKind::Enum(TRANSACTION_KINDS), "Only income or expense categories"),
            optional("include_archived", ParamKind::Boolean, "Include archived categories"),
        ],
    },
    FunctionSpec {
        name: "financial_db_adapter.create_category",
        description: "Create an income or expense category.",
        operation: Operation::CreateCategory,
        params: &[
            required("name", NAME, "Category name, unique per kind"),
            required("kind", ParamKind::Enum(TRANSACTION_KINDS), "income or expense"),
            optional("description", NOTE, "Free text description"),
        ],
    },
    FunctionSpec {
        name: "currency_service.get_rate",
        description: "Exchange rate between two currencies, cached for one hour.",
        operation: Operation::GetRate,
        params: &[
            required("base_currency", ParamKind::Currency, "Currency being priced"),
            required("target_currency", ParamKind::Currency, "Currency of the price"),
            optional("force_refresh", ParamKind::Boolean, "Skip the cache"),
        ],
    },
    FunctionSpec {
        name: "currency_service.convert_currency",
        description: "Convert an amount between currencies.",
        operation: Operation::ConvertCurrency,
        params: &[
            required("amount", ParamKind::Amount, "Amount in major units"),
            required("from_currency", ParamKind::Currency, "Source currency"),
            required("to_currency", ParamKind::Currency, "Target currency"),
            optional("force_refresh", ParamKind::Boolean, "Skip the cache"),
        ],
    },
    FunctionSpec {
        name: "currency_service.get_multiple_rates",
        description: "Exchange rates from one base currency to several others.",
        operation: Operation::GetMultipleRates,
        params: &[
            required("base_currency", ParamKind::Currency, "Currency being priced"),
            required("target_currencies", ParamKind::Currencies, "Currencies of the prices"),
        ],
    },
    FunctionSpec {
        name: "currency_service.get_historical_rate",
        description: "Exchange rate on a past date within the last year.",
        operation: Operation::GetHistoricalRate,
        params: &[
            required("base_currency", ParamKind::Currency, "Currency being priced"),
            required("target_currency", ParamKind::Currency, "Currency of the price"),
            required("date", ParamKind::Date, "Day of the rate, not in the future"),
            optional("amount", ParamKind::Amount, "Amount to convert at that rate"),
        ],
    },
    FunctionSpec {
        name: "currency_service.supported_currencies",
        description: "Currency codes grouped by region.",
        operation: Operation::SupportedCurrencies,
        params: &[],
    },
    FunctionSpec {
        name: "currency_service.get_currency_info",
        description: "Name, symbol, region and decimal places of a currency, with its rate against USD.",
        operation: Operation::GetCurrencyInfo,
        params: &[required("currency_code", ParamKind::Currency, "ISO 4217 code")],
    },
    FunctionSpec {
        name: "calendar_service.create_event",
        description: "Schedule a deadline, meeting or reminder.",
        operation: Operation::CreateEvent,
        params: &[
            required("title", NAME, "Event title"),
            required("due_at", ParamKind::DateTime, "Due date and time (RFC 3339)"),
            optional("kind", ParamKind::Enum(EVENT_KINDS), "Event kind, default other"),
            optional("description", NOTE, "Free text description"),
            optional("amount", ParamKind::Amount, "Amount due, in the merchant currency"),
        ],
    },
    FunctionSpec {
        name: "calendar_service.find_events",
        description: "Events in a date window, optionally by kind or status.",
        operation: Operation::FindEvents,
        params: &[
            optional("start_date", ParamKind::Date, "First day included"),
            optional("end_date", ParamKind::Date, "Last day included"),
            optional("kind", ParamKind::Enum(EVENT_KINDS), "Only this kind"),
            optional("status", ParamKind::Enum(EVENT_FILTER_STATUSES), "Only this status"),
            optional(
                "max_results",
                ParamKind::Integer { min: 1, max: 250 },
                "Maximum events, default 10",
            ),
        ],
    },
    FunctionSpec {
        name: "calendar_service.update_event",
        description: "Change the title, description or due time of an event.",
        operation: Operation::UpdateEvent,
        params: &[
            required("event_id", ParamKind::Id, "Event to update"),
            optional("title", NAME, "New title"),
            optional("description", NOTE, "New description"),
            optional("due_at", ParamKind::DateTime, "New due date and time (RFC 3339)"),
        ],
    },
    FunctionSpec {
        name: "calendar_service.update_event_status",
        description: "Mark an event completed or cancelled.",
        operation: Operation::UpdateEventStatus,
        params: &[
            required("event_id", ParamKind::Id, "Event to update"),
            required("status", ParamKind::Enum(EVENT_STATUSES), "New status"),
        ],
    },
    FunctionSpec {
        name: "calendar_service.delete_event",
        description: "Remove an event.",
        operation: Operation::DeleteEvent,
        params: &[required("event_id", ParamKind::Id, "Event to delete")],
    },
    FunctionSpec {
        name: "calendar_service.check_availability",
        description: "Whether a time window is free of open events, with the conflicting ones.",
        operation: Operation::CheckAvailability,
        params: &[
            required("start_datetime", ParamKind::DateTime, "Window start (RFC 3339)"),
            required("end_datetime", ParamKind::DateTime, "Window end (RFC 3339)"),
        ],
    },
    FunctionSpec {
        name: "calendar_service.get_free_time",
        description: "Free slots of at least the given length on one day.",
        operation: Operation::GetFreeTime,
        params: &[
            required("date", ParamKind::Date, "Day to search (YYYY-MM-DD)"),
            optional(
                "duration_minutes",
                ParamKind::Integer { min: 15, max: 480 },
                "Minimum slot length, default 60",
            ),
            optional(
                "business_hours_only",
                ParamKind::Boolean,
                "Search 09:00 to 17:00 UTC only, default true",
            ),
        ],
    },
];

pub fn registry() -> &'static [FunctionSpec] {
    REGISTRY
}

/// Exact-name lookup; anything outside the table is `None`.
pub fn lookup(name: &str) -> Option<&'static FunctionSpec> {
    REGISTRY.iter().find(|spec| spec.name == name)
}

pub fn tools() -> Vec<ToolDefinition> {
    REGISTRY.iter().map(FunctionSpec::tool_definition).collect()
}

impl FunctionSpec {
    pub fn param(&self, name: &str) -> Option<&'static Param> {
        self.params.iter().find(|param| param.name == name)
    }

    pub fn tool_definition(&self) -> ToolDefinition {
        let mut properties = Map::new();
        for param in self.params {
            let mut schema = param.kind.json_schema();
            if let Value::Object(fields) = &mut schema {
                fields.insert("description".to_string(), param.description.into());
            }
            properties.insert(param.name.to_string(), schema);
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|param| param.required)
            .map(|param| param.name)
            .collect();
        ToolDefinition {
            name: self.name,
            description: self.description,
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }),
        }
    }
}

impl ParamKind {
    fn json_schema(self) -> Value {
        match self {
            Self::Text { max_len } => json!({"type": "string", "maxLength": max_len}),
            Self::Integer { min, max } => json!({"type": "integer", "minimum": min, "maximum": max}),
            Self::Amount => json!({"type": "number", "minimum": 0}),
            Self::Boolean => json!({"type": "boolean"}),
            Self::Date => json!({"type": "string", "format": "date"}),
            Self::DateTime => json!({"type": "string", "format": "date-time"}),
            Self::Currency => json!({"type": "string", "pattern": "^[A-Z]{3}$"}),
            Self::Currencies => json!({
                "type": "array",
                "items": {"type": "string", "pattern": "^[A-Z]{3}$"},
                "minItems": 1,
            }),
            Self::Id => json!({"type": "string", "format": "uuid"}),
            Self::Enum(values) => json!({"type": "string", "enum": values}),
        }
    }
}
