//! Name-to-handler dispatch over the [`registry`](crate::registry).

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use engine::{
    Bucket, Currency, DateRange, EffectiveStatus, Engine, EventFilter, EventKind, EventStatus,
    EventUpdate, Money, NewEvent, NewTransaction, PaymentMethod, ReportKind, ReportRequest, Timeframe,
    TransactionFilter, TransactionKind,
};
use fx::CurrencyService;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    CalendarService, DispatchError,
    args::Args,
    registry::{self, Operation, ToolDefinition},
};

const DEFAULT_TREND_PERIODS: i64 = 3;
const DEFAULT_TOP_CATEGORIES: i64 = 10;
const DEFAULT_EVENT_RESULTS: i64 = 10;
const DEFAULT_SLOT_MINUTES: i64 = 60;

/// One step of a chained call.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChainStep {
    pub function: String,
    #[serde(default)]
    pub arguments: Value,
    /// Label of the step result, defaults to the function name.
    #[serde(default)]
    pub result_key: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    Failed,
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepOutcome {
    pub function: String,
    pub result_key: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChainReport {
    pub completed: bool,
    pub steps: Vec<StepOutcome>,
}

/// Validates calls against the registry and runs them for one owner.
///
/// The owner is always the authenticated merchant: it is a parameter of
/// every call and never read from the arguments.
#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<Engine>,
    fx: CurrencyService,
    calendar: CalendarService,
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, DispatchError> {
    serde_json::to_value(value).map_err(|err| DispatchError::Internal(err.to_string()))
}

fn parse<'a, T>(value: Option<&'a str>) -> Result<Option<T>, DispatchError>
where
    T: TryFrom<&'a str, Error = engine::EngineError>,
{
    value.map(T::try_from).transpose().map_err(Into::into)
}

impl Dispatcher {
    pub fn new(engine: Arc<Engine>, fx: CurrencyService, calendar: CalendarService) -> Self {
        Self {
            engine,
            fx,
            calendar,
        }
    }

    pub fn tools(&self) -> Vec<ToolDefinition> {
        registry::tools()
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn currency(&self) -> &CurrencyService {
        &self.fx
    }

    pub fn calendar(&self) -> &CalendarService {
        &self.calendar
    }

    pub async fn dispatch(
        &self,
        owner: Uuid,
        function: &str,
        arguments: &Value,
    ) -> Result<Value, DispatchError> {
        self.dispatch_at(owner, function, arguments, Utc::now()).await
    }

    /// Runs `function` as if the current time were `now`.
    pub async fn dispatch_at(
        &self,
        owner: Uuid,
        function: &str,
        arguments: &Value,
        now: DateTime<Utc>,
    ) -> Result<Value, DispatchError> {
        let spec = registry::lookup(function)
            .ok_or_else(|| DispatchError::UnknownFunction(function.to_string()))?;
        let args = Args::validate(spec, arguments)?;
        debug!(%owner, function = spec.name, "dispatching");

        let result = self.run(owner, spec.operation, &args, now).await;
        if let Err(err) = &result {
            match err {
                DispatchError::Internal(detail) | DispatchError::Upstream(detail) => {
                    warn!(%owner, function = spec.name, "{}: {detail}", err.code());
                }
                _ => debug!(%owner, function = spec.name, "rejected: {err}"),
            }
        }
        result
    }

    /// Runs the steps in order and stops at the first failure; the
    /// remaining steps are reported as skipped.
    pub async fn dispatch_chain(&self, owner: Uuid, steps: &[ChainStep]) -> ChainReport {
        let mut outcomes = Vec::with_capacity(steps.len());
        let mut failed = false;
        for step in steps {
            let result_key = step
                .result_key
                .clone()
                .unwrap_or_else(|| step.function.clone());
            let outcome = if failed {
                StepOutcome {
                    function: step.function.clone(),
                    result_key,
                    status: StepStatus::Skipped,
                    result: None,
                    error: None,
                }
            } else {
                match self.dispatch(owner, &step.function, &step.arguments).await {
                    Ok(result) => StepOutcome {
                        function: step.function.clone(),
                        result_key,
                        status: StepStatus::Ok,
                        result: Some(result),
                        error: None,
                    },
                    Err(err) => {
                        failed = true;
                        StepOutcome {
                            function: step.function.clone(),
                            result_key,
                            status: StepStatus::Failed,
                            result: None,
                            error: Some(err.to_string()),
                        }
                    }
                }
            };
            outcomes.push(outcome);
        }
        ChainReport {
            completed: !failed,
            steps: outcomes,
        }
    }

    async fn run(
        &self,
        owner: Uuid,
        operation: Operation,
        args: &Args,
        now: DateTime<Utc>,
    ) -> Result<Value, DispatchError> {
        let today = now.date_naive();
        match operation {
            Operation::QueryTransactions => self.query_transactions(owner, args, today).await,
            Operation::RecordTransaction => self.record_transaction(owner, args).await,
            Operation::GenerateSummary => self.generate_summary(owner, args, today).await,
            Operation::AnalyzeRevenue => {
                let period = parse::<Timeframe>(args.text("period"))?.unwrap_or(Timeframe::Month);
                let periods = args.integer("comparison_periods").unwrap_or(DEFAULT_TREND_PERIODS);
                let trend = self
                    .engine
                    .revenue_trend(owner, period, periods as u32, today)
                    .await?;
                to_json(&trend)
            }
            Operation::AnalyzeExpenses => self.analyze_expenses(owner, args, today).await,
            Operation::AnalyzeCashFlow => {
                let range = match args.date("start_date") {
                    Some(start) => DateRange::new(start, args.date("end_date").unwrap_or(today))?,
                    None => {
                        let period = parse::<Timeframe>(args.text("period"))?
                            .unwrap_or(Timeframe::Quarter);
                        period.range(today)?
                    }
                };
                to_json(&self.engine.cash_flow(owner, &range).await?)
            }
            Operation::ListCategories => {
                let kind = parse::<TransactionKind>(args.text("kind"))?;
                let include_archived = args.flag("include_archived").unwrap_or(false);
                let categories = self
                    .engine
                    .list_categories(owner, kind, include_archived)
                    .await?;
                Ok(json!({ "count": categories.len(), "categories": to_json(&categories)? }))
            }
            Operation::CreateCategory => {
                let kind = TransactionKind::try_from(args.required_text("kind")?)?;
                let category = self
                    .engine
                    .create_category(
                        owner,
                        args.required_text("name")?,
                        kind,
                        args.text("description"),
                    )
                    .await?;
                to_json(&category)
            }
            Operation::GetRate => {
                let quote = self
                    .fx
                    .get_rate(
                        args.required_currency("base_currency")?,
                        args.required_currency("target_currency")?,
                        args.flag("force_refresh").unwrap_or(false),
                    )
                    .await?;
                to_json(&quote)
            }
            Operation::ConvertCurrency => {
                let conversion = self
                    .fx
                    .convert(
                        args.required_amount("amount")?,
                        args.required_currency("from_currency")?,
                        args.required_currency("to_currency")?,
                        args.flag("force_refresh").unwrap_or(false),
                    )
                    .await?;
                to_json(&conversion)
            }
            Operation::GetMultipleRates => {
                let base = args.required_currency("base_currency")?;
                let quotes = args.currencies("target_currencies").unwrap_or_default();
                let rates = self.fx.get_multiple_rates(base, quotes).await;
                Ok(json!({ "base": base, "rates": to_json(&rates)? }))
            }
            Operation::GetHistoricalRate => {
                let historical = self
                    .fx
                    .historical_rate_at(
                        args.required_currency("base_currency")?,
                        args.required_currency("target_currency")?,
                        args.required_date("date")?,
                        args.amount("amount"),
                        today,
                    )
                    .await?;
                to_json(&historical)
            }
            Operation::SupportedCurrencies => {
                Ok(json!({ "groups": to_json(&self.fx.supported_currencies())? }))
            }
            Operation::GetCurrencyInfo => self.currency_info(args).await,
            Operation::CreateEvent => self.create_event(owner, args).await,
            Operation::FindEvents => self.find_events(owner, args, now).await,
            Operation::UpdateEvent => {
                let update = EventUpdate {
                    title: args.text("title").map(ToString::to_string),
                    description: args.text("description").map(|text| Some(text.to_string())),
                    due_at: args.datetime("due_at"),
                    status: None,
                };
                if update.is_empty() {
                    return Err(DispatchError::InvalidArguments(
                        "give at least one of `title`, `description` or `due_at`".to_string(),
                    ));
                }
                let event = self
                    .calendar
                    .update_event(owner, args.required_id("event_id")?, update)
                    .await?;
                to_json(&event)
            }
            Operation::UpdateEventStatus => {
                let status = EventStatus::try_from(args.required_text("status")?)?;
                let event = self
                    .calendar
                    .update_status(owner, args.required_id("event_id")?, status)
                    .await?;
                to_json(&event)
            }
            Operation::DeleteEvent => {
                let event = self
                    .calendar
                    .delete_event(owner, args.required_id("event_id")?)
                    .await?;
                Ok(json!({ "deleted": true, "event": to_json(&event)? }))
            }
            Operation::CheckAvailability => {
                let availability = self
                    .calendar
                    .check_availability(
                        owner,
                        args.required_datetime("start_datetime")?,
                        args.required_datetime("end_datetime")?,
                    )
                    .await?;
                to_json(&availability)
            }
            Operation::GetFreeTime => {
                let date = args.required_date("date")?;
                let minutes = args.integer("duration_minutes").unwrap_or(DEFAULT_SLOT_MINUTES);
                let business_hours_only = args.flag("business_hours_only").unwrap_or(true);
                let slots = self
                    .calendar
                    .free_time(owner, date, minutes, business_hours_only)
                    .await?;
                Ok(json!({
                    "date": date,
                    "duration_minutes": minutes,
                    "business_hours_only": business_hours_only,
                    "count": slots.len(),
                    "free_slots": to_json(&slots)?,
                }))
            }
        }
    }

    /// Static currency facts plus the live USD rate when one is available.
    async fn currency_info(&self, args: &Args) -> Result<Value, DispatchError> {
        let currency = args.required_currency("currency_code")?;
        let info = self.fx.currency_info(currency)?;
        let rate_vs_usd = match self.fx.get_rate(Currency::USD, currency, false).await {
            Ok(quote) => Some(quote.rate),
            Err(err) => {
                debug!(%currency, "no USD rate for currency info: {err}");
                None
            }
        };
        let mut value = to_json(&info)?;
        value["current_rate_vs_usd"] = to_json(&rate_vs_usd)?;
        Ok(value)
    }

    async fn query_transactions(
        &self,
        owner: Uuid,
        args: &Args,
        today: NaiveDate,
    ) -> Result<Value, DispatchError> {
        let range = match (args.date("start_date"), args.date("end_date")) {
            (Some(start), end) => Some(DateRange::new(start, end.unwrap_or(today))?),
            (None, Some(_)) => {
                return Err(DispatchError::InvalidArguments(
                    "`end_date` requires `start_date`".to_string(),
                ));
            }
            (None, None) => None,
        };
        let filter = TransactionFilter {
            kind: parse::<TransactionKind>(args.text("kind"))?,
            category_id: args.id("category_id"),
            payment_method: parse::<PaymentMethod>(args.text("payment_method"))?,
            range,
            limit: args.integer("limit").map(|limit| limit as u64),
        };
        let transactions = self.engine.list_transactions(owner, &filter).await?;
        Ok(json!({ "count": transactions.len(), "transactions": to_json(&transactions)? }))
    }

    async fn record_transaction(&self, owner: Uuid, args: &Args) -> Result<Value, DispatchError> {
        let merchant = self.engine.merchant(owner).await?;
        let currency = args.currency("currency").unwrap_or(merchant.base_currency);
        let amount = Money::from_decimal(args.required_amount("amount")?, currency)?;
        let input = NewTransaction {
            currency: Some(currency),
            category_id: args.id("category_id"),
            payment_method: parse::<PaymentMethod>(args.text("payment_method"))?
                .unwrap_or_default(),
            description: args.text("description").map(ToString::to_string),
            reference_id: args.text("reference_id").map(ToString::to_string),
            occurred_at: args.datetime("occurred_at"),
            ..NewTransaction::new(
                TransactionKind::try_from(args.required_text("kind")?)?,
                amount.minor(),
            )
        };
        let transaction = self.engine.record_transaction(owner, input).await?;
        Ok(json!({
            "transaction": to_json(&transaction)?,
            "amount": Money::new(transaction.amount_minor).format(transaction.currency),
        }))
    }

    async fn generate_summary(
        &self,
        owner: Uuid,
        args: &Args,
        today: NaiveDate,
    ) -> Result<Value, DispatchError> {
        let timeframe = Timeframe::try_from(args.required_text("timeframe")?)?;
        let range = match timeframe {
            Timeframe::Custom => match (args.date("start_date"), args.date("end_date")) {
                (Some(start), Some(end)) => DateRange::new(start, end)?,
                _ => {
                    return Err(DispatchError::InvalidArguments(
                        "custom timeframe requires `start_date` and `end_date`".to_string(),
                    ));
                }
            },
            preset => preset.range(today)?,
        };
        let request = ReportRequest {
            kind: parse::<ReportKind>(args.text("kind"))?.unwrap_or_default(),
            bucket: parse::<Bucket>(args.text("bucket"))?.unwrap_or_default(),
            ..ReportRequest::new(range)
        };
        to_json(&self.engine.generate_report(owner, &request).await?)
    }

    async fn analyze_expenses(
        &self,
        owner: Uuid,
        args: &Args,
        today: NaiveDate,
    ) -> Result<Value, DispatchError> {
        let period = Timeframe::try_from(args.required_text("period")?)?;
        let range = period.range(today)?;
        let top = args.integer("top_categories").unwrap_or(DEFAULT_TOP_CATEGORIES) as usize;
        let mut categories = self
            .engine
            .category_breakdown(owner, &range, Some(TransactionKind::Expense))
            .await?;
        let total_minor = categories
            .iter()
            .fold(0i64, |acc, share| acc.saturating_add(share.total_minor));
        let category_count = categories.len();
        categories.truncate(top);
        Ok(json!({
            "range": to_json(&range)?,
            "total_expense_minor": total_minor,
            "category_count": category_count,
            "top_categories": to_json(&categories)?,
        }))
    }

    async fn create_event(&self, owner: Uuid, args: &Args) -> Result<Value, DispatchError> {
        let amount_minor = match args.amount("amount") {
            Some(amount) => {
                let merchant = self.engine.merchant(owner).await?;
                Some(Money::from_decimal(amount, merchant.base_currency)?.minor())
            }
            None => None,
        };
        let input = NewEvent {
            title: args.required_text("title")?.to_string(),
            description: args.text("description").map(ToString::to_string),
            kind: parse::<EventKind>(args.text("kind"))?.unwrap_or(EventKind::Other),
            due_at: args.required_datetime("due_at")?,
            amount_minor,
            calendar_ref: None,
        };
        let event = self.calendar.create_event(owner, input).await?;
        to_json(&event)
    }

    async fn find_events(
        &self,
        owner: Uuid,
        args: &Args,
        now: DateTime<Utc>,
    ) -> Result<Value, DispatchError> {
        let from = args
            .date("start_date")
            .map(|day| day.and_time(NaiveTime::MIN).and_utc());
        let to = args
            .date("end_date")
            .map(|day| (day + Duration::days(1)).and_time(NaiveTime::MIN).and_utc());
        let filter = EventFilter {
            from,
            to,
            kind: parse::<EventKind>(args.text("kind"))?,
            status: parse::<EffectiveStatus>(args.text("status"))?,
            limit: Some(args.integer("max_results").unwrap_or(DEFAULT_EVENT_RESULTS) as u64),
        };
        let events = self.calendar.find_events(owner, &filter, now).await?;
        let listed: Vec<Value> = events
            .iter()
            .map(|event| -> Result<Value, DispatchError> {
                let mut value = to_json(event)?;
                value["effective_status"] = json!(event.effective_status(now));
                Ok(value)
            })
            .collect::<Result<_, _>>()?;
        Ok(json!({ "count": listed.len(), "events": listed }))
    }
}
