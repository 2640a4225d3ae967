//! Report aggregation over the ledger.
//!
//! Every aggregate is computed by the database (`SUM`/`COUNT` grouped by
//! category or time bucket) and restricted to one owner and one inclusive
//! calendar range. Reports have no side effects; empty ranges produce zeroed
//! totals.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, PaymentMethod, Period, ResultEngine, TransactionKind};

mod aggregate;
mod queries;

/// Inclusive range of calendar days, interpreted in UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ResultEngine<Self> {
        if end < start {
            return Err(EngineError::InvalidDateRange(format!(
                "end date {end} is before start date {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` days ending on `today` (inclusive).
    pub fn last_days(days: i64, today: NaiveDate) -> ResultEngine<Self> {
        if days < 1 {
            return Err(EngineError::InvalidDateRange(format!(
                "a range must span at least one day, got {days}"
            )));
        }
        Self::new(today - Duration::days(days - 1), today)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, bounds included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Midnight UTC of the first day.
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Midnight UTC of the day after the last one.
    pub fn end_exclusive_utc(&self) -> DateTime<Utc> {
        (self.end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start_utc() && at < self.end_exclusive_utc()
    }
}

/// Preset report windows ending today.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Week,
    Month,
    Quarter,
    Year,
    Custom,
}

impl Timeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
            Self::Custom => "custom",
        }
    }

    /// Window length in days, `None` for `custom`.
    pub fn days(self) -> Option<i64> {
        match self {
            Self::Week => Some(7),
            Self::Month => Some(30),
            Self::Quarter => Some(90),
            Self::Year => Some(365),
            Self::Custom => None,
        }
    }

    /// Resolves the preset against `today`. `custom` needs explicit dates.
    pub fn range(self, today: NaiveDate) -> ResultEngine<DateRange> {
        match self.days() {
            Some(days) => DateRange::last_days(days, today),
            None => Err(EngineError::InvalidDateRange(
                "custom timeframe requires start and end dates".to_string(),
            )),
        }
    }
}

impl TryFrom<&str> for Timeframe {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "quarter" => Ok(Self::Quarter),
            "year" => Ok(Self::Year),
            "custom" => Ok(Self::Custom),
            other => Err(EngineError::InvalidKind(format!("invalid timeframe: {other}"))),
        }
    }
}

/// Time bucket granularity for `Report::by_bucket`.
///
/// `week` labels are SQLite's `%W` week of year: weeks start on Monday and
/// the days before the first Monday of January fall in week `00`. They are
/// not ISO 8601 weeks (`2024-01-01` is `2024-W01`, `2023-01-01` is
/// `2023-W00`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Day,
    Week,
    #[default]
    Month,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// SQLite `strftime` pattern producing the bucket label; see the type
    /// docs for the week numbering.
    pub(crate) fn sql_format(self) -> &'static str {
        match self {
            Self::Day => "%Y-%m-%d",
            Self::Week => "%Y-W%W",
            Self::Month => "%Y-%m",
        }
    }
}

impl TryFrom<&str> for Bucket {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(EngineError::InvalidKind(format!("invalid bucket: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Income,
    Expense,
    ProfitLoss,
    #[default]
    Summary,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::ProfitLoss => "profit_loss",
            Self::Summary => "summary",
        }
    }

    /// The single transaction kind aggregated, `None` when both are.
    pub(crate) fn only_kind(self) -> Option<TransactionKind> {
        match self {
            Self::Income => Some(TransactionKind::Income),
            Self::Expense => Some(TransactionKind::Expense),
            Self::ProfitLoss | Self::Summary => None,
        }
    }

    pub(crate) fn has_category_breakdown(self) -> bool {
        !matches!(self, Self::ProfitLoss)
    }
}

impl TryFrom<&str> for ReportKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "profit_loss" | "profit-loss" => Ok(Self::ProfitLoss),
            "summary" => Ok(Self::Summary),
            other => Err(EngineError::InvalidKind(format!("invalid report kind: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportRequest {
    pub range: DateRange,
    pub kind: ReportKind,
    pub bucket: Bucket,
}

impl ReportRequest {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            kind: ReportKind::default(),
            bucket: Bucket::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub income_minor: i64,
    pub expense_minor: i64,
    pub profit_minor: i64,
    pub income_count: u64,
    pub expense_count: u64,
    pub transaction_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub kind: TransactionKind,
    pub total_minor: i64,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BucketTotal {
    pub bucket: String,
    pub income_minor: i64,
    pub expense_minor: i64,
    pub net_minor: i64,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    pub owner_id: Uuid,
    pub kind: ReportKind,
    pub range: DateRange,
    pub bucket: Bucket,
    pub currency: Currency,
    pub totals: Totals,
    pub by_category: Vec<CategoryTotal>,
    pub by_bucket: Vec<BucketTotal>,
}

/// A category total with its share of the kind total, in percent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub kind: TransactionKind,
    pub total_minor: i64,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentMethodTotal {
    pub payment_method: PaymentMethod,
    pub kind: TransactionKind,
    pub total_minor: i64,
    pub count: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CashFlowMonth {
    pub period: Period,
    pub income_minor: i64,
    pub expense_minor: i64,
    pub net_minor: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CashFlowReport {
    pub range: DateRange,
    pub currency: Currency,
    pub months: Vec<CashFlowMonth>,
    pub average_income_minor: i64,
    pub average_expense_minor: i64,
    pub average_net_minor: i64,
    /// Next month after the range, projected from the monthly averages.
    pub projection: CashFlowMonth,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RevenueWindow {
    pub range: DateRange,
    pub revenue_minor: i64,
    pub count: u64,
    pub average_ticket_minor: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RevenueTrend {
    pub period: Timeframe,
    pub currency: Currency,
    /// Oldest window first.
    pub windows: Vec<RevenueWindow>,
    /// Latest window against the previous one, in percent.
    pub growth_rate: f64,
}

/// Integer division rounding half away from zero.
pub(crate) fn div_round(total: i64, count: i64) -> i64 {
    if count == 0 {
        return 0;
    }
    let quotient = total / count;
    let remainder = total % count;
    if remainder.abs() * 2 >= count.abs() {
        quotient + total.signum() * count.signum()
    } else {
        quotient
    }
}

/// Percentage rounded to two decimals, 0 when `whole` is 0.
pub(crate) fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64) * 10_000.0 / (whole as f64)).round() / 100.0
}
