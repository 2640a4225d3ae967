use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, Statement, prelude::*};
use uuid::Uuid;

use crate::{
    Engine, EngineError, PaymentMethod, Period, ResultEngine, Transaction, TransactionKind,
    transactions, util::model_currency,
};

use super::{
    CashFlowMonth, CashFlowReport, CategoryShare, DateRange, PaymentMethodTotal, RevenueTrend,
    RevenueWindow, Timeframe,
    aggregate::{SCOPE, count_from_row, scope_values},
    div_round, percentage,
};

const MAX_TOP_LIMIT: u64 = 100;
const MAX_TREND_PERIODS: u32 = 12;

impl Engine {
    /// Category totals with their share of the kind total.
    pub async fn category_breakdown(
        &self,
        owner: Uuid,
        range: &DateRange,
        kind: Option<TransactionKind>,
    ) -> ResultEngine<Vec<CategoryShare>> {
        let totals = self.report_totals(owner, range, kind).await?;
        let rows = self.category_totals(owner, range, kind).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let whole = match row.kind {
                    TransactionKind::Income => totals.income_minor,
                    TransactionKind::Expense => totals.expense_minor,
                };
                CategoryShare {
                    percentage: percentage(row.total_minor, whole),
                    category_id: row.category_id,
                    category_name: row.category_name,
                    kind: row.kind,
                    total_minor: row.total_minor,
                    count: row.count,
                }
            })
            .collect())
    }

    /// Sum and count per payment method and kind, largest first.
    pub async fn payment_methods(
        &self,
        owner: Uuid,
        range: &DateRange,
    ) -> ResultEngine<Vec<PaymentMethodTotal>> {
        let sql = format!(
            "SELECT t.payment_method AS payment_method, t.kind AS kind, \
                    COALESCE(SUM(t.amount_minor), 0) AS total, COUNT(*) AS cnt \
             FROM transactions t \
             WHERE {SCOPE} \
             GROUP BY t.payment_method, t.kind \
             ORDER BY total DESC, t.payment_method ASC"
        );
        let rows = self
            .database
            .query_all(Statement::from_sql_and_values(
                self.database.get_database_backend(),
                sql,
                scope_values(owner, range),
            ))
            .await?;

        rows.iter()
            .map(|row| -> ResultEngine<PaymentMethodTotal> {
                let method: String = row.try_get("", "payment_method")?;
                let kind: String = row.try_get("", "kind")?;
                Ok(PaymentMethodTotal {
                    payment_method: PaymentMethod::try_from(method.as_str())?,
                    kind: TransactionKind::try_from(kind.as_str())?,
                    total_minor: row.try_get("", "total")?,
                    count: count_from_row(row, "cnt")?,
                })
            })
            .collect()
    }

    /// Largest transactions in the range, optionally of one kind.
    pub async fn top_transactions(
        &self,
        owner: Uuid,
        range: &DateRange,
        kind: Option<TransactionKind>,
        limit: u64,
    ) -> ResultEngine<Vec<Transaction>> {
        if !(1..=MAX_TOP_LIMIT).contains(&limit) {
            return Err(EngineError::InvalidAmount(format!(
                "limit must be between 1 and {MAX_TOP_LIMIT}"
            )));
        }
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::OwnerId.eq(owner))
            .filter(transactions::Column::OccurredAt.gte(range.start_utc()))
            .filter(transactions::Column::OccurredAt.lt(range.end_exclusive_utc()));
        if let Some(kind) = kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        query
            .order_by_desc(transactions::Column::AmountMinor)
            .order_by_desc(transactions::Column::OccurredAt)
            .limit(limit)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    /// Monthly income, expense and net over the range, with averages and a
    /// projection for the month after the range.
    ///
    /// Months without transactions are included with zero values.
    pub async fn cash_flow(&self, owner: Uuid, range: &DateRange) -> ResultEngine<CashFlowReport> {
        let merchant = self.require_merchant(&self.database, owner).await?;
        let currency = model_currency(&merchant.base_currency)?;
        let rows = self.monthly_sums(owner, range).await?;

        let first = Period::of(range.start());
        let last = Period::of(range.end());
        let mut months = Vec::new();
        let mut period = first;
        loop {
            let (income, expense) = rows
                .iter()
                .find(|(p, _, _)| *p == period)
                .map(|(_, income, expense)| (*income, *expense))
                .unwrap_or((0, 0));
            months.push(CashFlowMonth {
                period,
                income_minor: income,
                expense_minor: expense,
                net_minor: income.saturating_sub(expense),
            });
            if period >= last {
                break;
            }
            period = period.next();
        }

        let count = i64::try_from(months.len()).unwrap_or(1);
        let income_total = months
            .iter()
            .fold(0i64, |acc, m| acc.saturating_add(m.income_minor));
        let expense_total = months
            .iter()
            .fold(0i64, |acc, m| acc.saturating_add(m.expense_minor));
        let average_income_minor = div_round(income_total, count);
        let average_expense_minor = div_round(expense_total, count);
        let average_net_minor = average_income_minor.saturating_sub(average_expense_minor);

        Ok(CashFlowReport {
            range: *range,
            currency,
            months,
            average_income_minor,
            average_expense_minor,
            average_net_minor,
            projection: CashFlowMonth {
                period: last.next(),
                income_minor: average_income_minor,
                expense_minor: average_expense_minor,
                net_minor: average_net_minor,
            },
        })
    }

    /// Revenue over `periods` consecutive windows of the timeframe length,
    /// the latest ending on `today`.
    ///
    /// The growth rate compares the latest window with the previous one and
    /// is 0 when the previous revenue is 0.
    pub async fn revenue_trend(
        &self,
        owner: Uuid,
        period: Timeframe,
        periods: u32,
        today: NaiveDate,
    ) -> ResultEngine<RevenueTrend> {
        let days = match period {
            Timeframe::Month | Timeframe::Quarter | Timeframe::Year => period.days().unwrap_or(30),
            other => {
                return Err(EngineError::InvalidKind(format!(
                    "revenue trend supports month, quarter or year, got {}",
                    other.as_str()
                )));
            }
        };
        if !(2..=MAX_TREND_PERIODS).contains(&periods) {
            return Err(EngineError::InvalidAmount(format!(
                "periods must be between 2 and {MAX_TREND_PERIODS}"
            )));
        }
        let merchant = self.require_merchant(&self.database, owner).await?;
        let currency = model_currency(&merchant.base_currency)?;

        let mut windows = Vec::with_capacity(periods as usize);
        for index in (0..i64::from(periods)).rev() {
            let end = today - chrono::Duration::days(index * days);
            let range = DateRange::last_days(days, end)?;
            let totals = self
                .report_totals(owner, &range, Some(TransactionKind::Income))
                .await?;
            let count_i64 = i64::try_from(totals.income_count).unwrap_or(i64::MAX);
            windows.push(RevenueWindow {
                range,
                revenue_minor: totals.income_minor,
                count: totals.income_count,
                average_ticket_minor: div_round(totals.income_minor, count_i64),
            });
        }

        let growth_rate = match windows.as_slice() {
            [.., previous, latest] if previous.revenue_minor != 0 => {
                percentage(
                    latest.revenue_minor.saturating_sub(previous.revenue_minor),
                    previous.revenue_minor,
                )
            }
            _ => 0.0,
        };

        Ok(RevenueTrend {
            period,
            currency,
            windows,
            growth_rate,
        })
    }

    /// `(period, income, expense)` per calendar month with transactions.
    pub(crate) async fn monthly_sums(
        &self,
        owner: Uuid,
        range: &DateRange,
    ) -> ResultEngine<Vec<(Period, i64, i64)>> {
        let sql = format!(
            "SELECT strftime('%Y-%m', t.occurred_at) AS period, \
                    COALESCE(SUM(CASE WHEN t.kind = 'income' THEN t.amount_minor ELSE 0 END), 0) AS income, \
                    COALESCE(SUM(CASE WHEN t.kind = 'expense' THEN t.amount_minor ELSE 0 END), 0) AS expense \
             FROM transactions t \
             WHERE {SCOPE} \
             GROUP BY period \
             ORDER BY period ASC"
        );
        let rows = self
            .database
            .query_all(Statement::from_sql_and_values(
                self.database.get_database_backend(),
                sql,
                scope_values(owner, range),
            ))
            .await?;

        rows.iter()
            .map(|row| -> ResultEngine<(Period, i64, i64)> {
                let period: String = row.try_get("", "period")?;
                Ok((
                    Period::try_from(period.as_str())?,
                    row.try_get("", "income")?,
                    row.try_get("", "expense")?,
                ))
            })
            .collect()
    }
}
