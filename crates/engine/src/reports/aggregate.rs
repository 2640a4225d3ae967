use sea_orm::{ConnectionTrait, QueryResult, Statement, Value};
use uuid::Uuid;

use crate::{Engine, EngineError, ResultEngine, TransactionKind, util::model_currency};

use super::{Bucket, BucketTotal, CategoryTotal, DateRange, Report, ReportRequest, Totals};

/// `WHERE` clause shared by every ledger aggregate.
pub(super) const SCOPE: &str = "t.owner_id = ? AND t.occurred_at >= ? AND t.occurred_at < ?";

pub(super) fn scope_values(owner: Uuid, range: &DateRange) -> Vec<Value> {
    vec![
        owner.into(),
        range.start_utc().into(),
        range.end_exclusive_utc().into(),
    ]
}

/// Appends `AND t.kind = ?` when the aggregate is restricted to one kind.
pub(super) fn kind_clause(kind: Option<TransactionKind>, values: &mut Vec<Value>) -> &'static str {
    match kind {
        Some(kind) => {
            values.push(kind.as_str().into());
            " AND t.kind = ?"
        }
        None => "",
    }
}

pub(super) fn uuid_from_row(row: &QueryResult, column: &str) -> ResultEngine<Option<Uuid>> {
    let bytes: Option<Vec<u8>> = row.try_get("", column)?;
    bytes
        .map(|bytes| {
            Uuid::from_slice(&bytes)
                .map_err(|_| EngineError::InvalidId(format!("invalid uuid in column {column}")))
        })
        .transpose()
}

pub(super) fn count_from_row(row: &QueryResult, column: &str) -> ResultEngine<u64> {
    let count: i64 = row.try_get("", column)?;
    Ok(u64::try_from(count).unwrap_or_default())
}

impl Engine {
    /// Aggregates the owner's ledger over an inclusive date range.
    ///
    /// Totals always equal the sum of the signed amounts of the matching
    /// transactions; reversal entries take part with their negative amount.
    pub async fn generate_report(
        &self,
        owner: Uuid,
        request: &ReportRequest,
    ) -> ResultEngine<Report> {
        let merchant = self.require_merchant(&self.database, owner).await?;
        let currency = model_currency(&merchant.base_currency)?;
        let only = request.kind.only_kind();

        let totals = self.report_totals(owner, &request.range, only).await?;
        let by_category = if request.kind.has_category_breakdown() {
            self.category_totals(owner, &request.range, only).await?
        } else {
            Vec::new()
        };
        let by_bucket = self
            .bucket_totals(owner, &request.range, only, request.bucket)
            .await?;

        tracing::debug!(
            owner = %owner,
            kind = request.kind.as_str(),
            transactions = totals.transaction_count,
            "report generated"
        );

        Ok(Report {
            owner_id: owner,
            kind: request.kind,
            range: request.range,
            bucket: request.bucket,
            currency,
            totals,
            by_category,
            by_bucket,
        })
    }

    pub(crate) async fn report_totals(
        &self,
        owner: Uuid,
        range: &DateRange,
        only: Option<TransactionKind>,
    ) -> ResultEngine<Totals> {
        let mut values = scope_values(owner, range);
        let kind_filter = kind_clause(only, &mut values);
        let sql = format!(
            "SELECT t.kind AS kind, COALESCE(SUM(t.amount_minor), 0) AS total, COUNT(*) AS cnt \
             FROM transactions t \
             WHERE {SCOPE}{kind_filter} \
             GROUP BY t.kind"
        );
        let rows = self
            .database
            .query_all(Statement::from_sql_and_values(
                self.database.get_database_backend(),
                sql,
                values,
            ))
            .await?;

        let mut totals = Totals::default();
        for row in rows {
            let kind: String = row.try_get("", "kind")?;
            let total: i64 = row.try_get("", "total")?;
            let count = count_from_row(&row, "cnt")?;
            match TransactionKind::try_from(kind.as_str())? {
                TransactionKind::Income => {
                    totals.income_minor = total;
                    totals.income_count = count;
                }
                TransactionKind::Expense => {
                    totals.expense_minor = total;
                    totals.expense_count = count;
                }
            }
        }
        totals.profit_minor = totals.income_minor.saturating_sub(totals.expense_minor);
        totals.transaction_count = totals.income_count + totals.expense_count;
        Ok(totals)
    }

    /// Per `(category, kind)` totals, largest first. Uncategorized rows come
    /// back with a `None` category.
    pub(crate) async fn category_totals(
        &self,
        owner: Uuid,
        range: &DateRange,
        only: Option<TransactionKind>,
    ) -> ResultEngine<Vec<CategoryTotal>> {
        let mut values = scope_values(owner, range);
        let kind_filter = kind_clause(only, &mut values);
        let sql = format!(
            "SELECT t.category_id AS category_id, c.name AS category_name, t.kind AS kind, \
                    COALESCE(SUM(t.amount_minor), 0) AS total, COUNT(*) AS cnt \
             FROM transactions t \
             LEFT JOIN categories c ON c.id = t.category_id \
             WHERE {SCOPE}{kind_filter} \
             GROUP BY t.category_id, c.name, t.kind \
             ORDER BY total DESC, t.kind ASC, c.name ASC"
        );
        let rows = self
            .database
            .query_all(Statement::from_sql_and_values(
                self.database.get_database_backend(),
                sql,
                values,
            ))
            .await?;

        rows.iter()
            .map(|row| -> ResultEngine<CategoryTotal> {
                let kind: String = row.try_get("", "kind")?;
                Ok(CategoryTotal {
                    category_id: uuid_from_row(row, "category_id")?,
                    category_name: row.try_get("", "category_name")?,
                    kind: TransactionKind::try_from(kind.as_str())?,
                    total_minor: row.try_get("", "total")?,
                    count: count_from_row(row, "cnt")?,
                })
            })
            .collect()
    }

    /// Per time bucket income, expense and net, oldest bucket first.
    pub(crate) async fn bucket_totals(
        &self,
        owner: Uuid,
        range: &DateRange,
        only: Option<TransactionKind>,
        bucket: Bucket,
    ) -> ResultEngine<Vec<BucketTotal>> {
        let mut values: Vec<Value> = vec![bucket.sql_format().into()];
        values.extend(scope_values(owner, range));
        let kind_filter = kind_clause(only, &mut values);
        let sql = format!(
            "SELECT strftime(?, t.occurred_at) AS bucket, \
                    COALESCE(SUM(CASE WHEN t.kind = 'income' THEN t.amount_minor ELSE 0 END), 0) AS income, \
                    COALESCE(SUM(CASE WHEN t.kind = 'expense' THEN t.amount_minor ELSE 0 END), 0) AS expense, \
                    COUNT(*) AS cnt \
             FROM transactions t \
             WHERE {SCOPE}{kind_filter} \
             GROUP BY bucket \
             ORDER BY bucket ASC"
        );
        let rows = self
            .database
            .query_all(Statement::from_sql_and_values(
                self.database.get_database_backend(),
                sql,
                values,
            ))
            .await?;

        rows.iter()
            .map(|row| -> ResultEngine<BucketTotal> {
                let income: i64 = row.try_get("", "income")?;
                let expense: i64 = row.try_get("", "expense")?;
                Ok(BucketTotal {
                    bucket: row.try_get("", "bucket")?,
                    income_minor: income,
                    expense_minor: expense,
                    net_minor: income.saturating_sub(expense),
                    count: count_from_row(row, "cnt")?,
                })
            })
            .collect()
    }
}
