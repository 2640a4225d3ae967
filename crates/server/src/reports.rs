//! Reporting endpoints: full reports, preset windows, focused queries and
//! exports.

use api_types::report::{
    ExportQuery, QueryType, QuickReport, ReportGenerate, ReportQuery, ReportQueryResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use engine::{
    Bucket, DateRange, EngineError, Merchant, Report, ReportKind, ReportRequest, Timeframe,
    TransactionFilter,
};
use serde::Serialize;
use serde_json::json;

use crate::{
    ServerError,
    server::ServerState,
    transactions::{engine_kind, map_transaction, optional_range},
};

const MAX_REPORT_DAYS: i64 = 366;
const DEFAULT_QUERY_DAYS: i64 = 30;
const DEFAULT_TOP_LIMIT: u64 = 10;
const DEFAULT_TREND_PERIODS: u32 = 3;
const EXPORT_ROW_LIMIT: u64 = 1000;

fn report_request(
    range: DateRange,
    kind: Option<&str>,
    bucket: Option<&str>,
) -> Result<ReportRequest, EngineError> {
    Ok(ReportRequest {
        range,
        kind: kind.map(ReportKind::try_from).transpose()?.unwrap_or_default(),
        bucket: bucket.map(Bucket::try_from).transpose()?.unwrap_or_default(),
    })
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value, ServerError> {
    serde_json::to_value(value)
        .map_err(|err| ServerError::Internal(format!("failed to encode report: {err}")))
}

pub async fn generate(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Json(payload): Json<ReportGenerate>,
) -> Result<Json<Report>, ServerError> {
    let range = DateRange::new(payload.start_date, payload.end_date)?;
    if range.days() > MAX_REPORT_DAYS {
        return Err(EngineError::InvalidDateRange(format!(
            "a report covers at most {MAX_REPORT_DAYS} days"
        ))
        .into());
    }
    let request = report_request(range, payload.kind.as_deref(), payload.bucket.as_deref())?;
    let report = state.engine.generate_report(merchant.id, &request).await?;
    Ok(Json(report))
}

pub async fn quick(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Json(payload): Json<QuickReport>,
) -> Result<Json<Report>, ServerError> {
    let timeframe = Timeframe::try_from(payload.period.as_str())?;
    let range = timeframe.range(Utc::now().date_naive())?;
    let request = report_request(range, payload.kind.as_deref(), payload.bucket.as_deref())?;
    let report = state.engine.generate_report(merchant.id, &request).await?;
    Ok(Json(report))
}

pub async fn query(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Json(payload): Json<ReportQuery>,
) -> Result<Json<ReportQueryResponse>, ServerError> {
    let owner = merchant.id;
    let range = optional_range(payload.start_date, payload.end_date, DEFAULT_QUERY_DAYS)?;
    let kind = payload.kind.map(engine_kind);

    let result = match payload.query_type {
        QueryType::CategoryBreakdown => {
            to_value(&state.engine.category_breakdown(owner, &range, kind).await?)?
        }
        QueryType::PaymentMethods => to_value(&state.engine.payment_methods(owner, &range).await?)?,
        QueryType::TopTransactions => {
            let transactions: Vec<_> = state
                .engine
                .top_transactions(
                    owner,
                    &range,
                    kind,
                    payload.limit.unwrap_or(DEFAULT_TOP_LIMIT),
                )
                .await?
                .into_iter()
                .map(map_transaction)
                .collect();
            to_value(&transactions)?
        }
        QueryType::CashFlow => to_value(&state.engine.cash_flow(owner, &range).await?)?,
        QueryType::RevenueTrend => {
            let period = Timeframe::try_from(payload.period.as_deref().unwrap_or("month"))?;
            let trend = state
                .engine
                .revenue_trend(
                    owner,
                    period,
                    payload.periods.unwrap_or(DEFAULT_TREND_PERIODS),
                    Utc::now().date_naive(),
                )
                .await?;
            to_value(&trend)?
        }
    };

    Ok(Json(ReportQueryResponse {
        query_type: payload.query_type,
        result,
    }))
}

fn csv_export(transactions: &[engine::Transaction]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "id",
        "occurred_at",
        "kind",
        "amount",
        "currency",
        "category_id",
        "payment_method",
        "description",
        "reference_id",
        "reverses_id",
    ])?;
    for tx in transactions {
        let amount = engine::Money::new(tx.amount_minor).to_decimal(tx.currency);
        writer.write_record([
            tx.id.to_string(),
            tx.occurred_at.to_rfc3339(),
            tx.kind.as_str().to_string(),
            amount.to_string(),
            tx.currency.code().to_string(),
            tx.category_id.map(|id| id.to_string()).unwrap_or_default(),
            tx.payment_method.as_str().to_string(),
            tx.description.clone().unwrap_or_default(),
            tx.reference_id.clone().unwrap_or_default(),
            tx.reverses_id.map(|id| id.to_string()).unwrap_or_default(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

/// Report plus transaction listing for a range, as JSON or CSV.
pub async fn export(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Path(format): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ServerError> {
    let (Some(start), Some(end)) = (query.start_date, query.end_date) else {
        return Err(ServerError::Generic(
            "start_date and end_date are required".to_string(),
        ));
    };
    if format != "json" && format != "csv" {
        return Err(ServerError::Generic(
            "unsupported format, use json or csv".to_string(),
        ));
    }
    let range = DateRange::new(start, end)?;
    let filter = TransactionFilter {
        range: Some(range),
        limit: Some(EXPORT_ROW_LIMIT),
        ..TransactionFilter::default()
    };
    let transactions = state.engine.list_transactions(merchant.id, &filter).await?;
    let filename = format!("financial_report_{start}_{end}.{format}");
    let disposition = format!("attachment; filename=\"{filename}\"");
    tracing::info!(owner = %merchant.id, rows = transactions.len(), "exporting {filename}");

    if format == "csv" {
        let body = csv_export(&transactions)
            .map_err(|err| ServerError::Internal(format!("csv export failed: {err}")))?;
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            body,
        )
            .into_response());
    }

    let report = state
        .engine
        .generate_report(merchant.id, &ReportRequest::new(range))
        .await?;
    let transactions: Vec<_> = transactions.into_iter().map(map_transaction).collect();
    Ok((
        [(header::CONTENT_DISPOSITION, disposition)],
        Json(json!({ "report": report, "transactions": transactions })),
    )
        .into_response())
}
