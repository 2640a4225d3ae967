//! Ledger API endpoints.

use api_types::{
    TransactionKind,
    transaction::{
        PaymentMethod, TransactionListQuery, TransactionListResponse, TransactionNew,
        TransactionReverse, TransactionView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use engine::{Currency, DateRange, Merchant, NewTransaction, TransactionFilter};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub(crate) fn engine_kind(kind: TransactionKind) -> engine::TransactionKind {
    match kind {
        TransactionKind::Income => engine::TransactionKind::Income,
        TransactionKind::Expense => engine::TransactionKind::Expense,
    }
}

pub(crate) fn api_kind(kind: engine::TransactionKind) -> TransactionKind {
    match kind {
        engine::TransactionKind::Income => TransactionKind::Income,
        engine::TransactionKind::Expense => TransactionKind::Expense,
    }
}

fn engine_method(method: PaymentMethod) -> engine::PaymentMethod {
    match method {
        PaymentMethod::Cash => engine::PaymentMethod::Cash,
        PaymentMethod::Card => engine::PaymentMethod::Card,
        PaymentMethod::BankTransfer => engine::PaymentMethod::BankTransfer,
        PaymentMethod::Mobile => engine::PaymentMethod::Mobile,
        PaymentMethod::Other => engine::PaymentMethod::Other,
    }
}

fn api_method(method: engine::PaymentMethod) -> PaymentMethod {
    match method {
        engine::PaymentMethod::Cash => PaymentMethod::Cash,
        engine::PaymentMethod::Card => PaymentMethod::Card,
        engine::PaymentMethod::BankTransfer => PaymentMethod::BankTransfer,
        engine::PaymentMethod::Mobile => PaymentMethod::Mobile,
        engine::PaymentMethod::Other => PaymentMethod::Other,
    }
}

pub(crate) fn map_transaction(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: api_kind(tx.kind),
        amount_minor: tx.amount_minor,
        signed_amount_minor: tx.amount_minor * tx.kind.sign(),
        currency: tx.currency.code().to_string(),
        category_id: tx.category_id,
        payment_method: api_method(tx.payment_method),
        description: tx.description,
        reference_id: tx.reference_id,
        occurred_at: tx.occurred_at,
        created_at: tx.created_at,
        reverses_id: tx.reverses_id,
    }
}

/// Builds an inclusive range from optional bounds. A missing start is the
/// `default_days` days ending on the end date, a missing end is today.
pub(crate) fn optional_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    default_days: i64,
) -> Result<DateRange, ServerError> {
    let today = Utc::now().date_naive();
    let range = match (start, end) {
        (Some(start), Some(end)) => DateRange::new(start, end)?,
        (Some(start), None) => DateRange::new(start, today)?,
        (None, end) => DateRange::last_days(default_days, end.unwrap_or(today))?,
    };
    Ok(range)
}

pub async fn list(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let range = match (query.start_date, query.end_date) {
        (None, None) => None,
        (start, end) => Some(optional_range(start, end, 30)?),
    };
    let filter = TransactionFilter {
        kind: query.kind.map(engine_kind),
        category_id: query.category_id,
        payment_method: query.payment_method.map(engine_method),
        range,
        limit: query.limit,
    };
    let transactions = state
        .engine
        .list_transactions(merchant.id, &filter)
        .await?
        .into_iter()
        .map(map_transaction)
        .collect();

    Ok(Json(TransactionListResponse { transactions }))
}

pub async fn create(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let currency = payload
        .currency
        .as_deref()
        .map(Currency::try_from)
        .transpose()?;
    let input = NewTransaction {
        kind: engine_kind(payload.kind),
        amount_minor: payload.amount_minor,
        currency,
        category_id: payload.category_id,
        payment_method: payload.payment_method.map(engine_method).unwrap_or_default(),
        description: payload.description,
        reference_id: payload.reference_id,
        occurred_at: payload.occurred_at.map(|at| at.with_timezone(&Utc)),
    };
    let tx = state.engine.record_transaction(merchant.id, input).await?;
    Ok((StatusCode::CREATED, Json(map_transaction(tx))))
}

pub async fn get_one(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(merchant.id, id).await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn reverse(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<TransactionReverse>>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    let tx = state
        .engine
        .reverse_transaction(
            merchant.id,
            id,
            payload.note.as_deref(),
            payload.occurred_at.map(|at| at.with_timezone(&Utc)),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map_transaction(tx))))
}
