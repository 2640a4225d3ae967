//! Exchange rate endpoints.

use api_types::currency::{ConvertRequest, RateQuery};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use engine::{Currency, Merchant};
use fx::{Conversion, RateQuote};

use crate::{ServerError, server::ServerState};

pub async fn rate(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Query(query): Query<RateQuery>,
) -> Result<Json<RateQuote>, ServerError> {
    let base = Currency::try_from(query.base.as_str())?;
    let quote = Currency::try_from(query.quote.as_str())?;
    tracing::debug!(owner = %merchant.id, %base, %quote, "rate requested");
    let rate = state
        .agent
        .dispatcher()
        .currency()
        .get_rate(base, quote, query.force_refresh.unwrap_or(false))
        .await?;
    Ok(Json(rate))
}

pub async fn convert(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Json(payload): Json<ConvertRequest>,
) -> Result<Json<Conversion>, ServerError> {
    let from = Currency::try_from(payload.from_currency.as_str())?;
    let to = Currency::try_from(payload.to_currency.as_str())?;
    tracing::debug!(owner = %merchant.id, %from, %to, "conversion requested");
    let conversion = state
        .agent
        .dispatcher()
        .currency()
        .convert(payload.amount, from, to, payload.force_refresh.unwrap_or(false))
        .await?;
    Ok(Json(conversion))
}
