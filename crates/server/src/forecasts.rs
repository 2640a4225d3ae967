//! Forecast endpoints.

use api_types::forecast::{
    ForecastKind, ForecastListQuery, ForecastListResponse, ForecastNew, ForecastProject,
    ForecastView,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{ForecastBasis, Merchant, Period};

use crate::{ServerError, server::ServerState};

const DEFAULT_PROJECTION_MONTHS: u32 = 3;

fn engine_kind(kind: ForecastKind) -> engine::ForecastKind {
    match kind {
        ForecastKind::Revenue => engine::ForecastKind::Revenue,
        ForecastKind::Expense => engine::ForecastKind::Expense,
        ForecastKind::Profit => engine::ForecastKind::Profit,
    }
}

fn api_kind(kind: engine::ForecastKind) -> ForecastKind {
    match kind {
        engine::ForecastKind::Revenue => ForecastKind::Revenue,
        engine::ForecastKind::Expense => ForecastKind::Expense,
        engine::ForecastKind::Profit => ForecastKind::Profit,
    }
}

fn map_forecast(forecast: engine::Forecast) -> ForecastView {
    ForecastView {
        id: forecast.id,
        period: forecast.period.to_string(),
        kind: api_kind(forecast.kind),
        projected_minor: forecast.projected_minor,
        basis: forecast.basis.as_str().to_string(),
        notes: forecast.notes,
        updated_at: forecast.updated_at,
    }
}

pub async fn list(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Query(query): Query<ForecastListQuery>,
) -> Result<Json<ForecastListResponse>, ServerError> {
    let from = query.from.as_deref().map(Period::try_from).transpose()?;
    let to = query.to.as_deref().map(Period::try_from).transpose()?;
    let forecasts = state
        .engine
        .list_forecasts(merchant.id, from, to)
        .await?
        .into_iter()
        .map(map_forecast)
        .collect();

    Ok(Json(ForecastListResponse { forecasts }))
}

pub async fn save(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Json(payload): Json<ForecastNew>,
) -> Result<(StatusCode, Json<ForecastView>), ServerError> {
    let period = Period::try_from(payload.period.as_str())?;
    let forecast = state
        .engine
        .save_forecast(
            merchant.id,
            period,
            engine_kind(payload.kind),
            payload.projected_minor,
            ForecastBasis::Manual,
            payload.notes.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map_forecast(forecast))))
}

pub async fn project(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Json(payload): Json<ForecastProject>,
) -> Result<(StatusCode, Json<ForecastView>), ServerError> {
    let forecast = state
        .engine
        .project_forecast(
            merchant.id,
            engine_kind(payload.kind),
            payload.months.unwrap_or(DEFAULT_PROJECTION_MONTHS),
            Utc::now().date_naive(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map_forecast(forecast))))
}
