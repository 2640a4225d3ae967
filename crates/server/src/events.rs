//! Business calendar endpoints. Writes go through the calendar service so
//! mirrored events stay in sync with the provider.

use api_types::event::{
    EventKind, EventListQuery, EventListResponse, EventNew, EventStatus, EventUpdate, EventView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use engine::{EffectiveStatus, EngineError, EventFilter, Merchant, NewEvent};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn engine_kind(kind: EventKind) -> engine::EventKind {
    match kind {
        EventKind::Tax => engine::EventKind::Tax,
        EventKind::Invoice => engine::EventKind::Invoice,
        EventKind::Meeting => engine::EventKind::Meeting,
        EventKind::Reminder => engine::EventKind::Reminder,
        EventKind::LoanRepayment => engine::EventKind::LoanRepayment,
        EventKind::Other => engine::EventKind::Other,
    }
}

fn api_kind(kind: engine::EventKind) -> EventKind {
    match kind {
        engine::EventKind::Tax => EventKind::Tax,
        engine::EventKind::Invoice => EventKind::Invoice,
        engine::EventKind::Meeting => EventKind::Meeting,
        engine::EventKind::Reminder => EventKind::Reminder,
        engine::EventKind::LoanRepayment => EventKind::LoanRepayment,
        engine::EventKind::Other => EventKind::Other,
    }
}

fn effective(status: EventStatus) -> EffectiveStatus {
    match status {
        EventStatus::Upcoming => EffectiveStatus::Upcoming,
        EventStatus::Overdue => EffectiveStatus::Overdue,
        EventStatus::Completed => EffectiveStatus::Completed,
        EventStatus::Cancelled => EffectiveStatus::Cancelled,
    }
}

fn api_status(status: EffectiveStatus) -> EventStatus {
    match status {
        EffectiveStatus::Upcoming => EventStatus::Upcoming,
        EffectiveStatus::Overdue => EventStatus::Overdue,
        EffectiveStatus::Completed => EventStatus::Completed,
        EffectiveStatus::Cancelled => EventStatus::Cancelled,
    }
}

fn stored_status(status: EventStatus) -> Result<engine::EventStatus, EngineError> {
    match status {
        EventStatus::Upcoming => Ok(engine::EventStatus::Upcoming),
        EventStatus::Completed => Ok(engine::EventStatus::Completed),
        EventStatus::Cancelled => Ok(engine::EventStatus::Cancelled),
        EventStatus::Overdue => Err(EngineError::InvalidStatus(
            "overdue is derived from the due date and cannot be set".to_string(),
        )),
    }
}

fn map_event(event: engine::Event, now: DateTime<Utc>) -> EventView {
    EventView {
        effective_status: api_status(event.effective_status(now)),
        status: api_status(event.status.into()),
        id: event.id,
        title: event.title,
        description: event.description,
        kind: api_kind(event.kind),
        due_at: event.due_at,
        amount_minor: event.amount_minor,
        calendar_ref: event.calendar_ref,
    }
}

pub async fn list(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Query(query): Query<EventListQuery>,
) -> Result<Json<EventListResponse>, ServerError> {
    let now = Utc::now();
    let filter = EventFilter {
        from: query.from.map(|at| at.with_timezone(&Utc)),
        to: query.to.map(|at| at.with_timezone(&Utc)),
        kind: query.kind.map(engine_kind),
        status: query.status.map(effective),
        limit: query.limit,
    };
    let events = state
        .agent
        .dispatcher()
        .calendar()
        .find_events(merchant.id, &filter, now)
        .await?
        .into_iter()
        .map(|event| map_event(event, now))
        .collect();

    Ok(Json(EventListResponse { events }))
}

pub async fn create(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Json(payload): Json<EventNew>,
) -> Result<(StatusCode, Json<EventView>), ServerError> {
    let input = NewEvent {
        title: payload.title,
        description: payload.description,
        kind: engine_kind(payload.kind.unwrap_or_default()),
        due_at: payload.due_at.with_timezone(&Utc),
        amount_minor: payload.amount_minor,
        calendar_ref: None,
    };
    let event = state
        .agent
        .dispatcher()
        .calendar()
        .create_event(merchant.id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(map_event(event, Utc::now()))))
}

pub async fn update(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EventUpdate>,
) -> Result<Json<EventView>, ServerError> {
    let update = engine::EventUpdate {
        title: payload.title,
        description: payload
            .description
            .map(|text| Some(text).filter(|text| !text.trim().is_empty())),
        due_at: payload.due_at.map(|at| at.with_timezone(&Utc)),
        status: payload.status.map(stored_status).transpose()?,
    };
    let event = state
        .agent
        .dispatcher()
        .calendar()
        .update_event(merchant.id, id, update)
        .await?;
    Ok(Json(map_event(event, Utc::now())))
}

pub async fn delete(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .agent
        .dispatcher()
        .calendar()
        .delete_event(merchant.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
