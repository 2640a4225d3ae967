use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EffectiveStatus, EngineError, Event, EventFilter, EventStatus, EventUpdate, NewEvent,
    ResultEngine, events,
};

use super::{Engine, with_tx};

const MAX_LIMIT: u64 = 1000;

impl Engine {
    pub async fn create_event(&self, owner: Uuid, input: NewEvent) -> ResultEngine<Event> {
        let input = input.normalized()?;

        with_tx!(self, |db_tx| {
            self.require_merchant(&db_tx, owner).await?;
            let now = Utc::now();
            let model = events::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                owner_id: ActiveValue::Set(owner),
                title: ActiveValue::Set(input.title),
                description: ActiveValue::Set(input.description),
                kind: ActiveValue::Set(input.kind.as_str().to_string()),
                due_at: ActiveValue::Set(input.due_at),
                status: ActiveValue::Set(EventStatus::Upcoming.as_str().to_string()),
                amount_minor: ActiveValue::Set(input.amount_minor),
                calendar_ref: ActiveValue::Set(input.calendar_ref),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;
            Event::try_from(model)
        })
    }

    pub async fn event(&self, owner: Uuid, id: Uuid) -> ResultEngine<Event> {
        let model = self.require_event(&self.database, owner, id).await?;
        Event::try_from(model)
    }

    /// Lists events ordered by due date.
    ///
    /// A status filter of `overdue` selects upcoming events due before `now`;
    /// `upcoming` selects the ones due at or after `now`.
    pub async fn list_events(
        &self,
        owner: Uuid,
        filter: &EventFilter,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<Event>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to)
            && from >= to
        {
            return Err(EngineError::InvalidDateRange(
                "invalid range: from must be < to".to_string(),
            ));
        }
        let limit = filter.limit.unwrap_or(100);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(EngineError::InvalidAmount(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }

        let mut query = events::Entity::find().filter(events::Column::OwnerId.eq(owner));
        if let Some(from) = filter.from {
            query = query.filter(events::Column::DueAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(events::Column::DueAt.lt(to));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(events::Column::Kind.eq(kind.as_str()));
        }
        query = match filter.status {
            None => query,
            Some(EffectiveStatus::Overdue) => query
                .filter(events::Column::Status.eq(EventStatus::Upcoming.as_str()))
                .filter(events::Column::DueAt.lt(now)),
            Some(EffectiveStatus::Upcoming) => query
                .filter(events::Column::Status.eq(EventStatus::Upcoming.as_str()))
                .filter(events::Column::DueAt.gte(now)),
            Some(EffectiveStatus::Completed) => {
                query.filter(events::Column::Status.eq(EventStatus::Completed.as_str()))
            }
            Some(EffectiveStatus::Cancelled) => {
                query.filter(events::Column::Status.eq(EventStatus::Cancelled.as_str()))
            }
        };

        query
            .order_by_asc(events::Column::DueAt)
            .order_by_asc(events::Column::CreatedAt)
            .limit(limit)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Event::try_from)
            .collect()
    }

    /// Applies a partial update. `completed` and `cancelled` are final: an
    /// event in one of those states cannot change status anymore.
    pub async fn update_event(
        &self,
        owner: Uuid,
        id: Uuid,
        update: EventUpdate,
    ) -> ResultEngine<Event> {
        let update = update.normalized()?;

        with_tx!(self, |db_tx| {
            let model = self.require_event(&db_tx, owner, id).await?;
            let current = EventStatus::try_from(model.status.as_str())?;
            let mut active: events::ActiveModel = model.into();

            if let Some(status) = update.status
                && status != current
            {
                if current.is_final() {
                    return Err(EngineError::InvalidStatus(format!(
                        "event is already {}",
                        current.as_str()
                    )));
                }
                active.status = ActiveValue::Set(status.as_str().to_string());
            }
            if let Some(title) = update.title {
                active.title = ActiveValue::Set(title);
            }
            if let Some(description) = update.description {
                active.description = ActiveValue::Set(description);
            }
            if let Some(due_at) = update.due_at {
                active.due_at = ActiveValue::Set(due_at);
            }
            active.updated_at = ActiveValue::Set(Utc::now());

            let model = active.update(&db_tx).await?;
            Event::try_from(model)
        })
    }

    /// Removes an event and returns it.
    pub async fn delete_event(&self, owner: Uuid, id: Uuid) -> ResultEngine<Event> {
        with_tx!(self, |db_tx| {
            let model = self.require_event(&db_tx, owner, id).await?;
            events::Entity::delete_by_id(id).exec(&db_tx).await?;
            Event::try_from(model)
        })
    }
}
