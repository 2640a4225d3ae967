//! Merchant events with optional mirroring to an external calendar.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use engine::{
    EffectiveStatus, Engine, EngineError, Event, EventFilter, EventStatus, EventUpdate, NewEvent,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{CalendarError, ResultCalendar};

pub const GOOGLE_CALENDAR_URL: &str = "https://www.googleapis.com/calendar/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Data mirrored to the external calendar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarEntry {
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn event_length() -> chrono::Duration {
    chrono::Duration::hours(1)
}

impl CalendarEntry {
    fn for_event(input: &NewEvent) -> Self {
        Self::slot(input.title.clone(), input.description.clone(), input.due_at)
    }

    /// The stored event with `update` applied.
    fn updated(event: &Event, update: &EventUpdate) -> Self {
        Self::slot(
            update.title.clone().unwrap_or_else(|| event.title.clone()),
            update
                .description
                .clone()
                .unwrap_or_else(|| event.description.clone()),
            update.due_at.unwrap_or(event.due_at),
        )
    }

    fn slot(title: String, description: Option<String>, start: DateTime<Utc>) -> Self {
        Self {
            title,
            description,
            start,
            end: start + event_length(),
        }
    }
}

/// Time an event blocks in the calendar: one hour from `due_at`.
fn busy_until(event: &Event) -> DateTime<Utc> {
    event.due_at + event_length()
}

/// Result of [`CalendarService::check_availability`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_available: bool,
    pub conflicts: Vec<Event>,
}

/// A gap between events, see [`CalendarService::free_time`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FreeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
}

/// Opening hours used by [`CalendarService::free_time`], UTC.
const BUSINESS_OPEN_HOUR: i64 = 9;
const BUSINESS_CLOSE_HOUR: i64 = 17;
/// Upper bound on events scanned for one window.
const SCAN_LIMIT: u64 = 1000;

/// External calendar the local events are mirrored to.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Creates the entry and returns the provider's event id.
    async fn create(&self, entry: &CalendarEntry) -> ResultCalendar<String>;

    /// Replaces title, description and time of an existing entry.
    async fn update(&self, calendar_ref: &str, entry: &CalendarEntry) -> ResultCalendar<()>;

    async fn set_status(&self, calendar_ref: &str, status: EventStatus) -> ResultCalendar<()>;

    async fn delete(&self, calendar_ref: &str) -> ResultCalendar<()>;

    fn name(&self) -> &str;
}

#[derive(Clone, Debug)]
pub struct GoogleCalendarConfig {
    pub base_url: String,
    pub calendar_id: String,
    /// OAuth2 access token with the calendar scope.
    pub access_token: String,
}

impl GoogleCalendarConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            base_url: GOOGLE_CALENDAR_URL.to_string(),
            calendar_id: "primary".to_string(),
            access_token: access_token.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

#[derive(Debug, Serialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: String,
}

#[derive(Debug, Serialize)]
struct EventBody<'a> {
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    start: EventTime,
    end: EventTime,
}

/// Google Calendar v3 over REST.
#[derive(Clone, Debug)]
pub struct GoogleCalendarProvider {
    client: Client,
    config: GoogleCalendarConfig,
}

impl GoogleCalendarProvider {
    pub fn new(config: GoogleCalendarConfig) -> ResultCalendar<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/calendars/{}/events{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.calendar_id,
            path
        )
    }

    async fn check(response: reqwest::Response) -> ResultCalendar<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "calendar error".to_string());
        Err(CalendarError::Api { status, message })
    }
}

impl<'a> EventBody<'a> {
    fn from_entry(entry: &'a CalendarEntry) -> Self {
        Self {
            summary: &entry.title,
            description: entry.description.as_deref(),
            start: EventTime {
                date_time: entry.start.to_rfc3339(),
            },
            end: EventTime {
                date_time: entry.end.to_rfc3339(),
            },
        }
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarProvider {
    async fn create(&self, entry: &CalendarEntry) -> ResultCalendar<String> {
        let response = self
            .client
            .post(self.url(""))
            .bearer_auth(&self.config.access_token)
            .json(&EventBody::from_entry(entry))
            .send()
            .await?;
        let created: CreatedEvent = Self::check(response).await?.json().await?;
        Ok(created.id)
    }

    async fn update(&self, calendar_ref: &str, entry: &CalendarEntry) -> ResultCalendar<()> {
        let response = self
            .client
            .patch(self.url(&format!("/{calendar_ref}")))
            .bearer_auth(&self.config.access_token)
            .json(&EventBody::from_entry(entry))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn set_status(&self, calendar_ref: &str, status: EventStatus) -> ResultCalendar<()> {
        let remote = match status {
            EventStatus::Cancelled => "cancelled",
            EventStatus::Upcoming | EventStatus::Completed => "confirmed",
        };
        let response = self
            .client
            .patch(self.url(&format!("/{calendar_ref}")))
            .bearer_auth(&self.config.access_token)
            .json(&json!({ "status": remote }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, calendar_ref: &str) -> ResultCalendar<()> {
        let response = self
            .client
            .delete(self.url(&format!("/{calendar_ref}")))
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;
        // Already gone on the provider side.
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "google-calendar"
    }
}

/// Ledger events plus the optional external calendar.
///
/// With a provider, the provider call runs first: if it fails nothing is
/// changed locally.
#[derive(Clone)]
pub struct CalendarService {
    engine: Arc<Engine>,
    provider: Option<Arc<dyn CalendarProvider>>,
}

impl CalendarService {
    pub fn new(engine: Arc<Engine>, provider: Option<Arc<dyn CalendarProvider>>) -> Self {
        Self { engine, provider }
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|provider| provider.name())
    }

    pub async fn create_event(&self, owner: Uuid, input: NewEvent) -> ResultCalendar<Event> {
        // Input and owner are checked before touching the provider.
        let mut input = input.normalized()?;
        self.engine.merchant(owner).await?;
        if let Some(provider) = &self.provider {
            let calendar_ref = provider.create(&CalendarEntry::for_event(&input)).await?;
            info!(%owner, %calendar_ref, "event mirrored to {}", provider.name());
            input.calendar_ref = Some(calendar_ref);
        }
        Ok(self.engine.create_event(owner, input).await?)
    }

    pub async fn find_events(
        &self,
        owner: Uuid,
        filter: &EventFilter,
        now: DateTime<Utc>,
    ) -> ResultCalendar<Vec<Event>> {
        Ok(self.engine.list_events(owner, filter, now).await?)
    }

    pub async fn update_status(
        &self,
        owner: Uuid,
        id: Uuid,
        status: EventStatus,
    ) -> ResultCalendar<Event> {
        let event = self.engine.event(owner, id).await?;
        ensure_can_move(&event, status)?;
        if let (Some(provider), Some(calendar_ref)) = (&self.provider, &event.calendar_ref) {
            provider.set_status(calendar_ref, status).await?;
        }
        Ok(self
            .engine
            .update_event(owner, id, EventUpdate::status(status))
            .await?)
    }

    /// Applies field changes and then the status, if any. Everything is
    /// checked before the provider sees the change.
    pub async fn update_event(
        &self,
        owner: Uuid,
        id: Uuid,
        update: EventUpdate,
    ) -> ResultCalendar<Event> {
        let update = update.normalized()?;
        let event = self.engine.event(owner, id).await?;
        if let Some(status) = update.status {
            ensure_can_move(&event, status)?;
        }
        let fields = update.fields();
        if fields.is_empty() {
            return match update.status {
                Some(status) => self.update_status(owner, id, status).await,
                None => Ok(event),
            };
        }

        if let (Some(provider), Some(calendar_ref)) = (&self.provider, &event.calendar_ref) {
            provider
                .update(calendar_ref, &CalendarEntry::updated(&event, &fields))
                .await?;
            info!(%owner, %calendar_ref, "event update mirrored to {}", provider.name());
        }
        let event = self.engine.update_event(owner, id, fields).await?;
        match update.status {
            Some(status) => self.update_status(owner, id, status).await,
            None => Ok(event),
        }
    }

    pub async fn delete_event(&self, owner: Uuid, id: Uuid) -> ResultCalendar<Event> {
        let event = self.engine.event(owner, id).await?;
        if let (Some(provider), Some(calendar_ref)) = (&self.provider, &event.calendar_ref) {
            provider.delete(calendar_ref).await?;
        }
        Ok(self.engine.delete_event(owner, id).await?)
    }

    /// Open events whose one-hour slot overlaps `[start, end)`. Completed and
    /// cancelled events do not block time.
    pub async fn check_availability(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ResultCalendar<Availability> {
        if end <= start {
            return Err(EngineError::InvalidDateRange(
                "availability window must end after it starts".to_string(),
            )
            .into());
        }
        let conflicts = self.busy_events(owner, start, end).await?;
        Ok(Availability {
            start,
            end,
            is_available: conflicts.is_empty(),
            conflicts,
        })
    }

    /// Gaps of at least `duration_minutes` on `date` between open events,
    /// within 09:00-17:00 UTC when `business_hours_only`, else the whole day.
    pub async fn free_time(
        &self,
        owner: Uuid,
        date: NaiveDate,
        duration_minutes: i64,
        business_hours_only: bool,
    ) -> ResultCalendar<Vec<FreeSlot>> {
        if duration_minutes <= 0 {
            return Err(EngineError::InvalidAmount(
                "duration_minutes must be > 0".to_string(),
            )
            .into());
        }
        let midnight = date.and_time(NaiveTime::MIN).and_utc();
        let (day_start, day_end) = if business_hours_only {
            (
                midnight + chrono::Duration::hours(BUSINESS_OPEN_HOUR),
                midnight + chrono::Duration::hours(BUSINESS_CLOSE_HOUR),
            )
        } else {
            (midnight, midnight + chrono::Duration::days(1))
        };
        let minimum = chrono::Duration::minutes(duration_minutes);

        let mut slots = Vec::new();
        let mut cursor = day_start;
        for event in self.busy_events(owner, day_start, day_end).await? {
            if event.due_at > cursor && event.due_at - cursor >= minimum {
                slots.push(FreeSlot::between(cursor, event.due_at));
            }
            cursor = cursor.max(busy_until(&event));
        }
        if cursor < day_end && day_end - cursor >= minimum {
            slots.push(FreeSlot::between(cursor, day_end));
        }
        Ok(slots)
    }

    async fn busy_events(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ResultCalendar<Vec<Event>> {
        let filter = EventFilter {
            from: Some(start - event_length()),
            to: Some(end),
            limit: Some(SCAN_LIMIT),
            ..EventFilter::default()
        };
        let events = self.engine.list_events(owner, &filter, start).await?;
        Ok(events
            .into_iter()
            .filter(|event| !event.status.is_final())
            .filter(|event| event.due_at < end && busy_until(event) > start)
            .collect())
    }

    /// Events still open whose due time has passed.
    pub async fn overdue(&self, owner: Uuid, now: DateTime<Utc>) -> ResultCalendar<Vec<Event>> {
        let filter = EventFilter {
            status: Some(EffectiveStatus::Overdue),
            ..EventFilter::default()
        };
        self.find_events(owner, &filter, now).await
    }
}

impl FreeSlot {
    fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            duration_minutes: (end - start).num_minutes(),
        }
    }
}

fn ensure_can_move(event: &Event, status: EventStatus) -> ResultCalendar<()> {
    if event.status.is_final() && event.status != status {
        return Err(EngineError::InvalidStatus(format!(
            "event is already {}",
            event.status.as_str()
        ))
        .into());
    }
    Ok(())
}
