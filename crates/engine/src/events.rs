//! Business events: tax deadlines, invoices, meetings, reminders.
//!
//! Unlike transactions, events are mutable. `completed` and `cancelled` are
//! final states; `overdue` is never stored, it is derived when an `upcoming`
//! event is past its due date.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, util::normalize_optional_text};

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Tax,
    Invoice,
    Meeting,
    Reminder,
    LoanRepayment,
    Other,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        Self::Tax,
        Self::Invoice,
        Self::Meeting,
        Self::Reminder,
        Self::LoanRepayment,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tax => "tax",
            Self::Invoice => "invoice",
            Self::Meeting => "meeting",
            Self::Reminder => "reminder",
            Self::LoanRepayment => "loan_repayment",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for EventKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| EngineError::InvalidKind(format!("invalid event kind: {value}")))
    }
}

/// Stored status of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Upcoming,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_final(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl TryFrom<&str> for EventStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "upcoming" => Ok(Self::Upcoming),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidStatus(format!(
                "invalid event status: {other}"
            ))),
        }
    }
}

/// Status as seen by callers, including the derived `overdue`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveStatus {
    Upcoming,
    Overdue,
    Completed,
    Cancelled,
}

impl EffectiveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Overdue => "overdue",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for EffectiveStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "overdue" => Ok(Self::Overdue),
            other => EventStatus::try_from(other).map(Self::from),
        }
    }
}

impl From<EventStatus> for EffectiveStatus {
    fn from(value: EventStatus) -> Self {
        match value {
            EventStatus::Upcoming => Self::Upcoming,
            EventStatus::Completed => Self::Completed,
            EventStatus::Cancelled => Self::Cancelled,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: EventKind,
    pub due_at: DateTime<Utc>,
    pub status: EventStatus,
    pub amount_minor: Option<i64>,
    pub calendar_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Status with `overdue` derived against `now`.
    pub fn effective_status(&self, now: DateTime<Utc>) -> EffectiveStatus {
        match self.status {
            EventStatus::Upcoming if self.due_at < now => EffectiveStatus::Overdue,
            status => status.into(),
        }
    }
}

/// Input for `Engine::create_event`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub kind: EventKind,
    pub due_at: DateTime<Utc>,
    pub amount_minor: Option<i64>,
    pub calendar_ref: Option<String>,
}

fn validate_title(value: &str) -> ResultEngine<String> {
    let title = value.trim();
    if title.is_empty() {
        return Err(EngineError::InvalidName(
            "event title must not be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(EngineError::InvalidName(format!(
            "event title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_description(value: Option<&str>) -> ResultEngine<Option<String>> {
    let description = normalize_optional_text(value);
    if description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
    {
        return Err(EngineError::InvalidName(format!(
            "event description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(description)
}

impl NewEvent {
    /// Checks the input and returns it with title and texts trimmed.
    ///
    /// `Engine::create_event` runs the same check; callers that mirror the
    /// event elsewhere call it first so rejected input never leaves the
    /// process.
    pub fn normalized(self) -> ResultEngine<Self> {
        if let Some(amount) = self.amount_minor
            && (amount <= 0 || amount > Money::MAX_ENTRY.minor())
        {
            return Err(EngineError::InvalidAmount(format!(
                "event amount_minor must be between 1 and {}",
                Money::MAX_ENTRY.minor()
            )));
        }
        Ok(Self {
            title: validate_title(&self.title)?,
            description: validate_description(self.description.as_deref())?,
            calendar_ref: normalize_optional_text(self.calendar_ref.as_deref()),
            ..self
        })
    }
}

/// Partial update for `Engine::update_event`. `None` keeps the value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_at: Option<DateTime<Utc>>,
    pub status: Option<EventStatus>,
}

impl EventUpdate {
    pub fn status(status: EventStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// `true` when no field and no status would change.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Field changes only, without the status.
    pub fn fields(&self) -> Self {
        Self {
            status: None,
            ..self.clone()
        }
    }

    /// Same checks as [`NewEvent::normalized`] for the fields present.
    pub fn normalized(self) -> ResultEngine<Self> {
        Ok(Self {
            title: self.title.as_deref().map(validate_title).transpose()?,
            description: self
                .description
                .map(|d| validate_description(d.as_deref()))
                .transpose()?,
            ..self
        })
    }
}

/// Filters for `Engine::list_events`. `from` is inclusive and `to` is
/// exclusive, both compared against `due_at`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub kind: Option<EventKind>,
    pub status: Option<EffectiveStatus>,
    pub limit: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: String,
    pub due_at: DateTimeUtc,
    pub status: String,
    pub amount_minor: Option<i64>,
    pub calendar_ref: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::merchants::Entity",
        from = "Column::OwnerId",
        to = "super::merchants::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Merchant,
}

impl Related<super::merchants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Merchant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Event {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            owner_id: model.owner_id,
            title: model.title,
            description: model.description,
            kind: EventKind::try_from(model.kind.as_str())?,
            due_at: model.due_at,
            status: EventStatus::try_from(model.status.as_str())?,
            amount_minor: model.amount_minor,
            calendar_ref: model.calendar_ref,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn event(status: EventStatus, due_at: DateTime<Utc>) -> Event {
        Event {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "VAT".to_string(),
            description: None,
            kind: EventKind::Tax,
            due_at,
            status,
            amount_minor: None,
            calendar_ref: None,
            created_at: due_at,
            updated_at: due_at,
        }
    }

    #[test]
    fn upcoming_past_due_is_overdue() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let past = event(EventStatus::Upcoming, now - Duration::hours(1));
        let future = event(EventStatus::Upcoming, now + Duration::hours(1));
        let done = event(EventStatus::Completed, now - Duration::days(3));

        assert_eq!(past.effective_status(now), EffectiveStatus::Overdue);
        assert_eq!(future.effective_status(now), EffectiveStatus::Upcoming);
        assert_eq!(done.effective_status(now), EffectiveStatus::Completed);
    }

    fn new_event(title: &str, amount_minor: Option<i64>) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            description: Some("  ".to_string()),
            kind: EventKind::Meeting,
            due_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            amount_minor,
            calendar_ref: None,
        }
    }

    #[test]
    fn new_event_is_checked_and_trimmed() {
        let event = new_event("  Supplier call ", Some(5_000)).normalized().unwrap();
        assert_eq!(event.title, "Supplier call");
        assert_eq!(event.description, None);

        for bad in [
            new_event("   ", None),
            new_event(&"x".repeat(MAX_TITLE_LEN + 1), None),
            new_event("Rent", Some(0)),
            new_event("Rent", Some(Money::MAX_ENTRY.minor() + 1)),
        ] {
            assert!(bad.normalized().is_err());
        }
    }

    #[test]
    fn update_checks_only_present_fields() {
        let update = EventUpdate {
            title: Some(" Renamed ".to_string()),
            ..EventUpdate::status(EventStatus::Completed)
        };
        let normalized = update.clone().normalized().unwrap();
        assert_eq!(normalized.title.as_deref(), Some("Renamed"));
        assert_eq!(update.fields().status, None);
        assert!(EventUpdate::default().is_empty());
        assert!(
            EventUpdate {
                title: Some(String::new()),
                ..EventUpdate::default()
            }
            .normalized()
            .is_err()
        );
    }

    #[test]
    fn parses_kinds_and_statuses() {
        assert_eq!(
            EventKind::try_from("loan_repayment").unwrap(),
            EventKind::LoanRepayment
        );
        assert!(EventKind::try_from("party").is_err());
        assert_eq!(
            EffectiveStatus::try_from("overdue").unwrap(),
            EffectiveStatus::Overdue
        );
        assert!(matches!(
            EventStatus::try_from("overdue"),
            Err(EngineError::InvalidStatus(_))
        ));
    }
}
