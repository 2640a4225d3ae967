#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use agent::{
    CalendarEntry, CalendarError, CalendarProvider, CalendarService, Dispatcher, ResultCalendar,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use engine::{Currency, Engine, EventStatus};
use fx::{CurrencyService, FxError, FxSettings, MemoryRateStore, RateProvider, ResultFx};
use migration::MigratorTrait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use sea_orm::Database;
use uuid::Uuid;

pub struct FixedRates(pub Option<Decimal>);

#[async_trait]
impl RateProvider for FixedRates {
    async fn fetch_rate(&self, base: Currency, quote: Currency) -> ResultFx<Decimal> {
        self.0
            .ok_or_else(|| FxError::Provider(format!("no rate for {base}/{quote}")))
    }

    async fn fetch_historical(
        &self,
        base: Currency,
        quote: Currency,
        date: NaiveDate,
    ) -> ResultFx<Decimal> {
        self.0
            .ok_or_else(|| FxError::Provider(format!("no rate for {base}/{quote} on {date}")))
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Calendar double recording calls; fails every call when `failing`.
#[derive(Default)]
pub struct RecordingCalendar {
    pub failing: bool,
    pub created: Mutex<Vec<CalendarEntry>>,
    pub updated: Mutex<Vec<(String, CalendarEntry)>>,
    pub statuses: Mutex<Vec<(String, EventStatus)>>,
    pub deleted: Mutex<Vec<String>>,
    counter: AtomicUsize,
}

impl RecordingCalendar {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn check(&self) -> ResultCalendar<()> {
        if self.failing {
            return Err(CalendarError::Api {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "calendar down".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarProvider for RecordingCalendar {
    async fn create(&self, entry: &CalendarEntry) -> ResultCalendar<String> {
        self.check()?;
        self.created.lock().unwrap().push(entry.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("gcal-{n}"))
    }

    async fn update(&self, calendar_ref: &str, entry: &CalendarEntry) -> ResultCalendar<()> {
        self.check()?;
        self.updated
            .lock()
            .unwrap()
            .push((calendar_ref.to_string(), entry.clone()));
        Ok(())
    }

    async fn set_status(&self, calendar_ref: &str, status: EventStatus) -> ResultCalendar<()> {
        self.check()?;
        self.statuses
            .lock()
            .unwrap()
            .push((calendar_ref.to_string(), status));
        Ok(())
    }

    async fn delete(&self, calendar_ref: &str) -> ResultCalendar<()> {
        self.check()?;
        self.deleted.lock().unwrap().push(calendar_ref.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub struct Fixture {
    pub engine: Arc<Engine>,
    pub dispatcher: Dispatcher,
    pub owner: Uuid,
}

pub async fn engine() -> Arc<Engine> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Arc::new(Engine::builder().database(db).build().await.unwrap())
}

pub async fn fixture_with(
    rate: Option<Decimal>,
    calendar: Option<Arc<dyn CalendarProvider>>,
) -> Fixture {
    let engine = engine().await;
    let owner = engine
        .create_merchant("corner-shop", Currency::EUR)
        .await
        .unwrap()
        .merchant
        .id;
    let fx = CurrencyService::new(
        Arc::new(FixedRates(rate)),
        Arc::new(MemoryRateStore::new()),
        FxSettings::default(),
    );
    let calendar = CalendarService::new(engine.clone(), calendar);
    let dispatcher = Dispatcher::new(engine.clone(), fx, calendar);
    Fixture {
        engine,
        dispatcher,
        owner,
    }
}

pub async fn fixture() -> Fixture {
    fixture_with(Some(Decimal::new(90, 2)), None).await
}
