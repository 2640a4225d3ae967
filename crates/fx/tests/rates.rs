use std::{
    str::FromStr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use engine::Currency;
use fx::{
    CachedRate, CurrencyService, DbRateStore, FxError, FxSettings, MemoryRateStore, QuoteResult,
    RateProvider, RateSource, RateStore, ResultFx,
};
use migration::MigratorTrait;
use rust_decimal::Decimal;
use sea_orm::Database;

/// Provider answering a configurable rate and counting calls.
struct ScriptedProvider {
    rate: Mutex<Option<Decimal>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(rate: &str) -> Arc<Self> {
        Arc::new(Self {
            rate: Mutex::new(Some(dec(rate))),
            calls: AtomicUsize::new(0),
        })
    }

    fn set(&self, rate: Option<&str>) {
        *self.rate.lock().unwrap() = rate.map(dec);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateProvider for ScriptedProvider {
    async fn fetch_rate(&self, base: Currency, quote: Currency) -> ResultFx<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rate = *self.rate.lock().unwrap();
        rate.ok_or_else(|| FxError::Provider(format!("down for {base}/{quote}")))
    }

    async fn fetch_historical(
        &self,
        base: Currency,
        quote: Currency,
        date: NaiveDate,
    ) -> ResultFx<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rate = *self.rate.lock().unwrap();
        rate.ok_or_else(|| FxError::Provider(format!("no {base}/{quote} on {date}")))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Provider without a history endpoint.
struct LatestOnly;

#[async_trait]
impl RateProvider for LatestOnly {
    async fn fetch_rate(&self, _base: Currency, _quote: Currency) -> ResultFx<Decimal> {
        Ok(Decimal::ONE)
    }

    fn name(&self) -> &str {
        "latest-only"
    }
}

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

fn gbp() -> Currency {
    Currency::try_from("GBP").unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn service(provider: Arc<ScriptedProvider>) -> (CurrencyService, Arc<MemoryRateStore>) {
    let store = Arc::new(MemoryRateStore::new());
    let service = CurrencyService::new(provider, store.clone(), FxSettings::default());
    (service, store)
}

#[tokio::test]
async fn same_currency_never_hits_provider() {
    let provider = ScriptedProvider::new("0.9");
    let (service, _) = service(provider.clone());

    let quote = service
        .get_rate(Currency::EUR, Currency::EUR, true)
        .await
        .unwrap();
    assert_eq!(quote.rate, Decimal::ONE);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn rate_is_cached_for_one_hour() {
    let provider = ScriptedProvider::new("0.90");
    let (service, _) = service(provider.clone());

    let first = service
        .get_rate_at(Currency::USD, Currency::EUR, false, noon())
        .await
        .unwrap();
    assert_eq!(first.source, RateSource::Provider);

    provider.set(Some("0.95"));
    let second = service
        .get_rate_at(
            Currency::USD,
            Currency::EUR,
            false,
            noon() + Duration::minutes(59),
        )
        .await
        .unwrap();
    assert_eq!(second.source, RateSource::Cache);
    assert_eq!(second.rate, first.rate);
    assert_eq!(provider.calls(), 1);

    let third = service
        .get_rate_at(
            Currency::USD,
            Currency::EUR,
            false,
            noon() + Duration::minutes(61),
        )
        .await
        .unwrap();
    assert_eq!(third.source, RateSource::Provider);
    assert_eq!(third.rate, dec("0.95"));
    assert!(!third.stale);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn force_refresh_bypasses_cache() {
    let provider = ScriptedProvider::new("0.90");
    let (service, store) = service(provider.clone());

    service
        .get_rate_at(Currency::USD, Currency::EUR, false, noon())
        .await
        .unwrap();
    provider.set(Some("0.91"));
    let refreshed = service
        .get_rate_at(Currency::USD, Currency::EUR, true, noon())
        .await
        .unwrap();
    assert_eq!(refreshed.rate, dec("0.91"));
    assert_eq!(provider.calls(), 2);

    let cached = store.get(Currency::USD, Currency::EUR).await.unwrap().unwrap();
    assert_eq!(cached.rate, dec("0.91"));
}

#[tokio::test]
async fn provider_failure_serves_stale_cache() {
    let provider = ScriptedProvider::new("0.90");
    let (service, _) = service(provider.clone());

    service
        .get_rate_at(Currency::USD, Currency::EUR, false, noon())
        .await
        .unwrap();
    provider.set(None);

    let stale = service
        .get_rate_at(Currency::USD, Currency::EUR, false, noon() + Duration::hours(3))
        .await
        .unwrap();
    assert!(stale.stale);
    assert_eq!(stale.source, RateSource::StaleCache);
    assert_eq!(stale.rate, dec("0.90"));
    assert_eq!(stale.fetched_at, noon());

    let expired = service
        .get_rate_at(Currency::USD, Currency::EUR, false, noon() + Duration::hours(25))
        .await;
    assert!(matches!(expired, Err(FxError::Unavailable(_))));
}

#[tokio::test]
async fn provider_failure_without_cache_is_unavailable() {
    let provider = ScriptedProvider::new("0.90");
    provider.set(None);
    let (service, _) = service(provider);

    let err = service
        .get_rate(Currency::USD, Currency::EUR, false)
        .await
        .unwrap_err();
    assert!(matches!(err, FxError::Unavailable(_)));
    assert!(err.is_upstream());
}

#[tokio::test]
async fn stale_fallback_can_be_disabled() {
    let provider = ScriptedProvider::new("0.90");
    let store = Arc::new(MemoryRateStore::new());
    let service = CurrencyService::new(
        provider.clone(),
        store,
        FxSettings {
            allow_stale: false,
            ..FxSettings::default()
        },
    );
    service
        .get_rate_at(Currency::USD, Currency::EUR, false, noon())
        .await
        .unwrap();
    provider.set(None);

    let result = service
        .get_rate_at(Currency::USD, Currency::EUR, false, noon() + Duration::hours(2))
        .await;
    assert!(matches!(result, Err(FxError::Unavailable(_))));
}

#[tokio::test]
async fn convert_uses_cached_rate() {
    let provider = ScriptedProvider::new("0.80");
    let (service, store) = service(provider.clone());
    store
        .put(CachedRate {
            base: Currency::USD,
            quote: Currency::EUR,
            rate: dec("0.90"),
            fetched_at: Utc::now(),
        })
        .await
        .unwrap();

    let conversion = service
        .convert(dec("100"), Currency::USD, Currency::EUR, false)
        .await
        .unwrap();
    assert_eq!(conversion.converted.to_string(), "90.00");
    assert_eq!(conversion.rate, dec("0.90"));
    assert!(!conversion.stale);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn convert_rejects_negative_amounts() {
    let (service, _) = service(ScriptedProvider::new("0.9"));
    let result = service
        .convert(dec("-1"), Currency::USD, Currency::EUR, false)
        .await;
    assert!(matches!(result, Err(FxError::InvalidAmount(_))));
}

#[tokio::test]
async fn multiple_rates_report_each_quote() {
    let provider = ScriptedProvider::new("0.9");
    provider.set(None);
    let (service, store) = service(provider);
    store
        .put(CachedRate {
            base: Currency::USD,
            quote: Currency::EUR,
            rate: dec("0.9"),
            fetched_at: Utc::now(),
        })
        .await
        .unwrap();

    let results = service
        .get_multiple_rates(Currency::USD, &[Currency::EUR, gbp()])
        .await;
    assert_eq!(results.len(), 2);
    assert!(matches!(&results[0], QuoteResult::Rate(rate) if rate.rate == dec("0.9")));
    assert!(matches!(&results[1], QuoteResult::Failed { quote, .. } if *quote == gbp()));
}

#[tokio::test]
async fn currency_info_covers_known_codes() {
    let (service, _) = service(ScriptedProvider::new("1"));
    let info = service.currency_info(gbp()).unwrap();
    assert_eq!(info.name, "British Pound");
    assert!(service.currency_info(Currency::try_from("XYZ").unwrap()).is_err());
    assert!(
        service
            .supported_currencies()
            .iter()
            .any(|group| group.name == "major" && group.codes.contains(&"EUR"))
    );
}

#[tokio::test]
async fn historical_rate_converts_within_the_last_year() {
    let provider = ScriptedProvider::new("0.8");
    let (service, store) = service(provider.clone());
    let today = day(2024, 3, 1);

    let hist = service
        .historical_rate_at(Currency::USD, gbp(), day(2023, 3, 2), Some(dec("10.005")), today)
        .await
        .unwrap();
    assert_eq!(hist.rate, dec("0.8"));
    assert_eq!(hist.converted, Some(dec("8.00")));
    assert_eq!(provider.calls(), 1);
    assert!(store.get(Currency::USD, gbp()).await.unwrap().is_none());

    let same = service
        .historical_rate_at(gbp(), gbp(), today, None, today)
        .await
        .unwrap();
    assert_eq!(same.rate, Decimal::ONE);
    assert_eq!(same.converted, None);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn historical_rate_rejects_dates_out_of_range() {
    let provider = ScriptedProvider::new("0.8");
    let (service, _) = service(provider.clone());
    let today = day(2024, 3, 1);

    let future = service
        .historical_rate_at(Currency::USD, gbp(), day(2024, 3, 2), None, today)
        .await
        .unwrap_err();
    assert!(matches!(future, FxError::InvalidDate(_)));

    // 2024 is a leap year: 2023-03-01 is 366 days back.
    let too_old = service
        .historical_rate_at(Currency::USD, gbp(), day(2023, 3, 1), None, today)
        .await
        .unwrap_err();
    assert!(matches!(too_old, FxError::InvalidDate(_)));

    let negative = service
        .historical_rate_at(Currency::USD, gbp(), today, Some(dec("-1")), today)
        .await
        .unwrap_err();
    assert!(matches!(negative, FxError::InvalidAmount(_)));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn historical_rate_failure_is_unavailable() {
    let provider = ScriptedProvider::new("0.8");
    provider.set(None);
    let (service, _) = service(provider);
    let err = service
        .historical_rate_at(Currency::USD, gbp(), day(2024, 2, 1), None, day(2024, 3, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, FxError::Unavailable(_)));

    let latest_only = CurrencyService::new(
        Arc::new(LatestOnly),
        Arc::new(MemoryRateStore::new()),
        FxSettings::default(),
    );
    let err = latest_only
        .historical_rate_at(Currency::USD, gbp(), day(2024, 2, 1), None, day(2024, 3, 1))
        .await
        .unwrap_err();
    assert!(err.is_upstream());
}

#[tokio::test]
async fn db_store_upserts_pairs() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let store = DbRateStore::new(db);

    assert!(store.get(Currency::USD, Currency::EUR).await.unwrap().is_none());

    let first = CachedRate {
        base: Currency::USD,
        quote: Currency::EUR,
        rate: dec("0.9"),
        fetched_at: noon(),
    };
    store.put(first).await.unwrap();
    store
        .put(CachedRate {
            rate: dec("0.925"),
            fetched_at: noon() + Duration::hours(2),
            ..first
        })
        .await
        .unwrap();

    let cached = store.get(Currency::USD, Currency::EUR).await.unwrap().unwrap();
    assert_eq!(cached.rate, dec("0.925"));
    assert_eq!(cached.fetched_at, noon() + Duration::hours(2));
    assert!(store.get(Currency::EUR, Currency::USD).await.unwrap().is_none());
}
