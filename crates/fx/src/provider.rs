//! External FX rate providers.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDate;
use engine::Currency;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{FxError, ResultFx};

pub const DEFAULT_PRIMARY_URL: &str = "https://api.exchangerate-api.com/v4/latest";
pub const DEFAULT_SECONDARY_URL: &str = "https://api.exchangeratesapi.io/v1/latest";
pub const DEFAULT_HISTORY_URL: &str = "https://api.exchangerate-api.com/v4/history";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of live exchange rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Returns how many `quote` units one `base` unit buys.
    async fn fetch_rate(&self, base: Currency, quote: Currency) -> ResultFx<Decimal>;

    /// Returns the closing rate of `base` in `quote` on `date`.
    async fn fetch_historical(
        &self,
        base: Currency,
        quote: Currency,
        date: NaiveDate,
    ) -> ResultFx<Decimal> {
        let _ = (base, quote, date);
        Err(FxError::Provider(format!(
            "{} does not serve historical rates",
            self.name()
        )))
    }

    fn name(&self) -> &str;
}

#[derive(Clone, Debug)]
pub struct HttpProviderConfig {
    pub primary_url: String,
    pub secondary_url: String,
    /// Queried as `{history_url}/{BASE}/{YYYY-MM-DD}`.
    pub history_url: String,
    /// Enables the secondary endpoint.
    pub api_key: Option<String>,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            secondary_url: DEFAULT_SECONDARY_URL.to_string(),
            history_url: DEFAULT_HISTORY_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    #[serde(default)]
    rates: HashMap<String, Decimal>,
}

#[derive(Debug, Deserialize)]
struct KeyedLatestRates {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    rates: HashMap<String, Decimal>,
}

/// Looks up `quote` in a provider rate table, ignoring non-positive values.
fn pick_rate(rates: &HashMap<String, Decimal>, quote: Currency) -> Option<Decimal> {
    rates
        .get(quote.code())
        .copied()
        .filter(|rate| rate.is_sign_positive() && !rate.is_zero())
}

/// Queries the primary endpoint (`{primary_url}/{BASE}`) and falls back to
/// the keyed secondary endpoint when an API key is configured.
#[derive(Clone, Debug)]
pub struct HttpRateProvider {
    client: reqwest::Client,
    config: HttpProviderConfig,
}

impl HttpRateProvider {
    pub fn new(config: HttpProviderConfig) -> ResultFx<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    fn primary_url(&self, base: Currency) -> String {
        format!(
            "{}/{}",
            self.config.primary_url.trim_end_matches('/'),
            base.code()
        )
    }

    fn history_url(&self, base: Currency, date: NaiveDate) -> String {
        format!(
            "{}/{}/{}",
            self.config.history_url.trim_end_matches('/'),
            base.code(),
            date.format("%Y-%m-%d")
        )
    }

    async fn fetch_primary(&self, base: Currency, quote: Currency) -> ResultFx<Decimal> {
        let body: LatestRates = self
            .client
            .get(self.primary_url(base))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        pick_rate(&body.rates, quote).ok_or_else(|| {
            FxError::Provider(format!("primary provider has no rate for {base}/{quote}"))
        })
    }

    async fn fetch_secondary(
        &self,
        api_key: &str,
        base: Currency,
        quote: Currency,
    ) -> ResultFx<Decimal> {
        let body: KeyedLatestRates = self
            .client
            .get(&self.config.secondary_url)
            .query(&[
                ("access_key", api_key),
                ("base", base.code()),
                ("symbols", quote.code()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !body.success {
            return Err(FxError::Provider(
                "secondary provider rejected the request".to_string(),
            ));
        }
        pick_rate(&body.rates, quote).ok_or_else(|| {
            FxError::Provider(format!("secondary provider has no rate for {base}/{quote}"))
        })
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch_rate(&self, base: Currency, quote: Currency) -> ResultFx<Decimal> {
        let primary = match self.fetch_primary(base, quote).await {
            Ok(rate) => return Ok(rate),
            Err(err) => err,
        };
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(primary);
        };
        tracing::warn!(%base, %quote, error = %primary, "primary FX provider failed, trying secondary");
        self.fetch_secondary(api_key, base, quote).await
    }

    async fn fetch_historical(
        &self,
        base: Currency,
        quote: Currency,
        date: NaiveDate,
    ) -> ResultFx<Decimal> {
        let body: LatestRates = self
            .client
            .get(self.history_url(base, date))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        pick_rate(&body.rates, quote).ok_or_else(|| {
            FxError::Provider(format!("no {base}/{quote} rate for {date}"))
        })
    }

    fn name(&self) -> &str {
        "exchangerate-api"
    }
}
