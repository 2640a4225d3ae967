//! Cached currency conversion.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use engine::Currency;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    CachedRate, FxError, RateProvider, RateStore, ResultFx,
    catalog::{self, CurrencyGroup, CurrencyInfo},
};

/// Cache policy of the [`CurrencyService`].
#[derive(Clone, Copy, Debug)]
pub struct FxSettings {
    /// Age under which a cached rate is served without calling the provider.
    pub cache_ttl: Duration,
    /// Serve an expired cached rate when the provider fails.
    pub allow_stale: bool,
    /// Oldest cached rate usable as a fallback.
    pub max_stale: Duration,
}

impl Default for FxSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            allow_stale: true,
            max_stale: Duration::from_secs(24 * 3600),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Cache,
    Provider,
    StaleCache,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RateQuote {
    pub base: Currency,
    pub quote: Currency,
    pub rate: Decimal,
    pub fetched_at: DateTime<Utc>,
    pub source: RateSource,
    pub stale: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Conversion {
    pub amount: Decimal,
    pub base: Currency,
    pub quote: Currency,
    pub rate: Decimal,
    pub converted: Decimal,
    pub stale: bool,
    pub fetched_at: DateTime<Utc>,
}

/// Oldest date, in days before today, a historical rate is served for.
pub const MAX_HISTORY_DAYS: i64 = 365;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoricalRate {
    pub base: Currency,
    pub quote: Currency,
    pub date: NaiveDate,
    pub rate: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted: Option<Decimal>,
}

/// Outcome of one quote inside [`CurrencyService::get_multiple_rates`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuoteResult {
    Rate(RateQuote),
    Failed { quote: Currency, error: String },
}

/// Exchange rates with a time-bounded cache in front of a [`RateProvider`].
#[derive(Clone)]
pub struct CurrencyService {
    provider: Arc<dyn RateProvider>,
    store: Arc<dyn RateStore>,
    settings: FxSettings,
}

impl CurrencyService {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        store: Arc<dyn RateStore>,
        settings: FxSettings,
    ) -> Self {
        Self {
            provider,
            store,
            settings,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn settings(&self) -> FxSettings {
        self.settings
    }

    pub async fn get_rate(
        &self,
        base: Currency,
        quote: Currency,
        force_refresh: bool,
    ) -> ResultFx<RateQuote> {
        self.get_rate_at(base, quote, force_refresh, Utc::now()).await
    }

    /// Resolves the rate as seen at `now`.
    ///
    /// Order: identity pair, fresh cache, provider, stale cache.
    pub async fn get_rate_at(
        &self,
        base: Currency,
        quote: Currency,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> ResultFx<RateQuote> {
        if base == quote {
            return Ok(RateQuote {
                base,
                quote,
                rate: Decimal::ONE,
                fetched_at: now,
                source: RateSource::Cache,
                stale: false,
            });
        }

        let cached = self.store.get(base, quote).await?;
        if !force_refresh
            && let Some(hit) = cached
            && age_within(hit.fetched_at, now, self.settings.cache_ttl)
        {
            debug!(%base, %quote, "fx cache hit");
            return Ok(quote_from(hit, RateSource::Cache, false));
        }

        match self.provider.fetch_rate(base, quote).await {
            Ok(rate) => {
                let fresh = CachedRate {
                    base,
                    quote,
                    rate,
                    fetched_at: now,
                };
                self.store.put(fresh).await?;
                Ok(quote_from(fresh, RateSource::Provider, false))
            }
            Err(err) => match cached {
                Some(hit)
                    if self.settings.allow_stale
                        && age_within(hit.fetched_at, now, self.settings.max_stale) =>
                {
                    warn!(
                        %base,
                        %quote,
                        fetched_at = %hit.fetched_at,
                        "fx provider failed, serving stale rate: {err}"
                    );
                    Ok(quote_from(hit, RateSource::StaleCache, true))
                }
                _ => {
                    warn!(%base, %quote, "fx provider failed: {err}");
                    Err(FxError::Unavailable(format!(
                        "no rate for {base}/{quote}: {err}"
                    )))
                }
            },
        }
    }

    /// Converts `amount` of `base` into `quote`, rounded half away from zero
    /// to the quote currency's minor units.
    pub async fn convert(
        &self,
        amount: Decimal,
        base: Currency,
        quote: Currency,
        force_refresh: bool,
    ) -> ResultFx<Conversion> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(FxError::InvalidAmount(
                "amount must not be negative".to_string(),
            ));
        }
        let resolved = self.get_rate(base, quote, force_refresh).await?;
        let converted = convert_amount(amount, resolved.rate, quote)?;
        Ok(Conversion {
            amount,
            base,
            quote,
            rate: resolved.rate,
            converted,
            stale: resolved.stale,
            fetched_at: resolved.fetched_at,
        })
    }

    /// Resolves every quote independently; failures are reported per quote.
    pub async fn get_multiple_rates(
        &self,
        base: Currency,
        quotes: &[Currency],
    ) -> Vec<QuoteResult> {
        let mut results = Vec::with_capacity(quotes.len());
        for &quote in quotes {
            let result = match self.get_rate(base, quote, false).await {
                Ok(rate) => QuoteResult::Rate(rate),
                Err(err) => QuoteResult::Failed {
                    quote,
                    error: err.to_string(),
                },
            };
            results.push(result);
        }
        results
    }

    pub async fn historical_rate(
        &self,
        base: Currency,
        quote: Currency,
        date: NaiveDate,
        amount: Option<Decimal>,
    ) -> ResultFx<HistoricalRate> {
        self.historical_rate_at(base, quote, date, amount, Utc::now().date_naive())
            .await
    }

    /// Rate of `base` in `quote` on `date`, as seen on `today`.
    ///
    /// Historical rates bypass the cache.
    pub async fn historical_rate_at(
        &self,
        base: Currency,
        quote: Currency,
        date: NaiveDate,
        amount: Option<Decimal>,
        today: NaiveDate,
    ) -> ResultFx<HistoricalRate> {
        if date > today {
            return Err(FxError::InvalidDate(format!(
                "{date} is in the future"
            )));
        }
        if (today - date).num_days() > MAX_HISTORY_DAYS {
            return Err(FxError::InvalidDate(format!(
                "{date} is more than {MAX_HISTORY_DAYS} days ago"
            )));
        }
        if let Some(amount) = amount
            && amount.is_sign_negative()
            && !amount.is_zero()
        {
            return Err(FxError::InvalidAmount(
                "amount must not be negative".to_string(),
            ));
        }

        let rate = if base == quote {
            Decimal::ONE
        } else {
            self.provider
                .fetch_historical(base, quote, date)
                .await
                .map_err(|err| {
                    warn!(%base, %quote, %date, "historical fx lookup failed: {err}");
                    match err {
                        FxError::Provider(_) | FxError::Http(_) => FxError::Unavailable(
                            format!("no rate for {base}/{quote} on {date}: {err}"),
                        ),
                        other => other,
                    }
                })?
        };
        let converted = amount
            .map(|amount| convert_amount(amount, rate, quote))
            .transpose()?;
        Ok(HistoricalRate {
            base,
            quote,
            date,
            rate,
            amount,
            converted,
        })
    }

    pub fn supported_currencies(&self) -> &'static [CurrencyGroup] {
        catalog::supported_currencies()
    }

    pub fn currency_info(&self, currency: Currency) -> ResultFx<CurrencyInfo> {
        catalog::currency_info(currency)
            .ok_or_else(|| FxError::UnsupportedCurrency(currency.code().to_string()))
    }
}

fn age_within(fetched_at: DateTime<Utc>, now: DateTime<Utc>, limit: Duration) -> bool {
    match (now - fetched_at).to_std() {
        Ok(age) => age < limit,
        // Fetched "in the future" (clock skew): treat as fresh.
        Err(_) => true,
    }
}

fn quote_from(rate: CachedRate, source: RateSource, stale: bool) -> RateQuote {
    RateQuote {
        base: rate.base,
        quote: rate.quote,
        rate: rate.rate,
        fetched_at: rate.fetched_at,
        source,
        stale,
    }
}

pub(crate) fn convert_amount(amount: Decimal, rate: Decimal, quote: Currency) -> ResultFx<Decimal> {
    let scale = quote.minor_units();
    let mut converted = amount
        .checked_mul(rate)
        .ok_or_else(|| FxError::InvalidAmount("amount too large".to_string()))?
        .round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    converted.rescale(scale);
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn conversion_rounds_to_quote_minor_units() {
        let converted = convert_amount(dec("100"), dec("0.90"), Currency::EUR).unwrap();
        assert_eq!(converted.to_string(), "90.00");

        let converted = convert_amount(dec("0.125"), dec("1"), Currency::EUR).unwrap();
        assert_eq!(converted.to_string(), "0.13");

        let jpy = Currency::try_from("JPY").unwrap();
        let converted = convert_amount(dec("10"), dec("149.55"), jpy).unwrap();
        assert_eq!(converted.to_string(), "1496");
    }

    #[test]
    fn age_is_bounded_by_limit() {
        let now = Utc::now();
        let hour = Duration::from_secs(3600);
        assert!(age_within(now - chrono::Duration::minutes(59), now, hour));
        assert!(!age_within(now - chrono::Duration::minutes(60), now, hour));
        assert!(age_within(now + chrono::Duration::minutes(5), now, hour));
    }
}
