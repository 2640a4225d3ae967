//! Exchange rates for merchant ledgers.
//!
//! [`CurrencyService`] answers rate and conversion requests from a cache
//! (`currency_rates` table or memory) and refreshes it from an external
//! [`RateProvider`] once an entry is older than the configured TTL. When the
//! provider fails, a cached entry younger than `max_stale` is served and
//! flagged as stale.
pub use catalog::{CurrencyGroup, CurrencyInfo, currency_info, supported_currencies};
pub use error::{FxError, ResultFx};
pub use provider::{
    DEFAULT_HISTORY_URL, DEFAULT_PRIMARY_URL, DEFAULT_SECONDARY_URL, HttpProviderConfig,
    HttpRateProvider, RateProvider,
};
pub use service::{
    Conversion, CurrencyService, FxSettings, HistoricalRate, MAX_HISTORY_DAYS, QuoteResult,
    RateQuote, RateSource,
};
pub use store::{CachedRate, DbRateStore, MemoryRateStore, RateStore};

mod catalog;
mod error;
mod provider;
mod service;
mod store;
